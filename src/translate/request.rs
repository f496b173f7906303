//! Translate inbound chat-completion requests into upstream request bodies.
//!
//! One translator per provider family. Both are pure functions: request in,
//! upstream body out, no I/O. Absent optional fields take documented
//! defaults and never raise; the only structural requirement (non-empty
//! messages) is enforced at the dispatch boundary.

use super::gemini_types::{
    permissive_safety_settings, to_gemini_role, Content, GenerateContentRequest, GenerationConfig,
    Part, SystemInstruction,
};
use super::openai_types::{ChatCompletionRequest, ChatRole, UpstreamChatRequest};

/// Defaults for the OpenAI-compatible upstream.
pub const OPENAI_DEFAULT_TEMPERATURE: f64 = 0.6;
pub const OPENAI_DEFAULT_MAX_TOKENS: u64 = 1024;

/// Defaults for the Gemini upstream.
pub const GEMINI_DEFAULT_TEMPERATURE: f64 = 0.7;
pub const GEMINI_DEFAULT_MAX_OUTPUT_TOKENS: u64 = 8192;

/// Build the body for an OpenAI-compatible upstream: the inbound request
/// with the resolved model substituted, denied fields stripped, defaults
/// filled in, and the thinking-mode extension attached when enabled.
/// Messages are forwarded verbatim.
pub fn to_openai_upstream(
    req: &ChatCompletionRequest,
    upstream_model: &str,
    thinking_mode: bool,
    deny_list: &[String],
) -> UpstreamChatRequest {
    let extra = req
        .extra
        .iter()
        .filter(|(key, _)| !deny_list.iter().any(|denied| denied == *key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let thinking = thinking_mode.then(|| serde_json::json!({ "type": "enabled" }));

    UpstreamChatRequest {
        model: upstream_model.to_string(),
        messages: req.messages.clone(),
        temperature: req.temperature.unwrap_or(OPENAI_DEFAULT_TEMPERATURE),
        max_tokens: req.max_tokens.unwrap_or(OPENAI_DEFAULT_MAX_TOKENS),
        stream: req.stream,
        thinking,
        extra,
    }
}

/// Build the body for the Gemini native upstream. System messages are
/// lifted into `systemInstruction` (last one wins when several exist;
/// defined behavior), the remaining turns keep their order with
/// `assistant` rewritten to `model`, and the fixed permissive safety
/// block is always attached.
pub fn to_gemini(req: &ChatCompletionRequest) -> GenerateContentRequest {
    let system_instruction = req
        .messages
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .next_back()
        .map(|m| SystemInstruction {
            parts: vec![Part {
                text: m.content.clone(),
            }],
        });

    let contents = req
        .messages
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .map(|m| Content {
            role: to_gemini_role(m.role).to_string(),
            parts: vec![Part {
                text: m.content.clone(),
            }],
        })
        .collect();

    GenerateContentRequest {
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            temperature: req.temperature.unwrap_or(GEMINI_DEFAULT_TEMPERATURE),
            max_output_tokens: req.max_tokens.unwrap_or(GEMINI_DEFAULT_MAX_OUTPUT_TOKENS),
        },
        safety_settings: permissive_safety_settings(),
    }
}
