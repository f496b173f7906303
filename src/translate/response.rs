use super::gemini_types::GenerateContentResponse;
use super::openai_types::{
    ChatCompletionResponse, ChatUsage, Choice, ChoiceMessage,
};

/// Translate a completed Gemini response into a single OpenAI completion
/// object. Pure function: `model` is what the caller originally requested,
/// echoed back regardless of upstream routing.
pub fn gemini_to_completion(
    resp: &GenerateContentResponse,
    model: &str,
    created: i64,
) -> ChatCompletionResponse {
    let text = resp.first_text();

    let finish_reason = resp
        .candidates
        .first()
        .and_then(|c| c.finish_reason.as_deref())
        .map(map_gemini_finish_reason)
        .unwrap_or("stop");

    let usage = resp.usage_metadata.as_ref().map(|u| ChatUsage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    ChatCompletionResponse {
        id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
        object: "chat.completion".to_string(),
        created,
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage {
                role: "assistant".to_string(),
                content: Some(text),
            },
            finish_reason: Some(finish_reason.to_string()),
        }],
        usage,
    }
}

/// Map a Gemini finishReason to the OpenAI finish_reason vocabulary.
pub fn map_gemini_finish_reason(reason: &str) -> &'static str {
    match reason {
        "MAX_TOKENS" => "length",
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => "content_filter",
        _ => "stop",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::gemini_types::{Candidate, Content, Part, UsageMetadata};

    fn gemini_response(text: &str, finish: &str) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: "model".to_string(),
                    parts: vec![Part {
                        text: text.to_string(),
                    }],
                }),
                finish_reason: Some(finish.to_string()),
            }],
            usage_metadata: Some(UsageMetadata {
                prompt_token_count: 7,
                candidates_token_count: 3,
                total_token_count: 10,
            }),
        }
    }

    #[test]
    fn test_text_and_model_echoed() {
        let resp = gemini_response("Hello!", "STOP");
        let completion = gemini_to_completion(&resp, "gemini-2.5-flash", 1234);

        assert_eq!(completion.object, "chat.completion");
        assert_eq!(completion.model, "gemini-2.5-flash");
        assert_eq!(completion.created, 1234);
        assert!(completion.id.starts_with("chatcmpl-"));
        assert_eq!(
            completion.choices[0].message.content.as_deref(),
            Some("Hello!")
        );
        assert_eq!(
            completion.choices[0].finish_reason.as_deref(),
            Some("stop")
        );
    }

    #[test]
    fn test_usage_carried_over() {
        let resp = gemini_response("x", "STOP");
        let completion = gemini_to_completion(&resp, "gemini-2.5-flash", 0);

        let usage = completion.usage.expect("usage");
        assert_eq!(usage.prompt_tokens, 7);
        assert_eq!(usage.completion_tokens, 3);
        assert_eq!(usage.total_tokens, 10);
    }

    #[test]
    fn test_empty_candidates_yield_empty_content() {
        let resp = GenerateContentResponse {
            candidates: vec![],
            usage_metadata: None,
        };
        let completion = gemini_to_completion(&resp, "gemini-2.5-flash", 0);

        assert_eq!(completion.choices[0].message.content.as_deref(), Some(""));
        assert_eq!(
            completion.choices[0].finish_reason.as_deref(),
            Some("stop")
        );
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_gemini_finish_reason("STOP"), "stop");
        assert_eq!(map_gemini_finish_reason("MAX_TOKENS"), "length");
        assert_eq!(map_gemini_finish_reason("SAFETY"), "content_filter");
        assert_eq!(map_gemini_finish_reason("SOMETHING_ELSE"), "stop");
    }
}
