//! The orchestrating core: resolve the upstream, translate the request,
//! issue the call, hand the result to the relay, and classify failures.
//!
//! Constructed once from config + shared HTTP client; everything else is
//! per-request state. No retries: a single upstream failure is terminal
//! for that request.

use crate::config::{GatewayConfig, StreamMode};
use crate::error::{GatewayError, Result};
use crate::registry::{ModelRegistry, ProviderKind};
use crate::relay;
use crate::translate::gemini_types::GenerateContentResponse;
use crate::translate::openai_types::{ChatCompletionRequest, ErrorEnvelope};
use crate::translate::request::{to_gemini, to_openai_upstream};
use crate::translate::response::gemini_to_completion;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub struct Dispatcher {
    config: GatewayConfig,
    registry: ModelRegistry,
    client: reqwest::Client,
}

impl Dispatcher {
    pub fn new(config: GatewayConfig, client: reqwest::Client) -> Self {
        let registry = ModelRegistry::from_config(&config);
        Self {
            config,
            registry,
            client,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Handle one chat-completion request end to end.
    pub async fn dispatch(&self, req: ChatCompletionRequest) -> Response {
        if req.messages.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorEnvelope::invalid_request("messages must not be empty")),
            )
                .into_response();
        }

        let target = self.registry.resolve(req.model.as_deref());

        tracing::info!(
            model = req.model.as_deref().unwrap_or("<absent>"),
            upstream_model = %target.upstream_model,
            provider = ?target.kind,
            streaming = req.is_streaming(),
            "dispatching chat completion"
        );

        let result = match target.kind {
            ProviderKind::OpenAiCompat => self.via_openai(&req, &target.upstream_model).await,
            ProviderKind::GeminiNative => self.via_gemini(&req, &target.upstream_model).await,
        };

        result.unwrap_or_else(|err| error_response(&err))
    }

    /// OpenAI-compatible path: translated body forwarded with Bearer auth,
    /// response relayed as-is (raw byte pipe when streaming).
    async fn via_openai(&self, req: &ChatCompletionRequest, upstream_model: &str) -> Result<Response> {
        let api_key = self.config.resolve_openai_key()?;
        let url = format!(
            "{}/chat/completions",
            self.config.openai.base_url.trim_end_matches('/')
        );

        let body = to_openai_upstream(
            req,
            upstream_model,
            self.config.openai.thinking_mode,
            &self.config.params.drop,
        );

        tracing::debug!(%url, model = %body.model, "POST chat/completions");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(upstream_error(status, response).await);
        }

        if req.is_streaming() {
            Ok(relay::passthrough_stream(response))
        } else {
            let value: serde_json::Value = response.json().await?;
            Ok(Json(value).into_response())
        }
    }

    /// Gemini path: native-schema body, key-in-query auth. Streaming is
    /// transcoded incrementally unless the config pins buffered mode, in
    /// which case a streaming client gets the fake-stream fallback.
    async fn via_gemini(&self, req: &ChatCompletionRequest, upstream_model: &str) -> Result<Response> {
        let api_key = self.config.resolve_gemini_key()?;
        let base = self.config.gemini.base_url.trim_end_matches('/');
        let echo_model = req
            .model
            .clone()
            .unwrap_or_else(|| upstream_model.to_string());

        let body = to_gemini(req);
        let incremental =
            req.is_streaming() && self.config.gemini.stream_mode == StreamMode::Incremental;

        if incremental {
            let url = format!("{base}/models/{upstream_model}:streamGenerateContent");
            tracing::debug!(model = upstream_model, "POST streamGenerateContent");

            let response = self
                .client
                .post(&url)
                .query(&[("key", api_key.as_str())])
                .json(&body)
                .send()
                .await?;

            let status = response.status().as_u16();
            if status >= 400 {
                return Err(upstream_error(status, response).await);
            }

            return Ok(relay::transcode_stream(response, echo_model));
        }

        let url = format!("{base}/models/{upstream_model}:generateContent");
        tracing::debug!(model = upstream_model, "POST generateContent");

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(upstream_error(status, response).await);
        }

        let gemini_resp: GenerateContentResponse = response.json().await?;
        let completion =
            gemini_to_completion(&gemini_resp, &echo_model, chrono::Utc::now().timestamp());

        if req.is_streaming() {
            Ok(relay::fake_stream(&completion))
        } else {
            Ok(Json(completion).into_response())
        }
    }
}

/// Classify a failure into the client error envelope. Only reached when
/// no response bytes have been sent yet.
pub fn error_response(err: &GatewayError) -> Response {
    let status =
        StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    tracing::warn!(status = status.as_u16(), error = %err, "request failed");

    (status, Json(ErrorEnvelope::from(err))).into_response()
}

/// Extract the upstream's own error message where feasible; both upstream
/// families use an `{"error": {"message": ...}}` envelope.
async fn upstream_error(status: u16, response: reqwest::Response) -> GatewayError {
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| format!("upstream returned status {status}: {}", truncate(&body, 300)));

    GatewayError::upstream(status, message)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
