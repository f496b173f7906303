use crate::dispatch::Dispatcher;
use crate::registry::ProviderKind;
use crate::translate::openai_types::{ChatCompletionRequest, ErrorEnvelope};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub dispatcher: Dispatcher,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Unknown paths and unsupported methods both answer 404.
    Router::new()
        .route(
            "/v1/chat/completions",
            post(handle_chat_completions).fallback(handle_not_found),
        )
        .route("/health", get(handle_health).fallback(handle_not_found))
        .route("/v1/models", get(handle_models).fallback(handle_not_found))
        .fallback(handle_not_found)
        // Payload size is deliberately unbounded.
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_chat_completions(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: ChatCompletionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse request body");
            let err = ErrorEnvelope::invalid_request(format!("Invalid request body: {e}"));
            return (StatusCode::BAD_REQUEST, Json(err)).into_response();
        }
    };

    state.dispatcher.dispatch(req).await
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "port": state.dispatcher.config().port,
    }))
}

async fn handle_models(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let registry = state.dispatcher.registry();
    let created = chrono::Utc::now().timestamp();

    let models: Vec<serde_json::Value> = registry
        .advertised_models()
        .into_iter()
        .map(|id| {
            let owned_by = match registry.resolve(Some(&id)).kind {
                ProviderKind::OpenAiCompat => "openai-compatible",
                ProviderKind::GeminiNative => "google",
            };
            serde_json::json!({
                "id": id,
                "object": "model",
                "created": created,
                "owned_by": owned_by,
            })
        })
        .collect();

    Json(serde_json::json!({ "object": "list", "data": models }))
}

async fn handle_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorEnvelope::not_found("Not found")),
    )
        .into_response()
}
