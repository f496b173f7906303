//! Response relay: turn an upstream HTTP response into the client-facing
//! response, streamed or buffered.
//!
//! Streaming responses always go out with forced `text/event-stream`,
//! `no-cache`, `keep-alive` headers, whatever the upstream sent — some
//! clients stall waiting for these. The relay loops pull upstream bytes
//! only when the outbound side polls, so transport backpressure carries
//! through, and dropping the response (client disconnect) drops the
//! upstream stream with it.

use crate::translate::openai_types::{ChatCompletionChunk, ChatCompletionResponse};
use crate::translate::streaming::{GeminiTranscoder, LineFramer};

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::StreamExt;

const DONE_LINE: &[u8] = b"data: [DONE]\n\n";

/// Pipe an OpenAI-compatible upstream SSE stream to the client unmodified.
pub fn passthrough_stream(upstream: reqwest::Response) -> Response {
    let stream = upstream
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));

    streaming_response(Body::from_stream(stream))
}

/// Incrementally transcode a Gemini `streamGenerateContent` byte stream
/// into client chunks, closing with a finish chunk and `[DONE]`.
pub fn transcode_stream(upstream: reqwest::Response, model: String) -> Response {
    let byte_stream = upstream.bytes_stream();

    let out = async_stream::stream! {
        let mut framer = LineFramer::new();
        let mut transcoder = GeminiTranscoder::new(&model);

        tokio::pin!(byte_stream);

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    // Headers are already out; all we can do is stop.
                    tracing::warn!(error = %e, "upstream stream failed mid-relay, terminating");
                    break;
                }
            };

            for line in framer.push(&chunk) {
                if let Some(delta) = transcoder.transcode_line(&line) {
                    yield Ok::<Bytes, std::io::Error>(sse_data(&delta));
                }
            }
        }

        if let Some(line) = framer.finish() {
            if let Some(delta) = transcoder.transcode_line(&line) {
                yield Ok(sse_data(&delta));
            }
        }

        if transcoder.dropped() > 0 {
            tracing::debug!(dropped = transcoder.dropped(), "discarded unparseable stream fragments");
        }

        yield Ok(sse_data(&transcoder.finish_chunk()));
        yield Ok(Bytes::from_static(DONE_LINE));
    };

    streaming_response(Body::from_stream(out))
}

/// Wrap a completed response as a single streaming chunk, carrying the
/// finish reason, followed immediately by `[DONE]`. Used when the client
/// asked for a stream but the upstream call was buffered, so the
/// connection never stalls.
pub fn fake_stream(completion: &ChatCompletionResponse) -> Response {
    let first = completion.choices.first();
    let text = first
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();
    let finish_reason = first
        .and_then(|c| c.finish_reason.clone())
        .unwrap_or_else(|| "stop".to_string());

    let mut chunk =
        ChatCompletionChunk::delta(&completion.id, completion.created, &completion.model, &text);
    chunk.choices[0].finish_reason = Some(finish_reason);

    let mut payload = Vec::new();
    payload.extend_from_slice(&sse_data(&chunk));
    payload.extend_from_slice(DONE_LINE);

    streaming_response(Body::from(payload))
}

fn sse_data(chunk: &ChatCompletionChunk) -> Bytes {
    let json = serde_json::to_string(chunk).unwrap_or_default();
    Bytes::from(format!("data: {json}\n\n"))
}

fn streaming_response(body: Body) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
