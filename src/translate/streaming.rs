//! Incremental transcoding of a Gemini `streamGenerateContent` byte stream
//! into OpenAI chat-completion chunks.
//!
//! Gemini does not emit properly framed SSE: the stream is a pseudo-array
//! of JSON objects separated by commas and brackets, sometimes with a
//! `data:` line prefix, fragmented at arbitrary byte offsets. The
//! [`LineFramer`] buffers incomplete lines across chunk boundaries so a
//! parse is only ever attempted on a full line; the [`GeminiTranscoder`]
//! then extracts the text delta and wraps it in the client's chunk
//! envelope. Complete lines that still fail to parse are dropped and
//! counted, never fatal.

use super::openai_types::ChatCompletionChunk;

/// Splits an incoming byte stream into complete lines, carrying partial
/// lines across chunk boundaries. The buffer holds raw bytes; UTF-8
/// decoding happens only on complete lines, so a multibyte character
/// split across network chunks survives intact.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte chunk, returning every line completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..line.len() - 1]).into_owned());
        }
        lines
    }

    /// Drain whatever is left after the upstream closed (a final line
    /// without a trailing newline).
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&rest);
        if text.trim().is_empty() {
            return None;
        }
        Some(text.into_owned())
    }
}

/// Per-request transcoder state: a stable chunk id and timestamp, the
/// model id to echo, and a count of dropped fragments.
#[derive(Debug)]
pub struct GeminiTranscoder {
    id: String,
    created: i64,
    model: String,
    dropped: u64,
}

impl GeminiTranscoder {
    pub fn new(model: &str) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            created: chrono::Utc::now().timestamp(),
            model: model.to_string(),
            dropped: 0,
        }
    }

    /// Transcode one complete line into a client chunk, if it carries a
    /// text delta. Structural lines (brackets, commas, blanks) are skipped
    /// silently; unparseable payload lines are dropped and counted.
    pub fn transcode_line(&mut self, line: &str) -> Option<ChatCompletionChunk> {
        let payload = strip_framing(line)?;

        let value: serde_json::Value = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(_) => {
                self.dropped += 1;
                return None;
            }
        };

        let text = extract_text_delta(&value)?;
        if text.is_empty() {
            return None;
        }

        Some(ChatCompletionChunk::delta(
            &self.id,
            self.created,
            &self.model,
            &text,
        ))
    }

    /// The closing chunk with `finish_reason: "stop"`.
    pub fn finish_chunk(&self) -> ChatCompletionChunk {
        ChatCompletionChunk::finish(&self.id, self.created, &self.model)
    }

    /// How many complete-but-unparseable lines were discarded.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Strip Gemini's stream framing from a line: the optional `data:` prefix,
/// separator commas, and array brackets. Returns `None` when nothing
/// parseable can remain.
fn strip_framing(line: &str) -> Option<&str> {
    let mut s = line.trim();

    if let Some(stripped) = s.strip_prefix("data:") {
        s = stripped.trim();
    }

    s = s.trim_start_matches(',').trim_end_matches(',').trim();
    s = s.trim_start_matches('[').trim_end_matches(']').trim();

    if s.is_empty() || s == "[DONE]" {
        return None;
    }
    Some(s)
}

/// Pull the text delta out of a Gemini stream object:
/// `candidates[0].content.parts[*].text`, parts concatenated.
fn extract_text_delta(value: &serde_json::Value) -> Option<String> {
    let parts = value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELTA: &str =
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello"}]}}]}"#;

    #[test]
    fn test_framer_buffers_partial_lines_across_chunks() {
        let mut framer = LineFramer::new();

        let (head, tail) = DELTA.split_at(30);
        assert!(framer.push(head.as_bytes()).is_empty());
        assert!(framer.push(tail.as_bytes()).is_empty());

        let lines = framer.push(b"\n");
        assert_eq!(lines, vec![DELTA.to_string()]);
    }

    #[test]
    fn test_framer_keeps_multibyte_chars_split_across_chunks() {
        let mut framer = LineFramer::new();

        let line = r#"{"text":"héllo"}"#;
        let bytes = line.as_bytes();
        // Split inside the two-byte encoding of 'é'.
        let mid = line.find('é').unwrap() + 1;
        assert!(framer.push(&bytes[..mid]).is_empty());
        assert!(framer.push(&bytes[mid..]).is_empty());

        let lines = framer.push(b"\n");
        assert_eq!(lines, vec![line.to_string()]);
    }

    #[test]
    fn test_framer_splits_multiple_lines_in_one_chunk() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"one\ntwo\nthr");
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(framer.finish(), Some("thr".to_string()));
    }

    #[test]
    fn test_framer_finish_ignores_whitespace() {
        let mut framer = LineFramer::new();
        framer.push(b"  \n  ");
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn test_transcoder_extracts_delta() {
        let mut tx = GeminiTranscoder::new("gemini-2.5-flash");
        let chunk = tx.transcode_line(DELTA).expect("chunk");

        assert_eq!(chunk.model, "gemini-2.5-flash");
        assert_eq!(chunk.object, "chat.completion.chunk");
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hello"));
        assert!(chunk.choices[0].finish_reason.is_none());
    }

    #[test]
    fn test_transcoder_skips_structural_lines() {
        let mut tx = GeminiTranscoder::new("m");
        assert!(tx.transcode_line("[").is_none());
        assert!(tx.transcode_line("]").is_none());
        assert!(tx.transcode_line(",").is_none());
        assert!(tx.transcode_line("").is_none());
        assert_eq!(tx.dropped(), 0);
    }

    #[test]
    fn test_transcoder_strips_data_prefix_and_comma() {
        let mut tx = GeminiTranscoder::new("m");

        let with_prefix = format!("data: {DELTA}");
        assert!(tx.transcode_line(&with_prefix).is_some());

        let with_comma = format!(",{DELTA}");
        assert!(tx.transcode_line(&with_comma).is_some());
    }

    #[test]
    fn test_transcoder_counts_dropped_garbage() {
        let mut tx = GeminiTranscoder::new("m");
        assert!(tx.transcode_line("{not json at all").is_none());
        assert_eq!(tx.dropped(), 1);
    }

    #[test]
    fn test_transcoder_ignores_objects_without_text() {
        let mut tx = GeminiTranscoder::new("m");
        let no_text = r#"{"candidates":[{"finishReason":"STOP"}]}"#;
        assert!(tx.transcode_line(no_text).is_none());
        assert_eq!(tx.dropped(), 0);
    }

    #[test]
    fn test_chunk_id_stable_within_stream() {
        let mut tx = GeminiTranscoder::new("m");
        let first = tx.transcode_line(DELTA).unwrap();
        let second = tx.transcode_line(DELTA).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.id, tx.finish_chunk().id);
    }

    #[test]
    fn test_fragmented_stream_end_to_end() {
        // Simulate Gemini's pseudo-array fragmented at awkward offsets.
        let stream = format!("[{DELTA},\n{DELTA}\n]");
        let bytes = stream.as_bytes();

        let mut framer = LineFramer::new();
        let mut tx = GeminiTranscoder::new("gemini-2.5-flash");
        let mut deltas = Vec::new();

        for chunk in bytes.chunks(7) {
            for line in framer.push(chunk) {
                if let Some(c) = tx.transcode_line(&line) {
                    deltas.push(c);
                }
            }
        }
        if let Some(line) = framer.finish() {
            if let Some(c) = tx.transcode_line(&line) {
                deltas.push(c);
            }
        }

        assert_eq!(deltas.len(), 2);
        assert_eq!(tx.dropped(), 0);
    }
}
