//! API translation between the client-facing OpenAI protocol and the
//! upstream wire formats.
//!
//! The core of the gateway: converts requests, buffered responses, and
//! streaming deltas. All translation functions are pure (no I/O).

pub mod gemini_types;
pub mod openai_types;
pub mod request;
pub mod response;
pub mod streaming;
