//! Error types for the gateway.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GatewayError {
    /// A required credential or setting is absent. Fails before any
    /// upstream call is made.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The upstream answered with a non-2xx status. The status code is
    /// propagated to the client.
    #[error("Upstream returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    /// Network-level failure, no upstream response received.
    #[error("Upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn upstream(status: u16, msg: impl Into<String>) -> Self {
        Self::UpstreamStatus {
            status,
            message: msg.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// The HTTP status surfaced to the client for this failure. Upstream
    /// statuses propagate as-is; everything else is a plain 500.
    pub fn status(&self) -> u16 {
        match self {
            Self::UpstreamStatus { status, .. } => *status,
            _ => 500,
        }
    }

    /// Error-envelope `type` tag for this failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "configuration_error",
            Self::UpstreamStatus { .. } => "upstream_error",
            Self::Transport(_) => "upstream_transport_error",
            _ => "server_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
