use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Full gateway configuration. Built once at startup and handed to the
/// [`Dispatcher`](crate::dispatch::Dispatcher) by value; request handlers
/// never read ambient global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: u16,
    pub openai: OpenAiUpstream,
    pub gemini: GeminiUpstream,
    /// Extra model aliases layered over the built-in table.
    pub models: HashMap<String, String>,
    pub params: ParamsConfig,
}

/// The OpenAI-compatible upstream (DeepSeek by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiUpstream {
    pub base_url: String,
    pub api_key_env: String,
    pub default_model: String,
    /// When set, a `thinking: {"type": "enabled"}` extension object is
    /// injected into every translated request.
    pub thinking_mode: bool,
}

/// The Gemini native upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiUpstream {
    pub base_url: String,
    pub api_key_env: String,
    pub default_model: String,
    pub stream_mode: StreamMode,
}

/// How a streaming client request is served from the Gemini upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Call `streamGenerateContent` and transcode deltas incrementally.
    #[default]
    Incremental,
    /// Call `generateContent`, then wrap the full text as a single chunk.
    Buffered,
}

/// Request fields stripped before forwarding to the OpenAI-compatible
/// upstream (fields the upstream is known to reject).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamsConfig {
    #[serde(default = "default_drop_params")]
    pub drop: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 8787,
            openai: OpenAiUpstream::default(),
            gemini: GeminiUpstream::default(),
            models: HashMap::new(),
            params: ParamsConfig::default(),
        }
    }
}

impl Default for OpenAiUpstream {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_string(),
            api_key_env: "OPENAI_UPSTREAM_API_KEY".to_string(),
            default_model: "deepseek-chat".to_string(),
            thinking_mode: false,
        }
    }
}

impl Default for GeminiUpstream {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            default_model: "gemini-2.5-flash".to_string(),
            stream_mode: StreamMode::Incremental,
        }
    }
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            drop: default_drop_params(),
        }
    }
}

fn default_drop_params() -> Vec<String> {
    vec![
        "repetition_penalty".to_string(),
        "presence_penalty".to_string(),
        "frequency_penalty".to_string(),
        "logit_bias".to_string(),
    ]
}

impl GatewayConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file, falling back to
    /// built-in defaults when none exists.
    /// Priority: CLI arg > CWD > XDG config dir
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(&candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Resolve the OpenAI-compatible upstream key from the environment.
    pub fn resolve_openai_key(&self) -> Result<String> {
        resolve_key_env(&self.openai.api_key_env)
    }

    /// Resolve the Gemini upstream key from the environment.
    pub fn resolve_gemini_key(&self) -> Result<String> {
        resolve_key_env(&self.gemini.api_key_env)
    }
}

fn resolve_key_env(var: &str) -> Result<String> {
    std::env::var(var).map_err(|_| {
        GatewayError::config(format!(
            "Environment variable '{}' not set. Set it with your upstream API key.",
            var
        ))
    })
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("chatgate.toml")];

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("chatgate").join("config.toml"));
    }
    if let Ok(home) = std::env::var("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".config")
                .join("chatgate")
                .join("config.toml"),
        );
    }

    paths
}
