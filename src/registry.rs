//! Model routing: map a client-supplied model id to an upstream provider.
//!
//! Resolution is deliberately permissive: an unknown or absent model id is
//! substituted with the configured default upstream model rather than
//! rejected. The provider decision is made exactly once here; everything
//! downstream branches on [`ProviderKind`], never on the raw string.

use crate::config::GatewayConfig;
use std::collections::HashMap;

/// Which upstream wire format a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Upstream speaks the OpenAI chat-completions protocol (Bearer auth).
    OpenAiCompat,
    /// Upstream speaks the Gemini generateContent protocol (key-in-query auth).
    GeminiNative,
}

/// The routing decision for one request. Resolved once, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTarget {
    pub kind: ProviderKind,
    pub upstream_model: String,
}

/// Gemini model ids advertised on `/v1/models` alongside the alias table.
pub const GEMINI_MODELS: &[&str] = &["gemini-2.5-pro", "gemini-2.5-flash", "gemini-2.0-flash"];

/// Aliases recognized out of the box. Config `[models]` entries layer on top.
const BUILT_IN_ALIASES: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4",
    "gpt-4-turbo",
    "gpt-3.5-turbo",
    "o1",
    "o1-mini",
];

/// Static model-id → provider mapping, built once from config at startup.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    aliases: HashMap<String, String>,
    default_model: String,
    gemini_default: String,
}

impl ModelRegistry {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut aliases: HashMap<String, String> = BUILT_IN_ALIASES
            .iter()
            .map(|a| ((*a).to_string(), config.openai.default_model.clone()))
            .collect();

        for (alias, target) in &config.models {
            aliases.insert(alias.clone(), target.clone());
        }

        Self {
            aliases,
            default_model: config.openai.default_model.clone(),
            gemini_default: config.gemini.default_model.clone(),
        }
    }

    /// Resolve a client model id to an upstream target. Never fails: ids
    /// containing "gemini" (case-insensitive) route to the Gemini upstream
    /// as-is, except that the bare marker with no version suffix takes the
    /// configured Gemini default; known aliases map through the table, and
    /// anything else takes the default upstream model.
    pub fn resolve(&self, model: Option<&str>) -> ProviderTarget {
        let model = model.unwrap_or("").trim();

        let lowered = model.to_ascii_lowercase();
        if lowered.contains("gemini") {
            return ProviderTarget {
                kind: ProviderKind::GeminiNative,
                upstream_model: if lowered == "gemini" {
                    self.gemini_default.clone()
                } else {
                    model.to_string()
                },
            };
        }

        let upstream_model = match self.aliases.get(model) {
            Some(mapped) => mapped.clone(),
            None => {
                if !model.is_empty() {
                    tracing::debug!(model, default = %self.default_model, "unknown model id, substituting default");
                }
                self.default_model.clone()
            }
        };

        ProviderTarget {
            kind: ProviderKind::OpenAiCompat,
            upstream_model,
        }
    }

    /// Model ids advertised on `/v1/models`: the alias table plus the
    /// Gemini-native ids.
    pub fn advertised_models(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.aliases.keys().cloned().collect();
        ids.sort();
        ids.extend(GEMINI_MODELS.iter().map(|m| (*m).to_string()));
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;

    fn registry() -> ModelRegistry {
        ModelRegistry::from_config(&GatewayConfig::default())
    }

    #[test]
    fn test_known_alias_resolves_to_default_upstream() {
        let target = registry().resolve(Some("gpt-4o"));
        assert_eq!(target.kind, ProviderKind::OpenAiCompat);
        assert_eq!(target.upstream_model, "deepseek-chat");
    }

    #[test]
    fn test_unknown_model_substitutes_default() {
        let target = registry().resolve(Some("totally-made-up"));
        assert_eq!(target.kind, ProviderKind::OpenAiCompat);
        assert_eq!(target.upstream_model, "deepseek-chat");
    }

    #[test]
    fn test_absent_model_substitutes_default() {
        let target = registry().resolve(None);
        assert_eq!(target.kind, ProviderKind::OpenAiCompat);
        assert_eq!(target.upstream_model, "deepseek-chat");
    }

    #[test]
    fn test_gemini_marker_is_case_insensitive() {
        let target = registry().resolve(Some("Gemini-2.5-Flash"));
        assert_eq!(target.kind, ProviderKind::GeminiNative);
        assert_eq!(target.upstream_model, "Gemini-2.5-Flash");
    }

    #[test]
    fn test_bare_gemini_marker_takes_configured_default() {
        let target = registry().resolve(Some("gemini"));
        assert_eq!(target.kind, ProviderKind::GeminiNative);
        assert_eq!(target.upstream_model, "gemini-2.5-flash");

        let target = registry().resolve(Some("GEMINI"));
        assert_eq!(target.upstream_model, "gemini-2.5-flash");
    }

    #[test]
    fn test_gemini_model_forwarded_as_is() {
        let target = registry().resolve(Some("gemini-2.5-pro"));
        assert_eq!(target.kind, ProviderKind::GeminiNative);
        assert_eq!(target.upstream_model, "gemini-2.5-pro");
    }

    #[test]
    fn test_config_alias_overrides_built_in() {
        let mut config = GatewayConfig::default();
        config
            .models
            .insert("gpt-4o".to_string(), "deepseek-reasoner".to_string());
        let registry = ModelRegistry::from_config(&config);

        let target = registry.resolve(Some("gpt-4o"));
        assert_eq!(target.upstream_model, "deepseek-reasoner");
    }

    #[test]
    fn test_advertised_models_include_both_families() {
        let ids = registry().advertised_models();
        assert!(ids.iter().any(|m| m == "gpt-4o"));
        assert!(ids.iter().any(|m| m == "gemini-2.5-flash"));
    }
}
