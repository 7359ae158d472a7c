use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::{ProviderConfig, ProviderId, DEFAULT_TIMEOUT_SECS};

/// Application configuration loaded from environment variables.
/// Startup fails if the active provider has no credential.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub llm: LlmSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm: LlmSettings::from_env().context("Invalid LLM provider configuration")?,
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing credential for provider '{provider}': set {variable}")]
    MissingCredential {
        provider: ProviderId,
        variable: &'static str,
    },

    #[error("invalid value for {variable}: '{value}'")]
    InvalidValue {
        variable: &'static str,
        value: String,
    },
}

/// Per-provider credentials and defaults.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Everything the generation layer reads from process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub active: ProviderId,
    pub minimax: ProviderSettings,
    pub gemini: ProviderSettings,
    pub timeout_secs: u64,
}

impl LlmSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let active = match get("AI_PROVIDER") {
            Some(raw) => raw.parse::<ProviderId>().map_err(|_| ConfigError::InvalidValue {
                variable: "AI_PROVIDER",
                value: raw,
            })?,
            None => ProviderId::Gemini,
        };

        let timeout_secs = match get("AI_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    variable: "AI_TIMEOUT_SECS",
                    value: raw,
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let provider_settings = |provider: ProviderId, model_var: &str, url_var: &str| {
            ProviderSettings {
                api_key: get(provider.api_key_var()),
                model: get(model_var).unwrap_or_else(|| provider.default_model().to_string()),
                base_url: get(url_var)
                    .unwrap_or_else(|| provider.default_base_url().to_string()),
            }
        };

        Ok(LlmSettings {
            active,
            minimax: provider_settings(ProviderId::MiniMax, "MINIMAX_MODEL", "MINIMAX_BASE_URL"),
            gemini: provider_settings(ProviderId::Gemini, "GEMINI_MODEL", "GEMINI_BASE_URL"),
            timeout_secs,
        })
    }

    /// Snapshot for one call against the active provider.
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        let settings = match self.active {
            ProviderId::MiniMax => &self.minimax,
            ProviderId::Gemini => &self.gemini,
        };
        let api_key = settings
            .api_key
            .clone()
            .ok_or(ConfigError::MissingCredential {
                provider: self.active,
                variable: self.active.api_key_var(),
            })?;

        Ok(ProviderConfig {
            provider: self.active,
            model: settings.model.clone(),
            api_key,
            base_url: settings.base_url.clone(),
            timeout_secs: self.timeout_secs,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ConfigSource: injected configuration capability
// ────────────────────────────────────────────────────────────────────────────

/// Where agents get provider configuration from.
///
/// Each request asks for a fresh `ProviderConfig` snapshot; the snapshot is
/// immutable for the lifetime of that request. Credential rotation happens
/// only through an explicit `refresh()`.
pub trait ConfigSource: Send + Sync {
    fn provider_config(&self) -> Result<ProviderConfig, ConfigError>;

    /// The selected provider, whether or not it has a credential.
    fn active_provider(&self) -> ProviderId;

    /// Re-reads the underlying settings. On failure the previous settings stay
    /// in effect.
    fn refresh(&self) -> Result<ProviderId, ConfigError>;
}

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Settings cached from a key lookup (the process environment in production).
pub struct EnvConfigSource {
    lookup: Lookup,
    current: RwLock<LlmSettings>,
}

impl EnvConfigSource {
    pub fn new(initial: LlmSettings) -> Self {
        Self::with_lookup(initial, Arc::new(|key: &str| std::env::var(key).ok()))
    }

    pub fn with_lookup(initial: LlmSettings, lookup: Lookup) -> Self {
        Self {
            lookup,
            current: RwLock::new(initial),
        }
    }

    fn snapshot(&self) -> LlmSettings {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ConfigSource for EnvConfigSource {
    fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        self.snapshot().provider_config()
    }

    fn active_provider(&self) -> ProviderId {
        self.snapshot().active
    }

    fn refresh(&self) -> Result<ProviderId, ConfigError> {
        let lookup = Arc::clone(&self.lookup);
        let fresh = LlmSettings::from_lookup(move |key: &str| lookup(key)).map_err(|e| {
            warn!("Configuration refresh rejected, keeping previous settings: {e}");
            e
        })?;
        let active = fresh.active;

        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = fresh;

        info!("LLM configuration refreshed (active provider: {active})");
        Ok(active)
    }
}

/// Fixed settings. `refresh()` is a no-op.
#[cfg(test)]
pub struct StaticConfigSource(pub LlmSettings);

#[cfg(test)]
impl ConfigSource for StaticConfigSource {
    fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        self.0.provider_config()
    }

    fn active_provider(&self) -> ProviderId {
        self.0.active
    }

    fn refresh(&self) -> Result<ProviderId, ConfigError> {
        Ok(self.0.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn map_lookup(values: HashMap<String, String>) -> Lookup {
        Arc::new(move |key: &str| values.get(key).cloned())
    }

    fn settings_from(pairs: &[(&str, &str)]) -> Result<LlmSettings, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LlmSettings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_to_gemini_with_default_model_and_timeout() {
        let settings = settings_from(&[("GEMINI_API_KEY", "g")]).unwrap();
        assert_eq!(settings.active, ProviderId::Gemini);
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);

        let config = settings.provider_config().unwrap();
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.api_key, "g");
    }

    #[test]
    fn test_selects_minimax_with_overrides() {
        let settings = settings_from(&[
            ("AI_PROVIDER", "MiniMax"),
            ("MINIMAX_API_KEY", "m"),
            ("MINIMAX_MODEL", "abab7"),
            ("MINIMAX_BASE_URL", "http://localhost:9000/v1"),
            ("AI_TIMEOUT_SECS", "60"),
        ])
        .unwrap();

        let config = settings.provider_config().unwrap();
        assert_eq!(config.provider, ProviderId::MiniMax);
        assert_eq!(config.model, "abab7");
        assert_eq!(config.base_url, "http://localhost:9000/v1");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_missing_credential_for_active_provider() {
        // Key present only for the inactive provider.
        let settings = settings_from(&[("AI_PROVIDER", "minimax"), ("GEMINI_API_KEY", "g")])
            .unwrap();
        assert_eq!(
            settings.provider_config(),
            Err(ConfigError::MissingCredential {
                provider: ProviderId::MiniMax,
                variable: "MINIMAX_API_KEY",
            })
        );
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let settings = settings_from(&[("GEMINI_API_KEY", "   ")]).unwrap();
        assert!(settings.provider_config().is_err());
    }

    #[test]
    fn test_invalid_provider_and_timeout_are_rejected() {
        assert!(matches!(
            settings_from(&[("AI_PROVIDER", "openai")]),
            Err(ConfigError::InvalidValue {
                variable: "AI_PROVIDER",
                ..
            })
        ));
        assert!(matches!(
            settings_from(&[("AI_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidValue {
                variable: "AI_TIMEOUT_SECS",
                ..
            })
        ));
    }

    #[test]
    fn test_settings_debug_redacts_keys() {
        let settings = settings_from(&[("GEMINI_API_KEY", "top-secret")]).unwrap();
        assert!(!format!("{settings:?}").contains("top-secret"));
    }

    #[test]
    fn test_refresh_picks_up_rotated_credentials() {
        let values = Arc::new(RwLock::new(HashMap::from([(
            "GEMINI_API_KEY".to_string(),
            "old".to_string(),
        )])));
        let reader = Arc::clone(&values);
        let lookup: Lookup = Arc::new(move |key: &str| reader.read().unwrap().get(key).cloned());

        let initial = LlmSettings::from_lookup(|k| lookup(k)).unwrap();
        let source = EnvConfigSource::with_lookup(initial, Arc::clone(&lookup));
        assert_eq!(source.provider_config().unwrap().api_key, "old");

        values
            .write()
            .unwrap()
            .insert("GEMINI_API_KEY".to_string(), "new".to_string());
        // Not visible until refreshed.
        assert_eq!(source.provider_config().unwrap().api_key, "old");

        assert_eq!(source.refresh(), Ok(ProviderId::Gemini));
        assert_eq!(source.active_provider(), ProviderId::Gemini);
        assert_eq!(source.provider_config().unwrap().api_key, "new");
    }

    #[test]
    fn test_failed_refresh_keeps_previous_settings() {
        let initial = settings_from(&[("GEMINI_API_KEY", "g")]).unwrap();
        let source = EnvConfigSource::with_lookup(
            initial.clone(),
            map_lookup(HashMap::from([(
                "AI_PROVIDER".to_string(),
                "bogus".to_string(),
            )])),
        );

        assert!(source.refresh().is_err());
        assert_eq!(source.snapshot(), initial);
    }
}
