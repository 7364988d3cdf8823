//! Review configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! the `SPECCRITIC_MODEL` environment variable, then command-line flags
//! (applied by the caller on the returned struct).
//!
//! ```yaml
//! model: openai:gpt-4o
//! temperature: 0.1
//! max_tokens: 8192
//! timeout: 90s
//! profile: backend-api
//! strict: true
//! severity_threshold: warn
//! providers:
//!   openai:
//!     base_url: https://llm-gateway.internal/v1
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use speccritic_core::{Profile, Severity};

use crate::providers::{CompletionConfig, ModelSpec};

/// Environment variable selecting the `provider:model` to use.
pub const MODEL_ENV: &str = "SPECCRITIC_MODEL";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "anthropic:claude-sonnet-4-6";

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Settings for one review run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReviewConfig {
    /// `provider:model`; `None` falls back to [`DEFAULT_MODEL`]
    pub model: Option<String>,

    /// Sampling temperature, 0.0 - 2.0
    pub temperature: f32,

    /// Maximum response tokens
    pub max_tokens: u32,

    /// Per provider call, e.g. "90s" or "5m"
    #[serde(with = "duration_human")]
    pub timeout: Duration,

    pub profile: String,

    /// Treat silence as ambiguity
    pub strict: bool,

    /// Lowest issue severity shown in the output
    #[serde(deserialize_with = "severity_lenient")]
    pub severity_threshold: Severity,

    /// Per-provider JSON settings (`api_key`, `base_url`, ...)
    pub providers: BTreeMap<String, JsonValue>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.2,
            max_tokens: 4096,
            timeout: Duration::from_secs(300),
            profile: "general".to_string(),
            strict: false,
            severity_threshold: Severity::Info,
            providers: BTreeMap::new(),
        }
    }
}

mod duration_human {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parse a humantime duration such as `90s` or `5m`.
pub fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw)
        .map_err(|e| ConfigError::Invalid(format!("invalid timeout {:?}: {}", raw, e)))
}

fn severity_lenient<'de, D>(deserializer: D) -> Result<Severity, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

impl ReviewConfig {
    /// Parse a YAML document over the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty file deserializes to null, not to the defaults.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Load defaults, then the optional file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay environment values read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup(MODEL_ENV).filter(|m| !m.is_empty()) {
            self.model = Some(model);
        }
    }

    /// The configured model, or [`DEFAULT_MODEL`]. Does not log.
    pub fn model_spec(&self) -> Result<ModelSpec, ConfigError> {
        let raw = self.model.as_deref().unwrap_or(DEFAULT_MODEL);
        ModelSpec::parse(raw).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn uses_default_model(&self) -> bool {
        self.model.is_none()
    }

    /// Check every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.temperature.is_finite() || !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be > 0".to_string()));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be > 0".to_string()));
        }

        Profile::get(&self.profile).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if let Some(model) = &self.model {
            ModelSpec::parse(model).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }

        Ok(())
    }

    /// Provider JSON settings, `{}` when none are configured.
    pub fn provider_settings(&self, provider: &str) -> JsonValue {
        self.providers
            .get(provider)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}))
    }

    /// Per-call settings for the given model.
    pub fn completion_config(&self, model: &ModelSpec) -> CompletionConfig {
        CompletionConfig {
            model: model.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
        }
    }
}
