//! Configuration loading and validation
//!
//! Configuration lives in YAML: `config.example.yaml` ships with the repo as
//! the documented template, and a local `config.yaml` is merged over it.
//! A `profiles.<name>` overlay can then be applied on top, selected by
//! `--profile` or the `QUANTGPT_PROFILE` environment variable.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming the active profile overlay
pub const PROFILE_ENV: &str = "QUANTGPT_PROFILE";

/// Local configuration file, merged over the example template
pub const CONFIG_FILE: &str = "config.yaml";

/// Shipped template that supplies the base configuration
pub const EXAMPLE_CONFIG_FILE: &str = "config.example.yaml";

/// Main configuration structure loaded from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub openai: OpenAiConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from `root`, falling back to defaults when neither
    /// YAML file exists. `profile` overrides the `QUANTGPT_PROFILE` env var.
    pub fn load(root: &Path, profile: Option<&str>) -> Result<Self> {
        let base = load_yaml(&root.join(EXAMPLE_CONFIG_FILE))?;
        let local = load_yaml(&root.join(CONFIG_FILE))?;
        let mut merged = merge(base, local);

        let profile_name = profile
            .map(str::to_string)
            .or_else(|| std::env::var(PROFILE_ENV).ok());
        if let Some(name) = profile_name.filter(|n| !n.is_empty()) {
            let overlay = merged
                .get("profiles")
                .and_then(|p| p.get(name.as_str()))
                .cloned()
                .unwrap_or(serde_yaml::Value::Null);
            merged = merge(merged, overlay);
        }

        let config: Config = match merged {
            serde_yaml::Value::Null => Config::default(),
            value => serde_yaml::from_value(value).context("Failed to parse configuration")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges that the schema alone cannot express
    pub fn validate(&self) -> Result<()> {
        let t = self.openai.temperature;
        if !t.is_finite() || !(0.0..=2.0).contains(&t) {
            bail!("openai.temperature must be within [0, 2], got {}", t);
        }
        if self.openai.request_timeout_seconds == 0 {
            bail!("openai.request_timeout_seconds must be positive");
        }
        Ok(())
    }
}

/// Read a YAML file, treating a missing file as an empty document
fn load_yaml(path: &Path) -> Result<serde_yaml::Value> {
    if !path.exists() {
        return Ok(serde_yaml::Value::Null);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Recursive merge of `overlay` into `base`; values in the overlay win
fn merge(base: serde_yaml::Value, overlay: serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::Value;
    match (base, overlay) {
        (Value::Mapping(mut base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Mapping(base)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Application identity and deployment mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "QuantGPT".to_string(),
            environment: Environment::Development,
        }
    }
}

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

/// Settings for the OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API provider identifier (informational; the wire format is the same)
    pub provider: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Generation cap; 0 or null means the server default
    pub max_output_tokens: Option<u32>,
    /// Reproducibility seed
    pub seed: Option<u64>,
    /// Network timeout for a single request
    pub request_timeout_seconds: u64,
    /// API proxy override; None uses the provider default
    pub base_url: Option<String>,
    /// Force structured JSON output on every request
    pub json_mode: bool,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_output_tokens: Some(2048),
            seed: None,
            request_timeout_seconds: 120,
            base_url: None,
            json_mode: false,
        }
    }
}

/// Logging verbosity and destination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: PathBuf,
    /// Structured log format toggle
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: PathBuf::from("logs/quantgpt.log"),
            json: false,
        }
    }
}

/// Log verbosity, serialized in the uppercase form the config schema uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogLevel {
    #[serde(rename = "DEBUG")]
    Debug,
    #[default]
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "ERROR")]
    Error,
}

impl LogLevel {
    /// Directive understood by tracing's EnvFilter
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.app.name, "QuantGPT");
        assert_eq!(config.app.environment, Environment::Development);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.max_output_tokens, Some(2048));
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
app:
  name: QuantGPT
  environment: production
openai:
  model: gpt-4o
  temperature: 0.7
  max_output_tokens: 4096
  seed: 42
  json_mode: true
logging:
  level: WARNING
  file: /var/log/quantgpt.log
  json: true
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.app.environment, Environment::Production);
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.seed, Some(42));
        assert!(config.openai.json_mode);
        assert_eq!(config.logging.level, LogLevel::Warning);
        assert!(config.logging.json);
    }

    #[test]
    fn test_invalid_environment_rejected() {
        let yaml = "app:\n  environment: testing\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_temperature_range_validated() {
        let config = Config {
            openai: OpenAiConfig {
                temperature: 3.5,
                ..OpenAiConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_profile_overlay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(EXAMPLE_CONFIG_FILE),
            r#"
openai:
  model: gpt-4o-mini
  temperature: 0.2
profiles:
  production:
    openai:
      model: gpt-4o
"#,
        )
        .unwrap();

        let config = Config::load(dir.path(), Some("production")).unwrap();
        assert_eq!(config.openai.model, "gpt-4o");
        // Untouched keys survive the overlay
        assert_eq!(config.openai.temperature, 0.2);
    }

    #[test]
    fn test_local_config_overrides_example() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(EXAMPLE_CONFIG_FILE),
            "openai:\n  model: gpt-4o-mini\n  temperature: 0.3\n",
        )
        .unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "openai:\n  model: gpt-4o\n").unwrap();

        let config = Config::load(dir.path(), None).unwrap();
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.temperature, 0.3);
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path(), None).unwrap();
        assert_eq!(config.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_log_level_uppercase_forms() {
        let yaml = "logging:\n  level: DEBUG\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.level.as_filter(), "debug");
        assert!(serde_yaml::from_str::<Config>("logging:\n  level: debug\n").is_err());
    }
}
