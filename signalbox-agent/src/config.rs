//! Agent configuration.
//!
//! Settings load from a TOML file with defaults for everything except
//! the API key, which only ever comes from the environment so it never
//! lands in a config file or a strategy record.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the chat API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("missing API key: set {API_KEY_VAR}")]
    MissingApiKey,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Chat model name.
    pub model: String,
    /// Base URL of the chat completions API.
    pub api_base: String,
    /// Sampling temperature for code generation.
    pub temperature: f64,
    /// HTTP attempts per request (first try included).
    pub max_http_retries: u32,
    /// Regeneration attempts after a failed sandbox run.
    pub max_fix_attempts: u32,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Chat turns kept in session memory.
    pub session_window: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            temperature: 0.2,
            max_http_retries: 3,
            max_fix_attempts: 2,
            request_timeout_secs: 60,
            session_window: 20,
        }
    }
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Load from the given path if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// The key is read fresh on every call rather than cached in the
    /// struct, so it cannot be serialized out by accident.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(API_KEY_VAR).map_err(|_| ConfigError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = AgentConfig::default();
        assert_eq!(config.max_fix_attempts, 2);
        assert!(config.temperature < 1.0);
        assert!(config.session_window > 0);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: AgentConfig = toml::from_str("model = \"gpt-4o\"").unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.api_base, AgentConfig::default().api_base);
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, AgentConfig::default());
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "temperature = 0.7\nmax_fix_attempts = 5").unwrap();
        let config = AgentConfig::load(&path).unwrap();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_fix_attempts, 5);
    }

    #[test]
    fn api_key_never_serializes() {
        let json = serde_json::to_string(&AgentConfig::default()).unwrap();
        assert!(!json.contains("api_key"));
    }

    #[test]
    fn broken_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(&path, "model = [not toml").unwrap();
        assert!(matches!(
            AgentConfig::load(&path),
            Err(ConfigError::Toml(_))
        ));
    }
}
