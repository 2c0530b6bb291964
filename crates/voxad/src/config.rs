//! Configuration management for voxad.
//!
//! Loads settings from TOML or uses defaults. Lookup order: explicit path,
//! $VOXA_CONFIG, /etc/voxa/config.toml, ~/.config/voxa/config.toml.
//! Credentials are never defaulted; they come from the file or from
//! VOXA_WEATHER_API_KEY / VOXA_LLM_API_KEY.

use crate::apps::AppTarget;
use crate::fallback::DEFAULT_FALLBACK_TIMEOUT;
use crate::intents::DEFAULT_TRANSPORT_MAX_LEN;
use crate::llm_client::{DEFAULT_LLM_MODEL, DEFAULT_LLM_URL};
use crate::weather::DEFAULT_WEATHER_URL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/voxa/config.toml";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    format!("127.0.0.1:{}", voxa_shared::DEFAULT_PORT)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Frequency store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxa")
        .join("user_data.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Rule table tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Transport keywords (play/pause/...) only fire below this length
    #[serde(default = "default_transport_max_len")]
    pub transport_max_len: usize,
}

fn default_transport_max_len() -> usize {
    DEFAULT_TRANSPORT_MAX_LEN
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            transport_max_len: default_transport_max_len(),
        }
    }
}

/// Weather provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_weather_timeout")]
    pub timeout_secs: u64,
}

fn default_weather_url() -> String {
    DEFAULT_WEATHER_URL.to_string()
}

fn default_weather_timeout() -> u64 {
    8
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_url: default_weather_url(),
            api_key: None,
            timeout_secs: default_weather_timeout(),
        }
    }
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Generative model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub api_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Replaces the built-in interpretation template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template_path: Option<PathBuf>,
}

fn default_llm_url() -> String {
    DEFAULT_LLM_URL.to_string()
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

fn default_llm_timeout() -> u64 {
    DEFAULT_FALLBACK_TIMEOUT.as_secs()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_llm_url(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout(),
            prompt_template_path: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Custom template if one is configured
    pub fn load_template(&self) -> Result<Option<String>> {
        let Some(path) = &self.prompt_template_path else {
            return Ok(None);
        };
        let template = fs::read_to_string(path)
            .with_context(|| format!("Cannot read prompt template {}", path.display()))?;
        Ok(Some(template))
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    /// Extra entries for the application registry
    #[serde(default)]
    pub apps: BTreeMap<String, AppTarget>,
}

impl Config {
    /// Load config from the first file found, then apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Self {
        let mut config = match Self::candidate_paths(explicit)
            .into_iter()
            .find(|p| p.exists())
        {
            Some(path) => Self::load_from_path(&path).unwrap_or_else(|e| {
                warn!("Config at {} unusable, using defaults: {:#}", path.display(), e);
                Config::default()
            }),
            None => {
                info!("No config file found, using defaults");
                Config::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        if let Some(path) = explicit {
            return vec![path.to_path_buf()];
        }
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var("VOXA_CONFIG") {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from(CONFIG_PATH));
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("voxa").join("config.toml"));
        }
        paths
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Environment overrides. `lookup` is injected so tests avoid touching
    /// the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("VOXA_WEATHER_API_KEY") {
            self.weather.api_key = Some(key);
        }
        if let Some(key) = non_empty("VOXA_LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = non_empty("VOXA_LLM_URL") {
            self.llm.api_url = url;
        }
        if let Some(model) = non_empty("VOXA_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(bind) = non_empty("VOXA_BIND") {
            self.server.bind_addr = bind;
        }
    }

    /// Render as TOML with secrets stripped (for `voxad --print-config`)
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut redacted = self.clone();
        redacted.weather.api_key = redacted.weather.api_key.map(|_| "<redacted>".to_string());
        redacted.llm.api_key = redacted.llm.api_key.map(|_| "<redacted>".to_string());
        Ok(toml::to_string_pretty(&redacted)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr, "127.0.0.1:7878");
        assert_eq!(config.router.transport_max_len, 15);
        assert_eq!(config.weather.timeout_secs, 8);
        assert!(config.weather.api_key.is_none());
        assert!(config.llm.api_key.is_none());
        assert!(config.store.path.ends_with("voxa/user_data.json"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [weather]
            api_key = "abc"

            [router]
            transport_max_len = 20

            [apps]
            teams = { url = "https://teams.microsoft.com" }
            "#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.weather.api_key.as_deref(), Some("abc"));
        assert_eq!(config.weather.api_url, DEFAULT_WEATHER_URL);
        assert_eq!(config.router.transport_max_len, 20);
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(
            config.apps.get("teams"),
            Some(&AppTarget::web("https://teams.microsoft.com"))
        );
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nbind_addr = ").unwrap();
        assert!(Config::load_from_path(&path).is_err());

        let config = Config::load(Some(&path));
        assert_eq!(config.router.transport_max_len, 15);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("VOXA_WEATHER_API_KEY", "w-key"),
            ("VOXA_LLM_API_KEY", "l-key"),
            ("VOXA_LLM_MODEL", "gemini-pro"),
            ("VOXA_BIND", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.weather.api_key.as_deref(), Some("w-key"));
        assert_eq!(config.llm.api_key.as_deref(), Some("l-key"));
        assert_eq!(config.llm.model, "gemini-pro");
        // empty values are ignored
        assert_eq!(config.server.bind_addr, "127.0.0.1:7878");
    }

    #[test]
    fn test_redacted_output_hides_keys() {
        let mut config = Config::default();
        config.llm.api_key = Some("secret-value".to_string());
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_missing_template_file_is_an_error() {
        let config = LlmConfig {
            prompt_template_path: Some(PathBuf::from("/nonexistent/voxa/template.txt")),
            ..LlmConfig::default()
        };
        assert!(config.load_template().is_err());
        assert!(LlmConfig::default().load_template().unwrap().is_none());
    }
}
