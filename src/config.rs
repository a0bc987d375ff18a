//! Configuration for redcache

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for the memory system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base directory for all storage
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Length of every memory vector
    #[serde(default = "default_vector_size")]
    pub vector_size: usize,

    /// Persistence backend selection
    #[serde(default)]
    pub storage: StorageConfig,

    /// Optional text generation service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,

    /// HTTP server port
    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("redcache")
}

fn default_vector_size() -> usize {
    100
}

fn default_server_port() -> u16 {
    8420
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            vector_size: default_vector_size(),
            storage: StorageConfig::default(),
            llm: None,
            server_port: default_server_port(),
        }
    }
}

impl Config {
    /// Create a new config with a custom data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Load a config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Path of the JSON snapshot used by the disk backend
    pub fn snapshot_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("redcache_data.json"))
    }

    /// Path of the database used by the sqlite backend
    pub fn sqlite_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("redcache.db"))
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }

    /// Reject settings no store can be built from
    pub fn validate(&self) -> Result<()> {
        if self.vector_size == 0 {
            return Err(Error::config("vector_size must be at least 1"));
        }
        Ok(())
    }
}

/// Which persistence backend to use, and where
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `"disk"` or `"sqlite"`
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Overrides the backend's default file under `data_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_backend() -> String {
    "disk".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
        }
    }
}

/// Text generation provider selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,

    #[serde(default)]
    pub config: ProviderSettings,
}

impl LlmConfig {
    /// The settings the project suggests for OpenAI
    pub fn recommended() -> Self {
        Self {
            provider: "openai".to_string(),
            config: ProviderSettings {
                model: "gpt-4o-mini".to_string(),
                temperature: 0.2,
                max_tokens: 1500,
                ..Default::default()
            },
        }
    }
}

/// Provider-specific generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Falls back to `OPENAI_API_KEY` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    150
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.vector_size, 100);
        assert_eq!(config.storage.backend, "disk");
        assert!(config.storage.path.is_none());
        assert!(config.llm.is_none());
        assert_eq!(config.server_port, 8420);
    }

    #[test]
    fn parses_nested_llm_settings() {
        let raw = r#"{
            "storage": { "backend": "sqlite" },
            "llm": {
                "provider": "openai",
                "config": { "model": "gpt-4o-mini", "temperature": 0.2, "api_key": "sk-test" }
            }
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.storage.backend, "sqlite");

        let llm = config.llm.unwrap();
        assert_eq!(llm.provider, "openai");
        assert_eq!(llm.config.model, "gpt-4o-mini");
        assert_eq!(llm.config.temperature, 0.2);
        assert_eq!(llm.config.max_tokens, 150);
        assert_eq!(llm.config.base_url, "https://api.openai.com/v1");
        assert_eq!(llm.config.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn storage_paths_follow_data_dir_unless_overridden() {
        let mut config = Config::with_data_dir("/tmp/rc");
        assert_eq!(config.snapshot_path(), PathBuf::from("/tmp/rc/redcache_data.json"));
        assert_eq!(config.sqlite_path(), PathBuf::from("/tmp/rc/redcache.db"));

        config.storage.path = Some(PathBuf::from("/elsewhere/state.json"));
        assert_eq!(config.snapshot_path(), PathBuf::from("/elsewhere/state.json"));
    }

    #[test]
    fn zero_vector_size_is_rejected() {
        let config = Config {
            vector_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn recommended_llm_settings() {
        let llm = LlmConfig::recommended();
        assert_eq!(llm.provider, "openai");
        assert_eq!(llm.config.model, "gpt-4o-mini");
        assert_eq!(llm.config.max_tokens, 1500);
    }
}
