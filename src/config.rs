use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ReverieConfig {
    pub storage: StorageConfig,
    pub llm: ProviderConfig,
    pub extraction: ExtractionConfig,
    pub chat: ChatConfig,
    pub retrieval: RetrievalConfig,
    pub log_level: LogLevel,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(transparent)]
pub struct LogLevel(pub String);

impl Default for LogLevel {
    fn default() -> Self {
        Self("info".into())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the blob store: characters, lorebooks, and presets live here.
    pub data_dir: String,
    pub characters_folder: String,
    pub lorebooks_folder: String,
}

/// One OpenAI-compatible endpoint.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Off by default — extraction costs a model call per turn.
    pub enabled: bool,
    pub base_url: String,
    /// Falls back to the main LLM key when empty.
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub temperature: f64,
    pub top_p: f64,
    /// Target response length in words (substituted into the prompt, not
    /// sent as a token limit).
    pub response_length: u32,
    /// Number of recent messages included in the dialogue window.
    pub history_window: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Max memories retrieved per turn.
    pub memory_limit: usize,
    /// Recent messages scanned for lorebook keyword matches.
    pub scan_depth: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = default_reverie_dir()
            .join("data")
            .to_string_lossy()
            .into_owned();
        Self {
            data_dir,
            characters_folder: "characters".into(),
            lorebooks_folder: "lorebooks".into(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            model: "gpt-4-turbo".into(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1".into(),
            api_key: String::new(),
            model: "gpt-4o-mini".into(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: 0.95,
            response_length: 200,
            history_window: 10,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            memory_limit: 5,
            scan_depth: 5,
        }
    }
}

/// Returns `~/.reverie/`
pub fn default_reverie_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".reverie")
}

/// Returns the default config file path: `~/.reverie/config.toml`
pub fn default_config_path() -> PathBuf {
    default_reverie_dir().join("config.toml")
}

impl ReverieConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            ReverieConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (REVERIE_DATA_DIR,
    /// REVERIE_API_KEY, REVERIE_MODEL, REVERIE_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("REVERIE_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("REVERIE_API_KEY") {
            self.llm.api_key = val;
        }
        if let Ok(val) = std::env::var("REVERIE_MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = std::env::var("REVERIE_LOG_LEVEL") {
            self.log_level = LogLevel(val);
        }
    }

    /// Resolve the data directory, expanding `~` if needed.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    /// Provider config for the extraction model. The extraction key falls
    /// back to the main LLM key when empty.
    pub fn extraction_provider(&self) -> ProviderConfig {
        ProviderConfig {
            base_url: self.extraction.base_url.clone(),
            api_key: if self.extraction.api_key.is_empty() {
                self.llm.api_key.clone()
            } else {
                self.extraction.api_key.clone()
            },
            model: self.extraction.model.clone(),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ReverieConfig::default();
        assert_eq!(config.log_level.0, "info");
        assert_eq!(config.llm.model, "gpt-4-turbo");
        assert_eq!(config.retrieval.memory_limit, 5);
        assert_eq!(config.retrieval.scan_depth, 5);
        assert_eq!(config.chat.history_window, 10);
        assert!(!config.extraction.enabled);
        assert!(config.storage.data_dir.ends_with("data"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
log_level = "debug"

[storage]
data_dir = "/tmp/reverie-test"

[llm]
base_url = "http://localhost:11434/v1"
model = "llama3"

[retrieval]
memory_limit = 8
"#;
        let config: ReverieConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_level.0, "debug");
        assert_eq!(config.storage.data_dir, "/tmp/reverie-test");
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.retrieval.memory_limit, 8);
        // defaults still apply for unset fields
        assert_eq!(config.retrieval.scan_depth, 5);
        assert_eq!(config.chat.temperature, 0.8);
    }

    #[test]
    fn extraction_key_falls_back_to_main_key() {
        let mut config = ReverieConfig::default();
        config.llm.api_key = "main-key".into();

        let provider = config.extraction_provider();
        assert_eq!(provider.api_key, "main-key");

        config.extraction.api_key = "cheap-key".into();
        assert_eq!(config.extraction_provider().api_key, "cheap-key");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = ReverieConfig::default();
        std::env::set_var("REVERIE_DATA_DIR", "/tmp/override");
        std::env::set_var("REVERIE_MODEL", "env-model");
        std::env::set_var("REVERIE_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.data_dir, "/tmp/override");
        assert_eq!(config.llm.model, "env-model");
        assert_eq!(config.log_level.0, "trace");

        // Clean up
        std::env::remove_var("REVERIE_DATA_DIR");
        std::env::remove_var("REVERIE_MODEL");
        std::env::remove_var("REVERIE_LOG_LEVEL");
    }
}
