// Configuration Storage Service
// Reads the JSON config file and applies environment overrides.
// Scoring thresholds are constants and are never read from config.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_MODEL_URL: &str = "INTEGRITY_SCAN_MODEL_URL";
pub const ENV_API_KEY: &str = "INTEGRITY_SCAN_API_KEY";
pub const ENV_REFERENCE_DIR: &str = "INTEGRITY_SCAN_REFERENCE_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    #[default]
    Heuristic,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: ModelBackend,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
    pub reference_corpus_dir: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::Heuristic,
            base_url: None,
            api_key: None,
            timeout_secs: default_model_timeout(),
            reference_corpus_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    pub proxy: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            proxy: None,
        }
    }
}

fn default_model_timeout() -> u64 { 120 }
fn default_fetch_timeout() -> u64 { 60 }

pub struct ConfigStore {
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_file }
    }

    pub fn from_file(config_file: PathBuf) -> Self {
        Self { config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("integrity-scan"))
    }

    pub fn path(&self) -> &Path {
        &self.config_file
    }

    /// Load configuration from file; a missing file means defaults.
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load and apply process environment overrides.
    pub fn load_with_env(&self) -> Result<AppConfig, String> {
        let mut config = self.load()?;
        apply_overrides(&mut config, |key| env::var(key).ok());
        Ok(config)
    }
}

/// Apply overrides from `lookup`. Setting a model URL switches to the remote backend.
pub fn apply_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(url) = non_empty(ENV_MODEL_URL) {
        config.model.backend = ModelBackend::Remote;
        config.model.base_url = Some(url);
    }
    if let Some(key) = non_empty(ENV_API_KEY) {
        config.model.api_key = Some(key);
    }
    if let Some(dir) = non_empty(ENV_REFERENCE_DIR) {
        config.model.reference_corpus_dir = Some(PathBuf::from(dir));
    }
}
