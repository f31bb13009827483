use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::ai::BackendHandle;

/// Default config directory: ~/.blogcrew/
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".blogcrew")
}

/// Default config file path: ~/.blogcrew/settings.json
pub fn default_config_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub const ENV_BASE_URL: &str = "BLOGCREW_BASE_URL";
pub const ENV_MODEL: &str = "BLOGCREW_MODEL";
pub const ENV_API_KEY: &str = "BLOGCREW_API_KEY";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub shell: ShellConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Upper bound for the startup availability probe.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShellConfig {
    /// Print START events (agent inputs) in the live transcript.
    #[serde(default = "default_true")]
    pub show_inputs: bool,
}

fn default_version() -> u32 {
    1
}
fn default_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}
fn default_model() -> String {
    "llama3.1:latest".to_string()
}
fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            backend: BackendConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self { show_inputs: true }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Load the file if present, otherwise start from defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply BLOGCREW_* environment variables on top of the file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.backend.base_url = url;
        }
        if let Some(model) = non_empty(ENV_MODEL) {
            self.backend.model = model;
        }
        if let Some(key) = non_empty(ENV_API_KEY) {
            self.backend.api_key = Some(key);
        }
        self
    }

    pub fn backend_handle(&self) -> BackendHandle {
        BackendHandle {
            endpoint_url: self.backend.base_url.clone(),
            model_identifier: self.backend.model.clone(),
            api_key: self.backend.api_key.clone(),
        }
    }

    pub fn probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.backend.probe_timeout_secs)
    }
}
