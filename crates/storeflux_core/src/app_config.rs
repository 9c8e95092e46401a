use crate::{Backend, RefreshPolicy, StoreError, StructuredValuePolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const API_URL_ENV: &str = "STOREFLUX_API_URL";
pub const BACKEND_ENV: &str = "STOREFLUX_BACKEND";

const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub default_backend: Backend,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Stats and container list refresh interval; `0` disables polling.
    #[serde(default = "default_poll_secs")]
    pub stats_every_secs: u32,

    /// Refresh interval for the selected container's logs; `0` disables polling.
    #[serde(default = "default_poll_secs")]
    pub logs_every_secs: u32,

    #[serde(default = "default_log_tail")]
    pub log_tail: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_n_results")]
    pub n_results: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub structured_values: StructuredValuePolicy,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_secs() -> u32 {
    10
}

fn default_log_tail() -> u32 {
    200
}

fn default_n_results() -> u32 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            default_backend: Backend::default(),
            monitor: MonitorConfig::default(),
            search: SearchConfig::default(),
            editor: EditorConfig::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stats_every_secs: default_poll_secs(),
            logs_every_secs: default_poll_secs(),
            log_tail: default_log_tail(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_results: default_n_results(),
        }
    }
}

impl MonitorConfig {
    pub fn stats_policy(&self) -> RefreshPolicy {
        RefreshPolicy::from_secs(self.stats_every_secs)
    }

    pub fn logs_policy(&self) -> RefreshPolicy {
        RefreshPolicy::from_secs(self.logs_every_secs)
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Applies `STOREFLUX_API_URL` and `STOREFLUX_BACKEND` when set.
    pub fn apply_env(&mut self) -> Result<(), StoreError> {
        self.apply_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(BACKEND_ENV).ok(),
        )
    }

    pub fn apply_overrides(
        &mut self,
        api_url: Option<String>,
        backend: Option<String>,
    ) -> Result<(), StoreError> {
        if let Some(api_url) = api_url.filter(|url| !url.trim().is_empty()) {
            self.api_url = api_url.trim().to_string();
        }

        if let Some(backend) = backend.filter(|b| !b.trim().is_empty()) {
            self.default_backend = backend.parse()?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        let url = self.api_url.trim();

        if url.is_empty() {
            return Err(StoreError::InvalidConfig("api_url is empty".to_string()));
        }

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(StoreError::InvalidConfig(format!(
                "api_url must start with http:// or https://, got '{}'",
                url
            )));
        }

        Ok(())
    }
}

pub struct AppConfigStore {
    path: PathBuf,
}

impl AppConfigStore {
    pub fn new() -> Result<Self, StoreError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            StoreError::IoError(std::io::Error::other("Could not find config directory"))
        })?;

        let app_dir = config_dir.join("storeflux");
        fs::create_dir_all(&app_dir).map_err(StoreError::IoError)?;

        Ok(Self {
            path: app_dir.join("config.json"),
        })
    }

    pub fn from_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<AppConfig, StoreError> {
        if !self.path.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.path).map_err(StoreError::IoError)?;
        let config: AppConfig =
            serde_json::from_str(&content).map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))?;

        fs::write(&self.path, content).map_err(StoreError::IoError)?;

        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
