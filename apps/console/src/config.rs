use std::path::{Path, PathBuf};
use std::time::Duration;

use kb_client::HttpClientConfig;
use kb_console::ControllerConfig;
use kb_core::PageSize;
use kb_error::KbError;
use serde::Deserialize;
use tracing::info;

pub const CONFIG_PATH_ENV: &str = "KB_CONSOLE_CONFIG";
pub const BASE_URL_ENV: &str = "KB_API_BASE_URL";
const DEFAULT_CONFIG_PATH: &str = "configs/default.yaml";

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub api: ApiCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub console: ConsoleCfg,
}

#[derive(Debug, Deserialize)]
pub struct ApiCfg {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct StorageCfg {
    pub path: PathBuf,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/console"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConsoleCfg {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ConsoleCfg {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            page_size: default_page_size(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_page_size() -> u32 {
    10
}

impl AppConfig {
    pub fn from_yaml(s: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = serde_yaml::from_str(s)?;
        Ok(cfg)
    }

    pub fn http(&self) -> HttpClientConfig {
        HttpClientConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_millis(self.api.timeout_ms),
        }
    }

    pub fn controller(&self) -> kb_error::Result<ControllerConfig> {
        let page_size =
            PageSize::new(self.console.page_size).map_err(|e| KbError::Configuration {
                key: "console.page_size".to_string(),
                reason: e.to_string(),
            })?;
        Ok(ControllerConfig {
            debounce: Duration::from_millis(self.console.debounce_ms),
            page_size,
        })
    }

    /// 环境变量优先于配置文件
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
    }
}

pub fn load_config() -> anyhow::Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config_from(Path::new(&path))
}

pub fn load_config_from(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read config {}: {}", path.display(), e))?;
    let mut cfg = AppConfig::from_yaml(&s)?;
    cfg.apply_env();
    info!(path = %path.display(), base_url = %cfg.api.base_url, "load_config");
    Ok(cfg)
}
