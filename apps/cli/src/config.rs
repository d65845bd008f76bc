//! CLI configuration.
//!
//! Reads TOML at `~/.config/evoapp/cli.toml` (`%APPDATA%\evoapp\cli.toml` on
//! Windows). Every field has a default, so a missing or partial file works.

use std::path::{Path, PathBuf};
use std::time::Duration;

use evoapp_gateway::{
    DEFAULT_CONTRACT_SRC, DEFAULT_DRE_URL, DEFAULT_GRAPHQL_URL, DEFAULT_STAMPS_CONTRACT,
    DEFAULT_WARP_GATEWAY,
};
use evoapp_protocol::constants::{DEFAULT_HOST, GATEWAY_BASE};
use evoapp_publish::RetryPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Bundlr node used when `--host` is not given.
    pub host: String,
    /// Keyfile used when `--wallet` is not given.
    pub wallet: Option<PathBuf>,
    pub gateway_url: String,
    pub graphql_url: String,
    pub dre_url: String,
    pub warp_gateway_url: String,
    pub stamps_contract: String,
    pub contract_src: String,
    pub upload_concurrency: usize,
    /// Submit attempts per file, including the first.
    pub upload_retries: u32,
    pub upload_retry_delay_ms: u64,
    /// Skip files already uploaded by an earlier run.
    pub upload_cache: bool,
    pub build_tool: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            wallet: None,
            gateway_url: GATEWAY_BASE.into(),
            graphql_url: DEFAULT_GRAPHQL_URL.into(),
            dre_url: DEFAULT_DRE_URL.into(),
            warp_gateway_url: DEFAULT_WARP_GATEWAY.into(),
            stamps_contract: DEFAULT_STAMPS_CONTRACT.into(),
            contract_src: DEFAULT_CONTRACT_SRC.into(),
            upload_concurrency: 1,
            upload_retries: 3,
            upload_retry_delay_ms: 500,
            upload_cache: true,
            build_tool: "pnpm".into(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Loads configuration from `path`. A missing file yields the defaults;
    /// an unparsable one is reported and ignored.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match toml::from_str::<CliConfig>(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse cli config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.upload_retries.max(1),
            base_delay: Duration::from_millis(self.upload_retry_delay_ms),
        }
    }

    /// Gateway base URL with a trailing slash.
    pub fn gateway(&self) -> String {
        if self.gateway_url.ends_with('/') {
            self.gateway_url.clone()
        } else {
            format!("{}/", self.gateway_url)
        }
    }
}

/// Location of the persistent upload cache.
pub fn upload_cache_path() -> PathBuf {
    config_dir().join("upload-cache.json")
}

fn config_file_path() -> PathBuf {
    config_dir().join("cli.toml")
}

fn config_dir() -> PathBuf {
    config_base_dir().join("evoapp")
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}
