//! CLI configuration: `config.toml` plus environment overrides.

use crate::constants::{
    API_KEY_ENV_VAR, CONFIG_PATH_ENV_VAR, DEFAULT_CONFIG_FILE_PATH, DEFAULT_HTTP_CLIENT_TIMEOUT,
    DEFAULT_LOG_LEVEL, MAX_CONFIG_FILE_SIZE,
};
use crate::path_guard;
use crate::validation;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CliConfig {
    /// Base URL of the policy management service, e.g. `https://api.example.com`.
    #[serde(default)]
    pub trust_authority_base_url: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    /// Seconds.
    #[serde(default = "default_http_client_timeout")]
    pub http_client_timeout: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            trust_authority_base_url: None,
            tenant_id: None,
            http_client_timeout: default_http_client_timeout(),
            log_level: default_log_level(),
            api_key: None,
        }
    }
}

fn default_http_client_timeout() -> u64 {
    DEFAULT_HTTP_CLIENT_TIMEOUT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl CliConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = path_guard::validate(path, MAX_CONFIG_FILE_SIZE)?.read()?;
        let config_str = String::from_utf8(bytes)
            .with_context(|| format!("Config file {} is not UTF-8", path.display()))?;
        let config: CliConfig =
            toml::from_str(&config_str).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load from an explicit path, `$TENANTCTL_CONFIG`, or the default
    /// location. A missing default file yields defaults; an explicitly
    /// named file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE_PATH);
        if default_path.exists() {
            Self::from_file(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn base_url(&self) -> Result<&str> {
        self.trust_authority_base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| anyhow!("trust-authority-base-url is not set in the configuration"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http_client_timeout)
    }

    /// The environment variable wins over the config file.
    pub fn api_key(&self) -> Result<String> {
        let (key, source) = match std::env::var(API_KEY_ENV_VAR) {
            Ok(key) => (key, API_KEY_ENV_VAR),
            Err(_) => (self.api_key.clone().unwrap_or_default(), "api-key"),
        };
        validation::validate_api_key(&key, source)?;
        Ok(key)
    }
}
