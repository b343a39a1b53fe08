//! `~/.rallysync/config.yaml`: endpoint and pacing settings.
//!
//! Every function has two forms, like the sheet layer:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{config_io, ConfigError};

/// Environment variable that overrides [`SyncConfig::endpoint`].
pub const ENDPOINT_ENV: &str = "RALLYSYNC_ENDPOINT";

const DEFAULT_SOURCE: &str = "sheet";
const DEFAULT_CALL_DELAY_MS: u64 = 500;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for one sync installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// The remote POST endpoint every request goes to.
    pub endpoint: String,
    /// Value of `metadata.source` on outgoing requests.
    #[serde(default = "default_source")]
    pub source: String,
    /// Pause after every remote create/delete call.
    #[serde(default = "default_call_delay_ms")]
    pub call_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Provision every local-only record when there is no baseline yet.
    #[serde(default = "default_true")]
    pub provision_all_on_empty_baseline: bool,
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_call_delay_ms() -> u64 {
    DEFAULT_CALL_DELAY_MS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

impl SyncConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            source: default_source(),
            call_delay_ms: DEFAULT_CALL_DELAY_MS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            provision_all_on_empty_baseline: true,
        }
    }

    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::Invalid {
                key: "endpoint",
                reason: "must not be empty".to_string(),
            });
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "endpoint",
                reason: format!("'{endpoint}' is not an http(s) URL"),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.rallysync/`
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".rallysync")
}

/// `<home>/.rallysync/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    root_at(home).join("config.yaml")
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load and validate the config, applying the `RALLYSYNC_ENDPOINT` override.
pub fn load_at(home: &Path) -> Result<SyncConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| config_io(&path, e))?;
    let mut config: SyncConfig =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?;
    if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
        if !endpoint.trim().is_empty() {
            config.endpoint = endpoint;
        }
    }
    config.validate()?;
    Ok(config)
}

/// Atomically save the config: serialize → `config.yaml.tmp` → `chmod 0600` → rename.
pub fn save_at(home: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let dir = root_at(home);
    std::fs::create_dir_all(&dir).map_err(|e| config_io(&dir, e))?;
    let path = config_path_at(home);
    let tmp = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|e| config_io(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| config_io(&path, e))?;
    Ok(())
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| config_io(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
