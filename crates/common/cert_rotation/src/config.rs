//! The static configuration of a run, read once from a TOML file.
//!
//! ```toml
//! staging_dir = "/var/tmp"
//! lock_file = "/run/lock/cert-sync.lock"
//!
//! [source]
//! type = "remote"
//! endpoint = "https://certs.example.com/api/v1"
//! material_id = "www.example.com"
//! cert_token = "..."
//! key_token = "..."
//!
//! [destination]
//! type = "separate"
//! cert_path = "/etc/ssl/appliance/server.crt"
//! key_path = "/etc/ssl/appliance/server.key"
//!
//! [backup]
//! retention_days = 365
//!
//! [reload]
//! service = "nginx"
//! ```

use crate::backup::RetentionPolicy;
use crate::backup::DEFAULT_RETENTION_DAYS;
use crate::destination::DestinationSpec;
use crate::error::ConfigError;
use crate::reload::default_reload_command;
use crate::reload::ReloadAction;
use crate::source::SourceProvider;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use reqwest::header::HeaderName;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/cert-sync/cert-sync.toml";

/// Upper bound of the fetch and reload timeouts: one hour.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    pub source: SourceProvider,

    pub destination: DestinationSpec,

    #[serde(default)]
    pub backup: BackupSettings,

    #[serde(default)]
    pub reload: ReloadSettings,

    #[serde(default)]
    pub compare: CompareSettings,

    /// Where downloaded material is staged before being compared and installed
    #[serde(default = "default_staging_dir")]
    pub staging_dir: Utf8PathBuf,

    /// Lock preventing concurrent runs, none if unset
    #[serde(default)]
    pub lock_file: Option<Utf8PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupSettings {
    pub retention_days: u32,
}

impl Default for BackupSettings {
    fn default() -> Self {
        BackupSettings {
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReloadSettings {
    #[serde(default = "default_reload_command")]
    pub command: Vec<String>,

    #[serde(default)]
    pub service: Option<String>,

    #[serde(default = "default_reload_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReloadSettings {
    fn default() -> Self {
        ReloadSettings {
            command: default_reload_command(),
            service: None,
            timeout_secs: default_reload_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompareSettings {
    /// Skip the byte comparison when the local source files are older than the destination
    #[serde(default)]
    pub mtime_fast_path: bool,
}

fn default_staging_dir() -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(std::env::temp_dir()).unwrap_or_else(|_| "/tmp".into())
}

fn default_reload_timeout_secs() -> u64 {
    crate::reload::DEFAULT_TIMEOUT_SECS
}

impl SyncConfig {
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_owned()),
            _ => ConfigError::Unreadable {
                path: path.to_owned(),
                source: err,
            },
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig =
            toml::from_str(content).map_err(|err| ConfigError::InvalidSyntax {
                reason: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backup.retention_days == 0 {
            return Err(ConfigError::Invalid {
                reason: "backup.retention_days must be at least 1".into(),
            });
        }

        if let SourceProvider::Remote(remote) = &self.source {
            if let Some(header) = &remote.auth_header {
                HeaderName::from_bytes(header.as_bytes()).map_err(|_| ConfigError::Invalid {
                    reason: format!("source.auth_header is not a valid header name: {header:?}"),
                })?;
            }
            if remote.material_id.is_empty() {
                return Err(ConfigError::Invalid {
                    reason: "source.material_id cannot be empty".into(),
                });
            }
            if self.compare.mtime_fast_path {
                warn!("compare.mtime_fast_path is ignored for a remote source");
            }
            check_timeout("source.timeout_secs", remote.timeout_secs)?;
        }

        check_timeout("reload.timeout_secs", self.reload.timeout_secs)?;
        self.reload_action()?;
        Ok(())
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy::from_days(self.backup.retention_days)
    }

    pub fn reload_action(&self) -> Result<ReloadAction, ConfigError> {
        ReloadAction::try_new(
            &self.reload.command,
            self.reload.service.as_deref(),
            Duration::from_secs(self.reload.timeout_secs),
        )
    }
}

fn check_timeout(key: &str, secs: u64) -> Result<(), ConfigError> {
    if (1..=MAX_TIMEOUT_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            reason: format!("{key} must be between 1 and {MAX_TIMEOUT_SECS} seconds, got {secs}"),
        })
    }
}
