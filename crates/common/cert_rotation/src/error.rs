use camino::Utf8PathBuf;
use std::io;
use std::time::Duration;

/// Failure to obtain the certificate material.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Could not reach {url}")]
    TransportFailure {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} was rejected with HTTP status {code}")]
    RemoteRejected { url: String, code: u16 },

    #[error("Source file not found: {path}")]
    SourceMissing { path: Utf8PathBuf },

    #[error("Could not read source file {path}")]
    SourceUnreadable {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not stage downloaded material in {path}")]
    Staging {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot build a request url from endpoint {endpoint}")]
    InvalidUrl { endpoint: String },
}

/// Failure to read the installed material for comparison.
#[derive(thiserror::Error, Debug)]
pub enum CompareError {
    #[error("Could not read installed file {path}")]
    Unreadable {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to snapshot an installed file before it is overwritten.
#[derive(thiserror::Error, Debug)]
pub enum BackupError {
    #[error("Could not back up {from} to {to}")]
    CopyFailed {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not inspect {path}")]
    Inspect {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A backup that could not be pruned.
///
/// Never aborts a run: these are logged and counted.
#[derive(thiserror::Error, Debug)]
pub enum PruneWarning {
    #[error("Could not scan {dir} for expired backups")]
    ScanFailed {
        dir: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not remove expired backup {path}")]
    RemoveFailed {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to put the new material in place.
#[derive(thiserror::Error, Debug)]
pub enum InstallError {
    #[error("Could not write {path}")]
    WriteFailure {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied while installing {path}")]
    PermissionDenied {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    pub(crate) fn from_io(path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::PermissionDenied => InstallError::PermissionDenied { path, source },
            _ => InstallError::WriteFailure { path, source },
        }
    }
}

/// Failure of the reload action.
///
/// When this is returned the new material is already installed.
#[derive(thiserror::Error, Debug)]
pub enum ReloadError {
    #[error("Reload command <{command}> failed with code: {code:?}")]
    ActionFailed { command: String, code: Option<i32> },

    #[error("Reload command <{command}> could not be started")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Reload command <{command}> did not complete within {timeout:?}")]
    TimedOut { command: String, timeout: Duration },
}

/// Failure to take the run lock.
#[derive(thiserror::Error, Debug)]
pub enum LockError {
    #[error("Could not open lock file {path}")]
    Open {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Another run holds the lock {path}")]
    Held {
        path: Utf8PathBuf,
        #[source]
        source: nix::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(Utf8PathBuf),

    #[error("Could not read configuration file {path}")]
    Unreadable {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid syntax in the configuration: {reason}")]
    InvalidSyntax { reason: String },

    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}
