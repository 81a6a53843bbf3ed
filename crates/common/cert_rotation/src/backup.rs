//! Dated copies of the installed files, taken before they are overwritten.
//!
//! A backup of `/etc/ssl/server.key` made on 2024-03-01 is `/etc/ssl/server.key.20240301`.
//! Two backups made the same day share the same name: the later one wins.

use crate::error::BackupError;
use crate::error::PruneWarning;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use std::io::ErrorKind;
use std::time::Duration;
use std::time::SystemTime;
use time::Date;
use time::OffsetDateTime;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub const DEFAULT_RETENTION_DAYS: u32 = 365;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const DATE_STAMP_LEN: usize = 8;

/// Age past which a backup is removed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_age: Duration,
}

impl RetentionPolicy {
    pub fn from_days(days: u32) -> Self {
        RetentionPolicy {
            max_age: Duration::from_secs(u64::from(days) * SECONDS_PER_DAY),
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// A backup exactly as old as the threshold is kept.
    pub fn is_expired(&self, age: Duration) -> bool {
        age > self.max_age
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::from_days(DEFAULT_RETENTION_DAYS)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupRecord {
    pub original: Utf8PathBuf,
    pub path: Utf8PathBuf,
}

impl BackupRecord {
    pub fn new(original: &Utf8Path, date: Date) -> Self {
        let mut path = original.to_owned();
        path.set_file_name(format!(
            "{}.{}",
            original.file_name().unwrap_or_default(),
            date_stamp(date)
        ));
        BackupRecord {
            original: original.to_owned(),
            path,
        }
    }
}

fn date_stamp(date: Date) -> String {
    format!(
        "{:04}{:02}{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Today, in local time when the local offset can be determined, else in UTC.
pub fn local_today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Copy each existing file to its dated backup.
///
/// Paths that don't exist yet are skipped. The first failure aborts the snapshot.
pub fn snapshot(paths: &[&Utf8Path], today: Date) -> Result<Vec<BackupRecord>, BackupError> {
    let mut records = Vec::new();
    for &path in paths {
        match std::fs::metadata(path) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("Nothing to back up: {path} does not exist");
                continue;
            }
            Err(source) => {
                return Err(BackupError::Inspect {
                    path: path.to_owned(),
                    source,
                })
            }
        }

        let record = BackupRecord::new(path, today);
        std::fs::copy(path, &record.path).map_err(|source| BackupError::CopyFailed {
            from: path.to_owned(),
            to: record.path.clone(),
            source,
        })?;
        info!("Backed up {path} to {}", record.path);
        records.push(record);
    }
    Ok(records)
}

/// Names of the backups of a given file: `<file name>.<YYYYMMDD>`, next to that file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupPattern {
    pub directory: Utf8PathBuf,
    pub file_name: String,
}

impl BackupPattern {
    pub fn of(original: &Utf8Path) -> Self {
        let directory = match original.parent() {
            None => Utf8PathBuf::from("/"),
            Some(dir) if dir.as_str().is_empty() => Utf8PathBuf::from("."),
            Some(dir) => dir.to_owned(),
        };
        BackupPattern {
            directory,
            file_name: original.file_name().unwrap_or_default().to_string(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        name.strip_prefix(self.file_name.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|stamp| {
                stamp.len() == DATE_STAMP_LEN && stamp.bytes().all(|b| b.is_ascii_digit())
            })
    }
}

#[derive(Debug, Default)]
pub struct PruneReport {
    pub removed: usize,
    pub warnings: Vec<PruneWarning>,
}

/// Remove the backups matching `pattern` whose modification time is older than the retention.
///
/// Best effort: failures are logged and reported as warnings, never as errors.
/// A matching entry that cannot be removed, e.g. a directory, is reported too.
pub fn prune(pattern: &BackupPattern, retention: &RetentionPolicy, now: SystemTime) -> PruneReport {
    let mut report = PruneReport::default();
    let dir = &pattern.directory;

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(source) => {
            report.warn(PruneWarning::ScanFailed {
                dir: dir.clone(),
                source,
            });
            return report;
        }
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !pattern.matches(name) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };

        // A backup from the future has no age
        let age = now.duration_since(modified).unwrap_or_default();
        if !retention.is_expired(age) {
            continue;
        }

        let path = dir.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Removed expired backup {path}");
                report.removed += 1;
            }
            Err(source) => report.warn(PruneWarning::RemoveFailed { path, source }),
        }
    }

    report
}

impl PruneReport {
    fn warn(&mut self, warning: PruneWarning) {
        warn!("{warning}: {}", source_message(&warning));
        self.warnings.push(warning);
    }
}

fn source_message(err: &dyn std::error::Error) -> String {
    err.source().map(|err| err.to_string()).unwrap_or_default()
}
