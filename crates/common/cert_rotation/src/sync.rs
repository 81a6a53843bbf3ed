//! The certificate sync procedure.
//!
//! ```text
//! Fetching -> Comparing -> UpToDate
//!                       -> BackingUp -> Pruning -> Installing -> Reloading -> Done
//! ```
//!
//! Any stage can fail, which ends the run. Nothing done by a previous stage is undone:
//! staged downloads are discarded but installed files stay installed.

use crate::backup;
use crate::backup::BackupPattern;
use crate::backup::BackupRecord;
use crate::backup::RetentionPolicy;
use crate::compare;
use crate::config::SyncConfig;
use crate::destination::DestinationSpec;
use crate::error::*;
use crate::install;
use crate::lock::RunLock;
use crate::material::MaterialSet;
use crate::reload::ReloadAction;
use crate::source::SourceProvider;
use crate::staging::StagingArea;
use camino::Utf8PathBuf;
use std::fmt;
use std::time::SystemTime;
use time::Date;
use tracing::info;

/// The steps of a run, in order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Config,
    Lock,
    Fetching,
    Comparing,
    BackingUp,
    Pruning,
    Installing,
    Reloading,
}

impl Stage {
    /// Process exit code of a run that failed at this stage.
    pub fn exit_code(self) -> u8 {
        match self {
            Stage::Config => 1,
            Stage::Lock => 2,
            Stage::Fetching => 3,
            Stage::Comparing => 4,
            // Pruning only reports warnings, no run ever fails there
            Stage::BackingUp | Stage::Pruning => 5,
            Stage::Installing => 6,
            Stage::Reloading => 7,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Stage::Config => "loading the configuration",
            Stage::Lock => "locking",
            Stage::Fetching => "fetching the certificate material",
            Stage::Comparing => "comparing with the installed material",
            Stage::BackingUp => "backing up the installed material",
            Stage::Pruning => "pruning old backups",
            Stage::Installing => "installing the new material",
            Stage::Reloading => "reloading the service",
        };
        f.write_str(stage)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The installed material is the current one: nothing was touched
    UpToDate,

    /// Dry run only: the installed material would have been replaced
    WouldUpdate,

    /// The new material is installed and the service reloaded
    Updated,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::UpToDate => f.write_str("certificate up to date"),
            SyncOutcome::WouldUpdate => f.write_str("certificate would be updated"),
            SyncOutcome::Updated => f.write_str("certificate updated"),
        }
    }
}

/// What a successful run did.
#[derive(Debug)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub stages: Vec<Stage>,
    pub backups: Vec<BackupRecord>,
    pub pruned: usize,
    pub prune_warnings: Vec<PruneWarning>,
}

impl SyncReport {
    fn new() -> Self {
        SyncReport {
            outcome: SyncOutcome::UpToDate,
            stages: Vec::new(),
            backups: Vec::new(),
            pruned: 0,
            prune_warnings: Vec::new(),
        }
    }

    fn enter(&mut self, stage: Stage) {
        info!("Stage: {stage}");
        self.stages.push(stage);
    }

    fn finish(mut self, outcome: SyncOutcome) -> Self {
        info!("{outcome}");
        self.outcome = outcome;
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Compare(#[from] CompareError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Reload(#[from] ReloadError),
}

/// A run that failed, along with the stage where it failed.
#[derive(thiserror::Error, Debug)]
#[error("Failed while {stage}")]
pub struct SyncError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

impl SyncError {
    pub fn new(stage: Stage, source: impl Into<StageError>) -> Self {
        SyncError {
            stage,
            source: source.into(),
        }
    }

    /// Adapter for `map_err`
    pub fn at<E: Into<StageError>>(stage: Stage) -> impl FnOnce(E) -> SyncError {
        move |err| SyncError::new(stage, err)
    }

    /// The new material is on disk but the service may still be using the old one.
    pub fn is_installed_but_not_reloaded(&self) -> bool {
        self.stage == Stage::Reloading
    }

    pub fn exit_code(&self) -> u8 {
        self.stage.exit_code()
    }
}

/// A fully configured certificate sync procedure.
#[derive(Debug)]
pub struct CertSync {
    source: SourceProvider,
    destination: DestinationSpec,
    retention: RetentionPolicy,
    reload: ReloadAction,
    mtime_fast_path: bool,
    staging_dir: Utf8PathBuf,
    lock_file: Option<Utf8PathBuf>,
    dry_run: bool,
}

impl CertSync {
    pub fn try_new(config: SyncConfig) -> Result<Self, ConfigError> {
        let reload = config.reload_action()?;
        let retention = config.retention();
        Ok(CertSync {
            source: config.source,
            destination: config.destination,
            retention,
            reload,
            mtime_fast_path: config.compare.mtime_fast_path,
            staging_dir: config.staging_dir,
            lock_file: config.lock_file,
            dry_run: false,
        })
    }

    /// Stop after the comparison, reporting what would be done.
    pub fn dry_run(self, dry_run: bool) -> Self {
        CertSync { dry_run, ..self }
    }

    pub fn run(&self) -> Result<SyncReport, SyncError> {
        self.run_at(backup::local_today(), SystemTime::now())
    }

    /// Run with an explicit date for backup names and clock for backup ages.
    pub fn run_at(&self, today: Date, now: SystemTime) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new();

        let _lock = match &self.lock_file {
            Some(path) => {
                report.enter(Stage::Lock);
                Some(RunLock::acquire(path).map_err(SyncError::at(Stage::Lock))?)
            }
            None => None,
        };

        report.enter(Stage::Fetching);
        info!("Fetching certificate material from {}", self.source);
        // Dropped on return, which removes anything staged whatever the outcome
        let staging = StagingArea::create_in(&self.staging_dir).map_err(|source| {
            SyncError::new(
                Stage::Fetching,
                FetchError::Staging {
                    path: self.staging_dir.clone(),
                    source,
                },
            )
        })?;
        let material = self
            .source
            .fetch(&staging)
            .map_err(SyncError::at(Stage::Fetching))?;

        report.enter(Stage::Comparing);
        if !self
            .has_changed(&material)
            .map_err(SyncError::at(Stage::Comparing))?
        {
            return Ok(report.finish(SyncOutcome::UpToDate));
        }
        if self.dry_run {
            return Ok(report.finish(SyncOutcome::WouldUpdate));
        }

        let destination_paths = self.destination.paths();

        report.enter(Stage::BackingUp);
        report.backups = backup::snapshot(&destination_paths, today)
            .map_err(SyncError::at(Stage::BackingUp))?;

        report.enter(Stage::Pruning);
        for path in &destination_paths {
            let pruned = backup::prune(&BackupPattern::of(path), &self.retention, now);
            report.pruned += pruned.removed;
            report.prune_warnings.extend(pruned.warnings);
        }

        report.enter(Stage::Installing);
        install::write(&material, &self.destination).map_err(SyncError::at(Stage::Installing))?;

        report.enter(Stage::Reloading);
        self.reload
            .fire()
            .map_err(SyncError::at(Stage::Reloading))?;

        drop(staging);
        Ok(report.finish(SyncOutcome::Updated))
    }

    fn has_changed(&self, material: &MaterialSet) -> Result<bool, CompareError> {
        if let (true, SourceProvider::Local(local)) = (self.mtime_fast_path, &self.source) {
            if compare::unchanged_by_mtime(&local.paths(), &self.destination.paths()) {
                info!("Source files are older than the installed ones, skipping byte comparison");
                return Ok(false);
            }
        }

        compare::any_differs(&self.destination.layout(material))
    }
}
