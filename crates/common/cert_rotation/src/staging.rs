use crate::material::MaterialKind;
use camino::Utf8Path;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

/// Transient directory holding freshly downloaded material.
///
/// The directory and its content are removed when the value is dropped,
/// whatever the outcome of the run.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    pub fn create_in(parent: &Utf8Path) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("cert-sync.")
            .tempdir_in(parent)?;
        Ok(StagingArea { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file_for(&self, kind: MaterialKind) -> PathBuf {
        self.dir.path().join(format!("{kind}.pem"))
    }
}
