use crate::error::LockError;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use nix::fcntl::Flock;
use nix::fcntl::FlockArg;
use std::fs::File;
use std::fs::OpenOptions;
use tracing::debug;

/// Exclusive lock preventing two runs from rotating the same destination.
///
/// The lock is a `flock` on a dedicated file, released when the lock is dropped
/// or when the process dies. The file is left in place so that every run locks the same inode.
#[derive(Debug)]
pub struct RunLock {
    _handle: Flock<File>,
    pub path: Utf8PathBuf,
}

impl RunLock {
    /// Take the lock, failing immediately if another run holds it.
    pub fn acquire(path: impl AsRef<Utf8Path>) -> Result<RunLock, LockError> {
        let path = path.as_ref().to_owned();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        let handle = Flock::lock(file, FlockArg::LockExclusiveNonblock)
            .map_err(|(_, source)| LockError::Held {
                path: path.clone(),
                source,
            })?;

        debug!("Lock taken on {path}");
        Ok(RunLock {
            _handle: handle,
            path,
        })
    }
}
