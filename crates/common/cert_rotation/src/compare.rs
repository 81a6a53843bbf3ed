//! Deciding whether the installed material has to be replaced.

use crate::destination::DestinationFile;
use crate::error::CompareError;
use camino::Utf8Path;
use std::io::ErrorKind;
use std::time::SystemTime;

/// Tell if `installed` has to be overwritten with `staged`.
///
/// A missing file always differs. Otherwise this is an exact byte comparison:
/// line endings and trailing whitespace count.
pub fn differs(staged: &[u8], installed: &Utf8Path) -> Result<bool, CompareError> {
    match std::fs::read(installed) {
        Ok(content) => Ok(content != staged),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(true),
        Err(source) => Err(CompareError::Unreadable {
            path: installed.to_owned(),
            source,
        }),
    }
}

/// Tell if any of the destination files differs from its new content.
///
/// Cert and key are replaced together: one changed file is enough to reinstall the set.
pub fn any_differs(layout: &[DestinationFile<'_>]) -> Result<bool, CompareError> {
    for file in layout {
        if differs(&file.content, file.path)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Fast path for local sources: `true` when every source file is older than every destination.
///
/// This misses a source rewritten with an older timestamp (e.g. restored from a backup),
/// hence only used when explicitly enabled. Any missing file or unreadable timestamp
/// gives `false`, so the caller falls back to a byte comparison.
pub fn unchanged_by_mtime(sources: &[&Utf8Path], destinations: &[&Utf8Path]) -> bool {
    let sources: Option<Vec<SystemTime>> = sources.iter().map(|path| modified(path)).collect();
    let destinations: Option<Vec<SystemTime>> =
        destinations.iter().map(|path| modified(path)).collect();

    let newest_source = sources.and_then(|times| times.into_iter().max());
    let oldest_destination = destinations.and_then(|times| times.into_iter().min());

    match (newest_source, oldest_destination) {
        (Some(source), Some(destination)) => source < destination,
        _ => false,
    }
}

fn modified(path: &Utf8Path) -> Option<SystemTime> {
    std::fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
}
