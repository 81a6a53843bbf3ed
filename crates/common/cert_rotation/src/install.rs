//! Putting new material in place.

use crate::destination::DestinationSpec;
use crate::error::InstallError;
use crate::material::MaterialSet;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use std::fs::Permissions;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use tracing::info;

/// Owner-only read/write.
pub const INSTALLED_FILE_MODE: u32 = 0o600;

/// Install the material as laid out by the destination.
///
/// Each file is replaced atomically. The files of a multi-file destination are not replaced
/// as a whole: when the second write fails the first file keeps its new content.
pub fn write(material: &MaterialSet, destination: &DestinationSpec) -> Result<(), InstallError> {
    let layout = destination.layout(material);

    for file in &layout {
        atomically_write_file(file.path, &file.content)?;
        info!("Installed {} ({} bytes)", file.path, file.content.len());
    }

    for file in &layout {
        restrict_permissions(file.path)?;
    }

    Ok(())
}

/// Write a file through a temporary file renamed into place.
///
/// A reader sees either the previous content or the new one, never a partial write.
/// The temporary file is created with owner-only permissions in the destination directory,
/// so the rename never crosses filesystems.
pub fn atomically_write_file(dest: &Utf8Path, content: &[u8]) -> Result<(), InstallError> {
    let dest_dir = parent_dir(dest);
    let file_name = dest.file_name().unwrap_or("material");

    let mut tempfile = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .permissions(Permissions::from_mode(INSTALLED_FILE_MODE))
        .tempfile_in(&dest_dir)
        .map_err(|err| InstallError::from_io(dest, err))?;

    // The temporary file is removed on drop if anything fails before the rename
    tempfile
        .write_all(content)
        .map_err(|err| InstallError::from_io(dest, err))?;
    tempfile
        .as_file()
        .sync_all()
        .map_err(|err| InstallError::from_io(dest, err))?;

    tempfile
        .persist(dest)
        .map_err(|err| InstallError::from_io(dest, err.error))?;

    // Ensure the new name reach the disk
    let dir = std::fs::File::open(&dest_dir).map_err(|err| InstallError::from_io(dest, err))?;
    dir.sync_all()
        .map_err(|err| InstallError::from_io(dest, err))?;

    Ok(())
}

fn restrict_permissions(path: &Utf8Path) -> Result<(), InstallError> {
    std::fs::set_permissions(path, Permissions::from_mode(INSTALLED_FILE_MODE))
        .map_err(|err| InstallError::from_io(path, err))
}

fn parent_dir(file: &Utf8Path) -> Utf8PathBuf {
    match file.parent() {
        None => Utf8PathBuf::from("/"),
        Some(path) if path.as_str().is_empty() => Utf8PathBuf::from("."),
        Some(dir) => dir.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InstallError;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn temp_dir_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
    }

    fn mode(path: &Utf8Path) -> u32 {
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn atomically_write_file_replaces_the_content() {
        let dir = TempDir::new().unwrap();
        let dest = temp_dir_path(&dir).join("server.crt");
        std::fs::write(&dest, "CERT-V1").unwrap();

        atomically_write_file(&dest, b"CERT-V2").unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"CERT-V2");
        // no temporary file left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn separate_files_are_installed_with_owner_only_permissions() {
        let dir = TempDir::new().unwrap();
        let root = temp_dir_path(&dir);
        let destination = DestinationSpec::SeparateFiles {
            cert_path: root.join("server.crt"),
            key_path: root.join("server.key"),
        };
        std::fs::write(root.join("server.key"), "KEY-V1").unwrap();
        std::fs::set_permissions(root.join("server.key"), Permissions::from_mode(0o644)).unwrap();

        write(&MaterialSet::new("CERT-V2", "KEY-V2"), &destination).unwrap();

        assert_eq!(std::fs::read(root.join("server.crt")).unwrap(), b"CERT-V2");
        assert_eq!(std::fs::read(root.join("server.key")).unwrap(), b"KEY-V2");
        assert_eq!(mode(&root.join("server.crt")), 0o600);
        assert_eq!(mode(&root.join("server.key")), 0o600);
    }

    #[test]
    fn bundle_is_chain_then_key() {
        let dir = TempDir::new().unwrap();
        let path = temp_dir_path(&dir).join("site.pem");
        let destination = DestinationSpec::SingleBundle { path: path.clone() };

        write(&MaterialSet::new("C", "K"), &destination).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"CK");
        assert_eq!(mode(&path), 0o600);
    }

    #[test]
    fn missing_destination_directory_is_a_write_failure() {
        let dir = TempDir::new().unwrap();
        let root = temp_dir_path(&dir);
        let destination = DestinationSpec::SeparateFiles {
            cert_path: root.join("server.crt"),
            key_path: root.join("missing").join("server.key"),
        };

        let err = write(&MaterialSet::new("CERT-V2", "KEY-V2"), &destination).unwrap_err();

        assert_matches!(err, InstallError::WriteFailure { path, .. } if path == root.join("missing/server.key"));
        // No rollback: the certificate written first stays in place
        assert_eq!(std::fs::read(root.join("server.crt")).unwrap(), b"CERT-V2");
    }
}
