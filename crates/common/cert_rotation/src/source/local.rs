use crate::error::FetchError;
use crate::material::CertificateMaterial;
use crate::material::MaterialSet;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;
use tracing::debug;

/// Material already present on this host, e.g. maintained by an ACME client.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalSource {
    pub cert_path: Utf8PathBuf,
    pub key_path: Utf8PathBuf,
}

impl LocalSource {
    pub fn fetch(&self) -> Result<MaterialSet, FetchError> {
        let certificate = read_material(&self.cert_path)?;
        let key = read_material(&self.key_path)?;
        Ok(MaterialSet { certificate, key })
    }

    pub fn paths(&self) -> [&Utf8Path; 2] {
        [&self.cert_path, &self.key_path]
    }
}

fn read_material(path: &Utf8Path) -> Result<CertificateMaterial, FetchError> {
    match std::fs::read(path) {
        Ok(bytes) => {
            debug!("Read {} bytes from {path}", bytes.len());
            Ok(bytes.into())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(FetchError::SourceMissing {
            path: path.to_owned(),
        }),
        Err(source) => Err(FetchError::SourceUnreadable {
            path: path.to_owned(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn source_in(dir: &TempDir) -> LocalSource {
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        LocalSource {
            cert_path: root.join("fullchain.pem"),
            key_path: root.join("privkey.pem"),
        }
    }

    #[test]
    fn read_both_materials() {
        let dir = TempDir::new().unwrap();
        let source = source_in(&dir);
        std::fs::write(&source.cert_path, "CERT-V2").unwrap();
        std::fs::write(&source.key_path, "KEY-V2").unwrap();

        let material = source.fetch().unwrap();

        assert_eq!(material, MaterialSet::new("CERT-V2", "KEY-V2"));
    }

    #[test]
    fn missing_key_is_reported_with_its_path() {
        let dir = TempDir::new().unwrap();
        let source = source_in(&dir);
        std::fs::write(&source.cert_path, "CERT-V2").unwrap();

        let err = source.fetch().unwrap_err();

        assert_matches!(err, FetchError::SourceMissing { path } if path == source.key_path);
    }
}
