use crate::material::MaterialSet;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;
use std::borrow::Cow;

/// Where the consuming service expects its TLS material.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum DestinationSpec {
    /// Certificate (with chain) and private key in two files.
    #[serde(rename = "separate")]
    SeparateFiles {
        cert_path: Utf8PathBuf,
        key_path: Utf8PathBuf,
    },

    /// Chain then key, concatenated into one file.
    #[serde(rename = "bundle")]
    SingleBundle { path: Utf8PathBuf },
}

/// A destination file along with the content it must hold.
#[derive(Debug)]
pub struct DestinationFile<'a> {
    pub path: &'a Utf8Path,
    pub content: Cow<'a, [u8]>,
}

impl DestinationSpec {
    pub fn paths(&self) -> Vec<&Utf8Path> {
        match self {
            DestinationSpec::SeparateFiles {
                cert_path,
                key_path,
            } => vec![cert_path.as_path(), key_path.as_path()],
            DestinationSpec::SingleBundle { path } => vec![path.as_path()],
        }
    }

    /// Lay out the material the way it has to be found on disk.
    pub fn layout<'a>(&'a self, material: &'a MaterialSet) -> Vec<DestinationFile<'a>> {
        match self {
            DestinationSpec::SeparateFiles {
                cert_path,
                key_path,
            } => vec![
                DestinationFile {
                    path: cert_path,
                    content: Cow::Borrowed(material.certificate.as_bytes()),
                },
                DestinationFile {
                    path: key_path,
                    content: Cow::Borrowed(material.key.as_bytes()),
                },
            ],
            DestinationSpec::SingleBundle { path } => vec![DestinationFile {
                path,
                content: Cow::Owned(material.bundle().into_bytes()),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separate_files_keep_cert_and_key_apart() {
        let destination = DestinationSpec::SeparateFiles {
            cert_path: "/etc/ssl/server.crt".into(),
            key_path: "/etc/ssl/server.key".into(),
        };
        let material = MaterialSet::new("CERT", "KEY");

        let layout = destination.layout(&material);

        assert_eq!(layout.len(), 2);
        assert_eq!(layout[0].path, "/etc/ssl/server.crt");
        assert_eq!(layout[0].content.as_ref(), b"CERT");
        assert_eq!(layout[1].path, "/etc/ssl/server.key");
        assert_eq!(layout[1].content.as_ref(), b"KEY");
    }

    #[test]
    fn bundle_is_a_single_file() {
        let destination = DestinationSpec::SingleBundle {
            path: "/etc/haproxy/site.pem".into(),
        };
        let material = MaterialSet::new("CHAIN\n", "KEY\n");

        let layout = destination.layout(&material);

        assert_eq!(destination.paths(), vec!["/etc/haproxy/site.pem"]);
        assert_eq!(layout.len(), 1);
        assert_eq!(layout[0].content.as_ref(), b"CHAIN\nKEY\n");
    }

    #[test]
    fn deserialize_destinations() {
        let separate: DestinationSpec = toml::from_str(
            r#"
            type = "separate"
            cert_path = "/etc/ssl/server.crt"
            key_path = "/etc/ssl/server.key"
            "#,
        )
        .unwrap();
        assert_eq!(
            separate,
            DestinationSpec::SeparateFiles {
                cert_path: "/etc/ssl/server.crt".into(),
                key_path: "/etc/ssl/server.key".into(),
            }
        );

        let bundle: DestinationSpec = toml::from_str(
            r#"
            type = "bundle"
            path = "/etc/haproxy/site.pem"
            "#,
        )
        .unwrap();
        assert_eq!(
            bundle,
            DestinationSpec::SingleBundle {
                path: "/etc/haproxy/site.pem".into()
            }
        );
    }
}
