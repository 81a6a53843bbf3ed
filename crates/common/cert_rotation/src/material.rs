use std::fmt;

/// PEM encoded certificate, chain or private key.
///
/// The content is never interpreted: two materials are the same only when their bytes are.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct CertificateMaterial(Vec<u8>);

impl CertificateMaterial {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        CertificateMaterial(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Private keys must not end up in logs
impl fmt::Debug for CertificateMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertificateMaterial({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for CertificateMaterial {
    fn from(bytes: Vec<u8>) -> Self {
        CertificateMaterial(bytes)
    }
}

impl From<&str> for CertificateMaterial {
    fn from(content: &str) -> Self {
        CertificateMaterial(content.as_bytes().to_vec())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Certificate,
    Key,
}

impl MaterialKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialKind::Certificate => "certificate",
            MaterialKind::Key => "key",
        }
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The certificate (with its chain, if any) and the matching private key,
/// as obtained by a single fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialSet {
    pub certificate: CertificateMaterial,
    pub key: CertificateMaterial,
}

impl MaterialSet {
    pub fn new(
        certificate: impl Into<CertificateMaterial>,
        key: impl Into<CertificateMaterial>,
    ) -> Self {
        MaterialSet {
            certificate: certificate.into(),
            key: key.into(),
        }
    }

    pub fn get(&self, kind: MaterialKind) -> &CertificateMaterial {
        match kind {
            MaterialKind::Certificate => &self.certificate,
            MaterialKind::Key => &self.key,
        }
    }

    pub fn bundle(&self) -> Bundle {
        Bundle::from_parts([&self.certificate, &self.key])
    }
}

/// Chain then key, concatenated as is.
///
/// No separator is added: a missing trailing newline in the chain is kept missing.
#[derive(Clone, PartialEq, Eq)]
pub struct Bundle(Vec<u8>);

impl Bundle {
    pub fn from_parts<'a>(parts: impl IntoIterator<Item = &'a CertificateMaterial>) -> Self {
        let mut bytes = Vec::new();
        for part in parts {
            bytes.extend_from_slice(part.as_bytes());
        }
        Bundle(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bundle({} bytes)", self.0.len())
    }
}
