use crate::error::FetchError;
use crate::material::CertificateMaterial;
use crate::material::MaterialKind;
use crate::material::MaterialSet;
use crate::staging::StagingArea;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// Certificate API serving each material at `<endpoint>/<material_id>/<kind>`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteSource {
    /// Base url of the certificate API
    pub endpoint: Url,

    /// Identifier of the certificate on the remote side, usually the domain name
    pub material_id: String,

    /// Token authorizing the download of the certificate
    pub cert_token: String,

    /// Token authorizing the download of the private key
    pub key_token: String,

    /// Header carrying the token.
    ///
    /// When unset, the token is sent as `Authorization: Bearer <token>`.
    #[serde(default)]
    pub auth_header: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl RemoteSource {
    pub fn new(
        endpoint: Url,
        material_id: impl Into<String>,
        cert_token: impl Into<String>,
        key_token: impl Into<String>,
    ) -> Self {
        RemoteSource {
            endpoint,
            material_id: material_id.into(),
            cert_token: cert_token.into(),
            key_token: key_token.into(),
            auth_header: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn fetch(&self, staging: &StagingArea) -> Result<MaterialSet, FetchError> {
        let http = Client::builder()
            .timeout(self.timeout())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|source| FetchError::TransportFailure {
                url: self.endpoint.to_string(),
                source,
            })?;

        let certificate = self.fetch_material(&http, MaterialKind::Certificate, staging)?;
        let key = self.fetch_material(&http, MaterialKind::Key, staging)?;
        Ok(MaterialSet { certificate, key })
    }

    pub fn url_for(&self, kind: MaterialKind) -> Result<Url, FetchError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidUrl {
                endpoint: self.endpoint.to_string(),
            })?
            .pop_if_empty()
            .push(&self.material_id)
            .push(kind.as_str());
        Ok(url)
    }

    fn token_for(&self, kind: MaterialKind) -> &str {
        match kind {
            MaterialKind::Certificate => &self.cert_token,
            MaterialKind::Key => &self.key_token,
        }
    }

    fn fetch_material(
        &self,
        http: &Client,
        kind: MaterialKind,
        staging: &StagingArea,
    ) -> Result<CertificateMaterial, FetchError> {
        let url = self.url_for(kind)?;
        let token = self.token_for(kind);
        let request = match &self.auth_header {
            None => http.get(url.clone()).bearer_auth(token),
            Some(header) => http.get(url.clone()).header(header.as_str(), token),
        };

        debug!("Downloading {kind} from {url}");
        let mut response = request
            .send()
            .map_err(|source| FetchError::TransportFailure {
                url: url.to_string(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::RemoteRejected {
                url: url.to_string(),
                code: response.status().as_u16(),
            });
        }

        let staged_path = staging.file_for(kind);
        let staging_error = |source: std::io::Error| FetchError::Staging {
            path: staging.path().to_string_lossy().into_owned().into(),
            source,
        };
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&staged_path)
            .map_err(staging_error)?;
        response
            .copy_to(&mut file)
            .map_err(|source| FetchError::TransportFailure {
                url: url.to_string(),
                source,
            })?;
        file.sync_all().map_err(staging_error)?;

        let bytes = std::fs::read(&staged_path).map_err(staging_error)?;
        debug!("Staged {} bytes of {kind}", bytes.len());
        Ok(bytes.into())
    }
}

impl fmt::Debug for RemoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSource")
            .field("endpoint", &self.endpoint.as_str())
            .field("material_id", &self.material_id)
            .field("cert_token", &"<redacted>")
            .field("key_token", &"<redacted>")
            .field("auth_header", &self.auth_header)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
