//! Where the current certificate and key come from.

mod local;
mod remote;

pub use self::local::*;
pub use self::remote::*;

use crate::error::FetchError;
use crate::material::MaterialSet;
use crate::staging::StagingArea;
use serde::Deserialize;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceProvider {
    /// Download from an HTTPS endpoint.
    Remote(RemoteSource),

    /// Read from the local filesystem.
    Local(LocalSource),
}

impl SourceProvider {
    /// Obtain both the certificate and the key.
    ///
    /// Either both are returned or none: a failure on one material fails the whole fetch.
    pub fn fetch(&self, staging: &StagingArea) -> Result<MaterialSet, FetchError> {
        match self {
            SourceProvider::Remote(remote) => remote.fetch(staging),
            SourceProvider::Local(local) => local.fetch(),
        }
    }
}

impl fmt::Display for SourceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceProvider::Remote(remote) => write!(f, "{}", remote.endpoint),
            SourceProvider::Local(local) => {
                write!(f, "{} and {}", local.cert_path, local.key_path)
            }
        }
    }
}
