//! Certificate rotation for appliances that read their TLS material from fixed paths.
//!
//! A run fetches the current certificate and private key, compares them byte-for-byte
//! with what is installed and, only when something changed, backs up the installed files,
//! prunes old backups, installs the new material atomically with owner-only permissions
//! and fires the reload action of the consuming service.
//!
//! ```no_run
//! use cert_rotation::CertSync;
//! use cert_rotation::SyncConfig;
//!
//! let config = SyncConfig::load("/etc/cert-sync/cert-sync.toml")?;
//! let report = CertSync::try_new(config)?.run()?;
//! println!("{}", report.outcome);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
pub mod compare;
pub mod config;
pub mod destination;
pub mod error;
pub mod install;
pub mod lock;
pub mod material;
pub mod reload;
pub mod source;
pub mod staging;
pub mod sync;

pub use self::config::SyncConfig;
pub use self::destination::DestinationSpec;
pub use self::error::*;
pub use self::material::*;
pub use self::source::SourceProvider;
pub use self::sync::*;
