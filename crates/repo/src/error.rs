use std::{io, path::PathBuf};

use keel_config::ConfigError;
use thiserror::Error;

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("repository not initialized at {}", .path.display())]
    NotInitialized { path: PathBuf },

    #[error("repository already initialized at {}", .path.display())]
    AlreadyInitialized { path: PathBuf },

    #[error("repository at {} is closed", .path.display())]
    Closed { path: PathBuf },

    #[error("unsupported repository version {found:?} at {} (expected {expected})", .path.display())]
    Version {
        path: PathBuf,
        found: String,
        expected: u32,
    },

    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config in {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// Failure reported by a non-filesystem backend.
    #[error("repository backend error: {0}")]
    Backend(String),
}

impl RepoError {
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::NotInitialized { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors reading or writing the `Identity` section of the config.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("config has no {0} entry")]
    Missing(&'static str),

    #[error("private key is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("private key could not be decoded: {0}")]
    Decode(#[from] libp2p::identity::DecodingError),

    #[error("peer id {found} does not match private key (expected {expected})")]
    Mismatch { expected: String, found: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
