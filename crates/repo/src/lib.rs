//! The repository a keel node boots from.
//!
//! The node only talks to storage through the [`Repo`] trait. Two
//! implementations are provided:
//! - [`FsRepo`] - a directory holding `config.toml`, `version` and an optional
//!   `swarm.key`
//! - `MemoryRepo` (feature `test-utils`) - an in-memory repository that records
//!   every operation and can be told to fail

mod error;
mod fs;
mod identity;
#[cfg(any(test, feature = "test-utils"))]
mod memory;

pub use error::{IdentityError, RepoError};
pub use fs::{CONFIG_FILE, FsRepo, REPO_VERSION, SWARM_KEY_FILE, VERSION_FILE};
pub use identity::Identity;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{MemoryRepo, RepoOp};

use std::path::Path;

use async_trait::async_trait;
use keel_config::Config;

/// Storage collaborator consumed by the boot orchestrator.
///
/// All methods take `&self`; implementations keep their open/closed flag
/// behind interior mutability so a repository can be shared by `Arc`.
#[async_trait]
pub trait Repo: Send + Sync + 'static {
    /// Location used in diagnostics.
    fn path(&self) -> &Path;

    /// Open the repository.
    ///
    /// Fails with [`RepoError::NotInitialized`] when there is nothing to open.
    async fn open(&self) -> Result<(), RepoError>;

    async fn close(&self) -> Result<(), RepoError>;

    fn is_open(&self) -> bool;

    /// Whether an initialized repository exists, open or not.
    async fn is_initialized(&self) -> Result<bool, RepoError>;

    /// Create the repository with the given initial configuration.
    ///
    /// Does not open it.
    async fn init(&self, config: &Config) -> Result<(), RepoError>;

    async fn config_get(&self) -> Result<Config, RepoError>;

    async fn config_replace(&self, config: &Config) -> Result<(), RepoError>;

    /// Raw bytes of the shared network secret, if one is stored.
    async fn swarm_key(&self) -> Result<Option<Vec<u8>>, RepoError>;
}
