use std::path::{Path, PathBuf};

use keel_config::ConfigError;
use keel_net_pnet::ProtectorError;
use keel_repo::{IdentityError, RepoError};
use keel_swarm_node::SwarmNodeError;
use strum::Display;
use thiserror::Error;

use crate::{HookError, NodeState};

/// Coarse classification of a [`BootError`], published with
/// [`LifecycleEvent::Failed`](crate::LifecycleEvent::Failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BootErrorKind {
    RepoNotInitialized,
    RepoOpenFailed,
    InitFailed,
    ConfigPersistFailed,
    EndpointStartFailed,
    InvalidState,
    HookFailed,
}

/// Errors aborting a boot. Every variant carries the repository path.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("no initialized repository at {}", .path.display())]
    RepoNotInitialized { path: PathBuf },

    #[error("failed to open repository at {}: {source}", .path.display())]
    RepoOpenFailed {
        path: PathBuf,
        #[source]
        source: RepoError,
    },

    #[error("repository at {} is already initialized", .path.display())]
    RepoAlreadyInitialized { path: PathBuf },

    #[error("failed to initialize repository at {}: {source}", .path.display())]
    InitFailed {
        path: PathBuf,
        #[source]
        source: InitError,
    },

    #[error("failed to persist config for {}: {source}", .path.display())]
    ConfigPersistFailed {
        path: PathBuf,
        #[source]
        source: ConfigPersistError,
    },

    #[error("failed to start swarm endpoint for {}: {source}", .path.display())]
    EndpointStartFailed {
        path: PathBuf,
        #[source]
        source: StartError,
    },

    #[error("cannot {operation} while {state} ({})", .path.display())]
    InvalidState {
        path: PathBuf,
        state: NodeState,
        operation: &'static str,
    },

    #[error("pre-start hook {hook:?} failed for {}: {source}", .path.display())]
    HookFailed {
        path: PathBuf,
        hook: String,
        #[source]
        source: HookError,
    },
}

impl BootError {
    pub fn kind(&self) -> BootErrorKind {
        match self {
            Self::RepoNotInitialized { .. } => BootErrorKind::RepoNotInitialized,
            Self::RepoOpenFailed { .. } => BootErrorKind::RepoOpenFailed,
            Self::RepoAlreadyInitialized { .. } | Self::InitFailed { .. } => {
                BootErrorKind::InitFailed
            }
            Self::ConfigPersistFailed { .. } => BootErrorKind::ConfigPersistFailed,
            Self::EndpointStartFailed { .. } => BootErrorKind::EndpointStartFailed,
            Self::InvalidState { .. } => BootErrorKind::InvalidState,
            Self::HookFailed { .. } => BootErrorKind::HookFailed,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::RepoNotInitialized { path }
            | Self::RepoOpenFailed { path, .. }
            | Self::RepoAlreadyInitialized { path }
            | Self::InitFailed { path, .. }
            | Self::ConfigPersistFailed { path, .. }
            | Self::EndpointStartFailed { path, .. }
            | Self::InvalidState { path, .. }
            | Self::HookFailed { path, .. } => path,
        }
    }
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("key size {bits} is below the minimum of {min} bits")]
    KeyTooSmall { bits: u32, min: u32 },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
pub enum ConfigPersistError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("merged config is invalid: {0}")]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("node identity is not loaded")]
    NoIdentity,

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid swarm key: {0}")]
    SwarmKey(#[from] ProtectorError),

    #[error(transparent)]
    Swarm(#[from] SwarmNodeError),
}
