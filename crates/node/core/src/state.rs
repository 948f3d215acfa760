use keel_repo::{Repo, RepoError};
use strum::Display;

/// Repository state as seen by the boot orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RepoState {
    Closed,
    OpenUninitialized,
    OpenInitialized,
}

impl RepoState {
    pub async fn of<R: Repo>(repo: &R) -> Result<Self, RepoError> {
        if !repo.is_open() {
            return Ok(Self::Closed);
        }
        Ok(if repo.is_initialized().await? {
            Self::OpenInitialized
        } else {
            Self::OpenUninitialized
        })
    }
}

/// Node lifecycle.
///
/// ```text
/// Uninitialized ─► Initialized ─► Starting ─► Running ─► Stopping ─► Stopped
///                                    ▲                                  │
///                                    └──────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NodeState {
    #[default]
    Uninitialized,
    Initialized,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl NodeState {
    pub fn can_start(self) -> bool {
        matches!(self, Self::Initialized | Self::Stopped)
    }
}
