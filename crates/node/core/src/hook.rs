use async_trait::async_trait;
use keel_repo::{Identity, Repo};

pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Work that must happen after the repository is opened and the identity is
/// loaded, before the node counts as initialized.
///
/// Hooks run in registration order; the first error aborts the boot with
/// [`BootError::HookFailed`](crate::BootError::HookFailed).
#[async_trait]
pub trait PreStartHook<R: Repo>: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, repo: &R, identity: &Identity) -> Result<(), HookError>;
}
