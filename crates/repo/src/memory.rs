//! In-memory repository for tests.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use keel_config::Config;
use parking_lot::Mutex;

use crate::{Repo, RepoError};

/// Operations recorded by [`MemoryRepo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoOp {
    Open,
    Close,
    Init,
    ConfigGet,
    ConfigReplace,
    SwarmKey,
}

#[derive(Debug, Default)]
struct MemoryState {
    open: bool,
    config: Option<Config>,
    swarm_key: Option<Vec<u8>>,
    ops: Vec<RepoOp>,
    failing: HashSet<RepoOp>,
}

/// A repository that lives in memory, records every operation in order and
/// fails the operations it was told to fail.
#[derive(Debug)]
pub struct MemoryRepo {
    path: PathBuf,
    state: Mutex<MemoryState>,
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepo {
    /// An uninitialized repository.
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("memory://keel"),
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// A closed repository that already holds `config`.
    pub fn initialized(config: Config) -> Self {
        let repo = Self::new();
        repo.state.lock().config = Some(config);
        repo
    }

    pub fn with_swarm_key(self, key: impl Into<Vec<u8>>) -> Self {
        self.state.lock().swarm_key = Some(key.into());
        self
    }

    /// Make every future `op` fail with [`RepoError::Backend`].
    pub fn fail_on(self, op: RepoOp) -> Self {
        self.state.lock().failing.insert(op);
        self
    }

    /// Operations performed so far, in order.
    pub fn ops(&self) -> Vec<RepoOp> {
        self.state.lock().ops.clone()
    }

    /// Current config, without recording an operation.
    pub fn peek_config(&self) -> Option<Config> {
        self.state.lock().config.clone()
    }

    fn record(&self, op: RepoOp) -> Result<parking_lot::MutexGuard<'_, MemoryState>, RepoError> {
        let mut state = self.state.lock();
        state.ops.push(op);
        if state.failing.contains(&op) {
            return Err(RepoError::Backend(format!("injected failure on {op:?}")));
        }
        Ok(state)
    }

    fn closed(&self) -> RepoError {
        RepoError::Closed {
            path: self.path.clone(),
        }
    }
}

#[async_trait]
impl Repo for MemoryRepo {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<(), RepoError> {
        let mut state = self.record(RepoOp::Open)?;
        if state.config.is_none() {
            return Err(RepoError::NotInitialized {
                path: self.path.clone(),
            });
        }
        state.open = true;
        Ok(())
    }

    async fn close(&self) -> Result<(), RepoError> {
        self.record(RepoOp::Close)?.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    async fn is_initialized(&self) -> Result<bool, RepoError> {
        Ok(self.state.lock().config.is_some())
    }

    async fn init(&self, config: &Config) -> Result<(), RepoError> {
        let mut state = self.record(RepoOp::Init)?;
        if state.config.is_some() {
            return Err(RepoError::AlreadyInitialized {
                path: self.path.clone(),
            });
        }
        state.config = Some(config.clone());
        Ok(())
    }

    async fn config_get(&self) -> Result<Config, RepoError> {
        let state = self.record(RepoOp::ConfigGet)?;
        match (&state.config, state.open) {
            (Some(config), true) => Ok(config.clone()),
            _ => Err(self.closed()),
        }
    }

    async fn config_replace(&self, config: &Config) -> Result<(), RepoError> {
        let mut state = self.record(RepoOp::ConfigReplace)?;
        if !state.open {
            return Err(self.closed());
        }
        state.config = Some(config.clone());
        Ok(())
    }

    async fn swarm_key(&self) -> Result<Option<Vec<u8>>, RepoError> {
        let state = self.record(RepoOp::SwarmKey)?;
        if !state.open {
            return Err(self.closed());
        }
        Ok(state.swarm_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn records_operations_and_injects_failures() {
        let repo = MemoryRepo::initialized(Config::defaults()).fail_on(RepoOp::ConfigReplace);

        repo.open().await.unwrap();
        repo.config_get().await.unwrap();
        assert_matches!(
            repo.config_replace(&Config::new()).await,
            Err(RepoError::Backend(_))
        );

        assert_eq!(
            repo.ops(),
            vec![RepoOp::Open, RepoOp::ConfigGet, RepoOp::ConfigReplace]
        );
    }
}
