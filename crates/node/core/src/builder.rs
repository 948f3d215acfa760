use std::sync::Arc;

use keel_config::Config;
use keel_repo::Repo;

use crate::{Node, PreStartHook};

/// Assembles a [`Node`] around a repository.
pub struct NodeBuilder<R: Repo> {
    repo: Arc<R>,
    overrides: Config,
    hooks: Vec<Box<dyn PreStartHook<R>>>,
    force_private_network: bool,
}

impl<R: Repo> NodeBuilder<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            overrides: Config::new(),
            hooks: Vec::new(),
            force_private_network: false,
        }
    }

    /// Caller overrides, layered on top of the persisted config when the
    /// endpoint starts. Never persisted.
    pub fn overrides(mut self, overrides: Config) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn pre_start_hook(mut self, hook: impl PreStartHook<R> + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Refuse to start without a swarm key, whatever the config says.
    pub fn force_private_network(mut self, force: bool) -> Self {
        self.force_private_network = force;
        self
    }

    pub fn build(self) -> Node<R> {
        Node::new(self.repo, self.overrides, self.hooks, self.force_private_network)
    }
}
