use std::{path::PathBuf, sync::Arc};

use keel_config::{Config, SwarmOptions};
use keel_net_pnet::SwarmKey;
use keel_repo::{Identity, Repo};
use keel_swarm_node::{EndpointConfig, SwarmHandle, SwarmNode, SwarmNodeEvent};
use libp2p::{Multiaddr, PeerId};
use strum::Display;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    BootError, BootIntent, ConfigPersistError, InitError, InitOptions, LifecycleEvent,
    MIN_KEY_BITS, NodeState, PreStartHook, RepoState, StartError,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Display)]
#[strum(serialize_all = "snake_case")]
enum BootTask {
    Init(InitOptions),
    SetConfig(Config),
    Start,
}

/// A node bound to one repository.
///
/// Built with [`NodeBuilder`](crate::NodeBuilder). Calls take `&mut self`, so
/// boots, starts and stops of one node never interleave.
pub struct Node<R: Repo> {
    repo: Arc<R>,
    overrides: Config,
    hooks: Vec<Box<dyn PreStartHook<R>>>,
    force_private_network: bool,
    identity: Option<Identity>,
    state: NodeState,
    swarm: Option<SwarmNode>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl<R: Repo> Node<R> {
    pub(crate) fn new(
        repo: Arc<R>,
        overrides: Config,
        hooks: Vec<Box<dyn PreStartHook<R>>>,
        force_private_network: bool,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            repo,
            overrides,
            hooks,
            force_private_network,
            identity: None,
            state: NodeState::default(),
            swarm: None,
            events,
        }
    }

    pub fn repo(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn peer_id(&self) -> Option<PeerId> {
        self.identity.as_ref().map(Identity::peer_id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Handle to the running endpoint.
    pub fn swarm_handle(&self) -> Option<SwarmHandle> {
        self.swarm.as_ref().and_then(SwarmNode::handle)
    }

    /// Endpoint notifications, while the endpoint exists.
    pub fn swarm_events(&self) -> Option<broadcast::Receiver<SwarmNodeEvent>> {
        self.swarm.as_ref().map(SwarmNode::subscribe)
    }

    pub async fn repo_state(&self) -> Result<RepoState, BootError> {
        RepoState::of(&*self.repo)
            .await
            .map_err(|source| BootError::RepoOpenFailed {
                path: self.path(),
                source,
            })
    }

    /// Run one boot: open, then optionally initialize, configure and start.
    pub async fn boot(&mut self, intent: BootIntent) -> Result<(), BootError> {
        let result = self.run_boot(intent).await;
        match &result {
            Ok(()) => {
                info!(path = %self.repo.path().display(), state = %self.state, "node ready");
                self.emit(LifecycleEvent::Ready);
            }
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "boot failed");
                self.emit(LifecycleEvent::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
        result
    }

    async fn run_boot(&mut self, intent: BootIntent) -> Result<(), BootError> {
        let mut has_repo = self.probe_repo().await?;
        let mut queue = Vec::with_capacity(3);

        if intent.should_init && !has_repo {
            queue.push(BootTask::Init(intent.init_options));
            has_repo = true;
        }

        if intent.should_set_config {
            if has_repo {
                queue.push(BootTask::SetConfig(intent.config_patch.unwrap_or_default()));
            } else {
                warn!(path = %self.repo.path().display(), "no repository, skipping config update");
            }
        }

        if intent.should_start {
            if !has_repo {
                return Err(BootError::RepoNotInitialized { path: self.path() });
            }
            queue.push(BootTask::Start);
        }

        for task in queue {
            debug!(%task, "running boot task");
            match task {
                BootTask::Init(options) => self.init_repo(options).await?,
                BootTask::SetConfig(patch) => self.set_config(patch).await?,
                BootTask::Start => {
                    self.start().await?;
                }
            }
        }
        Ok(())
    }

    /// Open the repository if needed and run the pre-start step. Returns
    /// `false` when there is no repository to open.
    async fn probe_repo(&mut self) -> Result<bool, BootError> {
        if !self.repo.is_open() {
            match self.repo.open().await {
                Ok(()) => {}
                Err(e) if e.is_not_initialized() => {
                    debug!(path = %self.repo.path().display(), "no repository found");
                    return Ok(false);
                }
                Err(source) => {
                    return Err(BootError::RepoOpenFailed {
                        path: self.path(),
                        source,
                    });
                }
            }
        }
        if self.identity.is_none() {
            self.pre_start().await?;
        }
        Ok(true)
    }

    /// Load the identity, then run the registered hooks in order.
    async fn pre_start(&mut self) -> Result<(), BootError> {
        let config = self
            .repo
            .config_get()
            .await
            .map_err(|source| BootError::RepoOpenFailed {
                path: self.path(),
                source,
            })?;
        let identity = Identity::from_config(&config).map_err(|e| BootError::HookFailed {
            path: self.path(),
            hook: "identity".to_string(),
            source: Box::new(e),
        })?;

        for hook in &self.hooks {
            debug!(hook = hook.name(), "running pre-start hook");
            hook.run(&self.repo, &identity).await.map_err(|source| BootError::HookFailed {
                path: self.path(),
                hook: hook.name().to_string(),
                source,
            })?;
        }

        info!(peer_id = %identity.peer_id(), "node identity loaded");
        self.identity = Some(identity);
        if self.state == NodeState::Uninitialized {
            self.state = NodeState::Initialized;
        }
        Ok(())
    }

    async fn init_repo(&mut self, options: InitOptions) -> Result<(), BootError> {
        let init_failed = |source: InitError| BootError::InitFailed {
            path: self.path(),
            source,
        };

        if options.key_bits < MIN_KEY_BITS {
            return Err(init_failed(InitError::KeyTooSmall {
                bits: options.key_bits,
                min: MIN_KEY_BITS,
            }));
        }
        if options.passphrase.is_some() {
            debug!("passphrase accepted, private key is stored unencrypted");
        }

        if self.repo.is_initialized().await.map_err(|e| init_failed(e.into()))? {
            return Err(BootError::RepoAlreadyInitialized { path: self.path() });
        }

        let identity = Identity::generate();
        let mut config = Config::defaults();
        identity.write_to(&mut config).map_err(|e| init_failed(e.into()))?;
        self.repo.init(&config).await.map_err(|e| init_failed(e.into()))?;
        info!(
            path = %self.repo.path().display(),
            peer_id = %identity.peer_id(),
            key_bits = options.key_bits,
            "repository initialized"
        );

        self.repo
            .open()
            .await
            .map_err(|source| BootError::RepoOpenFailed {
                path: self.path(),
                source,
            })?;
        self.pre_start().await
    }

    async fn set_config(&mut self, patch: Config) -> Result<(), BootError> {
        if self.repo_state().await? == RepoState::Closed {
            return Err(BootError::RepoNotInitialized { path: self.path() });
        }
        self.merge_config(&patch)
            .await
            .map_err(|source| BootError::ConfigPersistFailed {
                path: self.path(),
                source,
            })
    }

    async fn merge_config(&self, patch: &Config) -> Result<(), ConfigPersistError> {
        let merged = self.repo.config_get().await?.merged(patch);
        SwarmOptions::resolve(&merged, &Config::new())?;
        self.repo.config_replace(&merged).await?;
        info!(keys = patch.as_table().len(), "config updated");
        Ok(())
    }

    /// Start the swarm endpoint. Only valid when initialized or stopped; on
    /// failure the node returns to its previous state.
    pub async fn start(&mut self) -> Result<Vec<Multiaddr>, BootError> {
        if !self.state.can_start() {
            return Err(BootError::InvalidState {
                path: self.path(),
                state: self.state,
                operation: "start",
            });
        }
        if !self.probe_repo().await? || self.repo_state().await? != RepoState::OpenInitialized {
            return Err(BootError::RepoNotInitialized { path: self.path() });
        }

        let previous = self.state;
        self.state = NodeState::Starting;
        match self.start_endpoint().await {
            Ok(listen_addrs) => {
                self.state = NodeState::Running;
                self.emit(LifecycleEvent::Started {
                    listen_addrs: listen_addrs.clone(),
                });
                Ok(listen_addrs)
            }
            Err(source) => {
                self.state = previous;
                Err(BootError::EndpointStartFailed {
                    path: self.path(),
                    source,
                })
            }
        }
    }

    async fn start_endpoint(&mut self) -> Result<Vec<Multiaddr>, StartError> {
        let keypair = self.identity.as_ref().ok_or(StartError::NoIdentity)?.keypair().clone();

        let persisted = self.repo.config_get().await?;
        let options = SwarmOptions::resolve(&persisted, &self.overrides)?;
        let mut config = EndpointConfig::try_from(&options)?;
        config.force_private_network |= self.force_private_network;

        let swarm_key = self
            .repo
            .swarm_key()
            .await?
            .map(|bytes| SwarmKey::parse(&bytes))
            .transpose()?;

        let mut swarm = SwarmNode::new(keypair, config);
        let listen_addrs = swarm.start(swarm_key).await?;
        self.swarm = Some(swarm);
        Ok(listen_addrs)
    }

    /// Stop the endpoint and close the repository. Safe to call on a node
    /// that never started.
    pub async fn stop(&mut self) {
        self.state = NodeState::Stopping;

        if let Some(mut swarm) = self.swarm.take() {
            swarm.stop().await;
        }
        if self.repo.is_open()
            && let Err(error) = self.repo.close().await
        {
            warn!(%error, "failed to close repository");
        }

        self.state = NodeState::Stopped;
        info!("node stopped");
        self.emit(LifecycleEvent::Stopped);
    }

    fn path(&self) -> PathBuf {
        self.repo.path().to_path_buf()
    }

    fn emit(&self, event: LifecycleEvent) {
        let _ = self.events.send(event);
    }
}
