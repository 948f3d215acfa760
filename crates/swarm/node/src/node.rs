use std::sync::Arc;

use keel_net_peers::{AddressBook, DialManager};
use keel_net_pnet::{Enforcement, Protector, SwarmKey, build_transport};
use libp2p::{Multiaddr, PeerId, Swarm, identity::Keypair, relay, swarm};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    EndpointConfig, SwarmHandle, SwarmNodeError, SwarmNodeEvent, behaviour::NodeBehaviour,
    event_loop::EventLoop,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The libp2p endpoint of a node. At most one swarm is live at a time.
pub struct SwarmNode {
    keypair: Keypair,
    config: EndpointConfig,
    events: broadcast::Sender<SwarmNodeEvent>,
    running: Option<Running>,
}

struct Running {
    handle: SwarmHandle,
    task: JoinHandle<()>,
    listen_addrs: Vec<Multiaddr>,
}

impl SwarmNode {
    pub fn new(keypair: Keypair, config: EndpointConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            keypair,
            config,
            events,
            running: None,
        }
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.keypair.public().to_peer_id()
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Subscribe to runtime notifications. Survives restarts.
    pub fn subscribe(&self) -> broadcast::Receiver<SwarmNodeEvent> {
        self.events.subscribe()
    }

    /// Handle to the live endpoint, if started.
    pub fn handle(&self) -> Option<SwarmHandle> {
        self.running.as_ref().map(|r| r.handle.clone())
    }

    /// Addresses reported by the listeners when the endpoint came up.
    pub fn listen_addrs(&self) -> &[Multiaddr] {
        self.running.as_ref().map(|r| r.listen_addrs.as_slice()).unwrap_or_default()
    }

    /// Bring the endpoint up and resolve once every listener has an address.
    ///
    /// With a `swarm_key` the node only accepts and completes connections
    /// with peers holding the same key. Nothing is retried; on error the
    /// node stays stopped.
    pub async fn start(
        &mut self,
        swarm_key: Option<SwarmKey>,
    ) -> Result<Vec<Multiaddr>, SwarmNodeError> {
        if self.running.is_some() {
            return Err(SwarmNodeError::AlreadyRunning);
        }

        let protector =
            Protector::bind(swarm_key, Enforcement::from(self.config.force_private_network))?;
        let peer_id = self.local_peer_id();
        let (relay_transport, relay_client) =
            self.config.relay.then(|| relay::client::new(peer_id)).unzip();

        let transport = build_transport(
            &self.keypair,
            protector.as_ref(),
            relay_transport,
            self.config.dial_timeout,
        )?;
        let behaviour = NodeBehaviour::new(&self.keypair, &self.config, relay_client)?;

        let mut swarm = Swarm::new(
            transport,
            behaviour,
            peer_id,
            swarm::Config::with_tokio_executor()
                .with_idle_connection_timeout(self.config.idle_timeout),
        );

        let mut listeners = Vec::with_capacity(self.config.listen_addrs.len());
        for addr in &self.config.listen_addrs {
            let id = swarm
                .listen_on(addr.clone())
                .map_err(|source| SwarmNodeError::Listen {
                    addr: addr.clone(),
                    source,
                })?;
            listeners.push(id);
        }

        let book = Arc::new(AddressBook::new());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let event_loop = EventLoop::new(
            swarm,
            listeners,
            DialManager::new(book.clone()),
            commands_rx,
            self.events.clone(),
            ready_tx,
            self.config.bootstrap.clone(),
            protector.is_some(),
        );
        let task = tokio::spawn(event_loop.run());

        let listen_addrs = match ready_rx.await {
            Ok(Ok(addrs)) => addrs,
            Ok(Err(error)) => {
                drop(commands_tx);
                let _ = task.await;
                return Err(error);
            }
            Err(_) => return Err(SwarmNodeError::EventLoopGone),
        };

        info!(
            %peer_id,
            private = protector.is_some(),
            listeners = listen_addrs.len(),
            "swarm endpoint started"
        );

        let handle = SwarmHandle::new(peer_id, book, commands_tx, self.config.dial_timeout);
        self.running = Some(Running {
            handle,
            task,
            listen_addrs: listen_addrs.clone(),
        });
        Ok(listen_addrs)
    }

    /// Stop the endpoint, closing every connection. A no-op when not running.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            debug!("swarm endpoint not running, nothing to stop");
            return;
        };

        if !running.handle.stop() {
            debug!("swarm event loop already gone");
        }
        if let Err(error) = running.task.await {
            warn!(%error, "swarm event loop panicked");
        }
        info!("swarm endpoint stopped");
    }
}

impl std::fmt::Debug for SwarmNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwarmNode")
            .field("peer_id", &self.local_peer_id())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
