use std::{sync::Arc, time::Duration};

use keel_net_peers::{AddressBook, PeerRecord};
use libp2p::{Multiaddr, PeerId};
use tokio::sync::{mpsc, oneshot};

use crate::{ConnectError, SwarmNodeError};

pub(crate) type ConnectReply = oneshot::Sender<Result<PeerId, ConnectError>>;

/// Requests into the event loop.
#[derive(Debug)]
pub(crate) enum Command {
    Connect { addr: Multiaddr, reply: ConnectReply },
    Disconnect {
        addr: Multiaddr,
        reply: oneshot::Sender<Result<PeerId, ConnectError>>,
    },
    Discovered { peer: PeerId, addrs: Vec<Multiaddr> },
    Stop,
}

/// Cloneable access to a running endpoint.
#[derive(Debug, Clone)]
pub struct SwarmHandle {
    local_peer_id: PeerId,
    book: Arc<AddressBook>,
    commands: mpsc::UnboundedSender<Command>,
    dial_timeout: Duration,
}

impl SwarmHandle {
    pub(crate) fn new(
        local_peer_id: PeerId,
        book: Arc<AddressBook>,
        commands: mpsc::UnboundedSender<Command>,
        dial_timeout: Duration,
    ) -> Self {
        Self {
            local_peer_id,
            book,
            commands,
            dial_timeout,
        }
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    /// Snapshot of the address book.
    pub fn peers(&self) -> Vec<PeerRecord> {
        self.book.peers()
    }

    pub fn connected_peers(&self) -> Vec<PeerRecord> {
        self.book.connected()
    }

    /// Dial `addr` and wait for the connection, at most the dial timeout.
    ///
    /// Peers on another private network, or on none while this node is
    /// private, resolve as an error rather than hanging.
    pub async fn connect(&self, addr: Multiaddr) -> Result<PeerId, ConnectError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Connect {
                addr: addr.clone(),
                reply,
            })
            .map_err(|_| ConnectError::NotRunning)?;

        match tokio::time::timeout(self.dial_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ConnectError::NotRunning),
            Err(_) => Err(ConnectError::DialTimeout {
                addr,
                timeout: self.dial_timeout,
            }),
        }
    }

    /// Close every connection to the peer behind `addr`.
    ///
    /// The peer is taken from the `/p2p/` component when present, otherwise
    /// looked up in the address book. Returns the disconnected peer.
    pub async fn disconnect(&self, addr: Multiaddr) -> Result<PeerId, ConnectError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Disconnect { addr, reply })
            .map_err(|_| ConnectError::NotRunning)?;
        rx.await.map_err(|_| ConnectError::NotRunning)?
    }

    /// Report a peer found by a discovery source outside the swarm.
    pub fn discovered(&self, peer: PeerId, addrs: Vec<Multiaddr>) -> Result<(), SwarmNodeError> {
        self.commands
            .send(Command::Discovered { peer, addrs })
            .map_err(|_| SwarmNodeError::NotRunning)
    }

    pub(crate) fn stop(&self) -> bool {
        self.commands.send(Command::Stop).is_ok()
    }
}
