use std::{io, time::Duration};

use keel_net_pnet::ProtectorError;
use libp2p::{Multiaddr, TransportError};
use thiserror::Error;

/// Errors bringing the endpoint up or down.
#[derive(Debug, Error)]
pub enum SwarmNodeError {
    #[error("swarm endpoint is already running")]
    AlreadyRunning,

    #[error("swarm endpoint is not running")]
    NotRunning,

    #[error("invalid multiaddr {addr:?}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: libp2p::multiaddr::Error,
    },

    #[error(transparent)]
    Protector(#[from] ProtectorError),

    #[error("failed to build network behaviour: {0}")]
    Behaviour(String),

    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: Multiaddr,
        #[source]
        source: TransportError<io::Error>,
    },

    #[error("listener closed before reporting an address: {reason}")]
    ListenerClosed { reason: String },

    #[error("swarm event loop terminated")]
    EventLoopGone,
}

/// Outcome of a single connect or disconnect request. Never fatal to the node.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("private network handshake with {addr} failed: {reason}")]
    ProtectorHandshakeFailed { addr: Multiaddr, reason: String },

    #[error("connect to {addr} timed out after {timeout:?}")]
    DialTimeout { addr: Multiaddr, timeout: Duration },

    #[error("connect to {addr} failed: {reason}")]
    Transport { addr: Multiaddr, reason: String },

    #[error("dial to {addr} was denied: {reason}")]
    Denied { addr: Multiaddr, reason: String },

    #[error("no connected peer at {0}")]
    NotConnected(Multiaddr),

    #[error("swarm endpoint is not running")]
    NotRunning,
}
