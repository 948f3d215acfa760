use std::time::Duration;

use keel_net_peers::PeerRecord;
use libp2p::{Multiaddr, PeerId};

/// Runtime notifications republished by the event loop.
#[derive(Debug, Clone)]
pub enum SwarmNodeEvent {
    ListenAddr(Multiaddr),
    PeerDiscovered(PeerRecord),
    PeerConnected(PeerRecord),
    PeerDisconnected(PeerId),
    Ping { peer: PeerId, rtt: Duration },
}
