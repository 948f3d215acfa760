use libp2p::Multiaddr;

use crate::BootErrorKind;

/// Lifecycle notifications. Each boot call publishes exactly one of
/// `Ready` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Ready,
    Failed { kind: BootErrorKind, message: String },
    Started { listen_addrs: Vec<Multiaddr> },
    Stopped,
}
