//! Peer bookkeeping shared between the swarm event loop and query handles.
//!
//! - [`AddressBook`]: every peer the node heard of, keyed by [`PeerId`](libp2p::PeerId)
//! - [`DialManager`]: turns discoveries into dials, holding them back until the
//!   endpoint is started

mod book;
mod dial;

pub use book::{AddressBook, PeerRecord};
pub use dial::{DialManager, Dialer};
