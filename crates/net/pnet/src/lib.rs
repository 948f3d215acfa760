//! Private network binding for the swarm transport.
//!
//! A node holding a [`SwarmKey`] only talks to nodes holding the byte-identical
//! key: every raw connection is run through the libp2p pre-shared-key
//! handshake before any other protocol. A node without a key is public and
//! never completes a connection with a private one.
//!
//! ```text
//! DNS(TCP) | relay circuit
//!   └── PSK protector (private networks only)
//!         └── Noise
//!               └── Yamux
//! ```

mod error;
mod key;
mod protector;
mod transport;

pub use error::ProtectorError;
pub use key::{SWARM_KEY_HEADER, SWARM_KEY_LEN, SwarmKey};
pub use protector::{Enforcement, Protector};
pub use transport::build_transport;
