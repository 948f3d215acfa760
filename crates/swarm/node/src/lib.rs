//! The swarm endpoint of a keel node.
//!
//! [`SwarmNode`] owns the lifecycle: [`start`](SwarmNode::start) binds the
//! network protector, builds the transport and behaviours, listens, and
//! resolves once every listener reported an address. The swarm itself is
//! driven by a single spawned event loop; everything else talks to it through
//! a cloneable [`SwarmHandle`].
//!
//! ```text
//! SwarmNode
//! ├── start() ─ Protector::bind ─ build_transport ─ Swarm::new ─ listen_on
//! └── EventLoop (tokio task)
//!     ├── Swarm<NodeBehaviour>   identify, ping, mDNS?, Kademlia?, gossipsub?, relay client/server?
//!     ├── DialManager            deferred / immediate discovery dials
//!     └── broadcast<SwarmNodeEvent>
//! ```

mod behaviour;
mod config;
mod error;
mod event;
mod event_loop;
mod handle;
mod node;

pub use config::EndpointConfig;
pub use error::{ConnectError, SwarmNodeError};
pub use event::SwarmNodeEvent;
pub use handle::SwarmHandle;
pub use node::SwarmNode;

/// Protocol version announced over identify.
pub const PROTOCOL_VERSION: &str = "/keel/0.1.0";

/// Agent version announced over identify.
pub const AGENT_VERSION: &str = concat!("keel/", env!("CARGO_PKG_VERSION"));
