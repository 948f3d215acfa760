//! Configuration handling for keel nodes.
//!
//! The repository persists one TOML document ([`Config`]). Effective endpoint
//! options ([`SwarmOptions`]) are produced by layering, in increasing
//! precedence:
//!
//! ```text
//! defaults (SwarmOptions::default())
//!   └── persisted repository config
//!         └── caller overrides
//! ```
//!
//! Every layer is merged with the same rule, see [`deep_merge`].

mod document;
mod error;
mod merge;
mod options;

pub use document::Config;
pub use error::ConfigError;
pub use merge::{deep_merge, resolve};
pub use options::{
    AddressesOptions, DEFAULT_DIAL_TIMEOUT_MS, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_LISTEN_ADDR,
    DEFAULT_PING_INTERVAL_MS, DiscoveryOptions, EndpointOptions, ExperimentalOptions, HopOptions,
    RelayOptions, SwarmOptions, ToggleOptions,
};

/// Re-exported so callers can build patches without depending on `toml`.
pub use toml::{Table, Value};
