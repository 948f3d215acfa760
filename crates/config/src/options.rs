//! Typed view of the options the swarm endpoint consumes.
//!
//! Key names follow the persisted document (`Discovery.MDNS.Enabled`,
//! `relay.hop.active`, `EXPERIMENTAL.dht`, ...). Every field has a default, so
//! a document missing any key still resolves.

use serde::{Deserialize, Serialize};

use crate::{Config, ConfigError, resolve};

/// Default TCP listen address.
pub const DEFAULT_LISTEN_ADDR: &str = "/ip4/0.0.0.0/tcp/4001";

/// Default bound on a single dial, PSK handshake included.
pub const DEFAULT_DIAL_TIMEOUT_MS: u64 = 15_000;

/// Default idle connection timeout.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 60_000;

/// Default ping interval.
pub const DEFAULT_PING_INTERVAL_MS: u64 = 15_000;

/// Effective endpoint options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmOptions {
    #[serde(rename = "Addresses")]
    pub addresses: AddressesOptions,

    #[serde(rename = "Discovery")]
    pub discovery: DiscoveryOptions,

    /// Ordered list of bootstrap peer multiaddrs.
    #[serde(rename = "Bootstrap")]
    pub bootstrap: Vec<String>,

    pub relay: RelayOptions,

    #[serde(rename = "EXPERIMENTAL")]
    pub experimental: ExperimentalOptions,

    #[serde(rename = "Swarm")]
    pub swarm: EndpointOptions,
}

impl SwarmOptions {
    /// Resolve options from the persisted document and caller overrides,
    /// falling back to [`SwarmOptions::default`] for anything neither sets.
    pub fn resolve(persisted: &Config, overrides: &Config) -> Result<Self, ConfigError> {
        let defaults = Config::from_serialize(&Self::default())?;
        resolve(&defaults, persisted, overrides)
            .to_options()
            .map_err(|e| ConfigError::Invalid {
                section: "swarm options",
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressesOptions {
    /// Listen multiaddrs.
    #[serde(rename = "Swarm")]
    pub swarm: Vec<String>,
}

impl Default for AddressesOptions {
    fn default() -> Self {
        Self {
            swarm: vec![DEFAULT_LISTEN_ADDR.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
    /// Local-broadcast discovery.
    #[serde(rename = "MDNS")]
    pub mdns: ToggleOptions,

    /// Relay-protocol (webRTC-star) discovery.
    #[serde(rename = "webRTCStar")]
    pub webrtc_star: ToggleOptions,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            mdns: ToggleOptions { enabled: true },
            webrtc_star: ToggleOptions { enabled: false },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleOptions {
    #[serde(rename = "Enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayOptions {
    /// Accept relayed connections.
    pub enabled: bool,
    pub hop: HopOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HopOptions {
    /// Forward traffic for other peers.
    pub enabled: bool,
    /// Dial the destination on behalf of the source instead of only
    /// relaying to already connected peers.
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentalOptions {
    /// Content routing (Kademlia).
    pub dht: bool,
    /// Publish-subscribe (gossipsub).
    pub pubsub: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointOptions {
    #[serde(rename = "DialTimeoutMs")]
    pub dial_timeout_ms: u64,

    #[serde(rename = "IdleTimeoutMs")]
    pub idle_timeout_ms: u64,

    #[serde(rename = "PingIntervalMs")]
    pub ping_interval_ms: u64,

    /// Refuse to start without a swarm key.
    #[serde(rename = "ForcePrivateNetwork")]
    pub force_private_network: bool,
}

impl Default for EndpointOptions {
    fn default() -> Self {
        Self {
            dial_timeout_ms: DEFAULT_DIAL_TIMEOUT_MS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            ping_interval_ms: DEFAULT_PING_INTERVAL_MS,
            force_private_network: false,
        }
    }
}
