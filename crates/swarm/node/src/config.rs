use std::{net::Ipv4Addr, time::Duration};

use keel_config::{
    DEFAULT_DIAL_TIMEOUT_MS, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_PING_INTERVAL_MS, SwarmOptions,
};
use libp2p::{Multiaddr, PeerId, multiaddr::Protocol};

use crate::SwarmNodeError;

/// Endpoint configuration with every address parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub listen_addrs: Vec<Multiaddr>,
    pub bootstrap: Vec<Multiaddr>,
    pub mdns: bool,
    /// No libp2p transport exists for webRTC-star; only logged.
    pub webrtc_star: bool,
    pub dht: bool,
    pub pubsub: bool,
    pub relay: bool,
    pub relay_hop: bool,
    pub relay_hop_active: bool,
    /// Bound on a single connect, protector handshake included.
    pub dial_timeout: Duration,
    pub idle_timeout: Duration,
    pub ping_interval: Duration,
    pub force_private_network: bool,
}

impl EndpointConfig {
    /// Whether this node forwards traffic for others.
    pub fn relay_server(&self) -> bool {
        self.relay && self.relay_hop
    }

    pub fn with_listen_addrs(mut self, addrs: Vec<Multiaddr>) -> Self {
        self.listen_addrs = addrs;
        self
    }

    pub fn with_bootstrap(mut self, addrs: Vec<Multiaddr>) -> Self {
        self.bootstrap = addrs;
        self
    }

    pub fn with_relay(mut self, enabled: bool) -> Self {
        self.relay = enabled;
        self
    }

    pub fn with_mdns(mut self, enabled: bool) -> Self {
        self.mdns = enabled;
        self
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_force_private_network(mut self, force: bool) -> Self {
        self.force_private_network = force;
        self
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            listen_addrs: vec![
                Multiaddr::empty()
                    .with(Protocol::Ip4(Ipv4Addr::UNSPECIFIED))
                    .with(Protocol::Tcp(4001)),
            ],
            bootstrap: Vec::new(),
            mdns: true,
            webrtc_star: false,
            dht: false,
            pubsub: false,
            relay: false,
            relay_hop: false,
            relay_hop_active: false,
            dial_timeout: Duration::from_millis(DEFAULT_DIAL_TIMEOUT_MS),
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
            ping_interval: Duration::from_millis(DEFAULT_PING_INTERVAL_MS),
            force_private_network: false,
        }
    }
}

impl TryFrom<&SwarmOptions> for EndpointConfig {
    type Error = SwarmNodeError;

    fn try_from(options: &SwarmOptions) -> Result<Self, Self::Error> {
        Ok(Self {
            listen_addrs: parse_addrs(&options.addresses.swarm)?,
            bootstrap: parse_addrs(&options.bootstrap)?,
            mdns: options.discovery.mdns.enabled,
            webrtc_star: options.discovery.webrtc_star.enabled,
            dht: options.experimental.dht,
            pubsub: options.experimental.pubsub,
            relay: options.relay.enabled,
            relay_hop: options.relay.hop.enabled,
            relay_hop_active: options.relay.hop.active,
            dial_timeout: Duration::from_millis(options.swarm.dial_timeout_ms),
            idle_timeout: Duration::from_millis(options.swarm.idle_timeout_ms),
            ping_interval: Duration::from_millis(options.swarm.ping_interval_ms),
            force_private_network: options.swarm.force_private_network,
        })
    }
}

fn parse_addrs(addrs: &[String]) -> Result<Vec<Multiaddr>, SwarmNodeError> {
    addrs
        .iter()
        .map(|addr| {
            addr.parse().map_err(|source| SwarmNodeError::InvalidAddress {
                addr: addr.clone(),
                source,
            })
        })
        .collect()
}

/// The `/p2p/` component of an address, if any.
pub(crate) fn peer_id_of(addr: &Multiaddr) -> Option<PeerId> {
    addr.iter().find_map(|protocol| match protocol {
        Protocol::P2p(peer) => Some(peer),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use keel_config::{Config, DEFAULT_LISTEN_ADDR};

    use super::*;

    #[test]
    fn defaults_match_resolved_options() {
        let options = SwarmOptions::default();
        let config = EndpointConfig::try_from(&options).unwrap();
        assert_eq!(config, EndpointConfig::default());
        assert_eq!(config.listen_addrs, vec![DEFAULT_LISTEN_ADDR.parse::<Multiaddr>().unwrap()]);
    }

    #[test]
    fn options_map_onto_endpoint() {
        let mut overrides = Config::new();
        overrides.set("relay.enabled", true).unwrap();
        overrides.set("relay.hop.enabled", true).unwrap();
        overrides.set("EXPERIMENTAL.dht", true).unwrap();
        overrides.set("Swarm.DialTimeoutMs", 250i64).unwrap();

        let options = SwarmOptions::resolve(&Config::new(), &overrides).unwrap();
        let config = EndpointConfig::try_from(&options).unwrap();

        assert!(config.relay_server());
        assert!(config.dht);
        assert!(!config.pubsub);
        assert_eq!(config.dial_timeout, Duration::from_millis(250));
    }

    #[test]
    fn invalid_bootstrap_address_is_rejected() {
        let options = SwarmOptions {
            bootstrap: vec!["not-a-multiaddr".into()],
            ..Default::default()
        };
        assert_matches!(
            EndpointConfig::try_from(&options),
            Err(SwarmNodeError::InvalidAddress { addr, .. }) if addr == "not-a-multiaddr"
        );
    }

    #[test]
    fn extracts_peer_id_component() {
        let peer = PeerId::random();
        let addr: Multiaddr = format!("/ip4/10.0.0.1/tcp/4001/p2p/{peer}").parse().unwrap();
        assert_eq!(peer_id_of(&addr), Some(peer));
        assert_eq!(peer_id_of(&"/ip4/10.0.0.1/tcp/4001".parse().unwrap()), None);
    }
}
