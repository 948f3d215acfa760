//! Behaviour composition for the swarm endpoint.
//!
//! Identify and ping are always on. Everything else is toggled by
//! [`EndpointConfig`]. The relay client comes paired with its transport, so it
//! is created by the caller with [`relay::client::new`].

use libp2p::{
    PeerId, gossipsub, identify,
    identity::Keypair,
    kad::{self, store::MemoryStore},
    mdns, ping, relay,
    swarm::{NetworkBehaviour, behaviour::toggle::Toggle},
};
use tracing::{info, warn};

use crate::{AGENT_VERSION, EndpointConfig, PROTOCOL_VERSION, SwarmNodeError};

#[derive(NetworkBehaviour)]
#[behaviour(to_swarm = "NodeEvent")]
pub(crate) struct NodeBehaviour {
    pub(crate) identify: identify::Behaviour,
    pub(crate) ping: ping::Behaviour,
    pub(crate) mdns: Toggle<mdns::tokio::Behaviour>,
    pub(crate) kad: Toggle<kad::Behaviour<MemoryStore>>,
    pub(crate) gossipsub: Toggle<gossipsub::Behaviour>,
    pub(crate) relay: Toggle<relay::Behaviour>,
    pub(crate) relay_client: Toggle<relay::client::Behaviour>,
}

impl NodeBehaviour {
    pub(crate) fn new(
        keypair: &Keypair,
        config: &EndpointConfig,
        relay_client: Option<relay::client::Behaviour>,
    ) -> Result<Self, SwarmNodeError> {
        let peer_id = keypair.public().to_peer_id();

        let identify = identify::Behaviour::new(
            identify::Config::new(PROTOCOL_VERSION.to_string(), keypair.public())
                .with_agent_version(AGENT_VERSION.to_string()),
        );
        let ping = ping::Behaviour::new(ping::Config::new().with_interval(config.ping_interval));

        let mdns = config
            .mdns
            .then(|| mdns::tokio::Behaviour::new(mdns::Config::default(), peer_id))
            .transpose()
            .map_err(|e| SwarmNodeError::Behaviour(format!("mdns: {e}")))?;

        let kad = config.dht.then(|| {
            let mut kad = kad::Behaviour::new(peer_id, MemoryStore::new(peer_id));
            kad.set_mode(Some(kad::Mode::Server));
            kad
        });

        let gossipsub = config
            .pubsub
            .then(|| {
                gossipsub::Behaviour::new(
                    gossipsub::MessageAuthenticity::Signed(keypair.clone()),
                    gossipsub::Config::default(),
                )
            })
            .transpose()
            .map_err(|e| SwarmNodeError::Behaviour(format!("gossipsub: {e}")))?;

        let relay = relay_server(peer_id, config);

        if config.webrtc_star {
            warn!("webRTC-star discovery is not available, ignoring Discovery.webRTCStar.Enabled");
        }

        Ok(Self {
            identify,
            ping,
            mdns: mdns.into(),
            kad: kad.into(),
            gossipsub: gossipsub.into(),
            relay: relay.into(),
            relay_client: relay_client.into(),
        })
    }
}

fn relay_server(peer_id: PeerId, config: &EndpointConfig) -> Option<relay::Behaviour> {
    if !config.relay_server() {
        return None;
    }
    if config.relay_hop_active {
        info!("relay.hop.active requested, relaying only between already reachable peers");
    }
    Some(relay::Behaviour::new(peer_id, relay::Config::default()))
}

#[derive(Debug)]
pub(crate) enum NodeEvent {
    Identify(Box<identify::Event>),
    Ping(ping::Event),
    Mdns(mdns::Event),
    Kad(Box<kad::Event>),
    Gossipsub(Box<gossipsub::Event>),
    Relay(Box<relay::Event>),
    RelayClient(Box<relay::client::Event>),
}

impl From<identify::Event> for NodeEvent {
    fn from(event: identify::Event) -> Self {
        NodeEvent::Identify(Box::new(event))
    }
}

impl From<ping::Event> for NodeEvent {
    fn from(event: ping::Event) -> Self {
        NodeEvent::Ping(event)
    }
}

impl From<mdns::Event> for NodeEvent {
    fn from(event: mdns::Event) -> Self {
        NodeEvent::Mdns(event)
    }
}

impl From<kad::Event> for NodeEvent {
    fn from(event: kad::Event) -> Self {
        NodeEvent::Kad(Box::new(event))
    }
}

impl From<gossipsub::Event> for NodeEvent {
    fn from(event: gossipsub::Event) -> Self {
        NodeEvent::Gossipsub(Box::new(event))
    }
}

impl From<relay::Event> for NodeEvent {
    fn from(event: relay::Event) -> Self {
        NodeEvent::Relay(Box::new(event))
    }
}

impl From<relay::client::Event> for NodeEvent {
    fn from(event: relay::client::Event) -> Self {
        NodeEvent::RelayClient(Box::new(event))
    }
}

#[cfg(test)]
mod tests {
    use keel_config::{Config, SwarmOptions};

    use super::*;

    fn behaviour_for(overrides: &[(&str, bool)]) -> NodeBehaviour {
        let mut patch = Config::new();
        for (key, value) in overrides {
            patch.set(key, *value).unwrap();
        }
        let options = SwarmOptions::resolve(&Config::new(), &patch).unwrap();
        let config = EndpointConfig::try_from(&options).unwrap().with_mdns(false);

        let keypair = Keypair::generate_ed25519();
        let client = config
            .relay
            .then(|| relay::client::new(keypair.public().to_peer_id()).1);
        NodeBehaviour::new(&keypair, &config, client).unwrap()
    }

    #[test]
    fn relay_enabled_alone_accepts_relayed_connections() {
        let behaviour = behaviour_for(&[("relay.enabled", true)]);
        assert!(behaviour.relay_client.is_enabled());
        assert!(!behaviour.relay.is_enabled());
    }

    #[test]
    fn relay_hop_also_serves_circuits() {
        let behaviour = behaviour_for(&[("relay.enabled", true), ("relay.hop.enabled", true)]);
        assert!(behaviour.relay_client.is_enabled());
        assert!(behaviour.relay.is_enabled());
    }

    #[test]
    fn optional_behaviours_are_off_by_default() {
        let behaviour = behaviour_for(&[]);
        assert!(!behaviour.relay_client.is_enabled());
        assert!(!behaviour.relay.is_enabled());
        assert!(!behaviour.kad.is_enabled());
        assert!(!behaviour.gossipsub.is_enabled());
    }
}
