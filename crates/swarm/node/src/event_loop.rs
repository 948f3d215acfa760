use std::{collections::HashMap, error::Error as StdError, io};

use futures::StreamExt;
use keel_net_peers::{DialManager, Dialer, PeerRecord};
use libp2p::{
    Multiaddr, PeerId, Swarm, TransportError,
    core::transport::ListenerId,
    identify, kad, mdns, ping,
    swarm::{
        ConnectionId, DialError, SwarmEvent,
        dial_opts::{DialOpts, PeerCondition},
    },
};
use metrics::counter;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::{
    ConnectError, SwarmNodeError, SwarmNodeEvent,
    behaviour::{NodeBehaviour, NodeEvent},
    config::peer_id_of,
    handle::{Command, ConnectReply},
};

pub(crate) type ReadySender = oneshot::Sender<Result<Vec<Multiaddr>, SwarmNodeError>>;

/// Drives the swarm. The only owner of [`Swarm`]; everything else goes
/// through commands.
pub(crate) struct EventLoop {
    swarm: Swarm<NodeBehaviour>,
    dials: DialManager,
    commands: mpsc::UnboundedReceiver<Command>,
    events: broadcast::Sender<SwarmNodeEvent>,
    /// Addresses reported per listener; ready once none is empty.
    listeners: HashMap<ListenerId, Vec<Multiaddr>>,
    ready: Option<ReadySender>,
    pending_connects: HashMap<ConnectionId, (Multiaddr, ConnectReply)>,
    bootstrap: Vec<Multiaddr>,
    private: bool,
}

impl EventLoop {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        swarm: Swarm<NodeBehaviour>,
        listeners: Vec<ListenerId>,
        dials: DialManager,
        commands: mpsc::UnboundedReceiver<Command>,
        events: broadcast::Sender<SwarmNodeEvent>,
        ready: ReadySender,
        bootstrap: Vec<Multiaddr>,
        private: bool,
    ) -> Self {
        Self {
            swarm,
            dials,
            commands,
            events,
            listeners: listeners.into_iter().map(|id| (id, Vec::new())).collect(),
            ready: Some(ready),
            pending_connects: HashMap::new(),
            bootstrap,
            private,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(peer_id = %self.swarm.local_peer_id(), "starting swarm event loop");

        self.announce_bootstrap();
        self.check_ready();

        loop {
            tokio::select! {
                event = self.swarm.select_next_some() => {
                    self.handle_swarm_event(event);
                }
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle_command(command) {
                        break;
                    }
                }
            }
        }

        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Err(SwarmNodeError::EventLoopGone));
        }
        info!("swarm event loop stopped");
    }

    /// Bootstrap peers count as discoveries made before the endpoint is up.
    fn announce_bootstrap(&mut self) {
        for addr in std::mem::take(&mut self.bootstrap) {
            let Some(peer) = peer_id_of(&addr) else {
                warn!(%addr, "bootstrap address has no /p2p/ component, skipping");
                continue;
            };
            if let Some(kad) = self.swarm.behaviour_mut().kad.as_mut() {
                let update = kad.add_address(&peer, addr.clone());
                trace!(%peer, ?update, "added bootstrap peer to routing table");
            }
            self.discover(peer, vec![addr]);
        }
    }

    fn check_ready(&mut self) {
        if self.ready.is_none() || self.listeners.values().any(Vec::is_empty) {
            return;
        }

        let addrs: Vec<Multiaddr> = self.listeners.values().flatten().cloned().collect();
        self.dials.on_started(&mut SwarmDialer(&mut self.swarm));

        if let Some(kad) = self.swarm.behaviour_mut().kad.as_mut()
            && let Err(error) = kad.bootstrap()
        {
            debug!(%error, "kademlia bootstrap skipped");
        }

        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Ok(addrs));
        }
    }

    fn discover(&mut self, peer: PeerId, addrs: Vec<Multiaddr>) {
        if peer == *self.swarm.local_peer_id() {
            return;
        }
        let record = self.dials.on_discovery(peer, addrs, &mut SwarmDialer(&mut self.swarm));
        trace!(%peer, addresses = record.addresses.len(), "peer discovered");
        self.emit(SwarmNodeEvent::PeerDiscovered(record));
    }

    fn emit(&self, event: SwarmNodeEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn handle_swarm_event(&mut self, event: SwarmEvent<NodeEvent>) {
        match event {
            SwarmEvent::NewListenAddr { listener_id, address } => {
                info!(%address, "listening");
                self.listeners.entry(listener_id).or_default().push(address.clone());
                self.emit(SwarmNodeEvent::ListenAddr(address));
                self.check_ready();
            }
            SwarmEvent::ExpiredListenAddr { address, .. } => {
                debug!(%address, "listen address expired");
            }
            SwarmEvent::ListenerClosed { listener_id, reason, .. } => {
                let unready = self.listeners.remove(&listener_id).is_some_and(|a| a.is_empty());
                match (unready, self.ready.take()) {
                    (true, Some(ready)) => {
                        let reason = match reason {
                            Ok(()) => "closed".to_string(),
                            Err(e) => e.to_string(),
                        };
                        let _ = ready.send(Err(SwarmNodeError::ListenerClosed { reason }));
                    }
                    (_, ready) => {
                        self.ready = ready;
                        debug!(?reason, "listener closed");
                        self.check_ready();
                    }
                }
            }
            SwarmEvent::ListenerError { error, .. } => {
                warn!(%error, "listener error");
            }
            SwarmEvent::ConnectionEstablished {
                peer_id,
                connection_id,
                endpoint,
                num_established,
                ..
            } => {
                counter!("keel_connections_established_total").increment(1);
                debug!(
                    %peer_id,
                    endpoint = %endpoint.get_remote_address(),
                    num_established,
                    "connection established"
                );

                let addr = endpoint.is_dialer().then(|| endpoint.get_remote_address().clone());
                let record = self.dials.on_connect(peer_id, addr);
                if let Some((_, reply)) = self.pending_connects.remove(&connection_id) {
                    let _ = reply.send(Ok(peer_id));
                }
                self.emit(SwarmNodeEvent::PeerConnected(record));
            }
            SwarmEvent::ConnectionClosed { peer_id, num_established, cause, .. } => {
                counter!("keel_connections_closed_total").increment(1);
                debug!(%peer_id, num_established, ?cause, "connection closed");
                if num_established == 0 {
                    self.dials.on_disconnect(&peer_id);
                    self.emit(SwarmNodeEvent::PeerDisconnected(peer_id));
                }
            }
            SwarmEvent::OutgoingConnectionError { connection_id, peer_id, error } => {
                counter!("keel_connect_failures_total").increment(1);
                match self.pending_connects.remove(&connection_id) {
                    Some((addr, reply)) => {
                        let error = self.classify(addr, &error);
                        debug!(%error, "connect failed");
                        let _ = reply.send(Err(error));
                    }
                    None => debug!(?peer_id, %error, "outgoing connection failed"),
                }
            }
            SwarmEvent::IncomingConnectionError { send_back_addr, error, .. } => {
                debug!(%send_back_addr, %error, "incoming connection failed");
            }
            SwarmEvent::Behaviour(event) => self.handle_behaviour_event(event),
            _ => {}
        }
    }

    fn handle_behaviour_event(&mut self, event: NodeEvent) {
        match event {
            NodeEvent::Identify(event) => {
                if let identify::Event::Received { peer_id, info, .. } = *event {
                    debug!(
                        %peer_id,
                        protocol_version = %info.protocol_version,
                        agent_version = %info.agent_version,
                        "identified peer"
                    );
                    if let Some(kad) = self.swarm.behaviour_mut().kad.as_mut() {
                        for addr in &info.listen_addrs {
                            kad.add_address(&peer_id, addr.clone());
                        }
                    }
                    self.discover(peer_id, info.listen_addrs);
                }
            }
            NodeEvent::Ping(ping::Event { peer, result, .. }) => match result {
                Ok(rtt) => {
                    trace!(%peer, ?rtt, "ping");
                    self.emit(SwarmNodeEvent::Ping { peer, rtt });
                }
                Err(error) => debug!(%peer, %error, "ping failed"),
            },
            NodeEvent::Mdns(mdns::Event::Discovered(found)) => {
                for (peer, addr) in found {
                    self.discover(peer, vec![addr]);
                }
            }
            NodeEvent::Mdns(mdns::Event::Expired(expired)) => {
                trace!(count = expired.len(), "mdns records expired");
            }
            NodeEvent::Kad(event) => match *event {
                kad::Event::RoutingUpdated { peer, addresses, .. } => {
                    self.discover(peer, addresses.into_vec());
                }
                other => trace!(event = ?other, "kademlia"),
            },
            NodeEvent::Gossipsub(event) => trace!(?event, "gossipsub"),
            NodeEvent::Relay(event) => debug!(?event, "relay"),
            NodeEvent::RelayClient(event) => debug!(?event, "relay client"),
        }
    }

    /// Returns `false` once the loop should exit.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Connect { addr, reply } => {
                counter!("keel_dials_total").increment(1);
                let opts = DialOpts::from(addr.clone());
                let connection_id = opts.connection_id();
                match self.swarm.dial(opts) {
                    Ok(()) => {
                        self.pending_connects.insert(connection_id, (addr, reply));
                    }
                    Err(error) => {
                        let _ = reply.send(Err(self.classify(addr, &error)));
                    }
                }
            }
            Command::Disconnect { addr, reply } => {
                let peer = peer_id_of(&addr).or_else(|| self.dials.book().find_by_address(&addr));
                let result = match peer {
                    Some(peer) if self.swarm.disconnect_peer_id(peer).is_ok() => Ok(peer),
                    _ => Err(ConnectError::NotConnected(addr)),
                };
                let _ = reply.send(result);
            }
            Command::Discovered { peer, addrs } => self.discover(peer, addrs),
            Command::Stop => return false,
        }
        true
    }

    /// On a private node, a transport failure that is not plain unreachability
    /// is the protector handshake failing.
    fn classify(&self, addr: Multiaddr, error: &DialError) -> ConnectError {
        match error {
            DialError::Transport(errors) => {
                let reason = errors
                    .iter()
                    .map(|(a, e)| format!("{a}: {}", describe(e)))
                    .collect::<Vec<_>>()
                    .join("; ");
                let unreachable = errors.iter().all(|(_, e)| match e {
                    TransportError::MultiaddrNotSupported(_) => true,
                    TransportError::Other(e) => is_unreachable(e),
                });
                if self.private && !unreachable {
                    ConnectError::ProtectorHandshakeFailed { addr, reason }
                } else {
                    ConnectError::Transport { addr, reason }
                }
            }
            DialError::Denied { cause, .. } => ConnectError::Denied {
                addr,
                reason: describe(cause),
            },
            other => ConnectError::Transport {
                addr,
                reason: describe(other),
            },
        }
    }
}

/// Every error in the chain, looking inside custom `io::Error`s whose
/// `source()` skips the wrapped error.
fn error_chain<'a>(error: &'a (dyn StdError + 'static)) -> Vec<&'a (dyn StdError + 'static)> {
    let mut chain = Vec::new();
    let mut current = Some(error);
    while let Some(err) = current {
        chain.push(err);
        current = match err.downcast_ref::<io::Error>().and_then(io::Error::get_ref) {
            Some(inner) => Some(inner as &(dyn StdError + 'static)),
            None => err.source(),
        };
    }
    chain
}

fn is_unreachable(error: &io::Error) -> bool {
    error_chain(error).iter().any(|err| {
        err.downcast_ref::<io::Error>().is_some_and(|io_err| {
            matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::AddrNotAvailable
                    | io::ErrorKind::HostUnreachable
                    | io::ErrorKind::NetworkUnreachable
            )
        })
    })
}

/// Non-empty messages along the error chain, `Debug` when none has one.
fn describe(error: &(dyn StdError + 'static)) -> String {
    let mut parts: Vec<String> = Vec::new();
    for err in error_chain(error) {
        let message = err.to_string();
        if !message.is_empty() && !parts.iter().any(|p| p.ends_with(&message)) {
            parts.push(message);
        }
    }
    if parts.is_empty() {
        format!("{error:?}")
    } else {
        parts.join(": ")
    }
}

/// Dials straight into the swarm the loop owns.
struct SwarmDialer<'a>(&'a mut Swarm<NodeBehaviour>);

impl Dialer for SwarmDialer<'_> {
    type Error = DialError;

    fn dial(&mut self, peer: &PeerRecord) -> Result<(), Self::Error> {
        self.0.dial(
            DialOpts::peer_id(peer.id)
                .addresses(peer.addresses.clone())
                .condition(PeerCondition::DisconnectedAndNotDialing)
                .build(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_connections_are_unreachable() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(is_unreachable(&refused));

        let wrapped = io::Error::other(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(is_unreachable(&wrapped));

        let handshake = io::Error::other("decryption failed");
        assert!(!is_unreachable(&handshake));
    }

    #[derive(Debug)]
    struct Silent(io::Error);

    impl std::fmt::Display for Silent {
        fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            Ok(())
        }
    }

    impl StdError for Silent {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn describe_reaches_past_empty_messages() {
        let error = io::Error::other(Silent(io::Error::other("pnet handshake failed")));
        assert_eq!(describe(&error), "pnet handshake failed");

        let transport: TransportError<io::Error> = TransportError::Other(error);
        assert_eq!(describe(&transport), "pnet handshake failed");
    }

    #[derive(Debug)]
    struct Blank;

    impl std::fmt::Display for Blank {
        fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            Ok(())
        }
    }

    impl StdError for Blank {}

    #[test]
    fn describe_falls_back_to_debug() {
        assert_eq!(describe(&Blank), "Blank");
    }
}
