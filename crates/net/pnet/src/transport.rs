use std::time::Duration;

use either::Either;
use libp2p::{
    PeerId, Transport,
    core::{
        muxing::StreamMuxerBox,
        transport::{Boxed, OptionalTransport},
        upgrade::Version,
    },
    dns,
    identity::Keypair,
    noise, relay, tcp, yamux,
};
use tracing::warn;

use crate::{Protector, ProtectorError};

/// Build the swarm transport, optionally guarded by a [`Protector`].
///
/// The protector handshake runs on the raw socket, so a key mismatch surfaces
/// as a failed connection upgrade rather than a protocol error. Relayed
/// circuits go through the same handshake as direct TCP connections.
pub fn build_transport(
    keypair: &Keypair,
    protector: Option<&Protector>,
    relay_client: Option<relay::client::Transport>,
    upgrade_timeout: Duration,
) -> Result<Boxed<(PeerId, StreamMuxerBox)>, ProtectorError> {
    let noise =
        noise::Config::new(keypair).map_err(|e| ProtectorError::Transport(e.to_string()))?;

    let dns = match dns::tokio::Transport::system(tcp_transport()) {
        Ok(transport) => transport,
        Err(error) => {
            warn!(%error, "system resolver unavailable, falling back to default resolver");
            dns::tokio::Transport::custom(
                tcp_transport(),
                dns::ResolverConfig::default(),
                dns::ResolverOpts::default(),
            )
        }
    };

    let relay = match relay_client {
        Some(client) => OptionalTransport::some(client),
        None => OptionalTransport::none(),
    };
    let base = dns.or_transport(relay);

    let raw = match protector.map(Protector::config) {
        Some(pnet) => Either::Left(base.and_then(move |socket, _| pnet.handshake(socket))),
        None => Either::Right(base),
    };

    Ok(raw
        .upgrade(Version::V1)
        .authenticate(noise)
        .multiplex(yamux::Config::default())
        .timeout(upgrade_timeout)
        .boxed())
}

fn tcp_transport() -> tcp::tokio::Transport {
    tcp::tokio::Transport::new(tcp::Config::default().nodelay(true))
}
