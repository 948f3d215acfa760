use std::{fmt, sync::Arc};

use libp2p::{Multiaddr, PeerId};
use metrics::counter;
use tracing::{debug, trace};

use crate::{AddressBook, PeerRecord};

/// Something that can start an outbound dial.
///
/// Dialing only starts the attempt; the outcome arrives later as a connection
/// event.
pub trait Dialer {
    type Error: fmt::Display;

    fn dial(&mut self, peer: &PeerRecord) -> Result<(), Self::Error>;
}

/// Schedules dials for discovered peers.
///
/// Before the endpoint is started, discoveries only land in the address book
/// and a pending list. The first [`on_started`](Self::on_started) dials what is
/// still pending, once; afterwards every discovery is dialed immediately.
/// Dial failures are logged and dropped, never retried.
#[derive(Debug)]
pub struct DialManager {
    book: Arc<AddressBook>,
    started: bool,
    pending: Vec<PeerId>,
}

impl DialManager {
    pub fn new(book: Arc<AddressBook>) -> Self {
        Self {
            book,
            started: false,
            pending: Vec::new(),
        }
    }

    pub fn book(&self) -> &Arc<AddressBook> {
        &self.book
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Peers waiting for the started transition, in discovery order.
    pub fn pending(&self) -> &[PeerId] {
        &self.pending
    }

    pub fn on_discovery<D: Dialer>(
        &mut self,
        id: PeerId,
        addresses: impl IntoIterator<Item = Multiaddr>,
        dialer: &mut D,
    ) -> PeerRecord {
        counter!("keel_peer_discoveries_total").increment(1);
        let record = self.book.upsert(id, addresses);

        if self.started {
            if !record.connected {
                dial(dialer, &record);
            }
        } else if !self.pending.contains(&id) {
            trace!(peer = %id, "endpoint not started, deferring dial");
            self.pending.push(id);
        }

        record
    }

    /// Flip to started and dial every peer still pending. Returns the number of
    /// dials attempted; zero on every call after the first.
    pub fn on_started<D: Dialer>(&mut self, dialer: &mut D) -> usize {
        if self.started {
            return 0;
        }
        self.started = true;

        let mut dialed = 0;
        for id in std::mem::take(&mut self.pending) {
            let Some(record) = self.book.get(&id) else { continue };
            if record.connected {
                continue;
            }
            dial(dialer, &record);
            dialed += 1;
        }

        debug!(dialed, "replayed deferred discoveries");
        dialed
    }

    pub fn on_connect(&mut self, id: PeerId, addr: Option<Multiaddr>) -> PeerRecord {
        self.pending.retain(|p| *p != id);
        self.book.mark_connected(id, addr)
    }

    pub fn on_disconnect(&mut self, id: &PeerId) {
        self.book.mark_disconnected(id);
    }
}

fn dial<D: Dialer>(dialer: &mut D, record: &PeerRecord) {
    counter!("keel_dials_total").increment(1);
    if let Err(error) = dialer.dial(record) {
        counter!("keel_dial_failures_total").increment(1);
        debug!(peer = %record.id, %error, "dial failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingDialer {
        dialed: Vec<PeerId>,
        fail: bool,
    }

    impl Dialer for RecordingDialer {
        type Error = &'static str;

        fn dial(&mut self, peer: &PeerRecord) -> Result<(), Self::Error> {
            self.dialed.push(peer.id);
            if self.fail { Err("unreachable") } else { Ok(()) }
        }
    }

    fn addr() -> Multiaddr {
        "/ip4/10.0.0.1/tcp/4001".parse().unwrap()
    }

    #[test]
    fn discoveries_before_start_are_deferred_then_replayed_once() {
        let mut manager = DialManager::new(Arc::new(AddressBook::new()));
        let mut dialer = RecordingDialer::default();
        let a = PeerId::random();
        let b = PeerId::random();

        manager.on_discovery(a, [addr()], &mut dialer);
        manager.on_discovery(b, [addr()], &mut dialer);
        manager.on_discovery(a, [addr()], &mut dialer);
        assert!(dialer.dialed.is_empty());
        assert_eq!(manager.pending(), &[a, b]);

        assert_eq!(manager.on_started(&mut dialer), 2);
        assert_eq!(dialer.dialed, vec![a, b]);

        assert_eq!(manager.on_started(&mut dialer), 0);
        assert_eq!(dialer.dialed.len(), 2);
        assert!(manager.pending().is_empty());
    }

    #[test]
    fn discoveries_after_start_are_dialed_immediately() {
        let mut manager = DialManager::new(Arc::new(AddressBook::new()));
        let mut dialer = RecordingDialer::default();
        manager.on_started(&mut dialer);

        let peer = PeerId::random();
        manager.on_discovery(peer, [addr()], &mut dialer);
        assert_eq!(dialer.dialed, vec![peer]);
    }

    #[test]
    fn connected_peers_are_not_redialed() {
        let mut manager = DialManager::new(Arc::new(AddressBook::new()));
        let mut dialer = RecordingDialer::default();
        let peer = PeerId::random();

        manager.on_discovery(peer, [addr()], &mut dialer);
        manager.on_connect(peer, None);
        assert_eq!(manager.on_started(&mut dialer), 0);

        manager.on_discovery(peer, [addr()], &mut dialer);
        assert!(dialer.dialed.is_empty());

        manager.on_disconnect(&peer);
        manager.on_discovery(peer, [addr()], &mut dialer);
        assert_eq!(dialer.dialed, vec![peer]);
    }

    #[test]
    fn dial_failures_are_swallowed() {
        let mut manager = DialManager::new(Arc::new(AddressBook::new()));
        let mut dialer = RecordingDialer {
            fail: true,
            ..Default::default()
        };
        manager.on_started(&mut dialer);

        let peer = PeerId::random();
        let record = manager.on_discovery(peer, [addr()], &mut dialer);
        assert_eq!(record.addresses, vec![addr()]);
        assert_eq!(manager.book().len(), 1);
        assert_eq!(dialer.dialed, vec![peer]);
    }

    #[test]
    fn dials_and_failures_are_counted() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let mut manager = DialManager::new(Arc::new(AddressBook::new()));
            let mut dialer = RecordingDialer {
                fail: true,
                ..Default::default()
            };
            manager.on_discovery(PeerId::random(), [addr()], &mut dialer);
            manager.on_started(&mut dialer);
            manager.on_discovery(PeerId::random(), [addr()], &mut dialer);
        });

        let rendered = handle.render();
        assert!(rendered.contains("keel_peer_discoveries_total 2"));
        assert!(rendered.contains("keel_dials_total 2"));
        assert!(rendered.contains("keel_dial_failures_total 2"));
    }
}
