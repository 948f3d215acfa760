use std::collections::HashMap;

use libp2p::{Multiaddr, PeerId};
use parking_lot::RwLock;

/// What the node knows about one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    pub id: PeerId,
    pub addresses: Vec<Multiaddr>,
    pub connected: bool,
}

impl PeerRecord {
    pub fn new(id: PeerId, addresses: Vec<Multiaddr>) -> Self {
        Self {
            id,
            addresses,
            connected: false,
        }
    }
}

/// Peers keyed by id.
///
/// Every mutation holds the write lock for the whole read-modify-write, so
/// concurrent discovery sources never lose an update.
#[derive(Debug, Default)]
pub struct AddressBook {
    peers: RwLock<HashMap<PeerId, PeerRecord>>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the peer or merge new addresses into its record. Returns the
    /// record as stored.
    pub fn upsert(&self, id: PeerId, addresses: impl IntoIterator<Item = Multiaddr>) -> PeerRecord {
        let mut peers = self.peers.write();
        let record = peers.entry(id).or_insert_with(|| PeerRecord::new(id, Vec::new()));
        for addr in addresses {
            if !record.addresses.contains(&addr) {
                record.addresses.push(addr);
            }
        }
        record.clone()
    }

    pub fn mark_connected(&self, id: PeerId, addr: Option<Multiaddr>) -> PeerRecord {
        let mut peers = self.peers.write();
        let record = peers.entry(id).or_insert_with(|| PeerRecord::new(id, Vec::new()));
        if let Some(addr) = addr
            && !record.addresses.contains(&addr)
        {
            record.addresses.push(addr);
        }
        record.connected = true;
        record.clone()
    }

    /// Returns `false` if the peer was unknown.
    pub fn mark_disconnected(&self, id: &PeerId) -> bool {
        match self.peers.write().get_mut(id) {
            Some(record) => {
                record.connected = false;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &PeerId) -> Option<PeerRecord> {
        self.peers.read().get(id).cloned()
    }

    pub fn is_connected(&self, id: &PeerId) -> bool {
        self.peers.read().get(id).is_some_and(|r| r.connected)
    }

    /// The peer reachable at `addr`, preferring a connected one.
    pub fn find_by_address(&self, addr: &Multiaddr) -> Option<PeerId> {
        let peers = self.peers.read();
        let mut matching = peers.values().filter(|r| r.addresses.contains(addr));
        let first = matching.next()?;
        if first.connected {
            return Some(first.id);
        }
        Some(matching.find(|r| r.connected).unwrap_or(first).id)
    }

    /// Snapshot of every known peer.
    pub fn peers(&self) -> Vec<PeerRecord> {
        self.peers.read().values().cloned().collect()
    }

    /// Snapshot of the connected peers.
    pub fn connected(&self) -> Vec<PeerRecord> {
        self.peers.read().values().filter(|r| r.connected).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}
