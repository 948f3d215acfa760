//! Node identity persisted in the `Identity` section of the config.

use std::fmt;

use keel_config::Config;
use libp2p::{PeerId, identity::Keypair};

use crate::IdentityError;

const PEER_ID_KEY: &str = "Identity.PeerID";
const PRIV_KEY_KEY: &str = "Identity.PrivKey";

/// The keypair a node signs with, and the peer id derived from it.
#[derive(Clone)]
pub struct Identity {
    keypair: Keypair,
    peer_id: PeerId,
}

impl Identity {
    /// Generate a fresh Ed25519 identity.
    pub fn generate() -> Self {
        Self::from_keypair(Keypair::generate_ed25519())
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        let peer_id = keypair.public().to_peer_id();
        Self { keypair, peer_id }
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Read the identity from a config document, checking that the stored
    /// peer id matches the private key.
    pub fn from_config(config: &Config) -> Result<Self, IdentityError> {
        let stored_peer_id = config
            .get_str(PEER_ID_KEY)
            .ok_or(IdentityError::Missing(PEER_ID_KEY))?;
        let encoded = config
            .get_str(PRIV_KEY_KEY)
            .ok_or(IdentityError::Missing(PRIV_KEY_KEY))?;

        let keypair = Keypair::from_protobuf_encoding(&hex::decode(encoded)?)?;
        let identity = Self::from_keypair(keypair);

        let expected = identity.peer_id.to_string();
        if expected != stored_peer_id {
            return Err(IdentityError::Mismatch {
                expected,
                found: stored_peer_id.to_string(),
            });
        }
        Ok(identity)
    }

    /// Write the `Identity` section into a config document.
    pub fn write_to(&self, config: &mut Config) -> Result<(), IdentityError> {
        let encoded = self.keypair.to_protobuf_encoding()?;
        config.set(PEER_ID_KEY, self.peer_id.to_string())?;
        config.set(PRIV_KEY_KEY, hex::encode(encoded))?;
        Ok(())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("peer_id", &self.peer_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn identity_survives_config() {
        let identity = Identity::generate();
        let mut config = Config::defaults();
        identity.write_to(&mut config).unwrap();

        let restored = Identity::from_config(&config).unwrap();
        assert_eq!(restored.peer_id(), identity.peer_id());
    }

    #[test]
    fn mismatched_peer_id_is_rejected() {
        let mut config = Config::new();
        Identity::generate().write_to(&mut config).unwrap();
        config
            .set(PEER_ID_KEY, Identity::generate().peer_id().to_string())
            .unwrap();

        assert_matches!(
            Identity::from_config(&config),
            Err(IdentityError::Mismatch { .. })
        );
    }

    #[test]
    fn missing_section_is_reported() {
        assert_matches!(
            Identity::from_config(&Config::defaults()),
            Err(IdentityError::Missing(PEER_ID_KEY))
        );
    }
}
