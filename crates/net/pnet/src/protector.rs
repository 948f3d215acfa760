use std::fmt;

use libp2p::pnet::PnetConfig;
use tracing::{debug, info};

use crate::{ProtectorError, SwarmKey};

/// Whether a node may run without a swarm key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Enforcement {
    /// No key means a public node.
    #[default]
    Optional,
    /// No key is a startup error.
    Required,
}

impl From<bool> for Enforcement {
    fn from(required: bool) -> Self {
        if required { Self::Required } else { Self::Optional }
    }
}

/// Connection protector derived from a [`SwarmKey`].
///
/// Installed into the transport by [`build_transport`](crate::build_transport),
/// it wraps every raw connection in the pre-shared-key handshake. Peers with a
/// different key, or no key at all, fail the handshake before any other
/// protocol runs.
#[derive(Clone)]
pub struct Protector {
    key: SwarmKey,
}

impl Protector {
    pub fn new(key: SwarmKey) -> Self {
        Self { key }
    }

    /// Decide whether the node runs private.
    ///
    /// Returns `Ok(None)` for a public node, and [`ProtectorError::Enforced`]
    /// when a key is required but absent.
    pub fn bind(
        key: Option<SwarmKey>,
        enforcement: Enforcement,
    ) -> Result<Option<Self>, ProtectorError> {
        match (key, enforcement) {
            (Some(key), _) => {
                let protector = Self::new(key);
                info!(fingerprint = %protector.fingerprint(), "private network active");
                Ok(Some(protector))
            }
            (None, Enforcement::Required) => Err(ProtectorError::Enforced),
            (None, Enforcement::Optional) => {
                debug!("no swarm key, running as a public node");
                Ok(None)
            }
        }
    }

    pub fn fingerprint(&self) -> String {
        self.key.fingerprint()
    }

    pub(crate) fn config(&self) -> PnetConfig {
        PnetConfig::new(self.key.psk())
    }
}

impl fmt::Debug for Protector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protector").field("fingerprint", &self.fingerprint()).finish()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn key_installs_protector_regardless_of_enforcement() {
        let key = SwarmKey::generate();
        for enforcement in [Enforcement::Optional, Enforcement::Required] {
            let protector = Protector::bind(Some(key), enforcement).unwrap().unwrap();
            assert_eq!(protector.fingerprint(), key.fingerprint());
        }
    }

    #[test]
    fn missing_key_is_public_unless_enforced() {
        assert!(Protector::bind(None, Enforcement::Optional).unwrap().is_none());
        assert_matches!(
            Protector::bind(None, Enforcement::Required),
            Err(ProtectorError::Enforced)
        );
    }

    #[test]
    fn enforcement_from_flag() {
        assert_eq!(Enforcement::from(true), Enforcement::Required);
        assert_eq!(Enforcement::from(false), Enforcement::Optional);
        assert_eq!(Enforcement::default(), Enforcement::Optional);
    }
}
