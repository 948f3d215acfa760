//! The shared network secret.

use std::{fmt, str::FromStr};

use libp2p::pnet::PreSharedKey;

use crate::ProtectorError;

/// Header every swarm key file starts with.
pub const SWARM_KEY_HEADER: &str = "/key/swarm/psk/1.0.0/\n/base16/\n";

/// Exact length of an encoded swarm key: the header plus 64 hex characters.
pub const SWARM_KEY_LEN: usize = SWARM_KEY_HEADER.len() + 64;

/// A 256-bit pre-shared key in the `/key/swarm/psk/1.0.0/` format.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SwarmKey([u8; 32]);

impl SwarmKey {
    pub fn new(key: [u8; 32]) -> Self {
        Self(key)
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        Self(rand::random())
    }

    /// Parse an encoded key. Trailing whitespace is ignored; what remains must
    /// be exactly [`SWARM_KEY_LEN`] bytes.
    pub fn parse(encoded: &[u8]) -> Result<Self, ProtectorError> {
        let trimmed = encoded.trim_ascii_end();
        if trimmed.len() != SWARM_KEY_LEN {
            return Err(ProtectorError::InvalidLength {
                expected: SWARM_KEY_LEN,
                found: trimmed.len(),
            });
        }

        let (header, body) = trimmed.split_at(SWARM_KEY_HEADER.len());
        if header != SWARM_KEY_HEADER.as_bytes() {
            return Err(ProtectorError::InvalidHeader);
        }

        let mut key = [0u8; 32];
        hex::decode_to_slice(body, &mut key)?;
        Ok(Self(key))
    }

    /// Render the key in its file format, exactly [`SWARM_KEY_LEN`] bytes.
    pub fn encode(&self) -> String {
        format!("{SWARM_KEY_HEADER}{}", hex::encode(self.0))
    }

    /// Public fingerprint, safe to log.
    pub fn fingerprint(&self) -> String {
        self.psk().fingerprint().to_string()
    }

    pub(crate) fn psk(&self) -> PreSharedKey {
        PreSharedKey::new(self.0)
    }
}

impl FromStr for SwarmKey {
    type Err = ProtectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes())
    }
}

impl fmt::Debug for SwarmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SwarmKey").field(&self.fingerprint()).finish()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const KEY: &str = concat!(
        "/key/swarm/psk/1.0.0/\n/base16/\n",
        "cd9e5b07b5d1c9ef1f3f1e6d8a3b6a4a0a4bcd1c1f4b7d3b3e2a5b8f4a1c2d3e"
    );

    #[test]
    fn encoded_key_is_95_bytes() {
        assert_eq!(SWARM_KEY_LEN, 95);
        assert_eq!(KEY.len(), SWARM_KEY_LEN);
        assert_eq!(SwarmKey::generate().encode().len(), SWARM_KEY_LEN);
    }

    #[test]
    fn parses_with_trailing_newline() {
        let key = SwarmKey::parse(format!("{KEY}\n").as_bytes()).unwrap();
        assert_eq!(key.encode(), KEY);
        assert_eq!(key, KEY.parse().unwrap());
    }

    #[test]
    fn rejects_malformed_keys() {
        assert_matches!(
            SwarmKey::parse(&KEY.as_bytes()[..90]),
            Err(ProtectorError::InvalidLength { found: 90, .. })
        );
        assert_matches!(
            SwarmKey::parse(KEY.replace("base16", "base64").as_bytes()),
            Err(ProtectorError::InvalidHeader)
        );
        assert_matches!(
            SwarmKey::parse(KEY.replace("cd9e", "zz9e").as_bytes()),
            Err(ProtectorError::InvalidKey(_))
        );
    }

    #[test]
    fn generated_keys_differ() {
        let a = SwarmKey::generate();
        let b = SwarmKey::generate();
        assert_ne!(a, b);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        let key: SwarmKey = KEY.parse().unwrap();
        assert!(!format!("{key:?}").contains("cd9e5b07"));
    }
}
