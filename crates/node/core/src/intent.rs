use std::fmt;

use keel_config::Config;

/// Default requested key size for a new identity.
pub const DEFAULT_KEY_BITS: u32 = 2048;

/// Smallest accepted key size.
pub const MIN_KEY_BITS: u32 = 1024;

/// Options for creating a repository.
///
/// New identities are always Ed25519; `key_bits` is validated but has no
/// further effect, and `passphrase` is accepted without being stored.
#[derive(Clone, PartialEq, Eq)]
pub struct InitOptions {
    pub key_bits: u32,
    pub passphrase: Option<String>,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            key_bits: DEFAULT_KEY_BITS,
            passphrase: None,
        }
    }
}

impl InitOptions {
    pub fn with_key_bits(mut self, bits: u32) -> Self {
        self.key_bits = bits;
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }
}

impl fmt::Debug for InitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitOptions")
            .field("key_bits", &self.key_bits)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// What a single boot call should do. Built once, never mutated by the node.
#[derive(Debug, Clone, Default)]
pub struct BootIntent {
    pub should_init: bool,
    pub init_options: InitOptions,
    pub should_set_config: bool,
    pub config_patch: Option<Config>,
    pub should_start: bool,
}

impl BootIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the repository if none exists.
    pub fn init(mut self, options: InitOptions) -> Self {
        self.should_init = true;
        self.init_options = options;
        self
    }

    /// Deep-merge `patch` into the persisted config.
    pub fn config(mut self, patch: Config) -> Self {
        self.should_set_config = true;
        self.config_patch = Some(patch);
        self
    }

    /// Start the swarm endpoint.
    pub fn start(mut self) -> Self {
        self.should_start = true;
        self
    }
}
