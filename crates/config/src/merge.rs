use toml::{Table, Value};

use crate::Config;

/// Merge `patch` into `base`.
///
/// Patch values win on key collision. Tables present on both sides are merged
/// recursively; every other value (arrays included) is replaced wholesale.
/// Merging the same patch twice yields the same document as merging it once.
pub fn deep_merge(base: &mut Table, patch: &Table) {
    for (key, incoming) in patch {
        match (base.get_mut(key), incoming) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Three-tier resolution: `overrides` over `persisted` over `defaults`.
pub fn resolve(defaults: &Config, persisted: &Config, overrides: &Config) -> Config {
    let mut resolved = defaults.clone();
    resolved.merge(persisted);
    resolved.merge(overrides);
    resolved
}
