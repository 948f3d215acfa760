//! The persisted configuration document.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use toml::{Table, Value};

use crate::{ConfigError, SwarmOptions, deep_merge};

/// A configuration document: a TOML table addressed with dotted key paths
/// such as `Discovery.MDNS.Enabled`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config(Table);

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: Table) -> Self {
        Self(table)
    }

    /// The document written into a freshly initialized repository.
    pub fn defaults() -> Self {
        // SwarmOptions only holds strings, integers, booleans and arrays of those.
        Self::from_serialize(&SwarmOptions::default()).unwrap_or_default()
    }

    /// Serialize any value that renders as a TOML table.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, ConfigError> {
        match Value::try_from(value)? {
            Value::Table(table) => Ok(Self(table)),
            _ => Err(ConfigError::NotATable {
                key: String::new(),
            }),
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(Self(toml::from_str(content)?))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self.0)?)
    }

    pub fn as_table(&self) -> &Table {
        &self.0
    }

    pub fn into_table(self) -> Table {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a value by dotted key path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Set a value by dotted key path, creating intermediate tables.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::InvalidPath(path.to_string()));
        }
        let Some((last, parents)) = segments.split_last() else {
            return Err(ConfigError::InvalidPath(path.to_string()));
        };

        let mut table = &mut self.0;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = table
                .entry(segment.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            table = match entry {
                Value::Table(inner) => inner,
                _ => {
                    return Err(ConfigError::NotATable {
                        key: segments.iter().take(depth + 1).copied().collect::<Vec<_>>().join("."),
                    });
                }
            };
        }
        table.insert(last.to_string(), value.into());
        Ok(())
    }

    /// Deep-merge `patch` over this document. See [`deep_merge`].
    pub fn merge(&mut self, patch: &Config) {
        deep_merge(&mut self.0, &patch.0);
    }

    pub fn merged(&self, patch: &Config) -> Config {
        let mut merged = self.clone();
        merged.merge(patch);
        merged
    }

    /// Deserialize the document into a typed view. Unknown keys are ignored.
    pub fn to_options<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        Ok(Value::Table(self.0.clone()).try_into()?)
    }
}

impl From<Table> for Config {
    fn from(table: Table) -> Self {
        Self(table)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn dotted_get_and_set() {
        let mut config = Config::new();
        config.set("Discovery.MDNS.Enabled", false).unwrap();
        config.set("Bootstrap", Value::Array(vec![])).unwrap();

        assert_eq!(config.get_bool("Discovery.MDNS.Enabled"), Some(false));
        assert!(config.get("Discovery.webRTCStar.Enabled").is_none());
        assert!(config.get("Bootstrap").unwrap().is_array());
    }

    #[test]
    fn set_through_scalar_fails() {
        let mut config = Config::new();
        config.set("relay", true).unwrap();
        assert_matches!(
            config.set("relay.enabled", true),
            Err(ConfigError::NotATable { key }) if key == "relay"
        );
        assert_matches!(config.set("a..b", 1i64), Err(ConfigError::InvalidPath(_)));
    }

    #[test]
    fn toml_round_trip_keeps_sections() {
        let defaults = Config::defaults();
        let rendered = defaults.to_toml_string().unwrap();
        let parsed = Config::parse(&rendered).unwrap();
        assert_eq!(parsed, defaults);
        assert_eq!(parsed.get_bool("Discovery.MDNS.Enabled"), Some(true));
    }
}
