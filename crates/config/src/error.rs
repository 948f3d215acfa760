use thiserror::Error;

/// Errors raised while reading, editing or interpreting a [`Config`](crate::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The document could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A dotted key path was empty or had an empty segment.
    #[error("invalid config key path {0:?}")]
    InvalidPath(String),

    /// A path segment that must be a table holds a scalar or array.
    #[error("config key {key:?} is not a table")]
    NotATable { key: String },

    /// The resolved document does not match the typed view.
    #[error("invalid value for {section}: {reason}")]
    Invalid { section: &'static str, reason: String },
}
