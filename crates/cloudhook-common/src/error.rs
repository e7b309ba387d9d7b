//! Error types for configuration lookups.

use thiserror::Error;

/// Errors raised while reading hook configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The requested section or key is absent.
    ///
    /// Callers that treat a missing setting as "off" should match on this
    /// variant rather than on the message text.
    #[error("Configuration not found: [{section}] {key}")]
    NotFound {
        /// Section that was searched.
        section: String,
        /// Key that was requested.
        key: String,
    },

    /// The setting exists but cannot be read as the requested type.
    #[error("Invalid value for [{section}] {key}: expected {expected}")]
    InvalidValue {
        /// Section holding the value.
        section: String,
        /// Key holding the value.
        key: String,
        /// Human-readable name of the expected type.
        expected: &'static str,
    },

    /// A section does not have the shape its settings require.
    #[error("Invalid [{section}] settings: {source}")]
    Decode {
        /// Section that failed to deserialize.
        section: String,
        /// Underlying deserialization error.
        #[source]
        source: toml::de::Error,
    },

    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The platform configuration directory could not be determined.
    #[error("Failed to determine config directory")]
    NoConfigDir,
}

impl ConfigError {
    /// Builds a [`ConfigError::NotFound`] for `section`/`key`.
    pub fn not_found(section: &str, key: &str) -> Self {
        Self::NotFound {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    /// Builds a [`ConfigError::InvalidValue`] for `section`/`key`.
    pub fn invalid(section: &str, key: &str, expected: &'static str) -> Self {
        Self::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            expected,
        }
    }

    /// Check if this error means the setting is simply absent.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias using `ConfigError`.
pub type Result<T> = std::result::Result<T, ConfigError>;
