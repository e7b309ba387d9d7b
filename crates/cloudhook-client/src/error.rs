//! Error types for the hook.

use cloudhook_common::ConfigError;
use thiserror::Error;

/// Errors that can occur while authorizing a client.
///
/// Proxy problems never appear here: a proxy that cannot be resolved or
/// applied degrades to a direct connection instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HookError {
    /// Configuration lookup failed for a reason other than an absent proxy
    /// setting.
    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigError),

    /// The credential provider could not produce credentials.
    #[error("Credentials error: {0}")]
    CredentialsError(String),

    /// The HTTP client could not be constructed.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Middleware layer error raised while sending a request.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    /// A credential token is not usable as an HTTP header value.
    #[error("Invalid authorization header: {0}")]
    InvalidHeader(String),
}

impl HookError {
    /// Check if this error came from the credential provider.
    pub const fn is_credentials_error(&self) -> bool {
        matches!(self, Self::CredentialsError(_))
    }

    /// Check if this error came from a configuration lookup.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::ConfigurationError(_))
    }
}

/// Result type alias using `HookError`.
pub type Result<T> = std::result::Result<T, HookError>;
