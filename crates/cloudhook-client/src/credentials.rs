//! Credentials and the providers that supply them.
//!
//! The hook asks a [`CredentialProvider`] for credentials once per
//! authorization call. Providers may return `None`, in which case the
//! resulting client sends requests without an `Authorization` header.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use secrecy::SecretString;
use typed_builder::TypedBuilder;

use crate::error::{HookError, Result};

/// An access token and the scopes it was issued for.
///
/// # Examples
///
/// ```
/// use cloudhook_client::Credentials;
/// use secrecy::SecretString;
///
/// let credentials = Credentials::builder()
///     .token(SecretString::new("ya29.token".to_string().into()))
///     .scopes(vec!["https://www.googleapis.com/auth/cloud-platform".to_string()])
///     .build();
///
/// assert!(!credentials.is_expired());
/// ```
#[derive(Clone, TypedBuilder)]
pub struct Credentials {
    /// Bearer token sent with every request.
    pub token: SecretString,
    /// Scopes the token was issued for.
    #[builder(default)]
    pub scopes: Vec<String>,
    /// When the token stops being valid, if known.
    #[builder(default, setter(strip_option))]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Check if the token has passed its expiry time.
    ///
    /// Tokens without a known expiry never report as expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }
}

// Custom Debug implementation to avoid exposing the token
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of credentials for the hook.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fetches credentials valid for `scopes`.
    ///
    /// Returns `Ok(None)` when the provider has no credentials to offer.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to obtain credentials.
    async fn get_credentials(&self, scopes: &[String]) -> Result<Option<Credentials>>;
}

/// Provider that never supplies credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousProvider;

#[async_trait]
impl CredentialProvider for AnonymousProvider {
    async fn get_credentials(&self, _scopes: &[String]) -> Result<Option<Credentials>> {
        Ok(None)
    }
}

/// Provider that hands out a fixed token.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl StaticTokenProvider {
    /// Creates a provider for `token`.
    #[must_use]
    pub const fn new(token: SecretString) -> Self {
        Self {
            token,
            expires_at: None,
        }
    }

    /// Sets the expiry reported with the token.
    #[must_use]
    pub const fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn get_credentials(&self, scopes: &[String]) -> Result<Option<Credentials>> {
        let credentials = Credentials {
            token: self.token.clone(),
            scopes: scopes.to_vec(),
            expires_at: self.expires_at,
        };

        if credentials.is_expired() {
            return Err(HookError::CredentialsError(
                "static token has expired".to_string(),
            ));
        }

        Ok(Some(credentials))
    }
}

/// Provider that reads a token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    /// Creates a provider reading the variable `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// Name of the variable this provider reads.
    #[must_use]
    pub fn var(&self) -> &str {
        &self.var
    }
}

#[async_trait]
impl CredentialProvider for EnvTokenProvider {
    async fn get_credentials(&self, scopes: &[String]) -> Result<Option<Credentials>> {
        let token = std::env::var(&self.var).map_err(|e| {
            HookError::CredentialsError(format!("cannot read token from {}: {e}", self.var))
        })?;

        if token.trim().is_empty() {
            return Err(HookError::CredentialsError(format!(
                "environment variable {} is empty",
                self.var
            )));
        }

        debug!("Loaded access token from {}", self.var);
        Ok(Some(Credentials {
            token: SecretString::new(token.into()),
            scopes: scopes.to_vec(),
            expires_at: None,
        }))
    }
}
