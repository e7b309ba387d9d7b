//! The authorization hook.

use std::fmt;
use std::sync::Arc;

use cloudhook_common::{
    ConfigurationService, PROXY_SECTION, ProxyDescriptor, ProxyType, USE_PROXY_KEY,
};
use log::{debug, warn};

use crate::credentials::{AnonymousProvider, CredentialProvider};
use crate::error::{HookError, Result};
use crate::proxy::{ProxyHandle, resolve_proxy_type};
use crate::transport::{AuthorizedClient, HttpClientFactory, ReqwestClientFactory};

/// Produces authorized HTTP clients for a cloud provider.
///
/// The hook holds no mutable state: each call reads configuration, fetches
/// credentials, and builds a fresh client. It is cheaply cloneable and can be
/// shared across tasks.
///
/// # Examples
///
/// ```no_run
/// use cloudhook_client::{CloudAuthHook, EnvTokenProvider};
/// use cloudhook_common::TomlConfiguration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let hook = CloudAuthHook::new(TomlConfiguration::load_default()?)
///     .with_credentials(EnvTokenProvider::new("GOOGLE_OAUTH_ACCESS_TOKEN"));
///
/// let client = hook.authorize().await?;
/// let response = client
///     .get("https://storage.googleapis.com/storage/v1/b?project=my-project")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CloudAuthHook {
    config: Arc<dyn ConfigurationService>,
    credentials: Arc<dyn CredentialProvider>,
    client_factory: Arc<dyn HttpClientFactory>,
}

impl CloudAuthHook {
    /// Creates a hook reading from `config`.
    ///
    /// Starts with no credentials and the `reqwest` client factory.
    pub fn new<C>(config: C) -> Self
    where
        C: ConfigurationService + 'static,
    {
        Self {
            config: Arc::new(config),
            credentials: Arc::new(AnonymousProvider),
            client_factory: Arc::new(ReqwestClientFactory),
        }
    }

    /// Sets the credential provider.
    #[must_use]
    pub fn with_credentials<P>(mut self, provider: P) -> Self
    where
        P: CredentialProvider + 'static,
    {
        self.credentials = Arc::new(provider);
        self
    }

    /// Sets the factory that builds HTTP clients.
    #[must_use]
    pub fn with_client_factory<F>(mut self, factory: F) -> Self
    where
        F: HttpClientFactory + 'static,
    {
        self.client_factory = Arc::new(factory);
        self
    }

    /// Builds an authorized client.
    ///
    /// Credentials are fetched once per call. The proxy is attached when
    /// enabled and usable; otherwise the client connects directly.
    ///
    /// # Errors
    ///
    /// Returns an error if settings are malformed, the credential provider
    /// fails, or the client cannot be built. Proxy problems never fail this
    /// call.
    pub async fn authorize(&self) -> Result<AuthorizedClient> {
        let settings = self.config.settings()?;
        debug!("Requesting credentials for scopes {:?}", settings.scopes);
        let credentials = self.credentials.get_credentials(&settings.scopes).await?;
        if credentials.is_none() {
            debug!("No credentials available; building an anonymous client");
        }

        let proxy = self.proxy_handle();
        self.client_factory
            .build(credentials.as_ref(), proxy.as_ref(), &settings)
    }

    /// Returns the proxy to route through, if proxying is enabled.
    ///
    /// A flag or descriptor that cannot be read is logged and treated as
    /// "no proxy".
    #[must_use]
    pub fn proxy_handle(&self) -> Option<ProxyHandle> {
        match self.use_proxy() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!("Ignoring unreadable proxy flag: {e}");
                return None;
            }
        }

        match self.config.get_proxy_config() {
            Ok(descriptor) => Some(ProxyHandle::from_descriptor(&descriptor)),
            Err(e) => {
                warn!("Proxy enabled but its settings are unavailable: {e}");
                None
            }
        }
    }

    /// Whether proxying is enabled.
    ///
    /// An absent flag (or section) means proxying is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the flag is present but not a boolean.
    pub fn use_proxy(&self) -> Result<bool> {
        match self.config.get_boolean(PROXY_SECTION, USE_PROXY_KEY) {
            Ok(enabled) => Ok(enabled),
            Err(e) if e.is_not_found() => {
                debug!("{e}; proxy disabled");
                Ok(false)
            }
            Err(e) => Err(HookError::from(e)),
        }
    }

    /// Maps a descriptor's protocol name to a known proxy type.
    #[must_use]
    pub fn resolve_proxy_type(&self, descriptor: &ProxyDescriptor) -> Option<ProxyType> {
        resolve_proxy_type(descriptor)
    }
}

impl fmt::Debug for CloudAuthHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudAuthHook").finish_non_exhaustive()
    }
}
