//! # cloudhook-client
//!
//! Builds authorized HTTP clients for cloud provider APIs.
//!
//! The [`CloudAuthHook`] reads whether a proxy should be used, turns the
//! configured proxy descriptor into a [`ProxyHandle`], fetches credentials
//! from a [`CredentialProvider`], and hands both to an [`HttpClientFactory`].
//! Each collaborator is a trait so deployments and tests can swap them.
//!
//! Proxy configuration never blocks authorization: a missing flag, a missing
//! descriptor, or an unrecognized proxy type all degrade to a direct client.
//!
//! ## Example
//!
//! ```no_run
//! use cloudhook_client::{CloudAuthHook, StaticTokenProvider};
//! use cloudhook_common::TomlConfiguration;
//! use secrecy::SecretString;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config: TomlConfiguration = r#"
//! [proxy]
//! use_proxy = true
//! proxy_host = "abc.com"
//! proxy_port = 8080
//! proxy_type = "HTTP"
//! "#
//! .parse()?;
//!
//! let hook = CloudAuthHook::new(config)
//!     .with_credentials(StaticTokenProvider::new(SecretString::new("ya29.token".to_string().into())));
//!
//! let client = hook.authorize().await?;
//! assert!(client.proxy().is_some());
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod error;
pub mod hook;
pub mod proxy;
pub mod transport;

pub use credentials::{
    AnonymousProvider, CredentialProvider, Credentials, EnvTokenProvider, StaticTokenProvider,
};
pub use error::HookError;
pub use hook::CloudAuthHook;
pub use proxy::{ProxyHandle, resolve_proxy_type};
pub use transport::{AuthorizedClient, HttpClientFactory, ReqwestClientFactory};
