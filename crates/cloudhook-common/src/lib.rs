//! # cloudhook-common
//!
//! Configuration model shared by the cloudhook crates.
//!
//! This crate provides:
//! - Proxy descriptors and the proxy protocols the hook can route through
//! - The [`ConfigurationService`] trait the hook reads settings from
//! - A TOML-backed implementation with environment overrides
//!
//! ## Example
//!
//! ```
//! use cloudhook_common::{ConfigurationService, ProxyType, TomlConfiguration};
//!
//! let config: TomlConfiguration = r#"
//! [proxy]
//! use_proxy = true
//! proxy_host = "abc.com"
//! proxy_port = 8080
//! proxy_type = "HTTP"
//! "#
//! .parse()?;
//!
//! assert!(config.get_boolean("proxy", "use_proxy")?);
//! let descriptor = config.get_proxy_config()?;
//! assert_eq!(descriptor.resolved_type(), Some(ProxyType::Http));
//! # Ok::<(), cloudhook_common::ConfigError>(())
//! ```

/// Configuration service trait, settings and the TOML implementation.
pub mod config;
/// Configuration error taxonomy.
pub mod error;
/// Proxy descriptors and proxy protocol names.
pub mod proxy;

pub use config::{
    ConfigurationService, HookSettings, PROXY_SECTION, RetryConfig, TomlConfiguration,
    USE_PROXY_KEY,
};
pub use error::ConfigError;
pub use proxy::{ProxyDescriptor, ProxyType};
