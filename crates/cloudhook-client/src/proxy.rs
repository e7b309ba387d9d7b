//! Proxy handles built from configured descriptors.

use std::fmt;

use cloudhook_common::{ProxyDescriptor, ProxyType};
use log::warn;

/// Maps the descriptor's protocol name to a known [`ProxyType`].
///
/// Unrecognized names are not an error; they simply have no mapping.
#[must_use]
pub fn resolve_proxy_type(descriptor: &ProxyDescriptor) -> Option<ProxyType> {
    let resolved = descriptor.resolved_type();
    if resolved.is_none() {
        warn!(
            "Unrecognized proxy type {:?}; expected one of SOCKS4, SOCKS5, HTTP, HTTP_NO_TUNNEL",
            descriptor.proxy_type
        );
    }
    resolved
}

/// A proxy the HTTP transport can route through.
///
/// A handle whose protocol did not resolve is still a handle, but it is not
/// routable and the transport ignores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyHandle {
    /// Proxy host name or address.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Resolved protocol, if the configured name was recognized.
    pub proxy_type: Option<ProxyType>,
}

impl ProxyHandle {
    /// Builds a handle from a descriptor, resolving its protocol name.
    #[must_use]
    pub fn from_descriptor(descriptor: &ProxyDescriptor) -> Self {
        Self {
            host: descriptor.host.clone(),
            port: descriptor.port,
            proxy_type: resolve_proxy_type(descriptor),
        }
    }

    /// Whether the transport can actually route through this proxy.
    #[must_use]
    pub fn is_routable(&self) -> bool {
        self.proxy_type.is_some() && !self.host.trim().is_empty()
    }

    /// URL addressing the proxy, e.g. `http://abc.com:8080`.
    ///
    /// IPv6 literals are bracketed (`http://[::1]:8080`). Returns `None` when
    /// the handle is not routable.
    #[must_use]
    pub fn proxy_url(&self) -> Option<String> {
        if !self.is_routable() {
            return None;
        }

        let host = self.host.trim();
        let authority = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{}", self.port)
        } else {
            format!("{host}:{}", self.port)
        };
        self.proxy_type
            .map(|t| format!("{}://{authority}", t.scheme()))
    }
}

impl fmt::Display for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.proxy_type {
            Some(t) => write!(f, "{t} {}:{}", self.host, self.port),
            None => write!(f, "unresolved {}:{}", self.host, self.port),
        }
    }
}
