//! Proxy descriptors and the proxy protocols the hook understands.

use std::fmt;

use serde::Deserialize;

/// Proxy protocol a descriptor can name.
///
/// The accepted names are the upper-case constants used by the platform's
/// proxy settings: `SOCKS4`, `SOCKS5`, `HTTP` and `HTTP_NO_TUNNEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyType {
    /// SOCKS version 4.
    Socks4,
    /// SOCKS version 5, with hostname resolution on the proxy.
    Socks5,
    /// HTTP proxy; HTTPS targets are tunnelled with `CONNECT`.
    Http,
    /// HTTP proxy named by platforms that forward plain HTTP without
    /// `CONNECT`. Routed like [`ProxyType::Http`], since HTTPS can only cross
    /// an HTTP proxy through a tunnel.
    HttpNoTunnel,
}

impl ProxyType {
    /// All known proxy types.
    pub const ALL: [Self; 4] = [Self::Socks4, Self::Socks5, Self::Http, Self::HttpNoTunnel];

    /// Maps a configured proxy-type name to a known protocol.
    ///
    /// Matching is exact and case-sensitive. Unknown names return `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cloudhook_common::ProxyType;
    ///
    /// assert_eq!(ProxyType::from_name("HTTP"), Some(ProxyType::Http));
    /// assert_eq!(ProxyType::from_name("Invalid_type"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// The configuration name of this proxy type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Socks4 => "SOCKS4",
            Self::Socks5 => "SOCKS5",
            Self::Http => "HTTP",
            Self::HttpNoTunnel => "HTTP_NO_TUNNEL",
        }
    }

    /// URL scheme used to address a proxy of this type.
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Socks4 => "socks4",
            Self::Socks5 => "socks5h",
            Self::Http | Self::HttpNoTunnel => "http",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Proxy settings as read from configuration.
///
/// The protocol is kept as the raw configured string; resolving it to a
/// [`ProxyType`] happens when a proxy handle is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyDescriptor {
    /// Proxy host name or address.
    #[serde(rename = "proxy_host")]
    pub host: String,
    /// Proxy port.
    #[serde(rename = "proxy_port")]
    pub port: u16,
    /// Name of the proxy protocol, e.g. `"HTTP"`.
    #[serde(rename = "proxy_type")]
    pub proxy_type: String,
}

impl ProxyDescriptor {
    /// Creates a descriptor from its parts.
    pub fn new(host: impl Into<String>, port: u16, proxy_type: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            proxy_type: proxy_type.into(),
        }
    }

    /// Resolves the configured protocol name.
    #[must_use]
    pub fn resolved_type(&self) -> Option<ProxyType> {
        ProxyType::from_name(&self.proxy_type)
    }
}
