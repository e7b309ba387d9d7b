//! Construction of authorized HTTP clients.
//!
//! [`HttpClientFactory`] is the seam between the hook and the HTTP stack. The
//! default [`ReqwestClientFactory`] produces a `reqwest` client wrapped in
//! retry middleware, with the bearer token installed as a default header and
//! the proxy (if any) applied to the connector.

use std::fmt;
use std::time::Duration;

use cloudhook_common::HookSettings;
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use secrecy::ExposeSecret;

use crate::credentials::Credentials;
use crate::error::{HookError, Result};
use crate::proxy::ProxyHandle;

/// Builds an [`AuthorizedClient`] from credentials and an optional proxy.
pub trait HttpClientFactory: Send + Sync {
    /// Builds a client.
    ///
    /// `credentials` of `None` yields a client that sends no `Authorization`
    /// header; `proxy` of `None` yields a direct client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    fn build(
        &self,
        credentials: Option<&Credentials>,
        proxy: Option<&ProxyHandle>,
        settings: &HookSettings,
    ) -> Result<AuthorizedClient>;
}

/// An HTTP client pre-configured with credentials and optional proxy routing.
#[derive(Clone)]
pub struct AuthorizedClient {
    client: ClientWithMiddleware,
    proxy: Option<ProxyHandle>,
    authenticated: bool,
}

impl AuthorizedClient {
    /// Wraps an already configured client.
    ///
    /// `proxy` should be the proxy actually applied to `client`, and
    /// `authenticated` whether it carries credentials.
    #[must_use]
    pub const fn new(
        client: ClientWithMiddleware,
        proxy: Option<ProxyHandle>,
        authenticated: bool,
    ) -> Self {
        Self {
            client,
            proxy,
            authenticated,
        }
    }

    /// The underlying middleware client, for requests other than `GET`.
    ///
    /// Requests sent through it carry the same credentials, proxy and retry
    /// policy.
    #[must_use]
    pub const fn http(&self) -> &ClientWithMiddleware {
        &self.client
    }

    /// The proxy requests are routed through, if any.
    #[must_use]
    pub const fn proxy(&self) -> Option<&ProxyHandle> {
        self.proxy.as_ref()
    }

    /// Whether requests carry credentials.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Sends an authorized GET request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails after retries.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        Ok(self.client.get(url).send().await?)
    }
}

impl fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("proxy", &self.proxy)
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}

/// Factory producing `reqwest` clients with retry middleware.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestClientFactory;

impl ReqwestClientFactory {
    /// Converts a handle into a `reqwest` proxy.
    ///
    /// Returns `None`, with a warning, when the handle cannot be applied.
    fn reqwest_proxy(handle: &ProxyHandle) -> Option<reqwest::Proxy> {
        let Some(url) = handle.proxy_url() else {
            warn!("Proxy {handle} is not routable; connecting directly");
            return None;
        };

        // reqwest can only reach HTTPS targets through an HTTP proxy with
        // CONNECT, so HTTP_NO_TUNNEL is routed like HTTP for every scheme
        match reqwest::Proxy::all(&url) {
            Ok(proxy) => Some(proxy),
            Err(e) => {
                warn!("Rejected proxy URL {url}: {e}; connecting directly");
                None
            }
        }
    }

    fn auth_headers(credentials: Option<&Credentials>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(credentials) = credentials {
            let mut value =
                HeaderValue::from_str(&format!("Bearer {}", credentials.token.expose_secret()))
                    .map_err(|e| HookError::InvalidHeader(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}

impl HttpClientFactory for ReqwestClientFactory {
    fn build(
        &self,
        credentials: Option<&Credentials>,
        proxy: Option<&ProxyHandle>,
        settings: &HookSettings,
    ) -> Result<AuthorizedClient> {
        let mut builder =
            reqwest::Client::builder().default_headers(Self::auth_headers(credentials)?);

        // None means no timeout
        if let Some(timeout) = settings.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let applied = proxy.and_then(|handle| {
            Self::reqwest_proxy(handle).map(|reqwest_proxy| (handle.clone(), reqwest_proxy))
        });

        // A disabled proxy also disables proxies picked up from the environment
        let (builder, applied) = match applied {
            Some((handle, reqwest_proxy)) => {
                debug!("Routing requests through proxy {handle}");
                (builder.proxy(reqwest_proxy), Some(handle))
            }
            None => (builder.no_proxy(), None),
        };

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(settings.retry.initial_delay, settings.retry.max_delay)
            .build_with_max_retries(settings.retry.max_retries);

        let client = reqwest_middleware::ClientBuilder::new(builder.build()?)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(AuthorizedClient::new(
            client,
            applied,
            credentials.is_some(),
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use cloudhook_common::{ProxyDescriptor, RetryConfig};
    use secrecy::SecretString;
    use wiremock::matchers::{any, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_credentials(token: &str) -> Credentials {
        Credentials::builder()
            .token(SecretString::new(token.to_string().into()))
            .build()
    }

    fn no_retry_settings() -> HookSettings {
        HookSettings {
            retry: RetryConfig {
                max_retries: 0,
                ..RetryConfig::default()
            },
            ..HookSettings::default()
        }
    }

    fn handle_for(server: &MockServer, proxy_type: &str) -> ProxyHandle {
        let address = server.address();
        ProxyHandle::from_descriptor(&ProxyDescriptor::new(
            address.ip().to_string(),
            address.port(),
            proxy_type,
        ))
    }

    #[tokio::test]
    async fn test_bearer_token_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b"))
            .and(header("Authorization", "Bearer ya29.test-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = ReqwestClientFactory
            .build(
                Some(&test_credentials("ya29.test-token")),
                None,
                &no_retry_settings(),
            )
            .unwrap();
        assert!(client.is_authenticated());
        assert!(client.proxy().is_none());

        let response = client
            .get(&format!("{}/storage/v1/b", server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_anonymous_client_sends_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = ReqwestClientFactory
            .build(None, None, &no_retry_settings())
            .unwrap();
        assert!(!client.is_authenticated());

        client.get(&server.uri()).await.unwrap();

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(received[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_http_proxy_receives_requests() {
        let proxy_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .mount(&proxy_server)
            .await;

        let handle = handle_for(&proxy_server, "HTTP");
        let client = ReqwestClientFactory
            .build(
                Some(&test_credentials("proxied")),
                Some(&handle),
                &no_retry_settings(),
            )
            .unwrap();
        assert_eq!(client.proxy(), Some(&handle));

        let response = client.get("http://target.invalid/compute/v1").await.unwrap();
        assert_eq!(response.status(), 200);

        let received = proxy_server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0]
                .headers
                .get("authorization")
                .map(|v| v.to_str().unwrap()),
            Some("Bearer proxied")
        );
    }

    #[tokio::test]
    async fn test_no_tunnel_proxy_forwards_plain_http() {
        let proxy_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .mount(&proxy_server)
            .await;

        let handle = handle_for(&proxy_server, "HTTP_NO_TUNNEL");
        let client = ReqwestClientFactory
            .build(None, Some(&handle), &no_retry_settings())
            .unwrap();

        client.get("http://target.invalid/").await.unwrap();

        let received = proxy_server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
    }

    #[tokio::test]
    async fn test_no_tunnel_proxy_carries_https() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let proxy_side = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0_u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 502 Bad Gateway\r\ncontent-length: 0\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8(head).unwrap()
        });

        let handle = ProxyHandle::from_descriptor(&ProxyDescriptor::new(
            address.ip().to_string(),
            address.port(),
            "HTTP_NO_TUNNEL",
        ));
        let client = ReqwestClientFactory
            .build(None, Some(&handle), &no_retry_settings())
            .unwrap();
        assert_eq!(client.proxy(), Some(&handle));

        // The proxy refuses the tunnel, so the request itself fails
        assert!(
            client
                .get("https://storage.googleapis.invalid/storage/v1/b")
                .await
                .is_err()
        );

        let head = proxy_side.await.unwrap();
        assert!(
            head.starts_with("CONNECT storage.googleapis.invalid:443 "),
            "unexpected request: {head}"
        );
    }

    #[tokio::test]
    async fn test_ipv6_proxy_host_is_accepted() {
        let handle =
            ProxyHandle::from_descriptor(&ProxyDescriptor::new("::1", 3128, "HTTP"));

        let client = ReqwestClientFactory
            .build(None, Some(&handle), &no_retry_settings())
            .unwrap();
        assert_eq!(client.proxy(), Some(&handle));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let settings = HookSettings {
            retry: RetryConfig {
                max_retries: 1,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
            },
            ..HookSettings::default()
        };
        let client = ReqwestClientFactory.build(None, None, &settings).unwrap();

        let response = client.get(&server.uri()).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transient_failure_returned_without_retries() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = ReqwestClientFactory
            .build(None, None, &no_retry_settings())
            .unwrap();

        let response = client.get(&server.uri()).await.unwrap();
        assert_eq!(response.status(), 503);
    }

    #[tokio::test]
    async fn test_underlying_client_sends_other_methods() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/b"))
            .and(header("Authorization", "Bearer ya29.upload"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = ReqwestClientFactory
            .build(
                Some(&test_credentials("ya29.upload")),
                None,
                &no_retry_settings(),
            )
            .unwrap();

        let response = client
            .http()
            .post(format!("{}/storage/v1/b", server.uri()))
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
    }

    #[tokio::test]
    async fn test_unroutable_proxy_connects_directly() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let handle = ProxyHandle::from_descriptor(&ProxyDescriptor::new(
            "abc.com",
            8080,
            "Invalid_type",
        ));
        let client = ReqwestClientFactory
            .build(None, Some(&handle), &no_retry_settings())
            .unwrap();

        assert!(client.proxy().is_none());
        assert_eq!(client.get(&server.uri()).await.unwrap().status(), 200);
    }

    #[tokio::test]
    async fn test_timeout_applied() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let settings = HookSettings {
            timeout_seconds: Some(1),
            ..no_retry_settings()
        };
        let client = ReqwestClientFactory.build(None, None, &settings).unwrap();

        let err = client.get(&server.uri()).await.unwrap_err();
        assert!(matches!(err, HookError::MiddlewareError(_)));
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        let result = ReqwestClientFactory.build(
            Some(&test_credentials("bad\ntoken")),
            None,
            &HookSettings::default(),
        );
        assert!(matches!(result, Err(HookError::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn test_debug_hides_client_internals() {
        let client = ReqwestClientFactory
            .build(Some(&test_credentials("secret-value")), None, &HookSettings::default())
            .unwrap();
        let debug_str = format!("{client:?}");

        assert!(debug_str.contains("authenticated: true"));
        assert!(!debug_str.contains("secret-value"));
    }
}
