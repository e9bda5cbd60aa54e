//! Registry HTTP transport.

use std::sync::Arc;
use std::time::Duration;

use fleetca_core::RegistryError;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type Result<T> = std::result::Result<T, RegistryError>;

/// Client for the registry's CA-registration API
#[derive(Clone)]
pub struct RegistryClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    base_url: Url,
    token: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("authenticated", &self.inner.token.is_some())
            .finish_non_exhaustive()
    }
}

impl RegistryClient {
    /// Create a client for `base_url` with default settings
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        RegistryClientBuilder::new(base_url).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> RegistryClientBuilder {
        RegistryClientBuilder::new(base_url)
    }

    /// Registry base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.inner.base_url.as_str()
    }

    /// Perform a GET request with query parameters
    pub(crate) async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.build_url(path, params)?;
        debug!(url = %url, "GET request");

        let response = self.send(self.inner.http.get(url)).await?;
        self.handle_response(response).await
    }

    /// Perform a POST request with a JSON body, ignoring any response body
    pub(crate) async fn post_json<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<()> {
        let url = self.build_url(path, &[])?;
        debug!(url = %url, "POST request");

        let response = self.send(self.inner.http.post(url).json(body)).await?;
        self.handle_empty_response(response).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.inner.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        request.send().await.map_err(|e| self.map_transport(&e))
    }

    fn map_transport(&self, e: &reqwest::Error) -> RegistryError {
        if e.is_timeout() {
            RegistryError::Timeout(self.inner.timeout.as_secs())
        } else if e.is_connect() {
            RegistryError::Connection(e.to_string())
        } else {
            RegistryError::Http(e.to_string())
        }
    }

    /// Resolve `path` against the base URL and append query parameters
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| RegistryError::InvalidUrl(e.to_string()))?;

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// Handle a response that returns JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await.map_err(|e| self.map_transport(&e))?;
            serde_json::from_str(&body).map_err(|e| RegistryError::MalformedResponse(e.to_string()))
        } else {
            Err(Self::handle_error(status.as_u16(), response).await)
        }
    }

    /// Handle a response whose body carries no data
    async fn handle_empty_response(&self, response: Response) -> Result<()> {
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            Err(Self::handle_error(status.as_u16(), response).await)
        }
    }

    /// Convert an error response to a `RegistryError`
    async fn handle_error(status: u16, response: Response) -> RegistryError {
        let body = response.text().await.unwrap_or_default();

        // Try to parse error message from JSON
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|e| e.as_str())
                    .map(String::from)
            })
            .unwrap_or(body);

        match status {
            401 | 403 => {
                warn!(status, "registry rejected credentials");
                RegistryError::Unauthorized
            }
            _ => RegistryError::Api {
                code: status,
                message,
            },
        }
    }
}

/// Builder for configuring a [`RegistryClient`]
pub struct RegistryClientBuilder {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    user_agent: String,
}

impl RegistryClientBuilder {
    /// Create a new builder for the given registry base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("fleetca/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Send `Authorization: Bearer <token>` with every request
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<RegistryClient> {
        let mut base_url =
            Url::parse(&self.base_url).map_err(|e| RegistryError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                base_url.scheme()
            )));
        }
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| RegistryError::Http(e.to_string()))?;

        Ok(RegistryClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                token: self.token,
                timeout: self.timeout,
            }),
        })
    }
}
