//! HTTP origin client.
//!
//! ### Semantics
//! - Method, URL and request headers are forwarded as-is
//! - Redirects followed up to `max_redirects` (default: 5)
//! - Any response, 2xx or not, is returned; the caller decides what to cache
//! - Connect, timeout and body read failures surface as `NetworkUnavailable`

use std::time::{Duration, Instant};

use reqwest::{Client, Method};

use zubid_sw_core::{AppConfig, Error, Headers, Origin, Request, Response};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "zubid-sw/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "zubid-sw/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Self::default() }
    }
}

/// reqwest-backed [`Origin`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn request_failed(url: &str, err: &reqwest::Error) -> Error {
    if err.is_builder() {
        Error::InvalidInput(format!("{url}: {err}"))
    } else if err.is_timeout() {
        Error::NetworkUnavailable(format!("{url}: timed out"))
    } else {
        Error::NetworkUnavailable(format!("{url}: {err}"))
    }
}

#[async_trait::async_trait]
impl Origin for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let url = request.url.as_str();

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("unsupported method '{}'", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| request_failed(url, &e))?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await.map_err(|e| request_failed(url, &e))?;

        tracing::debug!(
            url = %url,
            method = %request.method,
            status,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "origin responded"
        );

        Ok(Response { status, headers, body })
    }
}
