//! Request and response boundary objects exchanged with the intercepting host.
//!
//! ### URL Normalization
//! - Trim whitespace, lowercase host, remove fragments
//! - Preserve query string (no reordering)
//! - Any scheme parses; the router decides what gets intercepted

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::hash::request_key;

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for crate::Error {
    fn from(err: UrlError) -> Self {
        crate::Error::InvalidUrl(err.to_string())
    }
}

/// Normalize a URL string so equal resources share one cache key.
pub fn normalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            parsed
                .set_host(Some(&lowered))
                .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        }
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Ordered header list with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace every value of `name` with a single value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.0.push((name, value.into()));
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub headers: Headers,
}

impl Request {
    /// Build a request, normalizing the URL and upper-casing the method.
    pub fn new(method: &str, url: &str) -> Result<Self, UrlError> {
        Ok(Self { method: method.trim().to_ascii_uppercase(), url: normalize(url)?, headers: Headers::new() })
    }

    pub fn get(url: &str) -> Result<Self, UrlError> {
        Self::new("GET", url)
    }

    /// GET request for an already parsed URL.
    pub fn for_url(mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method: "GET".into(), url, headers: Headers::new() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// Whether the `Accept` header asks for an HTML document.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get("accept")
            .is_some_and(|accept| accept.contains("text/html"))
    }

    /// Cache key identifying this request (method + normalized URL).
    pub fn key(&self) -> String {
        request_key(&self.method, &self.url)
    }
}

/// A response snapshot: status, headers and the full body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Headers::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    Fallback,
}

/// A response together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
}

impl Served {
    pub fn cache(response: Response) -> Self {
        Self { response, source: ResponseSource::Cache }
    }

    pub fn network(response: Response) -> Self {
        Self { response, source: ResponseSource::Network }
    }

    pub fn fallback(response: Response) -> Self {
        Self { response, source: ResponseSource::Fallback }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercase_host() {
        let url = normalize("https://ZUBID.example/Auctions.html").unwrap();
        assert_eq!(url.host_str(), Some("zubid.example"));
        assert_eq!(url.path(), "/Auctions.html");
    }

    #[test]
    fn test_normalize_remove_fragment() {
        let url = normalize("https://zubid.example/index.html#top").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.as_str(), "https://zubid.example/index.html");
    }

    #[test]
    fn test_normalize_preserve_query() {
        let url = normalize("  https://zubid.example/auction-detail.html?id=7&b=2  ").unwrap();
        assert_eq!(url.query(), Some("id=7&b=2"));
    }

    #[test]
    fn test_normalize_accepts_extension_scheme() {
        let url = normalize("chrome-extension://abcdef/popup.html").unwrap();
        assert_eq!(url.scheme(), "chrome-extension");
    }

    #[test]
    fn test_normalize_empty() {
        assert!(matches!(normalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_normalize_relative_rejected() {
        assert!(matches!(normalize("/index.html"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_headers_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/html");
        assert_eq!(headers.get("content-type"), Some("text/html"));

        headers.insert("CONTENT-TYPE", "text/css");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Content-Type"), Some("text/css"));
    }

    #[test]
    fn test_request_method_uppercased() {
        let req = Request::new(" post ", "https://zubid.example/api/bids").unwrap();
        assert_eq!(req.method, "POST");
    }

    #[test]
    fn test_accepts_html() {
        let req = Request::get("https://zubid.example/")
            .unwrap()
            .with_header("Accept", "text/html,application/xhtml+xml");
        assert!(req.accepts_html());

        let img = Request::get("https://zubid.example/logo.png")
            .unwrap()
            .with_header("Accept", "image/png");
        assert!(!img.accepts_html());

        let bare = Request::get("https://zubid.example/").unwrap();
        assert!(!bare.accepts_html());
    }

    #[test]
    fn test_key_ignores_fragment_and_host_case() {
        let a = Request::get("https://ZUBID.example/app.js#x").unwrap();
        let b = Request::get("https://zubid.example/app.js").unwrap();
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_response_is_success() {
        assert!(Response::new(200, "ok").is_success());
        assert!(Response::new(204, "").is_success());
        assert!(!Response::new(304, "").is_success());
        assert!(!Response::new(404, "").is_success());
    }
}
