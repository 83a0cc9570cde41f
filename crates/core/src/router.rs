//! Request classification.
//!
//! `classify` is a pure function of the request and the route table: no
//! store access, no hidden state. Rules are evaluated in order and the first
//! match wins:
//!
//! 1. non-http(s) scheme → not intercepted
//! 2. non-GET method → `NetworkOnly`
//! 3. API prefix → `NetworkOnly`
//! 4. uploaded-media prefix → `NetworkOnly`
//! 5. network-first prefix → `NetworkFirstWithFallback`
//! 6. everything else → `CacheFirst`

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::request::Request;

/// Handling policy for an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDecision {
    /// Always fetch live; the store is neither read nor written.
    NetworkOnly,
    /// Serve a cached copy immediately and refresh it in the background;
    /// on a miss fetch live and cache the result.
    CacheFirst,
    /// Fetch live first; fall back to the cache, then the offline document.
    NetworkFirstWithFallback,
}

/// Path prefixes driving classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    pub api_prefixes: Vec<String>,
    pub media_prefixes: Vec<String>,
    pub network_first_prefixes: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            api_prefixes: vec!["/api/".into()],
            media_prefixes: vec!["/uploads/".into()],
            network_first_prefixes: Vec::new(),
        }
    }
}

impl RouteTable {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_prefixes: config.api_prefixes.clone(),
            media_prefixes: config.media_prefixes.clone(),
            network_first_prefixes: config.network_first_prefixes.clone(),
        }
    }
}

fn matches_any(path: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

/// Pick the handling policy for a request.
///
/// Returns `None` for requests the worker must not intercept.
pub fn classify(request: &Request, routes: &RouteTable) -> Option<RoutingDecision> {
    if !request.is_http() {
        return None;
    }

    if request.method != "GET" {
        return Some(RoutingDecision::NetworkOnly);
    }

    let path = request.url.path();

    if matches_any(path, &routes.api_prefixes) || matches_any(path, &routes.media_prefixes) {
        return Some(RoutingDecision::NetworkOnly);
    }

    if matches_any(path, &routes.network_first_prefixes) {
        return Some(RoutingDecision::NetworkFirstWithFallback);
    }

    Some(RoutingDecision::CacheFirst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(method: &str, url: &str) -> Option<RoutingDecision> {
        classify(&Request::new(method, url).unwrap(), &RouteTable::default())
    }

    #[test]
    fn test_api_is_network_only() {
        assert_eq!(route("GET", "https://zubid.example/api/auctions?page=2"), Some(RoutingDecision::NetworkOnly));
        assert_eq!(route("GET", "https://zubid.example/api/bids/7"), Some(RoutingDecision::NetworkOnly));
    }

    #[test]
    fn test_uploads_is_network_only() {
        assert_eq!(route("GET", "https://zubid.example/uploads/lot-7.jpg"), Some(RoutingDecision::NetworkOnly));
    }

    #[test]
    fn test_prefix_needs_full_segment() {
        assert_eq!(route("GET", "https://zubid.example/api"), Some(RoutingDecision::CacheFirst));
        assert_eq!(route("GET", "https://zubid.example/apidocs.html"), Some(RoutingDecision::CacheFirst));
    }

    #[test]
    fn test_pages_are_cache_first() {
        assert_eq!(route("GET", "https://zubid.example/"), Some(RoutingDecision::CacheFirst));
        assert_eq!(route("GET", "https://zubid.example/auctions.html"), Some(RoutingDecision::CacheFirst));
        assert_eq!(route("GET", "https://zubid.example/styles.css"), Some(RoutingDecision::CacheFirst));
    }

    #[test]
    fn test_non_http_not_intercepted() {
        assert_eq!(route("GET", "chrome-extension://abcdef/content.js"), None);
        assert_eq!(route("GET", "data:text/plain,hello"), None);
    }

    #[test]
    fn test_non_get_is_network_only() {
        assert_eq!(route("POST", "https://zubid.example/index.html"), Some(RoutingDecision::NetworkOnly));
        assert_eq!(route("PUT", "https://zubid.example/api/bids/7"), Some(RoutingDecision::NetworkOnly));
    }

    #[test]
    fn test_network_first_prefix() {
        let routes = RouteTable { network_first_prefixes: vec!["/news/".into()], ..Default::default() };
        let request = Request::get("https://zubid.example/news/today.html").unwrap();
        assert_eq!(classify(&request, &routes), Some(RoutingDecision::NetworkFirstWithFallback));
    }

    #[test]
    fn test_api_wins_over_network_first() {
        let routes = RouteTable { network_first_prefixes: vec!["/".into()], ..Default::default() };
        let request = Request::get("https://zubid.example/api/auctions").unwrap();
        assert_eq!(classify(&request, &routes), Some(RoutingDecision::NetworkOnly));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let request = Request::get("https://zubid.example/my-bids.html").unwrap();
        let routes = RouteTable::default();
        let first = classify(&request, &routes);
        for _ in 0..10 {
            assert_eq!(classify(&request, &routes), first);
        }
    }

    #[test]
    fn test_from_config() {
        let config = AppConfig { media_prefixes: vec!["/media/".into()], ..Default::default() };
        let routes = RouteTable::from_config(&config);
        let request = Request::get("https://zubid.example/media/a.png").unwrap();
        assert_eq!(classify(&request, &routes), Some(RoutingDecision::NetworkOnly));
    }
}
