//! Request identity for cache lookups.

use sha2::{Digest, Sha256};
use url::Url;

/// Compute the cache key for a request: SHA-256 over method and normalized URL.
pub fn request_key(method: &str, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_key_stability() {
        let a = request_key("GET", &url("https://zubid.example/index.html"));
        let b = request_key("GET", &url("https://zubid.example/index.html"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_method_case_insensitive() {
        let a = request_key("get", &url("https://zubid.example/"));
        let b = request_key("GET", &url("https://zubid.example/"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_different_method() {
        let get = request_key("GET", &url("https://zubid.example/api/bids"));
        let post = request_key("POST", &url("https://zubid.example/api/bids"));
        assert_ne!(get, post);
    }

    #[test]
    fn test_key_query_significant() {
        let a = request_key("GET", &url("https://zubid.example/auction-detail.html?id=7"));
        let b = request_key("GET", &url("https://zubid.example/auction-detail.html?id=8"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_format() {
        let key = request_key("GET", &url("https://zubid.example/"));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
