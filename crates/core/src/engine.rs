//! Fetch-and-reconcile engine.
//!
//! Carries out a routing decision against the store and the origin:
//!
//! - cache-first: serve a hit immediately and refresh it in the background;
//!   on a miss fetch live and write the result into the dynamic generation
//! - network-first: fetch live, then fall back to the cache
//! - network-only: fetch live, never touch the store
//!
//! When both the cache and the network fail, HTML requests get the cached
//! offline document; everything else sees the original failure.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::Error;
use crate::cache::CacheDb;
use crate::lifecycle::GenerationSet;
use crate::origin::Origin;
use crate::request::{Request, Response, Served};
use crate::router::RoutingDecision;

/// Result of handling one request.
#[derive(Debug)]
pub struct Handled {
    pub served: Served,
    /// Background refresh spawned for a cache hit, if any.
    pub refresh: Option<JoinHandle<Result<(), Error>>>,
}

impl Handled {
    fn now(served: Served) -> Self {
        Self { served, refresh: None }
    }
}

/// Store + origin pair that serves requests.
#[derive(Clone)]
pub struct FetchEngine {
    store: CacheDb,
    origin: Arc<dyn Origin>,
    offline_document: String,
}

impl FetchEngine {
    pub fn new(store: CacheDb, origin: Arc<dyn Origin>, offline_document: impl Into<String>) -> Self {
        Self { store, origin, offline_document: offline_document.into() }
    }

    pub fn store(&self) -> &CacheDb {
        &self.store
    }

    pub fn origin(&self) -> &dyn Origin {
        self.origin.as_ref()
    }

    /// Serve a request under the given policy and generation set.
    pub async fn handle(
        &self, request: &Request, decision: RoutingDecision, generations: &GenerationSet,
    ) -> Result<Handled, Error> {
        match decision {
            RoutingDecision::NetworkOnly => Ok(Handled::now(Served::network(self.origin.fetch(request).await?))),
            RoutingDecision::CacheFirst => self.cache_first(request, generations).await,
            RoutingDecision::NetworkFirstWithFallback => self.network_first(request, generations).await.map(Handled::now),
        }
    }

    async fn cache_first(&self, request: &Request, generations: &GenerationSet) -> Result<Handled, Error> {
        if let Some(response) = self.lookup(request, generations).await {
            tracing::debug!(url = %request.url, "cache hit");
            let refresh = self.background_refresh(request.clone(), generations.clone());
            return Ok(Handled { served: Served::cache(response), refresh: Some(refresh) });
        }

        tracing::debug!(url = %request.url, "cache miss");
        match self.fetch_and_cache(request, generations).await {
            Ok(response) => Ok(Handled::now(Served::network(response))),
            Err(err) => self.offline_fallback(request, generations, err).await.map(Handled::now),
        }
    }

    async fn network_first(&self, request: &Request, generations: &GenerationSet) -> Result<Served, Error> {
        match self.fetch_and_cache(request, generations).await {
            Ok(response) => Ok(Served::network(response)),
            Err(err) => {
                if let Some(cached) = self.lookup(request, generations).await {
                    tracing::debug!(url = %request.url, error = %err, "network failed, serving cached copy");
                    return Ok(Served::cache(cached));
                }
                self.offline_fallback(request, generations, err).await
            }
        }
    }

    /// Look the request up across the current generations.
    ///
    /// Store failures are logged and treated as a miss.
    pub async fn lookup(&self, request: &Request, generations: &GenerationSet) -> Option<Response> {
        match self.store.match_request(request, &generations.search_order()).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Fetch live and write a 2xx response into the dynamic generation.
    ///
    /// The write finishes before the response is returned and is not
    /// cancelled if the caller goes away. Non-2xx responses are returned but
    /// not cached.
    ///
    /// # Errors
    ///
    /// Propagates the origin failure unchanged.
    pub async fn fetch_and_cache(&self, request: &Request, generations: &GenerationSet) -> Result<Response, Error> {
        let start = Instant::now();
        let response = self.origin.fetch(request).await?;

        tracing::debug!(
            url = %request.url,
            status = response.status,
            bytes = response.body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched from origin"
        );

        if response.is_success() {
            self.write_back(request, &response, generations).await;
        }

        Ok(response)
    }

    async fn write_back(&self, request: &Request, response: &Response, generations: &GenerationSet) {
        let store = self.store.clone();
        let handle = generations.dynamic_handle();
        let request = request.clone();
        let response = response.clone();

        let write = tokio::spawn(async move { store.put(&handle, &request, &response).await });

        match write.await {
            Ok(Ok(())) => {}
            Ok(Err(err @ Error::StorageQuotaExceeded { .. })) => {
                tracing::warn!(error = %err, "response served without caching");
            }
            Ok(Err(err)) => tracing::warn!(error = %err, "failed to cache response"),
            Err(err) => tracing::warn!(error = %err, "cache write task failed"),
        }
    }

    /// Re-fetch a request in the background to refresh its cached copy.
    ///
    /// The outcome is logged only and the task always ends `Ok`; the caller
    /// already has its response.
    pub fn background_refresh(&self, request: Request, generations: GenerationSet) -> JoinHandle<Result<(), Error>> {
        let engine = self.clone();
        tokio::spawn(async move {
            match engine.fetch_and_cache(&request, &generations).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!(url = %request.url, "background refresh stored");
                }
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = response.status, "background refresh kept cached copy");
                }
                Err(err) if err.is_network() => {
                    tracing::debug!(url = %request.url, error = %err, "origin unreachable, cached copy kept");
                }
                Err(err) => {
                    tracing::warn!(url = %request.url, error = %err, "background refresh failed");
                }
            }
            Ok(())
        })
    }

    /// Serve the cached offline document to HTML requests, or hand back `err`.
    pub async fn offline_fallback(
        &self, request: &Request, generations: &GenerationSet, err: Error,
    ) -> Result<Served, Error> {
        if !request.accepts_html() {
            return Err(err);
        }

        let Ok(document) = request.url.join(&self.offline_document) else {
            return Err(err);
        };

        match self.lookup(&Request::for_url(document), generations).await {
            Some(response) => {
                tracing::info!(url = %request.url, error = %err, "offline, serving cached document");
                Ok(Served::fallback(response))
            }
            None => Err(err),
        }
    }
}
