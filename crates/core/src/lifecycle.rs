//! Generation lifecycle: install and activate.
//!
//! Install pre-caches the manifest into the new static generation. Any failed
//! manifest fetch aborts the install before a single entry is written, so the
//! previously active generations keep serving untouched. Activate deletes every
//! generation outside the new set.

use futures_util::future::try_join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::{CacheDb, GenerationHandle, GenerationKind};
use crate::origin::Origin;
use crate::request::{Request, Response};

/// The current static and dynamic generation ids.
///
/// Loaded at activation and passed explicitly into routing and fetch calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationSet {
    pub static_id: String,
    pub dynamic_id: String,
}

impl GenerationSet {
    /// Ids for a deployed version: `{prefix}-static-{version}` and
    /// `{prefix}-dynamic-{version}`, or `static-{version}` when the prefix is empty.
    pub fn for_version(prefix: &str, version: &str) -> Self {
        let id = |kind: GenerationKind| {
            if prefix.is_empty() { format!("{kind}-{version}") } else { format!("{prefix}-{kind}-{version}") }
        };
        Self { static_id: id(GenerationKind::Static), dynamic_id: id(GenerationKind::Dynamic) }
    }

    /// Lookup order for cache matches: dynamic first, so a refreshed copy
    /// shadows the install-time one, then static.
    pub fn search_order(&self) -> [&str; 2] {
        [self.dynamic_id.as_str(), self.static_id.as_str()]
    }

    pub fn contains(&self, id: &str) -> bool {
        self.static_id == id || self.dynamic_id == id
    }

    pub fn static_handle(&self) -> GenerationHandle {
        GenerationHandle::new(self.static_id.clone(), GenerationKind::Static)
    }

    pub fn dynamic_handle(&self) -> GenerationHandle {
        GenerationHandle::new(self.dynamic_id.clone(), GenerationKind::Dynamic)
    }
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    pub generations: GenerationSet,
    pub cached: Vec<String>,
}

/// Outcome of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivateReport {
    pub generations: GenerationSet,
    pub deleted: Vec<String>,
}

/// Resolve manifest paths against the origin.
pub fn resolve_manifest(origin_url: &Url, paths: &[String]) -> Result<Vec<Url>, Error> {
    paths
        .iter()
        .map(|path| {
            origin_url
                .join(path)
                .map_err(|e| Error::InvalidUrl(format!("manifest entry '{path}': {e}")))
        })
        .collect()
}

async fn fetch_manifest_entry(origin: &dyn Origin, url: &Url) -> Result<(Request, Response), Error> {
    let request = Request::for_url(url.clone());
    let response = origin
        .fetch(&request)
        .await
        .map_err(|e| Error::ManifestFetchFailed { url: url.to_string(), reason: e.to_string() })?;

    if !response.is_success() {
        return Err(Error::ManifestFetchFailed { url: url.to_string(), reason: format!("status {}", response.status) });
    }

    Ok((request, response))
}

/// Fetch every manifest entry and write them into the static generation.
///
/// All fetches run concurrently and complete before anything is written; the
/// write itself is a single transaction.
///
/// # Errors
///
/// `ManifestFetchFailed` for the first entry that fails; the store is left
/// exactly as it was.
pub async fn install(
    store: &CacheDb, origin: &dyn Origin, generations: &GenerationSet, manifest: &[Url],
) -> Result<InstallReport, Error> {
    tracing::info!(generation = %generations.static_id, entries = manifest.len(), "installing static generation");

    let entries = try_join_all(manifest.iter().map(|url| fetch_manifest_entry(origin, url))).await?;

    store.put_many(&generations.static_handle(), &entries).await?;

    Ok(InstallReport {
        generations: generations.clone(),
        cached: entries.iter().map(|(request, _)| request.url.to_string()).collect(),
    })
}

/// Delete every generation outside `generations` and make sure both current
/// generations exist.
pub async fn activate(store: &CacheDb, generations: &GenerationSet) -> Result<ActivateReport, Error> {
    let mut deleted = Vec::new();
    for id in store.list_generation_ids().await? {
        if generations.contains(&id) {
            continue;
        }
        tracing::info!(generation = %id, "removing stale generation");
        if store.delete_generation(&id).await? {
            deleted.push(id);
        }
    }

    store.open_generation(&generations.static_id, GenerationKind::Static).await?;
    store.open_generation(&generations.dynamic_id, GenerationKind::Dynamic).await?;

    Ok(ActivateReport { generations: generations.clone(), deleted })
}
