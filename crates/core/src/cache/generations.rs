//! Named cache generations.
//!
//! A generation is a versioned partition of the store. Generations are
//! created idempotently, listed for the lifecycle manager, and deleted as a
//! whole inside a single transaction.

use std::collections::BTreeSet;
use std::fmt;

use super::connection::CacheDb;
use crate::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Which partition a generation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    /// Pre-cached manifest assets written at install.
    Static,
    /// Responses cached while serving requests.
    Dynamic,
}

impl GenerationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationKind::Static => "static",
            GenerationKind::Dynamic => "dynamic",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "static" => Some(GenerationKind::Static),
            "dynamic" => Some(GenerationKind::Dynamic),
            _ => None,
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to an opened generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationHandle {
    pub(crate) id: String,
    pub(crate) kind: GenerationKind,
}

impl GenerationHandle {
    pub(crate) fn new(id: impl Into<String>, kind: GenerationKind) -> Self {
        Self { id: id.into(), kind }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> GenerationKind {
        self.kind
    }
}

/// Size summary for one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationStats {
    pub id: String,
    pub kind: GenerationKind,
    pub entries: u64,
    pub bytes: u64,
    pub created_at: String,
}

impl CacheDb {
    /// Open a generation, creating it if absent.
    ///
    /// Idempotent: reopening keeps the original kind and creation time.
    pub async fn open_generation(&self, id: &str, kind: GenerationKind) -> Result<GenerationHandle, Error> {
        let handle = GenerationHandle::new(id, kind);
        let id = id.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (id, kind, created_at) VALUES (?1, ?2, ?3)",
                    params![id, kind.as_str(), now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;
        Ok(handle)
    }

    /// List the ids of every generation in the store.
    pub async fn list_generation_ids(&self) -> Result<BTreeSet<String>, Error> {
        self.conn
            .call(|conn| -> Result<BTreeSet<String>, Error> {
                let mut stmt = conn.prepare("SELECT id FROM generations")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<BTreeSet<_>, _>>()?;
                Ok(ids)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and all of its entries in one transaction.
    ///
    /// Returns false if the generation did not exist.
    pub async fn delete_generation(&self, id: &str) -> Result<bool, Error> {
        let id = id.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE generation_id = ?1", params![id])?;
                let removed = tx.execute("DELETE FROM generations WHERE id = ?1", params![id])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry count and body bytes per generation, ordered by id.
    pub async fn generation_stats(&self) -> Result<Vec<GenerationStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.id, g.kind, g.created_at, COUNT(e.key), COALESCE(SUM(LENGTH(e.body)), 0)
                     FROM generations g
                     LEFT JOIN entries e ON e.generation_id = g.id
                     GROUP BY g.id
                     ORDER BY g.id",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, i64>(4)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(id, kind, created_at, entries, bytes)| {
                        let kind = GenerationKind::parse(&kind)
                            .ok_or_else(|| Error::MigrationFailed(format!("unknown generation kind: {kind}")))?;
                        Ok(GenerationStats { id, kind, entries: entries as u64, bytes: bytes as u64, created_at })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }
}
