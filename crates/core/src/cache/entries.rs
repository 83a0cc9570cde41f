//! Cache entry reads and writes.
//!
//! Entries are whole-response snapshots keyed by request identity inside a
//! generation. Writes replace the full row (last write wins); nothing is ever
//! patched in place.

use super::connection::CacheDb;
use super::generations::GenerationHandle;
use crate::request::{Headers, Request, Response};
use crate::Error;
use bytes::Bytes;
use tokio_rusqlite::{params, rusqlite};

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub generation_id: String,
    pub key: String,
    pub method: String,
    pub url: String,
    pub response: Response,
    pub inserted_at: String,
}

/// Row ready to be written; serialized on the caller's side of the connection.
struct EntryRow {
    key: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to serialize headers: {e}")))?;
        Ok(Self {
            key: request.key(),
            method: request.method.clone(),
            url: request.url.to_string(),
            status: response.status,
            headers_json,
            body: response.body.to_vec(),
        })
    }
}

/// Bytes the generation would hold after replacing `key` with `incoming` bytes.
fn projected_bytes(
    conn: &rusqlite::Connection, generation_id: &str, keys: &[&str], incoming: u64,
) -> Result<u64, Error> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(LENGTH(body)), 0) FROM entries WHERE generation_id = ?1",
        params![generation_id],
        |row| row.get(0),
    )?;
    let mut replaced: i64 = 0;
    for key in keys {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT LENGTH(body) FROM entries WHERE generation_id = ?1 AND key = ?2",
                params![generation_id, key],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                e => Err(e),
            })?;
        replaced += existing.unwrap_or(0);
    }
    Ok((total - replaced).max(0) as u64 + incoming)
}

fn insert_row(conn: &rusqlite::Connection, generation_id: &str, row: &EntryRow, now: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO entries (generation_id, key, method, url, status, headers_json, body, inserted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(generation_id, key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            inserted_at = excluded.inserted_at",
        params![generation_id, &row.key, &row.method, &row.url, row.status, &row.headers_json, &row.body, now],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store a response under the request's key, replacing any existing entry.
    ///
    /// The generation must already exist; a generation retired by activation
    /// is never recreated by a late write.
    pub async fn put(&self, handle: &GenerationHandle, request: &Request, response: &Response) -> Result<(), Error> {
        let row = EntryRow::new(request, response)?;
        let generation_id = handle.id.clone();
        let quota = self.max_generation_bytes;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                if let Some(limit) = quota {
                    let projected = projected_bytes(&tx, &generation_id, &[row.key.as_str()], row.body.len() as u64)?;
                    if projected > limit {
                        return Err(Error::StorageQuotaExceeded { generation: generation_id, limit });
                    }
                }
                insert_row(&tx, &generation_id, &row, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Write a batch of entries atomically, creating the generation if needed.
    ///
    /// Either every entry lands or none does.
    pub async fn put_many(&self, handle: &GenerationHandle, entries: &[(Request, Response)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let generation_id = handle.id.clone();
        let kind = handle.kind;
        let quota = self.max_generation_bytes;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (id, kind, created_at) VALUES (?1, ?2, ?3)",
                    params![generation_id, kind.as_str(), now],
                )?;
                if let Some(limit) = quota {
                    let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
                    let incoming = rows.iter().map(|r| r.body.len() as u64).sum();
                    if projected_bytes(&tx, &generation_id, &keys, incoming)? > limit {
                        return Err(Error::StorageQuotaExceeded { generation: generation_id, limit });
                    }
                }
                for row in &rows {
                    insert_row(&tx, &generation_id, row, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look a key up across generations in the given order; first hit wins.
    ///
    /// A miss is `Ok(None)`, not an error.
    pub async fn get(&self, key: &str, search: &[&str]) -> Result<Option<CacheEntry>, Error> {
        let key = key.to_string();
        let search: Vec<String> = search.iter().map(|s| s.to_string()).collect();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, body, inserted_at
                     FROM entries WHERE generation_id = ?1 AND key = ?2",
                )?;

                for generation_id in &search {
                    let result = stmt.query_row(params![generation_id, key], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, u16>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Vec<u8>>(4)?,
                            row.get::<_, String>(5)?,
                        ))
                    });

                    match result {
                        Ok((method, url, status, headers_json, body, inserted_at)) => {
                            let headers: Headers = serde_json::from_str(&headers_json)
                                .map_err(|e| Error::InvalidInput(format!("corrupt stored headers: {e}")))?;
                            return Ok(Some(CacheEntry {
                                generation_id: generation_id.clone(),
                                key: key.clone(),
                                method,
                                url,
                                response: Response { status, headers, body: Bytes::from(body) },
                                inserted_at,
                            }));
                        }
                        Err(rusqlite::Error::QueryReturnedNoRows) => continue,
                        Err(e) => return Err(e.into()),
                    }
                }

                Ok(None)
            })
            .await
            .map_err(Error::from)
    }

    /// Convenience lookup for a request, returning only the response.
    pub async fn match_request(&self, request: &Request, search: &[&str]) -> Result<Option<Response>, Error> {
        Ok(self.get(&request.key(), search).await?.map(|entry| entry.response))
    }
}
