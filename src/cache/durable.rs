//! Durable Tier Module
//!
//! SQLite-backed tier that survives process restarts, accessed through
//! tokio-rusqlite so database work runs off the async threads.
//!
//! Rows store timestamps as RFC 3339 text, which makes expiry sweeps a
//! plain string comparison on an indexed column.

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio_rusqlite::{params, rusqlite, Connection};

use crate::cache::{CacheEntry, Category};
use crate::error::StorageError;

/// Schema migrations: (version, SQL batch). Applied in order; all
/// statements are idempotent via CREATE IF NOT EXISTS.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_cache_entries.sql"))];

// == Durable Tier ==
/// Handle to the persistent cache database.
#[derive(Clone, Debug)]
pub struct DurableTier {
    conn: Connection,
}

impl DurableTier {
    // == Open ==
    /// Opens (creating if needed) the database at `path`, applies pragmas
    /// and any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)
            .await
            .map_err(StorageError::from)?;
        Self::init(conn).await
    }

    /// Opens a fresh in-memory database. Used by tests and by hosts that
    /// opt out of persistence.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(StorageError::from)?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;",
            )?;
            Ok(())
        })
        .await
        .map_err(StorageError::Database)?;

        Self::migrate(&conn).await?;

        Ok(Self { conn })
    }

    // == Migrations ==
    /// Applies pending migrations, tracked in a `_migrations` version table.
    async fn migrate(conn: &Connection) -> Result<(), StorageError> {
        conn.call(|conn| -> Result<(), StorageError> {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL
                )",
                [],
            )?;

            let current: i64 = conn.query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )?;

            for (version, sql) in MIGRATIONS {
                if *version > current {
                    conn.execute_batch(sql)
                        .map_err(|e| StorageError::Migration(e.to_string()))?;
                    conn.execute(
                        "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                        params![version, Utc::now().to_rfc3339()],
                    )?;
                }
            }

            Ok(())
        })
        .await
        .map_err(StorageError::from)
    }

    // == Put ==
    /// Inserts or replaces an entry by key.
    pub async fn put(&self, entry: &CacheEntry) -> Result<(), StorageError> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), StorageError> {
                let payload = serde_json::to_string(&entry.payload)
                    .map_err(|e| StorageError::Corrupt(e.to_string()))?;
                conn.execute(
                    "INSERT INTO cache_entries (key, category, payload, stored_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(key) DO UPDATE SET
                        category = excluded.category,
                        payload = excluded.payload,
                        stored_at = excluded.stored_at,
                        expires_at = excluded.expires_at",
                    params![
                        &entry.key,
                        entry.category.as_str(),
                        payload,
                        entry.stored_at.to_rfc3339(),
                        entry.expires_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(StorageError::from)
    }

    // == Get ==
    /// Fetches an entry by key; `None` if the key is not stored.
    /// Expiry is the caller's decision, so expired rows are returned as-is.
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StorageError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, StorageError> {
                let result = conn.query_row(
                    "SELECT key, category, payload, stored_at, expires_at
                     FROM cache_entries WHERE key = ?1",
                    params![key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                );

                match result {
                    Ok(row) => Ok(Some(decode_row(row)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(StorageError::from)
    }

    // == Delete ==
    /// Deletes an entry by key; returns whether a row was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, StorageError> {
                let count = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(StorageError::from)
    }

    // == Delete Expired ==
    /// Deletes every row whose TTL has elapsed; returns the removed count.
    pub async fn delete_expired(&self) -> Result<u64, StorageError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, StorageError> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE expires_at <= ?1",
                    params![now],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(StorageError::from)
    }

    // == Clear Category ==
    /// Deletes every row of a category; returns the removed count.
    pub async fn clear_category(&self, category: Category) -> Result<u64, StorageError> {
        self.conn
            .call(move |conn| -> Result<u64, StorageError> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE category = ?1",
                    params![category.as_str()],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(StorageError::from)
    }

    // == Clear All ==
    /// Deletes every row; returns the removed count.
    pub async fn clear_all(&self) -> Result<u64, StorageError> {
        self.conn
            .call(|conn| -> Result<u64, StorageError> {
                let count = conn.execute("DELETE FROM cache_entries", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(StorageError::from)
    }

    // == Count ==
    /// Number of stored rows, expired or not.
    pub async fn count(&self) -> Result<u64, StorageError> {
        self.conn
            .call(|conn| -> Result<u64, StorageError> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(StorageError::from)
    }
}

// == Row Decoding ==
fn decode_row(
    (key, category, payload, stored_at, expires_at): (String, String, String, String, String),
) -> Result<CacheEntry, StorageError> {
    let category: Category = category
        .parse()
        .map_err(|e: String| StorageError::Corrupt(e))?;
    let payload = serde_json::from_str(&payload).map_err(|e| StorageError::Corrupt(e.to_string()))?;
    let stored_at = parse_timestamp(&stored_at)?;
    let expires_at = parse_timestamp(&expires_at)?;
    Ok(CacheEntry {
        key,
        category,
        payload,
        stored_at,
        expires_at,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}
