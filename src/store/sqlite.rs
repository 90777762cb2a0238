use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};
use tracing::warn;

use crate::app::{DynlensError, Result};
use crate::domain::Post;
use crate::store::{CacheEntry, CacheStore};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| DynlensError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            DynlensError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }
}

impl CacheStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT fetched_at, ttl_minutes, payload FROM cache WHERE key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((fetched_at, ttl_minutes, payload)) = row else {
            return Ok(None);
        };

        let fetched_at = match DateTime::parse_from_rfc3339(&fetched_at) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                warn!("corrupt cache entry {key}: bad timestamp ({e}), treating as miss");
                conn.execute("DELETE FROM cache WHERE key = ?1", params![key])?;
                return Ok(None);
            }
        };

        let posts: Vec<Post> = match serde_json::from_str(&payload) {
            Ok(posts) => posts,
            Err(e) => {
                warn!("corrupt cache entry {key}: bad payload ({e}), treating as miss");
                conn.execute("DELETE FROM cache WHERE key = ?1", params![key])?;
                return Ok(None);
            }
        };

        Ok(Some(CacheEntry {
            key: key.to_string(),
            fetched_at,
            ttl_minutes,
            posts,
        }))
    }

    fn put(&self, key: &str, posts: &[Post], ttl_minutes: i64) -> Result<()> {
        let payload = serde_json::to_string(posts)
            .map_err(|e| DynlensError::Parse(format!("cache payload serialization: {e}")))?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO cache (key, fetched_at, ttl_minutes, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, Utc::now().to_rfc3339(), ttl_minutes, payload],
        )?;

        Ok(())
    }
}
