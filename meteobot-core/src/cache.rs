//! SQLite-backed weather response cache.
//!
//! One row per (location, provider, period). The handle is opened once and
//! cloned into every request; all clones share one connection. Blocking
//! SQLite work runs on tokio's blocking pool.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::{
    freshness::is_fresh,
    model::{ForecastPeriod, LocationKey, WeatherReport},
    provider::ProviderId,
};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to open weather cache at {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Weather cache storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Weather cache row for {key} is corrupted: {reason}")]
    Corrupted { key: String, reason: String },
    #[error("Failed to encode reports for the weather cache: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Weather cache worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// The cache's unique key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub location: LocationKey,
    pub provider: ProviderId,
    pub period: ForecastPeriod,
}

impl CacheKey {
    pub fn new(location: LocationKey, provider: ProviderId, period: ForecastPeriod) -> Self {
        Self { location, provider, period }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.location, self.provider, self.period)
    }
}

/// One stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub key: CacheKey,
    /// Epoch seconds of the last write.
    pub written_at: i64,
    pub payload: String,
}

impl WeatherRecord {
    /// Decode the stored payload.
    pub fn reports(&self) -> Result<Vec<WeatherReport>, CacheError> {
        serde_json::from_str(&self.payload).map_err(|e| CacheError::Corrupted {
            key: self.key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Result of a freshness-aware read.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub fresh: bool,
    pub record: Option<WeatherRecord>,
}

#[derive(Debug, Clone)]
pub struct WeatherCache {
    conn: Arc<Mutex<Connection>>,
}

impl WeatherCache {
    /// Open (creating if needed) the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| CacheError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// A throwaway cache that lives as long as the handle.
    pub fn in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        // The unique index is created separately so that tables written by
        // older builds (no constraint) pick it up too.
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS weather_cache (
                lat_lon TEXT NOT NULL,
                weather_provider TEXT NOT NULL,
                period TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                weather_data TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_weather_cache_key
                ON weather_cache(lat_lon, weather_provider, period);
            "#,
        )?;

        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    async fn run<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, CacheError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            op(&*guard)
        })
        .await?
    }

    pub async fn get(&self, key: &CacheKey) -> Result<Option<WeatherRecord>, CacheError> {
        debug!(%key, "reading weather cache");
        let key = key.clone();

        self.run(move |conn| {
            let row = conn
                .query_row(
                    "SELECT timestamp, weather_data FROM weather_cache
                     WHERE lat_lon = ?1 AND weather_provider = ?2 AND period = ?3",
                    params![key.location.as_key(), key.provider.as_str(), key.period.as_str()],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;

            Ok(row.map(|(written_at, payload)| WeatherRecord { key, written_at, payload }))
        })
        .await
    }

    /// Insert a record or replace the timestamp and payload of the existing
    /// one. A single statement, so readers never see a half-written row.
    pub async fn upsert(&self, key: &CacheKey, payload: &str, written_at: i64) -> Result<(), CacheError> {
        debug!(%key, written_at, "writing weather cache");
        let key = key.clone();
        let payload = payload.to_string();

        self.run(move |conn| {
            conn.execute(
                r#"
                INSERT INTO weather_cache (lat_lon, weather_provider, period, timestamp, weather_data)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (lat_lon, weather_provider, period)
                DO UPDATE SET timestamp = excluded.timestamp, weather_data = excluded.weather_data
                "#,
                params![
                    key.location.as_key(),
                    key.provider.as_str(),
                    key.period.as_str(),
                    written_at,
                    payload,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// `get` plus the freshness decision at `now`.
    pub async fn lookup(&self, key: &CacheKey, now: i64) -> Result<CacheLookup, CacheError> {
        let record = self.get(key).await?;
        let fresh = record.as_ref().is_some_and(|r| is_fresh(r.written_at, now));
        Ok(CacheLookup { fresh, record })
    }

    /// Number of stored records.
    pub async fn len(&self) -> Result<u64, CacheError> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM weather_cache", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    pub async fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len().await? == 0)
    }
}
