//! Persistent address-to-geolocation store.
//!
//! Wraps a SQLite connection pool (WAL mode) holding the single
//! `ip_geolocation` table. The handle is cheap to clone; each enrichment
//! worker receives its own clone, and the pool hands every worker its own
//! connection, so no two workers ever share one.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;

use log::info;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::error_handling::StoreError;
use crate::models::GeoRecord;

/// Persistent mapping from client address to [`GeoRecord`].
///
/// Records are inserted once and never updated; the address is the primary
/// key, and inserting a second record for the same address fails loudly with
/// [`StoreError::DuplicateKey`].
#[derive(Clone)]
pub struct GeoStore {
    pool: SqlitePool,
}

impl GeoStore {
    /// Opens (or creates) the store at `path` and ensures the schema exists.
    ///
    /// Safe to call against an already-initialized database file; both the
    /// file creation and the schema statement are idempotent. Any failure
    /// here is fatal to the run.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let path_str = path.to_string_lossy().to_string();
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path_str)
        {
            Ok(_) => info!("Geolocation database file created."),
            Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
                info!("Geolocation database file already exists.")
            }
            Err(e) => return Err(StoreError::FileCreation(e.to_string())),
        }

        let pool = SqlitePool::connect(&format!("sqlite:{}", path_str)).await?;

        // Enable WAL mode so worker connections can read while one writes
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;

        let store = GeoStore { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Opens an in-memory store for tests.
    ///
    /// The pool is pinned to a single connection because every new in-memory
    /// SQLite connection is a separate empty database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = GeoStore { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Creates the `ip_geolocation` table if it doesn't exist.
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS ip_geolocation (
                ip TEXT PRIMARY KEY,
                continent_code TEXT,
                continent_name TEXT,
                country_code2 TEXT,
                country_code3 TEXT,
                country_name TEXT,
                country_name_official TEXT,
                country_capital TEXT,
                state_prov TEXT,
                state_code TEXT,
                district TEXT,
                city TEXT,
                zipcode TEXT,
                latitude TEXT,
                longitude TEXT,
                is_eu INTEGER,
                calling_code TEXT,
                country_tld TEXT,
                languages TEXT,
                country_flag TEXT,
                geoname_id TEXT,
                isp TEXT,
                connection_type TEXT,
                organization TEXT,
                currency_code TEXT,
                currency_name TEXT,
                currency_symbol TEXT,
                time_zone_name TEXT,
                time_zone_offset REAL,
                time_zone_offset_with_dst REAL,
                time_zone_current_time TEXT,
                time_zone_current_time_unix REAL,
                time_zone_is_dst INTEGER,
                time_zone_dst_savings REAL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Point lookup by exact address; `Ok(None)` on a miss.
    pub async fn get(&self, address: &str) -> Result<Option<GeoRecord>, StoreError> {
        let record = sqlx::query_as::<_, GeoRecord>("SELECT * FROM ip_geolocation WHERE ip = ?")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Inserts a new record.
    ///
    /// Fails with [`StoreError::DuplicateKey`] when a record for the address
    /// already exists; the insert never overwrites silently.
    pub async fn put(&self, record: &GeoRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO ip_geolocation (
                ip, continent_code, continent_name, country_code2, country_code3,
                country_name, country_name_official, country_capital, state_prov,
                state_code, district, city, zipcode, latitude, longitude,
                is_eu, calling_code, country_tld, languages, country_flag,
                geoname_id, isp, connection_type, organization, currency_code,
                currency_name, currency_symbol, time_zone_name, time_zone_offset,
                time_zone_offset_with_dst, time_zone_current_time,
                time_zone_current_time_unix, time_zone_is_dst, time_zone_dst_savings
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.ip)
        .bind(&record.continent_code)
        .bind(&record.continent_name)
        .bind(&record.country_code2)
        .bind(&record.country_code3)
        .bind(&record.country_name)
        .bind(&record.country_name_official)
        .bind(&record.country_capital)
        .bind(&record.state_prov)
        .bind(&record.state_code)
        .bind(&record.district)
        .bind(&record.city)
        .bind(&record.zipcode)
        .bind(&record.latitude)
        .bind(&record.longitude)
        .bind(record.is_eu)
        .bind(&record.calling_code)
        .bind(&record.country_tld)
        .bind(&record.languages)
        .bind(&record.country_flag)
        .bind(&record.geoname_id)
        .bind(&record.isp)
        .bind(&record.connection_type)
        .bind(&record.organization)
        .bind(&record.currency_code)
        .bind(&record.currency_name)
        .bind(&record.currency_symbol)
        .bind(&record.time_zone_name)
        .bind(record.time_zone_offset)
        .bind(record.time_zone_offset_with_dst)
        .bind(&record.time_zone_current_time)
        .bind(record.time_zone_current_time_unix)
        .bind(record.time_zone_is_dst)
        .bind(record.time_zone_dst_savings)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateKey {
                    address: record.ip.clone(),
                })
            }
            Err(e) => Err(StoreError::Unavailable(e)),
        }
    }

    /// Full scan of the store, for aggregate reporting.
    ///
    /// Returns an empty vector (not an error) when the store holds no records.
    pub async fn all(&self) -> Result<Vec<GeoRecord>, StoreError> {
        let records = sqlx::query_as::<_, GeoRecord>("SELECT * FROM ip_geolocation")
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    /// Flushes and releases the underlying pool; safe to call multiple times.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
