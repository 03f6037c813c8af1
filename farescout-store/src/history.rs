//! Price history and search log.
//!
//! Append-only SQLite tables: one price-history row per successful
//! fan-out, one search-log row per served request. The history feeds
//! downstream prediction via range reads.

use chrono::{DateTime, NaiveDate, Utc};
use farescout_core::{CabinClass, SourceId};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::StoreError;

// ============================================================================
// History Row
// ============================================================================

/// One price-history sample.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistoryRow {
    /// Departure date sampled.
    pub date: NaiveDate,
    /// Origin airport.
    pub origin: String,
    /// Destination airport.
    pub destination: String,
    /// Cabin class.
    pub cabin: CabinClass,
    /// Minimum converted price across offers.
    pub min_price: f64,
    /// Average converted price across offers.
    pub avg_price: f64,
    /// Maximum converted price across offers.
    pub max_price: f64,
    /// Number of offers sampled.
    pub sample_count: usize,
    /// Price count per source.
    pub source_mix: BTreeMap<SourceId, usize>,
    /// When the sample was recorded.
    pub recorded_at: DateTime<Utc>,
}

// ============================================================================
// Price History
// ============================================================================

/// SQLite-backed history store.
pub struct PriceHistory {
    conn: Mutex<Connection>,
}

impl PriceHistory {
    /// Default on-disk location for the history database.
    pub fn default_path() -> std::path::PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("farescout")
            .join("history.db")
    }

    /// Opens (or creates) the history database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        info!(path = %path.display(), "History store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory store (tests, ephemeral deployments).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS price_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                origin TEXT NOT NULL,
                destination TEXT NOT NULL,
                cabin TEXT NOT NULL,
                min_price REAL NOT NULL,
                avg_price REAL NOT NULL,
                max_price REAL NOT NULL,
                sample_count INTEGER NOT NULL,
                source_mix TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_history_route
                ON price_history (origin, destination, date);
            CREATE TABLE IF NOT EXISTS search_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query_key TEXT NOT NULL,
                cache_state TEXT NOT NULL,
                offer_count INTEGER NOT NULL,
                partial INTEGER NOT NULL,
                duration_ms INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Appends one history row.
    pub fn record(&self, row: &HistoryRow) -> Result<(), StoreError> {
        let source_mix = serde_json::to_string(&row.source_mix)?;
        let conn = self.conn.lock().expect("history lock poisoned");
        conn.execute(
            "INSERT INTO price_history
                (date, origin, destination, cabin, min_price, avg_price,
                 max_price, sample_count, source_mix, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                row.date.to_string(),
                row.origin,
                row.destination,
                row.cabin.as_str(),
                row.min_price,
                row.avg_price,
                row.max_price,
                row.sample_count as i64,
                source_mix,
                row.recorded_at.to_rfc3339(),
            ],
        )?;
        debug!(
            origin = %row.origin,
            destination = %row.destination,
            min = row.min_price,
            "History row recorded"
        );
        Ok(())
    }

    /// Reads history rows for a route within a departure-date range.
    pub fn query_range(
        &self,
        origin: &str,
        destination: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HistoryRow>, StoreError> {
        let conn = self.conn.lock().expect("history lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT date, origin, destination, cabin, min_price, avg_price,
                    max_price, sample_count, source_mix, recorded_at
             FROM price_history
             WHERE origin = ?1 AND destination = ?2
               AND date >= ?3 AND date <= ?4
             ORDER BY recorded_at",
        )?;
        let rows = stmt.query_map(
            params![origin, destination, from.to_string(), to.to_string()],
            |row| {
                let date: String = row.get(0)?;
                let cabin: String = row.get(3)?;
                let source_mix: String = row.get(8)?;
                let recorded_at: String = row.get(9)?;
                Ok(HistoryRow {
                    date: date.parse().unwrap_or_default(),
                    origin: row.get(1)?,
                    destination: row.get(2)?,
                    cabin: CabinClass::parse(&cabin).unwrap_or(CabinClass::Economy),
                    min_price: row.get(4)?,
                    avg_price: row.get(5)?,
                    max_price: row.get(6)?,
                    sample_count: row.get::<_, i64>(7)?.try_into().unwrap_or(0),
                    source_mix: serde_json::from_str(&source_mix).unwrap_or_default(),
                    recorded_at: recorded_at
                        .parse()
                        .unwrap_or_else(|_| Utc::now()),
                })
            },
        )?;
        Ok(rows.filter_map(Result::ok).collect())
    }

    /// Appends one search-log row.
    pub fn log_search(
        &self,
        query_key: &str,
        cache_state: &str,
        offer_count: usize,
        partial: bool,
        duration_ms: u64,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("history lock poisoned");
        conn.execute(
            "INSERT INTO search_log
                (query_key, cache_state, offer_count, partial, duration_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                query_key,
                cache_state,
                offer_count as i64,
                i64::from(partial),
                duration_ms as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
