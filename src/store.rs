//! SQLite-backed store for cleaned sale records.
//!
//! The store is an explicit handle: every report and lookup takes a
//! `&SalesStore`. The `sales` table is loaded wholesale, once, and is never
//! mutated afterwards.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::SaleRecord;
use crate::error::{Result, SalesError};
use crate::metrics::StoreMetrics;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sales (
    invoice_id      TEXT PRIMARY KEY NOT NULL,
    branch          TEXT NOT NULL,
    city            TEXT NOT NULL,
    category        TEXT NOT NULL,
    unit_price      REAL NOT NULL CHECK (unit_price >= 0),
    quantity        INTEGER NOT NULL CHECK (quantity >= 0),
    date            TEXT NOT NULL,
    time            TEXT NOT NULL,
    payment_method  TEXT NOT NULL,
    rating          REAL NOT NULL CHECK (rating BETWEEN 0 AND 10),
    profit_margin   REAL,
    total           REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sales_branch ON sales (branch);
CREATE INDEX IF NOT EXISTS idx_sales_date ON sales (date);

CREATE TABLE IF NOT EXISTS load_runs (
    run_id         TEXT PRIMARY KEY,
    source         TEXT NOT NULL,
    source_sha256  TEXT NOT NULL,
    rows_loaded    INTEGER NOT NULL,
    loaded_at      TEXT NOT NULL
);

-- One row per branch; equal counts resolve to the alphabetically first method
CREATE VIEW IF NOT EXISTS preferred_payment_per_branch AS
WITH ranked AS (
    SELECT
        branch,
        payment_method,
        COUNT(*) AS no_transactions,
        ROW_NUMBER() OVER (
            PARTITION BY branch
            ORDER BY COUNT(*) DESC, payment_method ASC
        ) AS rn
    FROM sales
    GROUP BY branch, payment_method
)
SELECT branch, payment_method AS preferred_payment_method, no_transactions
FROM ranked
WHERE rn = 1;
"#;

/// Result of a `load` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadOutcome {
    Loaded { run_id: Uuid, rows: usize },
    /// The same input was loaded before; nothing was written
    AlreadyLoaded { run_id: String },
}

/// A row of the `load_runs` ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRun {
    pub run_id: String,
    pub source: String,
    pub source_sha256: String,
    pub rows_loaded: u64,
    pub loaded_at: String,
}

/// A branch's preferred payment method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferredPayment {
    pub branch: String,
    pub preferred_payment_method: String,
    pub no_transactions: u64,
}

pub struct SalesStore {
    conn: Connection,
}

impl SalesStore {
    /// Open (or create) a store file. `:memory:` opens an in-memory store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path == Path::new(":memory:") {
            return Self::open_in_memory();
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        debug!("Opened store at {} (journal_mode={})", path.display(), mode);
        Self::init(conn)
    }

    /// Open a store file that must already exist. Used by commands that only
    /// read, so a mistyped path is an error rather than a new empty store.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path == Path::new(":memory:") {
            return Self::open_in_memory();
        }
        if !path.is_file() {
            return Err(SalesError::StoreMissing(path.display().to_string()));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        debug!("Opened existing store at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Load a cleaned batch. Loading is all-or-nothing inside one transaction.
    #[instrument(skip(self, records), fields(rows = records.len()))]
    pub fn load(&mut self, records: &[SaleRecord], source: &str, source_sha256: &str) -> Result<LoadOutcome> {
        if let Some(run_id) = self.find_load_by_fingerprint(source_sha256)? {
            info!("Input {} already loaded by run {}, skipping", source_sha256, run_id);
            StoreMetrics::record_load_skipped();
            return Ok(LoadOutcome::AlreadyLoaded { run_id });
        }
        let existing = self.record_count()?;
        if existing > 0 {
            return Err(SalesError::StoreNotEmpty {
                existing,
                fingerprint: source_sha256.to_string(),
            });
        }

        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sales (invoice_id, branch, city, category, unit_price, quantity, date, time, payment_method, rating, profit_margin, total)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for r in records {
                stmt.execute(params![
                    r.invoice_id,
                    r.branch,
                    r.city,
                    r.category,
                    r.unit_price,
                    r.quantity,
                    r.date.format("%Y-%m-%d").to_string(),
                    r.time.format("%H:%M:%S").to_string(),
                    r.payment_method,
                    r.rating,
                    r.profit_margin,
                    r.total,
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO load_runs (run_id, source, source_sha256, rows_loaded, loaded_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id.to_string(),
                source,
                source_sha256,
                records.len() as i64,
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;

        StoreMetrics::record_load(records.len(), started.elapsed().as_secs_f64());
        info!("Loaded {} records (run {})", records.len(), run_id);
        Ok(LoadOutcome::Loaded {
            run_id,
            rows: records.len(),
        })
    }

    fn find_load_by_fingerprint(&self, sha256: &str) -> Result<Option<String>> {
        let run_id = self
            .conn
            .query_row(
                "SELECT run_id FROM load_runs WHERE source_sha256 = ?1",
                params![sha256],
                |row| row.get(0),
            )
            .optional()?;
        Ok(run_id)
    }

    pub fn record_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Distinct branch identifiers, sorted
    pub fn branches(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT branch FROM sales ORDER BY branch")?;
        let branches = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(branches)
    }

    pub fn load_runs(&self) -> Result<Vec<LoadRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, source, source_sha256, rows_loaded, loaded_at FROM load_runs ORDER BY loaded_at",
        )?;
        let runs = stmt
            .query_map([], |row| {
                Ok(LoadRun {
                    run_id: row.get(0)?,
                    source: row.get(1)?,
                    source_sha256: row.get(2)?,
                    rows_loaded: row.get::<_, i64>(3)? as u64,
                    loaded_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }

    /// Preferred payment method for one branch. An unknown branch, or one
    /// with no transactions, yields `None`.
    pub fn preferred_payment_for(&self, branch: &str) -> Result<Option<PreferredPayment>> {
        let found = self
            .conn
            .query_row(
                "SELECT branch, preferred_payment_method, no_transactions
                 FROM preferred_payment_per_branch
                 WHERE branch = ?1",
                params![branch],
                |row| {
                    Ok(PreferredPayment {
                        branch: row.get(0)?,
                        preferred_payment_method: row.get(1)?,
                        no_transactions: row.get::<_, i64>(2)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }
}
