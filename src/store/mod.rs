//! Persistent metrics store backed by an embedded SQLite file.
//!
//! One table per database file; the column set is fixed by the
//! [`SchemaVersion`] the store was configured with when the table was
//! created. Reads stream through [`RowCursor`], a bounded-memory paged
//! iterator, so result sets never have to fit in memory.
//!
//! # Example
//!
//! ```ignore
//! use rast_metrics::store::{MetricsStore, StoreConfig};
//!
//! let mut store = MetricsStore::open("./trainingdata_2021-04-06.db", StoreConfig::default())?;
//! store.ensure_table()?;
//! store.insert_many(&rows)?;
//! for row in store.stream_between("2021-03-30", "2021-04-05") {
//!     let row = row?;
//!     // ...
//! }
//! ```

mod cursor;

pub use cursor::RowCursor;

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::debug;

use crate::row::MetricsRow;
use crate::schema::{self, SchemaVersion};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database file unreachable or corrupt at open. Not retried; the store
    /// is local and transient failure is not expected.
    #[error("failed to open metrics database: {0}")]
    Connection(#[source] rusqlite::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The file was stamped under one generation and the store was configured
    /// for the other.
    #[error("schema generation mismatch: database is '{found}', store configured for '{expected}'")]
    SchemaMismatch {
        found: SchemaVersion,
        expected: SchemaVersion,
    },

    /// The generation stamp in the file is not one this build knows.
    #[error("unknown schema generation stamp: '{0}'")]
    UnknownGeneration(String),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store construction parameters.
///
/// The schema generation is owned by the store instance, not by the process:
/// two stores with different generations can coexist, each bound to its own
/// file.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Generation the metrics table is created and read under.
    pub schema_version: SchemaVersion,
    /// Rows fetched per page while streaming.
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { schema_version: SchemaVersion::default(), page_size: 1000 }
    }
}

impl StoreConfig {
    /// Config for the given generation with the default page size.
    pub fn for_version(schema_version: SchemaVersion) -> Self {
        Self { schema_version, ..Self::default() }
    }
}

/// Embedded store for one metrics table.
#[derive(Debug)]
pub struct MetricsStore {
    conn: Connection,
    config: StoreConfig,
}

impl MetricsStore {
    /// Open or create a database file at `path`.
    ///
    /// Fails with [`StoreError::Connection`] if the file is unreachable and
    /// with [`StoreError::SchemaMismatch`] if the file carries a generation
    /// stamp that contradicts `config`.
    pub fn open<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::Connection)?;
        Self::initialize(conn, config)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(config: StoreConfig) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::Connection)?;
        Self::initialize(conn, config)
    }

    fn initialize(conn: Connection, config: StoreConfig) -> Result<Self> {
        schema::init_connection(&conn)?;
        let store = Self { conn, config };
        store.validate_generation()?;
        Ok(store)
    }

    fn validate_generation(&self) -> Result<()> {
        if let Some(stamp) = schema::read_generation(&self.conn)? {
            let found = SchemaVersion::parse(&stamp)
                .ok_or(StoreError::UnknownGeneration(stamp))?;
            if found != self.config.schema_version {
                return Err(StoreError::SchemaMismatch {
                    found,
                    expected: self.config.schema_version,
                });
            }
        }
        Ok(())
    }

    /// Generation this store reads and writes under.
    pub fn schema_version(&self) -> SchemaVersion {
        self.config.schema_version
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create the metrics table for the configured generation if absent.
    ///
    /// Idempotent; never alters existing columns. Stamps the file with the
    /// generation on first creation.
    pub fn ensure_table(&self) -> Result<()> {
        self.conn
            .execute_batch(self.config.schema_version.create_table_sql())?;
        if schema::read_generation(&self.conn)?.is_none() {
            schema::stamp_generation(&self.conn, self.config.schema_version)?;
        }
        Ok(())
    }

    /// Whether any stored row's timestamp falls on the given calendar date.
    ///
    /// Used by ingestion to skip log files that were already processed.
    pub fn exists_for_date(&self, date: NaiveDate) -> Result<bool> {
        let day = date.format("%Y-%m-%d").to_string();
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM training_data WHERE date(timestamp) = ?1)",
            [day],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Bulk-append rows inside one transaction.
    ///
    /// No uniqueness constraint beyond the identity column; duplicate logical
    /// events are allowed. Idempotence is the caller's responsibility,
    /// enforced via [`exists_for_date`](Self::exists_for_date).
    pub fn insert_many(&mut self, rows: &[MetricsRow]) -> Result<usize> {
        let version = self.config.schema_version;
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(version.insert_sql())?;
            for row in rows {
                match version {
                    SchemaVersion::V1 => stmt.execute(params![
                        row.timestamp,
                        row.parallel_requests_start as i64,
                        row.parallel_requests_end as i64,
                        row.parallel_requests_finished as i64,
                        row.request_type,
                        row.system_cpu_usage,
                        row.requests_per_second as i64,
                        row.requests_per_minute as i64,
                        row.request_execution_time_ms as i64,
                    ])?,
                    SchemaVersion::Current => stmt.execute(params![
                        row.timestamp,
                        row.parallel_requests_start as i64,
                        row.parallel_requests_end as i64,
                        row.parallel_requests_finished as i64,
                        row.request_type,
                        row.system_cpu_usage,
                        row.requests_per_second as i64,
                        row.requests_per_minute as i64,
                        row.switch_id as i64,
                        row.bytes_per_second_transmitted as i64,
                        row.packets_per_second_transmitted as i64,
                        row.request_execution_time_ms as i64,
                    ])?,
                };
            }
        }
        tx.commit()?;
        debug!(rows = rows.len(), "inserted metrics rows");
        Ok(rows.len())
    }

    /// Total number of stored rows.
    pub fn row_count(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM training_data", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Stream every row in insertion order.
    ///
    /// The cursor fetches constant-size pages; at no point does the full
    /// result set reside in memory. Forward-only and not restartable: a fresh
    /// call re-executes the scan. Dropping the cursor releases it.
    pub fn stream_all(&self) -> RowCursor<'_> {
        RowCursor::new(&self.conn, self.config.schema_version, None, self.config.page_size)
    }

    /// Stream rows whose calendar date lies in `begin..=end`, in insertion
    /// order.
    ///
    /// The bounds are inclusive textual dates (`YYYY-MM-DD`) compared
    /// server-side against `date(timestamp)`. `begin == end` yields exactly
    /// that day; reversed bounds yield an empty cursor.
    pub fn stream_between(&self, begin: &str, end: &str) -> RowCursor<'_> {
        RowCursor::new(
            &self.conn,
            self.config.schema_version,
            Some((begin.to_string(), end.to_string())),
            self.config.page_size,
        )
    }
}
