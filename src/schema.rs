//! Schema generations for the metrics table.
//!
//! Two incompatible column sets exist in the field: [`SchemaVersion::V1`]
//! (no per-switch throughput columns) and [`SchemaVersion::Current`]. The
//! generation is fixed per database file: it is stamped into a `schema_meta`
//! table when the metrics table is first created, and opening a stamped file
//! under the other generation is rejected at the store boundary. There is no
//! in-place migration; operators use separate files per generation.

use rusqlite::Connection;

/// A named, versioned set of column definitions for the metrics table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    /// Original column set, without switch throughput counters.
    V1,
    /// Column set including `switch_id` and per-switch throughput counters.
    #[default]
    Current,
}

impl SchemaVersion {
    /// Stamp text stored in `schema_meta`.
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaVersion::V1 => "v1",
            SchemaVersion::Current => "current",
        }
    }

    /// Parse a generation stamp read back from `schema_meta`.
    pub fn parse(stamp: &str) -> Option<Self> {
        match stamp {
            "v1" => Some(SchemaVersion::V1),
            "current" => Some(SchemaVersion::Current),
            _ => None,
        }
    }

    /// DDL for this generation's metrics table and its indexes.
    pub(crate) fn create_table_sql(self) -> &'static str {
        match self {
            SchemaVersion::V1 => V1_TABLE_SQL,
            SchemaVersion::Current => CURRENT_TABLE_SQL,
        }
    }

    pub(crate) fn insert_sql(self) -> &'static str {
        match self {
            SchemaVersion::V1 => {
                "INSERT INTO training_data (timestamp, parallel_requests_start, \
                 parallel_requests_end, parallel_requests_finished, request_type, \
                 system_cpu_usage, requests_per_second, requests_per_minute, \
                 request_execution_time_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            }
            SchemaVersion::Current => {
                "INSERT INTO training_data (timestamp, parallel_requests_start, \
                 parallel_requests_end, parallel_requests_finished, request_type, \
                 system_cpu_usage, requests_per_second, requests_per_minute, \
                 switch_id, bytes_per_second_transmitted, \
                 packets_per_second_transmitted, request_execution_time_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            }
        }
    }

    /// Column list for reads; order must match the row mapping in `crate::row`.
    pub(crate) fn select_columns(self) -> &'static str {
        match self {
            SchemaVersion::V1 => {
                "id, timestamp, parallel_requests_start, parallel_requests_end, \
                 parallel_requests_finished, request_type, system_cpu_usage, \
                 requests_per_second, requests_per_minute, request_execution_time_ms"
            }
            SchemaVersion::Current => {
                "id, timestamp, parallel_requests_start, parallel_requests_end, \
                 parallel_requests_finished, request_type, system_cpu_usage, \
                 requests_per_second, requests_per_minute, switch_id, \
                 bytes_per_second_transmitted, packets_per_second_transmitted, \
                 request_execution_time_ms"
            }
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const V1_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS training_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    parallel_requests_start INTEGER NOT NULL,
    parallel_requests_end INTEGER NOT NULL,
    parallel_requests_finished INTEGER NOT NULL,
    request_type TEXT NOT NULL,
    system_cpu_usage REAL NOT NULL,
    requests_per_second INTEGER NOT NULL,
    requests_per_minute INTEGER NOT NULL,
    request_execution_time_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_training_data_timestamp ON training_data(timestamp);
CREATE INDEX IF NOT EXISTS idx_training_data_request_type ON training_data(request_type);
";

const CURRENT_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS training_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    parallel_requests_start INTEGER NOT NULL,
    parallel_requests_end INTEGER NOT NULL,
    parallel_requests_finished INTEGER NOT NULL,
    request_type TEXT NOT NULL,
    system_cpu_usage REAL NOT NULL,
    requests_per_second INTEGER NOT NULL,
    requests_per_minute INTEGER NOT NULL,
    switch_id INTEGER NOT NULL,
    bytes_per_second_transmitted INTEGER NOT NULL,
    packets_per_second_transmitted INTEGER NOT NULL,
    request_execution_time_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_training_data_timestamp ON training_data(timestamp);
CREATE INDEX IF NOT EXISTS idx_training_data_request_type ON training_data(request_type);
";

const META_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_meta (
    generation TEXT NOT NULL,
    stamped_at TEXT NOT NULL DEFAULT (datetime('now'))
);
";

/// Configure connection pragmas and make sure the metadata table exists.
pub(crate) fn init_connection(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA temp_store = MEMORY;",
    )?;
    conn.execute_batch(META_TABLE_SQL)
}

/// Read the generation stamp, if the file has one.
pub(crate) fn read_generation(conn: &Connection) -> Result<Option<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT generation FROM schema_meta LIMIT 1")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

/// Stamp the file with the generation its table was created under.
pub(crate) fn stamp_generation(
    conn: &Connection,
    version: SchemaVersion,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO schema_meta (generation) VALUES (?1)",
        [version.as_str()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_roundtrip() {
        assert_eq!(SchemaVersion::parse("v1"), Some(SchemaVersion::V1));
        assert_eq!(SchemaVersion::parse("current"), Some(SchemaVersion::Current));
        assert_eq!(SchemaVersion::parse("v3"), None);
        assert_eq!(SchemaVersion::parse(SchemaVersion::V1.as_str()), Some(SchemaVersion::V1));
    }

    #[test]
    fn test_default_is_current() {
        assert_eq!(SchemaVersion::default(), SchemaVersion::Current);
    }

    #[test]
    fn test_read_generation_empty() {
        let conn = Connection::open_in_memory().unwrap();
        init_connection(&conn).unwrap();
        assert_eq!(read_generation(&conn).unwrap(), None);
    }

    #[test]
    fn test_stamp_and_read_generation() {
        let conn = Connection::open_in_memory().unwrap();
        init_connection(&conn).unwrap();
        stamp_generation(&conn, SchemaVersion::V1).unwrap();
        assert_eq!(read_generation(&conn).unwrap().as_deref(), Some("v1"));
    }
}
