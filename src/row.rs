//! Measurement rows and their per-generation stored shapes.
//!
//! [`MetricsRow`] is the generation-agnostic view callers work with. On disk a
//! row is one of two explicit shapes, [`V1Record`] or [`CurrentRecord`],
//! carried by the [`StoredRecord`] tagged union; the `From` adapter produces
//! the uniform row and structurally defaults the fields V1 never stored.

use chrono::NaiveDateTime;
use rusqlite::Row;

use crate::schema::SchemaVersion;

/// One normalized measurement event.
///
/// Constructed either partially from a parsed log entry (see
/// [`MetricsRow::from_logfile_entry`](crate::ingest)) or fully from a stored
/// record. Plain owned value; no shared ownership.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    pub timestamp: NaiveDateTime,
    pub parallel_requests_start: u32,
    pub parallel_requests_end: u32,
    pub parallel_requests_finished: u32,
    pub request_type: String,
    pub system_cpu_usage: f64,
    pub requests_per_second: u32,
    pub requests_per_minute: u32,
    /// Identifier of the switch the request was routed through. 0 under V1.
    pub switch_id: u32,
    /// Bytes/s transmitted through the switch. 0 under V1.
    pub bytes_per_second_transmitted: u64,
    /// Packets/s transmitted through the switch. 0 under V1.
    pub packets_per_second_transmitted: u64,
    pub request_execution_time_ms: u32,
}

/// Stored shape under the V1 generation.
#[derive(Debug, Clone, PartialEq)]
pub struct V1Record {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub parallel_requests_start: u32,
    pub parallel_requests_end: u32,
    pub parallel_requests_finished: u32,
    pub request_type: String,
    pub system_cpu_usage: f64,
    pub requests_per_second: u32,
    pub requests_per_minute: u32,
    pub request_execution_time_ms: u32,
}

/// Stored shape under the current generation.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentRecord {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub parallel_requests_start: u32,
    pub parallel_requests_end: u32,
    pub parallel_requests_finished: u32,
    pub request_type: String,
    pub system_cpu_usage: f64,
    pub requests_per_second: u32,
    pub requests_per_minute: u32,
    pub switch_id: u32,
    pub bytes_per_second_transmitted: u64,
    pub packets_per_second_transmitted: u64,
    pub request_execution_time_ms: u32,
}

/// A row as it exists on disk, tagged with its generation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRecord {
    V1(V1Record),
    Current(CurrentRecord),
}

impl StoredRecord {
    /// Identity column value, used for keyset pagination.
    pub fn id(&self) -> i64 {
        match self {
            StoredRecord::V1(r) => r.id,
            StoredRecord::Current(r) => r.id,
        }
    }

    /// Map one result row; column order must match
    /// [`SchemaVersion::select_columns`].
    pub(crate) fn from_sql_row(
        version: SchemaVersion,
        row: &Row<'_>,
    ) -> Result<Self, rusqlite::Error> {
        match version {
            SchemaVersion::V1 => Ok(StoredRecord::V1(V1Record {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                parallel_requests_start: row.get::<_, i64>(2)? as u32,
                parallel_requests_end: row.get::<_, i64>(3)? as u32,
                parallel_requests_finished: row.get::<_, i64>(4)? as u32,
                request_type: row.get(5)?,
                system_cpu_usage: row.get(6)?,
                requests_per_second: row.get::<_, i64>(7)? as u32,
                requests_per_minute: row.get::<_, i64>(8)? as u32,
                request_execution_time_ms: row.get::<_, i64>(9)? as u32,
            })),
            SchemaVersion::Current => Ok(StoredRecord::Current(CurrentRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                parallel_requests_start: row.get::<_, i64>(2)? as u32,
                parallel_requests_end: row.get::<_, i64>(3)? as u32,
                parallel_requests_finished: row.get::<_, i64>(4)? as u32,
                request_type: row.get(5)?,
                system_cpu_usage: row.get(6)?,
                requests_per_second: row.get::<_, i64>(7)? as u32,
                requests_per_minute: row.get::<_, i64>(8)? as u32,
                switch_id: row.get::<_, i64>(9)? as u32,
                bytes_per_second_transmitted: row.get::<_, i64>(10)? as u64,
                packets_per_second_transmitted: row.get::<_, i64>(11)? as u64,
                request_execution_time_ms: row.get::<_, i64>(12)? as u32,
            })),
        }
    }
}

impl From<StoredRecord> for MetricsRow {
    fn from(record: StoredRecord) -> Self {
        match record {
            StoredRecord::V1(r) => MetricsRow {
                timestamp: r.timestamp,
                parallel_requests_start: r.parallel_requests_start,
                parallel_requests_end: r.parallel_requests_end,
                parallel_requests_finished: r.parallel_requests_finished,
                request_type: r.request_type,
                system_cpu_usage: r.system_cpu_usage,
                requests_per_second: r.requests_per_second,
                requests_per_minute: r.requests_per_minute,
                switch_id: 0,
                bytes_per_second_transmitted: 0,
                packets_per_second_transmitted: 0,
                request_execution_time_ms: r.request_execution_time_ms,
            },
            StoredRecord::Current(r) => MetricsRow {
                timestamp: r.timestamp,
                parallel_requests_start: r.parallel_requests_start,
                parallel_requests_end: r.parallel_requests_end,
                parallel_requests_finished: r.parallel_requests_finished,
                request_type: r.request_type,
                system_cpu_usage: r.system_cpu_usage,
                requests_per_second: r.requests_per_second,
                requests_per_minute: r.requests_per_minute,
                switch_id: r.switch_id,
                bytes_per_second_transmitted: r.bytes_per_second_transmitted,
                packets_per_second_transmitted: r.packets_per_second_transmitted,
                request_execution_time_ms: r.request_execution_time_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 3, 30)
            .unwrap()
            .and_hms_opt(14, 30, 5)
            .unwrap()
    }

    #[test]
    fn test_v1_record_defaults_throughput_fields() {
        let record = StoredRecord::V1(V1Record {
            id: 7,
            timestamp: ts(),
            parallel_requests_start: 4,
            parallel_requests_end: 3,
            parallel_requests_finished: 2,
            request_type: "GET".to_string(),
            system_cpu_usage: 0.25,
            requests_per_second: 10,
            requests_per_minute: 600,
            request_execution_time_ms: 120,
        });

        let row = MetricsRow::from(record);
        assert_eq!(row.switch_id, 0);
        assert_eq!(row.bytes_per_second_transmitted, 0);
        assert_eq!(row.packets_per_second_transmitted, 0);
        assert_eq!(row.request_execution_time_ms, 120);
        assert_eq!(row.request_type, "GET");
    }

    #[test]
    fn test_current_record_carries_throughput_fields() {
        let record = StoredRecord::Current(CurrentRecord {
            id: 1,
            timestamp: ts(),
            parallel_requests_start: 1,
            parallel_requests_end: 1,
            parallel_requests_finished: 1,
            request_type: "POST".to_string(),
            system_cpu_usage: 0.5,
            requests_per_second: 5,
            requests_per_minute: 300,
            switch_id: 3,
            bytes_per_second_transmitted: 1024,
            packets_per_second_transmitted: 64,
            request_execution_time_ms: 80,
        });

        let row = MetricsRow::from(record);
        assert_eq!(row.switch_id, 3);
        assert_eq!(row.bytes_per_second_transmitted, 1024);
        assert_eq!(row.packets_per_second_transmitted, 64);
    }
}
