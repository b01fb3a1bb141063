//! ML-ready tabular export of stored metrics.
//!
//! Streams rows out of a [`MetricsStore`] and flattens each one into a fixed
//! column order of `f64` features, assigning a stable ordinal code to every
//! distinct request type on first sighting. The code map is returned to the
//! caller; feeding it back into a later export keeps codes reproducible
//! across calls.

use std::collections::HashMap;
use std::time::Instant;

use chrono::Datelike;
use tracing::debug;

use crate::schema::SchemaVersion;
use crate::store::{MetricsStore, Result};

/// Ordinal encoding of request-type strings: each distinct value gets the
/// next integer code on first sighting.
pub type RequestTypeCodes = HashMap<String, i64>;

/// Column headers for the V1 column set.
const V1_COLUMNS: &[&str] = &[
    "Timestamp",
    "WeekDay",
    "PR1",
    "PR2",
    "PR3",
    "RequestType",
    "CPU",
    "RPS",
    "RPM",
    "ResponseTimeSeconds",
];

/// Column headers for the current column set.
const CURRENT_COLUMNS: &[&str] = &[
    "Timestamp",
    "WeekDay",
    "PR1",
    "PR2",
    "PR3",
    "RequestType",
    "CPU",
    "RPS",
    "RPM",
    "SwitchID",
    "BytesPerSec",
    "PacketsPerSec",
    "ResponseTimeSeconds",
];

/// Tabular export output: one `f64` row per stored row, fixed column order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsFrame {
    columns: &'static [&'static str],
    rows: Vec<Vec<f64>>,
}

impl MetricsFrame {
    fn new(version: SchemaVersion) -> Self {
        let columns = match version {
            SchemaVersion::V1 => V1_COLUMNS,
            SchemaVersion::Current => CURRENT_COLUMNS,
        };
        Self { columns, rows: Vec::new() }
    }

    pub fn columns(&self) -> &[&'static str] {
        self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Export all stored rows, or only those within an inclusive `YYYY-MM-DD`
/// date range, starting from an empty code map.
pub fn export(
    store: &MetricsStore,
    date_range: Option<(&str, &str)>,
) -> Result<(MetricsFrame, RequestTypeCodes)> {
    export_with_codes(store, date_range, RequestTypeCodes::new())
}

/// Export with a pre-seeded code map, so request-type codes stay stable
/// across separate export calls.
///
/// Rows come out in insertion order, one output row per input row; nothing
/// is reordered or deduplicated. The elapsed wall time of the whole export
/// is emitted as a diagnostic event.
pub fn export_with_codes(
    store: &MetricsStore,
    date_range: Option<(&str, &str)>,
    mut codes: RequestTypeCodes,
) -> Result<(MetricsFrame, RequestTypeCodes)> {
    let started = Instant::now();
    let version = store.schema_version();
    let mut frame = MetricsFrame::new(version);

    let cursor = match date_range {
        Some((begin, end)) => store.stream_between(begin, end),
        None => store.stream_all(),
    };

    for row in cursor {
        let row = row?;

        let next_code = codes.len() as i64;
        let code = *codes.entry(row.request_type.clone()).or_insert(next_code);

        // Fractional epoch seconds; weekday indexed Monday = 0.
        let epoch_seconds = row.timestamp.and_utc().timestamp_micros() as f64 / 1e6;
        let weekday = row.timestamp.weekday().num_days_from_monday() as f64;

        let mut record = vec![
            epoch_seconds,
            weekday,
            row.parallel_requests_start as f64,
            row.parallel_requests_end as f64,
            row.parallel_requests_finished as f64,
            code as f64,
            row.system_cpu_usage,
            row.requests_per_second as f64,
            row.requests_per_minute as f64,
        ];
        if version == SchemaVersion::Current {
            record.push(row.switch_id as f64);
            record.push(row.bytes_per_second_transmitted as f64);
            record.push(row.packets_per_second_transmitted as f64);
        }
        record.push(row.request_execution_time_ms as f64 / 1000.0);

        frame.rows.push(record);
    }

    debug!(
        rows = frame.len(),
        elapsed_s = started.elapsed().as_secs_f64(),
        "metrics export finished"
    );

    Ok((frame, codes))
}
