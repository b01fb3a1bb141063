//! Ingestion-side input contract.
//!
//! The log extractor itself (regex text parsing, file walking) lives outside
//! this crate; what lives here is the shape it must produce. Each relevant
//! log line yields a `(timestamp, response_time_ms)` pair collected into a
//! [`ResponseTimeSeries`], and each measurement becomes a [`LogfileEntry`]
//! from which a partial [`MetricsRow`] is built.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};

use crate::row::MetricsRow;

/// A parsed measurement from one log entry. Only the fields the log actually
/// carries; the remaining [`MetricsRow`] fields are filled in later from
/// system sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct LogfileEntry {
    pub timestamp: NaiveDateTime,
    pub parallel_requests_start: u32,
    pub parallel_requests_end: u32,
    pub parallel_requests_finished: u32,
    pub request_type: String,
    pub response_time_ms: u32,
}

impl MetricsRow {
    /// Partial construction from a parsed log entry. CPU, request rates and
    /// switch throughput default to 0 until merged in.
    pub fn from_logfile_entry(entry: LogfileEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            parallel_requests_start: entry.parallel_requests_start,
            parallel_requests_end: entry.parallel_requests_end,
            parallel_requests_finished: entry.parallel_requests_finished,
            request_type: entry.request_type,
            system_cpu_usage: 0.0,
            requests_per_second: 0,
            requests_per_minute: 0,
            switch_id: 0,
            bytes_per_second_transmitted: 0,
            packets_per_second_transmitted: 0,
            request_execution_time_ms: entry.response_time_ms,
        }
    }
}

/// Interface for the external log extractor collaborator.
pub trait ResponseTimeSource {
    /// Produce the timestamp-keyed response times from one log file.
    fn read_response_times(&mut self) -> std::io::Result<ResponseTimeSeries>;
}

/// Timestamp-keyed response times with collision perturbation.
///
/// Log timestamps can collide when the logger's resolution is coarser than
/// the request rate. A colliding entry is shifted forward by 100µs until it
/// lands on a free key, so both measurements survive; nothing is overwritten
/// or rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseTimeSeries {
    inner: BTreeMap<NaiveDateTime, f64>,
}

impl ResponseTimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a measurement, perturbing the key forward past any collisions.
    pub fn insert(&mut self, timestamp: NaiveDateTime, response_time_ms: f64) {
        let mut key = timestamp;
        while self.inner.contains_key(&key) {
            key += Duration::microseconds(100);
        }
        self.inner.insert(key, response_time_ms);
    }

    pub fn get(&self, timestamp: NaiveDateTime) -> Option<f64> {
        self.inner.get(&timestamp).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Entries in timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.inner.iter().map(|(ts, ms)| (*ts, *ms))
    }
}

impl IntoIterator for ResponseTimeSeries {
    type Item = (NaiveDateTime, f64);
    type IntoIter = std::collections::btree_map::IntoIter<NaiveDateTime, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 3, 30)
            .unwrap()
            .and_hms_micro_opt(9, 41, 17, 500_000)
            .unwrap()
    }

    #[test]
    fn test_collision_shifts_second_entry() {
        let mut series = ResponseTimeSeries::new();
        series.insert(ts(), 120.0);
        series.insert(ts(), 90.0);

        assert_eq!(series.len(), 2);
        assert_eq!(series.get(ts()), Some(120.0));
        assert_eq!(series.get(ts() + Duration::microseconds(100)), Some(90.0));
    }

    #[test]
    fn test_collision_chain_keeps_shifting() {
        let mut series = ResponseTimeSeries::new();
        for i in 0..4 {
            series.insert(ts(), i as f64);
        }

        assert_eq!(series.len(), 4);
        for i in 0..4 {
            let key = ts() + Duration::microseconds(100 * i);
            assert_eq!(series.get(key), Some(i as f64));
        }
    }

    #[test]
    fn test_distinct_timestamps_untouched() {
        let mut series = ResponseTimeSeries::new();
        series.insert(ts(), 10.0);
        series.insert(ts() + Duration::seconds(1), 20.0);

        assert_eq!(series.get(ts()), Some(10.0));
        assert_eq!(series.get(ts() + Duration::seconds(1)), Some(20.0));
    }

    #[test]
    fn test_iter_is_timestamp_ordered() {
        let mut series = ResponseTimeSeries::new();
        series.insert(ts() + Duration::seconds(5), 3.0);
        series.insert(ts(), 1.0);
        series.insert(ts() + Duration::seconds(2), 2.0);

        let values: Vec<f64> = series.iter().map(|(_, ms)| ms).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_logfile_entry_partial_fields() {
        let entry = LogfileEntry {
            timestamp: ts(),
            parallel_requests_start: 3,
            parallel_requests_end: 2,
            parallel_requests_finished: 2,
            request_type: "GET".to_string(),
            response_time_ms: 415,
        };

        let row = MetricsRow::from_logfile_entry(entry);
        assert_eq!(row.timestamp, ts());
        assert_eq!(row.request_execution_time_ms, 415);
        assert_eq!(row.system_cpu_usage, 0.0);
        assert_eq!(row.requests_per_second, 0);
        assert_eq!(row.switch_id, 0);
    }
}
