//! Per-switch flow aggregation at one-second granularity.
//!
//! Collectors emit byte and packet counters per switch; samples arriving
//! within the same wall-clock second are summed into one bucket keyed by
//! time-of-day (the date is discarded: flow stats are only ever queried
//! within a day). The snapshot serializes to JSON with canonical `HH:MM:SS`
//! keys and round-trips losslessly.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Local, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from snapshot decoding.
#[derive(Debug, Error)]
pub enum FlowStatsError {
    /// The snapshot text does not match the expected shape, e.g. a malformed
    /// time-of-day key.
    #[error("malformed flow stats snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Accumulated per-second throughput counters for one network switch.
///
/// Both mappings always hold the same key set: every accumulation writes to
/// both. There is no internal locking; concurrent producers must go through
/// caller-supplied exclusion (the `&mut` receivers make the single-writer
/// discipline explicit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchAggFlowStats {
    pub switch_id: u32,
    bytes_per_second_received: BTreeMap<NaiveTime, u64>,
    packets_per_second_received: BTreeMap<NaiveTime, u64>,
}

fn truncate_to_second(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}

impl SwitchAggFlowStats {
    pub fn new(switch_id: u32) -> Self {
        Self {
            switch_id,
            bytes_per_second_received: BTreeMap::new(),
            packets_per_second_received: BTreeMap::new(),
        }
    }

    /// Accumulate a sample against the current wall-clock second.
    pub fn add_agg_flow_stats(&mut self, bytes_per_second: u64, packets_per_second: u64) {
        self.record_at(Local::now().time(), bytes_per_second, packets_per_second);
    }

    /// Accumulate a sample against an explicit time of day.
    ///
    /// The key is truncated to whole seconds; a second sample within the same
    /// second is summed into the existing bucket, never replacing it.
    pub fn record_at(&mut self, time: NaiveTime, bytes_per_second: u64, packets_per_second: u64) {
        let key = truncate_to_second(time);
        *self.bytes_per_second_received.entry(key).or_insert(0) += bytes_per_second;
        *self.packets_per_second_received.entry(key).or_insert(0) += packets_per_second;
    }

    /// Bytes/s accumulated for the second `timestamp` falls in; 0 if unseen.
    pub fn get_bytes_per_second_for(&self, timestamp: NaiveDateTime) -> u64 {
        let key = truncate_to_second(timestamp.time());
        self.bytes_per_second_received.get(&key).copied().unwrap_or(0)
    }

    /// Packets/s accumulated for the second `timestamp` falls in; 0 if unseen.
    pub fn get_packets_per_second_for(&self, timestamp: NaiveDateTime) -> u64 {
        let key = truncate_to_second(timestamp.time());
        self.packets_per_second_received.get(&key).copied().unwrap_or(0)
    }

    /// Number of distinct seconds sampled.
    pub fn len(&self) -> usize {
        self.bytes_per_second_received.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes_per_second_received.is_empty()
    }

    /// Serialize to the JSON snapshot format.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Reconstruct a snapshot; malformed text is a parse error.
    pub fn from_json(s: &str) -> Result<Self, FlowStatsError> {
        Ok(serde_json::from_str(s)?)
    }
}

impl fmt::Display for SwitchAggFlowStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_same_second_samples_are_summed() {
        let mut stats = SwitchAggFlowStats::new(1);
        stats.record_at(at(10, 15, 30), 100, 10);
        stats.record_at(at(10, 15, 30), 50, 5);

        let ts = chrono::NaiveDate::from_ymd_opt(2021, 4, 1)
            .unwrap()
            .and_hms_opt(10, 15, 30)
            .unwrap();
        assert_eq!(stats.get_bytes_per_second_for(ts), 150);
        assert_eq!(stats.get_packets_per_second_for(ts), 15);
    }

    #[test]
    fn test_sub_second_samples_share_a_bucket() {
        let mut stats = SwitchAggFlowStats::new(1);
        let fractional = at(8, 0, 12).with_nanosecond(250_000_000).unwrap();
        stats.record_at(fractional, 40, 4);
        stats.record_at(at(8, 0, 12), 60, 6);

        let ts = chrono::NaiveDate::from_ymd_opt(2021, 4, 1)
            .unwrap()
            .and_hms_opt(8, 0, 12)
            .unwrap();
        assert_eq!(stats.get_bytes_per_second_for(ts), 100);
        assert_eq!(stats.len(), 1);
    }

    #[test]
    fn test_unseen_second_defaults_to_zero() {
        let stats = SwitchAggFlowStats::new(2);
        let ts = chrono::NaiveDate::from_ymd_opt(2021, 4, 1)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(stats.get_bytes_per_second_for(ts), 0);
        assert_eq!(stats.get_packets_per_second_for(ts), 0);
    }

    #[test]
    fn test_add_agg_flow_stats_samples_now() {
        let mut stats = SwitchAggFlowStats::new(3);
        stats.add_agg_flow_stats(10, 1);
        assert_eq!(stats.len(), 1);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut stats = SwitchAggFlowStats::new(7);
        stats.record_at(at(0, 0, 1), 100, 10);
        stats.record_at(at(12, 30, 45), 2048, 256);
        stats.record_at(at(12, 30, 45), 1, 1);
        stats.record_at(at(23, 59, 59), 7, 3);

        let json = stats.to_json();
        let decoded = SwitchAggFlowStats::from_json(&json).unwrap();
        assert_eq!(decoded, stats);
    }

    #[test]
    fn test_snapshot_keys_are_canonical() {
        let mut stats = SwitchAggFlowStats::new(1);
        stats.record_at(at(9, 5, 3), 1, 1);
        assert!(stats.to_json().contains("\"09:05:03\""));
    }

    #[test]
    fn test_malformed_key_is_a_parse_error() {
        let text = r#"{
            "switch_id": 1,
            "bytes_per_second_received": {"not-a-time": 5},
            "packets_per_second_received": {}
        }"#;
        assert!(matches!(
            SwitchAggFlowStats::from_json(text),
            Err(FlowStatsError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_field_is_a_parse_error() {
        let text = r#"{"switch_id": 1}"#;
        assert!(SwitchAggFlowStats::from_json(text).is_err());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_snapshot_round_trip(
            samples in prop::collection::vec(
                (0u32..24, 0u32..60, 0u32..60, 0u64..1_000_000, 0u64..100_000),
                0..50,
            )
        ) {
            let mut stats = SwitchAggFlowStats::new(42);
            for (h, m, s, bytes, packets) in samples {
                let time = NaiveTime::from_hms_opt(h, m, s).unwrap();
                stats.record_at(time, bytes, packets);
            }

            let decoded = SwitchAggFlowStats::from_json(&stats.to_json()).unwrap();
            prop_assert_eq!(decoded, stats);
        }

        #[test]
        fn prop_lookup_never_fails(h in 0u32..24, m in 0u32..60, s in 0u32..60) {
            let stats = SwitchAggFlowStats::new(1);
            let ts = chrono::NaiveDate::from_ymd_opt(2021, 1, 1)
                .unwrap()
                .and_hms_opt(h, m, s)
                .unwrap();
            prop_assert_eq!(stats.get_bytes_per_second_for(ts), 0);
            prop_assert_eq!(stats.get_packets_per_second_for(ts), 0);
        }
    }
}
