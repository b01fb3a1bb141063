//! rast-metrics
//!
//! Local-first persistence for load-test performance measurements: a
//! versioned SQLite-backed metrics store, bounded-memory streaming reads,
//! per-switch per-second flow aggregation with a round-trippable JSON
//! snapshot, and an ML-ready tabular export with ordinal request-type coding.
//!
//! # Example
//!
//! ```ignore
//! use rast_metrics::{export, MetricsStore, StoreConfig, SwitchAggFlowStats};
//!
//! let mut store = MetricsStore::open("./trainingdata.db", StoreConfig::default())?;
//! store.ensure_table()?;
//! store.insert_many(&rows)?;
//!
//! let (frame, request_type_codes) = export(&store, Some(("2021-03-30", "2021-04-05")))?;
//! ```

pub mod export;
pub mod flow;
pub mod ingest;
pub mod row;
pub mod schema;
pub mod store;

pub use export::{export, export_with_codes, MetricsFrame, RequestTypeCodes};
pub use flow::{FlowStatsError, SwitchAggFlowStats};
pub use ingest::{LogfileEntry, ResponseTimeSeries, ResponseTimeSource};
pub use row::{CurrentRecord, MetricsRow, StoredRecord, V1Record};
pub use schema::SchemaVersion;
pub use store::{MetricsStore, RowCursor, StoreConfig, StoreError};
