//! Paged row cursor for streaming reads.
//!
//! Keyset pagination over the identity column: each page re-queries
//! `WHERE id > last_seen` with a constant `LIMIT`, so memory stays bounded by
//! one page regardless of table size. The cursor borrows the store's
//! connection; dropping it on any exit path, including early abandonment,
//! releases the underlying resources.

use std::collections::VecDeque;

use rusqlite::{params, Connection};
use tracing::trace;

use super::StoreError;
use crate::row::{MetricsRow, StoredRecord};
use crate::schema::SchemaVersion;

/// Lazy, forward-only sequence of [`MetricsRow`]s in insertion order.
///
/// Not restartable; a fresh call to the stream method re-executes the scan.
/// A failed page fetch yields the error once and then ends the sequence.
pub struct RowCursor<'conn> {
    conn: &'conn Connection,
    version: SchemaVersion,
    /// Inclusive textual date bounds applied server-side, if any.
    date_filter: Option<(String, String)>,
    page_size: usize,
    last_id: i64,
    buffer: VecDeque<MetricsRow>,
    exhausted: bool,
    failed: bool,
}

impl<'conn> RowCursor<'conn> {
    pub(crate) fn new(
        conn: &'conn Connection,
        version: SchemaVersion,
        date_filter: Option<(String, String)>,
        page_size: usize,
    ) -> Self {
        Self {
            conn,
            version,
            date_filter,
            page_size: page_size.max(1),
            last_id: 0,
            buffer: VecDeque::new(),
            exhausted: false,
            failed: false,
        }
    }

    fn fetch_page(&mut self) -> Result<(), StoreError> {
        let columns = self.version.select_columns();
        let version = self.version;

        let records: Vec<StoredRecord> = match &self.date_filter {
            Some((begin, end)) => {
                let sql = format!(
                    "SELECT {columns} FROM training_data \
                     WHERE id > ?1 AND date(timestamp) BETWEEN ?2 AND ?3 \
                     ORDER BY id LIMIT ?4"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let mapped = stmt.query_map(
                    params![self.last_id, begin, end, self.page_size as i64],
                    |row| StoredRecord::from_sql_row(version, row),
                )?;
                mapped.collect::<Result<_, _>>()?
            }
            None => {
                let sql = format!(
                    "SELECT {columns} FROM training_data WHERE id > ?1 ORDER BY id LIMIT ?2"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let mapped = stmt.query_map(
                    params![self.last_id, self.page_size as i64],
                    |row| StoredRecord::from_sql_row(version, row),
                )?;
                mapped.collect::<Result<_, _>>()?
            }
        };

        if records.len() < self.page_size {
            self.exhausted = true;
        }
        trace!(fetched = records.len(), after_id = self.last_id, "fetched cursor page");

        for record in records {
            self.last_id = record.id();
            self.buffer.push_back(record.into());
        }
        Ok(())
    }
}

impl Iterator for RowCursor<'_> {
    type Item = Result<MetricsRow, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.buffer.is_empty() {
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.failed = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
