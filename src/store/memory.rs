//! In-memory wide-column backend.
//!
//! One ordered map per table; lexicographic key order stands in for the
//! physical store's byte ordering, so prefix and range scans behave the
//! same way. Used by the engine tests and as the default backend of the
//! development server.

use std::collections::BTreeMap;
use std::ops::Bound;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::error::{ErrorContext, StoreError, StoreResult};
use super::gateway::{RawRow, StoreGateway};
use super::scan::{ColumnFilter, RowRange, ScanOptions};
use super::schema::TableSchema;

type Row = BTreeMap<String, String>;

#[derive(Default)]
struct Table {
    rows: BTreeMap<String, Row>,
    schema: TableSchema,
}

/// In-memory store keyed by table name.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with its column schema. Idempotent on the name; the
    /// schema is replaced.
    pub fn create_table(&self, name: &str, schema: TableSchema) {
        let mut tables = self.tables.write();
        let table = tables.entry(name.to_string()).or_default();
        table.schema = schema;
    }

    /// Insert a row directly, for seeding fixtures.
    pub fn insert(&self, table: &str, key: &str, cells: &[(&str, &str)]) {
        let mut tables = self.tables.write();
        let table = tables.entry(table.to_string()).or_default();
        let row = table.rows.entry(key.to_string()).or_default();
        for (col, val) in cells {
            row.insert((*col).to_string(), (*val).to_string());
        }
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    fn filter_row(key: &str, row: &Row, columns: &ColumnFilter) -> RawRow {
        let cells = match columns {
            ColumnFilter::All => row.clone(),
            ColumnFilter::Columns(_) => row
                .iter()
                .filter(|(col, _)| columns.accepts(col))
                .map(|(c, v)| (c.clone(), v.clone()))
                .collect(),
        };
        RawRow {
            key: key.to_string(),
            cells,
        }
    }

    fn matches_evaluation(row: &Row, evaluation: &Option<(String, String)>) -> bool {
        match evaluation {
            None => true,
            Some((column, value)) => row.get(column).map(String::as_str) == Some(value.as_str()),
        }
    }
}

#[async_trait]
impl StoreGateway for MemoryStore {
    async fn scan(
        &self,
        table: &str,
        range: &RowRange,
        opts: &ScanOptions,
    ) -> StoreResult<Vec<RawRow>> {
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::unknown_table(table))?;

        let selected: Box<dyn Iterator<Item = (&String, &Row)>> = match range {
            RowRange::Full => Box::new(t.rows.iter()),
            RowRange::Prefix(prefix) => {
                let prefix = prefix.clone();
                Box::new(
                    t.rows
                        .range::<String, _>((Bound::Included(prefix.clone()), Bound::Unbounded))
                        .take_while(move |(k, _)| k.starts_with(&prefix)),
                )
            }
            RowRange::Between { start, stop } => Box::new(t.rows.range::<String, _>((
                Bound::Included(start.clone()),
                Bound::Included(stop.clone()),
            ))),
        };

        let matching: Vec<(&String, &Row)> = selected
            .filter(|(_, row)| Self::matches_evaluation(row, &opts.evaluation))
            .collect();

        let limited: Vec<RawRow> = if opts.reversed {
            matching
                .into_iter()
                .rev()
                .take(opts.limit)
                .map(|(k, row)| Self::filter_row(k, row, &opts.columns))
                .collect()
        } else {
            matching
                .into_iter()
                .take(opts.limit)
                .map(|(k, row)| Self::filter_row(k, row, &opts.columns))
                .collect()
        };

        Ok(limited)
    }

    async fn get(&self, table: &str, key: &str) -> StoreResult<Option<RawRow>> {
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::unknown_table(table))?;
        Ok(t.rows
            .get(key)
            .map(|row| Self::filter_row(key, row, &ColumnFilter::All)))
    }

    async fn put(
        &self,
        table: &str,
        key: &str,
        cells: &BTreeMap<String, String>,
    ) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::write(
                "empty row key",
                ErrorContext::new("put").with_table(table),
            ));
        }
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::unknown_table(table))?;
        // Last write wins per cell; no ordering guarantee across writers.
        let row = t.rows.entry(key.to_string()).or_default();
        for (col, val) in cells {
            row.insert(col.clone(), val.clone());
        }
        Ok(())
    }

    async fn schema(&self, table: &str) -> StoreResult<TableSchema> {
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::unknown_table(table))?;
        Ok(t.schema.clone())
    }
}
