//! The store gateway trait.
//!
//! A thin, retry-free abstraction over the physical wide-column store. The
//! engine only ever issues bounded scans, point gets, single-row puts and
//! schema fetches; everything else (key construction, decoding, merging) is
//! layered on top.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::error::StoreResult;
use super::scan::{RowRange, ScanOptions};
use super::schema::TableSchema;

/// One raw row returned from a scan: the row key plus string cells keyed by
/// `family:qualifier`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub key: String,
    pub cells: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn with_cell(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.cells.insert(column.into(), value.into());
        self
    }

    pub fn cell(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

/// Synchronous-per-request client abstraction over the physical store.
///
/// # Thread safety
/// Implementations must be `Send + Sync`; a single gateway instance is
/// shared by all in-flight requests.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Scan a table over the given row range with per-call options.
    ///
    /// Rows come back in key order (reverse key order when
    /// `opts.reversed`), truncated to `opts.limit`.
    async fn scan(&self, table: &str, range: &RowRange, opts: &ScanOptions)
        -> StoreResult<Vec<RawRow>>;

    /// Point lookup of a single row.
    async fn get(&self, table: &str, key: &str) -> StoreResult<Option<RawRow>>;

    /// Append-only single-row put.
    async fn put(&self, table: &str, key: &str, cells: &BTreeMap<String, String>)
        -> StoreResult<()>;

    /// Fetch the registered column schema of a table.
    async fn schema(&self, table: &str) -> StoreResult<TableSchema>;
}
