//! Immutable per-call scan options.
//!
//! The underlying store exposes limit/range/reverse as mutable per-handle
//! state. That state must never leak between queries, so the gateway
//! contract takes a fresh [`ScanOptions`] value on every call and restores
//! nothing: there is simply no shared mutable state to restore.

/// Default row cap applied when the caller did not set an explicit limit.
/// Every scan issued by the engine is bounded.
pub const DEFAULT_SCAN_LIMIT: usize = 10_000;

/// Which rows a scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRange {
    /// Every row of the table.
    Full,
    /// Rows whose key starts with the given prefix.
    Prefix(String),
    /// Rows with `start <= key <= stop` in lexicographic order.
    Between { start: String, stop: String },
}

impl RowRange {
    pub fn prefix(p: impl Into<String>) -> Self {
        Self::Prefix(p.into())
    }

    pub fn between(start: impl Into<String>, stop: impl Into<String>) -> Self {
        Self::Between {
            start: start.into(),
            stop: stop.into(),
        }
    }
}

/// Which columns a scan returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnFilter {
    /// All columns (`*`).
    #[default]
    All,
    /// Only the named columns.
    Columns(Vec<String>),
}

impl ColumnFilter {
    /// Parse the wire form: `*` or a comma-separated column list.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.replace(' ', "");
        if spec.is_empty() || spec == "*" {
            Self::All
        } else {
            Self::Columns(spec.split(',').map(str::to_string).collect())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn accepts(&self, column: &str) -> bool {
        match self {
            Self::All => true,
            Self::Columns(cols) => cols.iter().any(|c| c == column),
        }
    }
}

/// Options for one scan, constructed fresh per call.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub columns: ColumnFilter,
    /// Maximum number of rows returned.
    pub limit: usize,
    /// Most-recent-first iteration.
    pub reversed: bool,
    /// Optional cell-value predicate `(column, value)`; only rows whose
    /// cell equals the value are returned.
    pub evaluation: Option<(String, String)>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            columns: ColumnFilter::All,
            limit: DEFAULT_SCAN_LIMIT,
            reversed: false,
            evaluation: None,
        }
    }
}

impl ScanOptions {
    pub fn with_columns(mut self, filter: ColumnFilter) -> Self {
        self.columns = filter;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = if limit == 0 { DEFAULT_SCAN_LIMIT } else { limit };
        self
    }

    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    pub fn with_evaluation(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.evaluation = Some((column.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_filter_parse_star() {
        assert!(ColumnFilter::parse("*").is_all());
        assert!(ColumnFilter::parse("").is_all());
    }

    #[test]
    fn test_column_filter_parse_list_strips_spaces() {
        let f = ColumnFilter::parse("i:jd, i:ra");
        assert!(f.accepts("i:jd"));
        assert!(f.accepts("i:ra"));
        assert!(!f.accepts("i:dec"));
    }

    #[test]
    fn test_zero_limit_falls_back_to_default() {
        let opts = ScanOptions::default().with_limit(0);
        assert_eq!(opts.limit, DEFAULT_SCAN_LIMIT);
    }
}
