//! Tabular result structure with a stable column ordering.

use std::collections::{BTreeMap, BTreeSet};

use crate::store::CellValue;

/// One decoded result row: column identifier to typed value.
pub type Record = BTreeMap<String, CellValue>;

/// A formatted, column-ordered result table.
///
/// Columns are the union of all record columns, ordered lexicographically;
/// that ordering is deterministic for a fixed input, so repeated queries
/// against an unchanged store serialize byte-identically. Records missing a
/// column read as [`CellValue::Null`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattedTable {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl FormattedTable {
    pub fn new(records: Vec<Record>) -> Self {
        let columns: BTreeSet<String> = records
            .iter()
            .flat_map(|r| r.keys().cloned())
            .collect();
        Self {
            columns: columns.into_iter().collect(),
            records,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a one-column table, used for schema listings.
    pub fn single_column(name: &str, values: Vec<String>) -> Self {
        let records = values
            .into_iter()
            .map(|v| {
                let mut record = Record::new();
                record.insert(name.to_string(), CellValue::Str(v));
                record
            })
            .collect();
        Self::new(records)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Typed cell access; missing cells read as `Null`.
    pub fn value(&self, row: usize, column: &str) -> CellValue {
        self.records
            .get(row)
            .and_then(|r| r.get(column))
            .cloned()
            .unwrap_or(CellValue::Null)
    }

    /// Numeric view of one column; missing or non-numeric cells are `None`.
    pub fn f64_column(&self, column: &str) -> Vec<Option<f64>> {
        self.records
            .iter()
            .map(|r| r.get(column).and_then(CellValue::as_f64))
            .collect()
    }

    /// The set of `(column, text value)` pairs over all records, used by
    /// round-trip tests. `Null` cells are skipped.
    pub fn value_pairs(&self) -> BTreeSet<(String, String)> {
        self.records
            .iter()
            .flat_map(|r| {
                r.iter()
                    .filter(|(_, v)| !matches!(v, CellValue::Null))
                    .map(|(c, v)| (c.clone(), v.to_text()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, CellValue)]) -> Record {
        pairs
            .iter()
            .map(|(c, v)| (c.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_column_union_is_sorted() {
        let table = FormattedTable::new(vec![
            record(&[("i:jd", CellValue::Double(1.0))]),
            record(&[("d:tag", CellValue::Str("valid".into()))]),
        ]);
        assert_eq!(table.columns(), &["d:tag".to_string(), "i:jd".to_string()]);
    }

    #[test]
    fn test_missing_cell_reads_null() {
        let table = FormattedTable::new(vec![
            record(&[("i:jd", CellValue::Double(1.0))]),
            record(&[("d:tag", CellValue::Str("valid".into()))]),
        ]);
        assert_eq!(table.value(1, "i:jd"), CellValue::Null);
        assert_eq!(table.value(0, "i:jd"), CellValue::Double(1.0));
    }

    #[test]
    fn test_value_pairs_skips_null() {
        let table = FormattedTable::new(vec![record(&[
            ("i:jd", CellValue::Double(1.0)),
            ("d:gap", CellValue::Null),
        ])]);
        let pairs = table.value_pairs();
        assert_eq!(pairs.len(), 1);
        assert!(pairs.contains(&("i:jd".to_string(), "1".to_string())));
    }

    #[test]
    fn test_single_column() {
        let table = FormattedTable::single_column("schema", vec!["a".into(), "b".into()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), &["schema".to_string()]);
    }
}
