//! Nightly statistics lookups.

use crate::error::PortalResult;
use crate::format::{FormatOptions, FormattedTable};
use crate::query::StatsQuery;
use crate::store::{Index, RowRange, ScanOptions, StoreGateway};

use super::format_scan;

/// Row-key prefix of the statistics table; one row per observing night.
const NIGHTLY_PREFIX: &str = "nightly_";

/// Fetch nightly statistics rows by date prefix, or the statistics column
/// list when `schema_only` is set.
pub async fn statistics(
    store: &dyn StoreGateway,
    query: &StatsQuery,
) -> PortalResult<FormattedTable> {
    if query.schema_only {
        let schema = store.schema(Index::Statistics.table_name()).await?;
        let names = schema.column_names().map(str::to_string).collect();
        return Ok(FormattedTable::single_column("schema", names));
    }

    let range = RowRange::prefix(format!("{}{}", NIGHTLY_PREFIX, query.date));
    let opts = ScanOptions::default().with_columns(query.columns.clone());
    let rows = store
        .scan(Index::Statistics.table_name(), &range, &opts)
        .await?;
    // statistics rows carry no science payload, so derived columns never apply
    let fmt = FormatOptions::default().truncated(true);
    format_scan(store, Index::Statistics, &rows, &fmt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures;
    use crate::store::{CellValue, ColumnFilter};

    fn query(date: &str, schema_only: bool) -> StatsQuery {
        StatsQuery {
            date: date.to_string(),
            columns: ColumnFilter::All,
            schema_only,
        }
    }

    #[tokio::test]
    async fn test_single_night() {
        let store = fixtures::seeded_store();
        let table = statistics(&store, &query("20210301", false)).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "basic:sci"), CellValue::Int(180000));
    }

    #[tokio::test]
    async fn test_month_prefix_matches_all_nights() {
        let store = fixtures::seeded_store();
        let table = statistics(&store, &query("202103", false)).await.unwrap();
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_schema_listing() {
        let store = fixtures::seeded_store();
        let table = statistics(&store, &query("", true)).await.unwrap();
        assert_eq!(table.columns(), &["schema".to_string()]);
        let names: Vec<String> = table
            .records()
            .iter()
            .filter_map(|r| r.get("schema").and_then(CellValue::as_str))
            .map(str::to_string)
            .collect();
        assert!(names.contains(&"basic:raw".to_string()));
    }

    #[tokio::test]
    async fn test_column_restriction() {
        let store = fixtures::seeded_store();
        let q = StatsQuery {
            date: "20210301".to_string(),
            columns: ColumnFilter::parse("basic:raw"),
            schema_only: false,
        };
        let table = statistics(&store, &q).await.unwrap();
        assert_eq!(table.columns(), &["basic:raw".to_string()]);
    }
}
