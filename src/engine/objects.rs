//! Object lookup on the main alert table.

use crate::error::PortalResult;
use crate::format::formatter::decode_rows;
use crate::format::{format_rows, merge_photometry, FormatOptions, FormattedTable};
use crate::models::KEY_SEPARATOR;
use crate::query::ObjectQuery;
use crate::store::{Index, RowRange, ScanOptions, StoreGateway};

/// Fetch the full alert history of one or more objects.
///
/// With `with_upper_limits`, the upper-limit and below-quality-threshold
/// histories are merged in, tagged and deduplicated against the valid set.
pub async fn fetch_objects(
    store: &dyn StoreGateway,
    query: &ObjectQuery,
) -> PortalResult<FormattedTable> {
    let opts = ScanOptions::default().with_columns(query.columns.clone());
    let mut valid_rows = Vec::new();
    let mut upper_rows = Vec::new();
    let mut bad_rows = Vec::new();
    for oid in &query.object_ids {
        let range = RowRange::prefix(format!("{}{}", oid, KEY_SEPARATOR));
        valid_rows.extend(
            store
                .scan(Index::Objects.table_name(), &range, &opts)
                .await?,
        );
        if query.with_upper_limits {
            upper_rows.extend(
                store
                    .scan(Index::Upper.table_name(), &range, &ScanOptions::default())
                    .await?,
            );
            bad_rows.extend(
                store
                    .scan(
                        Index::UpperValid.table_name(),
                        &range,
                        &ScanOptions::default(),
                    )
                    .await?,
            );
        }
    }

    let schema = store.schema(Index::Objects.table_name()).await?;
    let fmt = FormatOptions::default().truncated(query.truncated);
    let table = format_rows(&valid_rows, &schema, &fmt);
    if !query.with_upper_limits {
        return Ok(table);
    }

    let upper_schema = store.schema(Index::Upper.table_name()).await?;
    let bad_schema = store.schema(Index::UpperValid.table_name()).await?;
    let upper = decode_rows(&upper_rows, &upper_schema);
    let bad = decode_rows(&bad_rows, &bad_schema);
    Ok(merge_photometry(
        table.into_records(),
        upper,
        bad,
        fmt.jd_round_decimals,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures;
    use crate::store::{CellValue, ColumnFilter};

    fn query(ids: &[&str]) -> ObjectQuery {
        ObjectQuery {
            object_ids: ids.iter().map(|s| s.to_string()).collect(),
            columns: ColumnFilter::All,
            truncated: false,
            with_upper_limits: false,
        }
    }

    #[tokio::test]
    async fn test_full_history_most_recent_first() {
        let store = fixtures::seeded_store();
        let table = fetch_objects(&store, &query(&["OBJ1"])).await.unwrap();
        assert_eq!(table.len(), 2);
        let jds: Vec<f64> = table.f64_column("i:jd").into_iter().flatten().collect();
        assert!(jds[0] > jds[1]);
        // derived columns present on a non-truncated fetch
        assert_eq!(
            table.value(0, "v:classification"),
            CellValue::Str("SN candidate".into())
        );
    }

    #[tokio::test]
    async fn test_multiple_objects_concatenated() {
        let store = fixtures::seeded_store();
        let table = fetch_objects(&store, &query(&["OBJ1", "OBJ2"])).await.unwrap();
        assert_eq!(table.len(), 3);
    }

    #[tokio::test]
    async fn test_column_restriction_returns_exactly_those_fields() {
        let store = fixtures::seeded_store();
        let mut q = query(&["OBJ1"]);
        q.columns = ColumnFilter::parse("i:jd,i:magpsf");
        q.truncated = true;
        let table = fetch_objects(&store, &q).await.unwrap();
        assert_eq!(
            table.columns(),
            &["i:jd".to_string(), "i:magpsf".to_string()]
        );
    }

    #[tokio::test]
    async fn test_upper_limit_merge() {
        let store = fixtures::seeded_store();
        let mut q = query(&["OBJ1"]);
        q.with_upper_limits = true;
        let table = fetch_objects(&store, &q).await.unwrap();

        // 2 valid + 1 upper + 1 bad kept; the duplicate-jd bad row dropped
        assert_eq!(table.len(), 4);
        let tags: Vec<String> = table
            .records()
            .iter()
            .filter_map(|r| r.get("d:tag").and_then(|v| v.as_str().map(String::from)))
            .collect();
        assert_eq!(tags.iter().filter(|t| *t == "valid").count(), 2);
        assert_eq!(tags.iter().filter(|t| *t == "upperlim").count(), 1);
        assert_eq!(tags.iter().filter(|t| *t == "badquality").count(), 1);

        // non-valid rows carry the sentinel candidate id
        for record in table.records() {
            if record.get("d:tag").and_then(CellValue::as_str) != Some("valid") {
                assert_eq!(record.get("i:candid"), Some(&CellValue::Int(-1)));
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_object_yields_empty_table() {
        let store = fixtures::seeded_store();
        let table = fetch_objects(&store, &query(&["NOPE"])).await.unwrap();
        assert!(table.is_empty());
    }
}
