//! Solar-System object and tracklet lookups.

use crate::error::PortalResult;
use crate::format::{FormatOptions, FormattedTable};
use crate::models::RowKey;
use crate::query::{SsoQuery, TrackletQuery};
use crate::store::{Index, RawRow, RowRange, ScanOptions, StoreGateway};

use super::format_scan;

/// Fetch every alert associated with the given Solar-System designations.
pub async fn sso_search(store: &dyn StoreGateway, query: &SsoQuery) -> PortalResult<FormattedTable> {
    let opts = ScanOptions::default().with_columns(query.columns.clone());
    let mut rows: Vec<RawRow> = Vec::new();
    for designation in &query.designations {
        let range = RowRange::prefix(RowKey::sso_prefix(designation).encode());
        rows.extend(
            store
                .scan(Index::SsoName.table_name(), &range, &opts)
                .await?,
        );
    }
    let fmt = FormatOptions::default().truncated(query.truncated);
    format_scan(store, Index::SsoName, &rows, &fmt).await
}

/// Fetch the alerts of one tracklet, or of every tracklet matching a
/// partial date prefix.
pub async fn tracklet_search(
    store: &dyn StoreGateway,
    query: &TrackletQuery,
) -> PortalResult<FormattedTable> {
    let opts = ScanOptions::default().with_columns(query.columns.clone());
    let range = RowRange::prefix(query.prefix.clone());
    let rows = store
        .scan(Index::Tracklet.table_name(), &range, &opts)
        .await?;
    let fmt = FormatOptions::default().truncated(query.truncated);
    format_scan(store, Index::Tracklet, &rows, &fmt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures;
    use crate::store::{CellValue, ColumnFilter};

    #[tokio::test]
    async fn test_sso_by_designation() {
        let store = fixtures::seeded_store();
        let query = SsoQuery {
            designations: vec!["2010 JO69".to_string()],
            columns: ColumnFilter::All,
            truncated: false,
        };
        let table = sso_search(&store, &query).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.value(0, "i:ssnamenr"),
            CellValue::Str("2010JO69".into())
        );
    }

    #[tokio::test]
    async fn test_sso_prefix_does_not_overmatch() {
        let store = fixtures::seeded_store();
        // designation 2010JO6 must not match 2010JO69 rows
        store.insert(
            Index::SsoName.table_name(),
            &format!("2010JO6_{}", fixtures::JD_EPOCH1),
            &[("i:objectId", "SSO2"), ("i:ssnamenr", "2010JO6")],
        );
        let query = SsoQuery {
            designations: vec!["2010JO6".to_string()],
            columns: ColumnFilter::All,
            truncated: false,
        };
        let table = sso_search(&store, &query).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.value(0, "i:ssnamenr"),
            CellValue::Str("2010JO6".into())
        );
    }

    #[tokio::test]
    async fn test_tracklet_by_id() {
        let store = fixtures::seeded_store();
        let query = TrackletQuery {
            prefix: "TRCK_20210810_055711".to_string(),
            columns: ColumnFilter::All,
            truncated: false,
        };
        let table = tracklet_search(&store, &query).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.value(0, "i:objectId"),
            CellValue::Str("SSO1".into())
        );
    }

    #[tokio::test]
    async fn test_tracklet_partial_date_prefix() {
        let store = fixtures::seeded_store();
        let query = TrackletQuery {
            prefix: "TRCK_20210810".to_string(),
            columns: ColumnFilter::All,
            truncated: false,
        };
        let table = tracklet_search(&store, &query).await.unwrap();
        assert_eq!(table.len(), 1);
    }
}
