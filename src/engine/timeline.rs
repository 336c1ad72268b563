//! Temporal and class-index scans.

use crate::error::PortalResult;
use crate::format::{FormatOptions, FormattedTable};
use crate::models::{JulianDate, RowKey};
use crate::query::{AnomalyQuery, ClassSelector, LatestsQuery};
use crate::store::{Index, RowRange, ScanOptions, StoreGateway};

use super::format_scan;

/// Full-window scan over the time index, grouped by object. The window is
/// already truncated to the maximum by the validator.
pub async fn date_range(
    store: &dyn StoreGateway,
    start: JulianDate,
    stop: JulianDate,
    limit: usize,
) -> PortalResult<FormattedTable> {
    let range = RowRange::between(
        RowKey::time(start.value()).encode(),
        RowKey::time(stop.value()).encode(),
    );
    let opts = ScanOptions::default().with_limit(limit);
    let rows = store.scan(Index::Time.table_name(), &range, &opts).await?;
    format_scan(store, Index::Time, &rows, &FormatOptions::grouped()).await
}

/// Latest-N query: reversed bounded scan over the classification index
/// selected by the class label. Externally-classified results are grouped
/// by object; the native index returns every alert.
pub async fn class_latest(
    store: &dyn StoreGateway,
    query: &LatestsQuery,
) -> PortalResult<FormattedTable> {
    let (index, range) = match &query.class {
        ClassSelector::All => (
            Index::Time,
            RowRange::between(
                RowKey::time(query.start.value()).encode(),
                RowKey::time(query.stop.value()).encode(),
            ),
        ),
        ClassSelector::Class(label) => (
            Index::Class,
            RowRange::between(
                RowKey::class_time(label, query.start.value()).encode(),
                RowKey::class_time(label, query.stop.value()).encode(),
            ),
        ),
        ClassSelector::Tns(label) => (
            Index::TnsClass,
            RowRange::between(
                RowKey::class_time(label, query.start.value()).encode(),
                RowKey::class_time(label, query.stop.value()).encode(),
            ),
        ),
    };
    let opts = ScanOptions::default()
        .with_limit(query.limit)
        .with_columns(query.columns.clone())
        .reversed();
    let rows = store.scan(index.table_name(), &range, &opts).await?;

    let mut fmt = FormatOptions::default()
        .truncated(query.truncated)
        .with_color(query.extract_color)
        .with_constellation(!query.truncated);
    fmt.group_by_object = matches!(query.class, ClassSelector::Tns(_));
    format_scan(store, index, &rows, &fmt).await
}

/// Reversed bounded scan over the anomaly index.
pub async fn anomalies(
    store: &dyn StoreGateway,
    query: &AnomalyQuery,
) -> PortalResult<FormattedTable> {
    let range = RowRange::between(
        RowKey::time(query.start.value()).encode(),
        RowKey::time(query.stop.value()).encode(),
    );
    let opts = ScanOptions::default()
        .with_limit(query.limit)
        .with_columns(query.columns.clone())
        .reversed();
    let rows = store
        .scan(Index::Anomaly.table_name(), &range, &opts)
        .await?;
    let fmt = FormatOptions::default().truncated(query.truncated);
    format_scan(store, Index::Anomaly, &rows, &fmt).await
}
