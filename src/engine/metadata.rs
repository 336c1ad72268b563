//! User-attached object metadata.
//!
//! One row per object, keyed by the object identifier. Reverse lookup by
//! internal name goes through the store's server-side value predicate
//! rather than a dedicated index; the table stays small.

use std::collections::BTreeMap;

use crate::error::PortalResult;
use crate::format::formatter::decode_rows;
use crate::format::FormattedTable;
use crate::query::MetadataPut;
use crate::store::{Index, RowRange, ScanOptions, StoreGateway};

/// Attach or overwrite the metadata row of one object.
pub async fn put_metadata(store: &dyn StoreGateway, entry: &MetadataPut) -> PortalResult<()> {
    let mut cells = BTreeMap::new();
    cells.insert("d:internal_name".to_string(), entry.internal_name.clone());
    cells.insert("d:comments".to_string(), entry.comments.clone());
    cells.insert("d:username".to_string(), entry.username.clone());
    store
        .put(Index::Metadata.table_name(), &entry.object_id, &cells)
        .await?;
    Ok(())
}

/// Fetch the metadata row of one object; an empty table when none exists.
pub async fn metadata_by_object(
    store: &dyn StoreGateway,
    object_id: &str,
) -> PortalResult<FormattedTable> {
    let schema = store.schema(Index::Metadata.table_name()).await?;
    let rows = match store.get(Index::Metadata.table_name(), object_id).await? {
        Some(row) => vec![row],
        None => Vec::new(),
    };
    Ok(FormattedTable::new(decode_rows(&rows, &schema)))
}

/// Reverse lookup: every object carrying the given internal name.
pub async fn metadata_by_internal_name(
    store: &dyn StoreGateway,
    internal_name: &str,
) -> PortalResult<FormattedTable> {
    let schema = store.schema(Index::Metadata.table_name()).await?;
    let opts = ScanOptions::default().with_evaluation("d:internal_name", internal_name);
    let rows = store
        .scan(Index::Metadata.table_name(), &RowRange::Full, &opts)
        .await?;
    let mut records = decode_rows(&rows, &schema);
    for (record, row) in records.iter_mut().zip(&rows) {
        record.insert(
            "i:objectId".to_string(),
            crate::store::CellValue::Str(row.key.clone()),
        );
    }
    Ok(FormattedTable::new(records))
}
