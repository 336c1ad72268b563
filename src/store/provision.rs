//! Table provisioning for the in-memory backend.
//!
//! Creates every registered index with its column schema. The development
//! server starts from a provisioned store; the engine test fixtures seed
//! rows on top of the same layout.

use super::memory::MemoryStore;
use super::registry::Index;
use super::schema::{ColumnType, TableSchema};

/// Column schema shared by the alert-bearing tables (the main table and the
/// denormalized indices carry the same science payload).
pub fn alert_schema() -> TableSchema {
    TableSchema::new()
        .with_column("i:objectId", ColumnType::Str)
        .with_column("i:candid", ColumnType::Long)
        .with_column("i:jd", ColumnType::Double)
        .with_column("i:jdstarthist", ColumnType::Double)
        .with_column("i:ra", ColumnType::Double)
        .with_column("i:dec", ColumnType::Double)
        .with_column("i:fid", ColumnType::Int)
        .with_column("i:magpsf", ColumnType::Double)
        .with_column("i:sigmapsf", ColumnType::Double)
        .with_column("i:diffmaglim", ColumnType::Double)
        .with_column("i:isdiffpos", ColumnType::Str)
        .with_column("i:ssnamenr", ColumnType::Str)
        .with_column("d:cdsxmatch", ColumnType::Str)
        .with_column("d:roid", ColumnType::Int)
        .with_column("d:snn_snia_vs_nonia", ColumnType::Double)
        .with_column("d:snn_sn_vs_all", ColumnType::Double)
        .with_column("d:mulens_class_1", ColumnType::Str)
        .with_column("d:mulens_class_2", ColumnType::Str)
        .with_column("d:anomaly_score", ColumnType::Double)
        .with_column("d:tracklet", ColumnType::Str)
        .with_column("b:cutoutScience_stampData", ColumnType::Bytes)
        .with_column("b:cutoutTemplate_stampData", ColumnType::Bytes)
        .with_column("b:cutoutDifference_stampData", ColumnType::Bytes)
}

fn upper_limit_schema() -> TableSchema {
    TableSchema::new()
        .with_column("i:objectId", ColumnType::Str)
        .with_column("i:jd", ColumnType::Double)
        .with_column("i:fid", ColumnType::Int)
        .with_column("i:magpsf", ColumnType::Double)
        .with_column("i:sigmapsf", ColumnType::Double)
        .with_column("i:diffmaglim", ColumnType::Double)
}

fn tns_resolver_schema() -> TableSchema {
    TableSchema::new()
        .with_column("d:fullname", ColumnType::Str)
        .with_column("d:internalname", ColumnType::Str)
        .with_column("d:type", ColumnType::Str)
}

fn sso_resolver_schema() -> TableSchema {
    TableSchema::new()
        .with_column("i:ssnamenr", ColumnType::Str)
        .with_column("i:name", ColumnType::Str)
        .with_column("i:number", ColumnType::Int)
}

fn statistics_schema() -> TableSchema {
    TableSchema::new()
        .with_column("basic:raw", ColumnType::Long)
        .with_column("basic:sci", ColumnType::Long)
        .with_column("basic:fields", ColumnType::Long)
        .with_column("basic:exposures", ColumnType::Long)
        .with_column("class:Solar System", ColumnType::Long)
        .with_column("class:SN candidate", ColumnType::Long)
        .with_column("class:Unknown", ColumnType::Long)
}

fn metadata_schema() -> TableSchema {
    TableSchema::new()
        .with_column("d:internal_name", ColumnType::Str)
        .with_column("d:comments", ColumnType::Str)
        .with_column("d:username", ColumnType::Str)
}

fn schema_for(index: Index) -> TableSchema {
    match index {
        Index::Upper | Index::UpperValid => upper_limit_schema(),
        Index::TnsResolver => tns_resolver_schema(),
        Index::SsoResolver => sso_resolver_schema(),
        Index::Statistics => statistics_schema(),
        Index::Metadata => metadata_schema(),
        // ingestion tables register their schemas per pipeline at upload time
        Index::Ingest | Index::IngestSandbox => TableSchema::new(),
        _ => alert_schema(),
    }
}

/// A memory store with every index created and typed, no rows.
pub fn provisioned_memory_store() -> MemoryStore {
    let store = MemoryStore::new();
    for index in Index::all() {
        store.create_table(index.table_name(), schema_for(*index));
    }
    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RowRange, ScanOptions, StoreGateway};

    #[tokio::test]
    async fn test_every_index_is_scannable() {
        let store = provisioned_memory_store();
        for index in Index::all() {
            let rows = store
                .scan(index.table_name(), &RowRange::Full, &ScanOptions::default())
                .await
                .unwrap();
            assert!(rows.is_empty());
        }
    }

    #[tokio::test]
    async fn test_alert_schema_registered() {
        let store = provisioned_memory_store();
        let schema = store.schema(Index::Objects.table_name()).await.unwrap();
        assert_eq!(schema.column_type("i:jd"), Some(ColumnType::Double));
        assert_eq!(
            schema.column_type("b:cutoutScience_stampData"),
            Some(ColumnType::Bytes)
        );
    }
}
