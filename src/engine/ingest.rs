//! Follow-up pipeline ingestion.
//!
//! External pipelines push small space-delimited tables keyed by pipeline
//! name, observation date and exposure id. The first upload of a pipeline
//! registers its column schema in a bookkeeping row; every later upload is
//! diffed against it and rejected before any write when the columns drift.
//! Sandbox uploads land in a separate table with its own registry.

use std::collections::BTreeMap;

use crate::error::{PortalError, PortalResult};
use crate::format::formatter::decode_rows;
use crate::format::FormattedTable;
use crate::models::{RowKey, KEY_SEPARATOR};
use crate::query::{DateSelection, IngestDownload, IngestUpload};
use crate::store::{ColumnType, Index, RowRange, ScanOptions, StoreGateway, TableSchema};

/// Key of the per-pipeline schema bookkeeping row. `schema` sorts outside
/// every `{pipeline}_` prefix, so data scans never see it.
fn schema_key(pipeline: &str) -> String {
    format!("schema{}{}", KEY_SEPARATOR, pipeline)
}

fn ingest_index(sandbox: bool) -> Index {
    if sandbox {
        Index::IngestSandbox
    } else {
        Index::Ingest
    }
}

/// Parse the space-delimited payload into a header and data rows.
fn parse_payload(payload: &str) -> PortalResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .trim(csv::Trim::All)
        .from_reader(payload.as_bytes());
    let header: Vec<String> = reader
        .headers()
        .map_err(|e| PortalError::validation("payload", format!("invalid payload: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();
    if header.is_empty() || header.iter().any(String::is_empty) {
        return Err(PortalError::validation("payload", "empty column name in header"));
    }
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| PortalError::validation("payload", format!("invalid payload: {}", e)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((header, rows))
}

/// Infer the stored type of one payload column: numeric throughout decodes
/// as double, anything else stays a string.
fn infer_type(column_index: usize, rows: &[Vec<String>]) -> &'static str {
    let mut saw_value = false;
    for row in rows {
        match row.get(column_index) {
            Some(v) if !v.is_empty() => {
                saw_value = true;
                if v.parse::<f64>().is_err() {
                    return "string";
                }
            }
            _ => {}
        }
    }
    if saw_value {
        "double"
    } else {
        "string"
    }
}

/// Upload one batch. Returns the number of data rows written.
pub async fn upload(store: &dyn StoreGateway, query: &IngestUpload) -> PortalResult<usize> {
    let (header, rows) = parse_payload(&query.payload)?;
    let table = ingest_index(query.sandbox).table_name();

    match store.get(table, &schema_key(&query.pipeline)).await? {
        Some(registered) => {
            let known: Vec<String> = registered
                .cells
                .keys()
                .filter_map(|c| c.strip_prefix("d:"))
                .map(str::to_string)
                .collect();
            let missing: Vec<String> = known
                .iter()
                .filter(|c| !header.contains(c))
                .cloned()
                .collect();
            let unexpected: Vec<String> = header
                .iter()
                .filter(|c| !known.contains(c))
                .cloned()
                .collect();
            if !missing.is_empty() || !unexpected.is_empty() {
                return Err(PortalError::SchemaMismatch {
                    pipeline: query.pipeline.clone(),
                    missing,
                    unexpected,
                });
            }
        }
        None => {
            let mut cells = BTreeMap::new();
            for (i, column) in header.iter().enumerate() {
                cells.insert(format!("d:{}", column), infer_type(i, &rows).to_string());
            }
            cells.insert("i:version".to_string(), query.version.clone());
            store.put(table, &schema_key(&query.pipeline), &cells).await?;
        }
    }

    for (i, row) in rows.iter().enumerate() {
        let key = RowKey::ingest(&query.pipeline, &query.date, &query.eid, i).encode();
        let cells: BTreeMap<String, String> = header
            .iter()
            .zip(row.iter())
            .map(|(c, v)| (format!("d:{}", c), v.clone()))
            .collect();
        store.put(table, &key, &cells).await?;
    }
    Ok(rows.len())
}

/// Download previously ingested rows, typed per the registered schema.
pub async fn download(
    store: &dyn StoreGateway,
    query: &IngestDownload,
) -> PortalResult<FormattedTable> {
    let table = ingest_index(query.sandbox).table_name();

    let schema = match store.get(table, &schema_key(&query.pipeline)).await? {
        Some(row) => {
            let mut schema = TableSchema::new();
            for (column, type_name) in &row.cells {
                if column.starts_with("d:") {
                    let ty = ColumnType::parse(type_name).unwrap_or(ColumnType::Str);
                    schema = schema.with_column(column.clone(), ty);
                }
            }
            schema
        }
        None => {
            return Err(PortalError::validation(
                "pipeline",
                format!("unknown pipeline `{}`", query.pipeline),
            ))
        }
    };

    let range = match &query.dates {
        DateSelection::All => RowRange::prefix(format!("{}{}", query.pipeline, KEY_SEPARATOR)),
        DateSelection::Single(date) => {
            RowRange::prefix(format!("{}{}{}", query.pipeline, KEY_SEPARATOR, date))
        }
        // `~` sorts after every key character, making the stop date inclusive
        DateSelection::Range(start, stop) => RowRange::between(
            format!("{}{}{}", query.pipeline, KEY_SEPARATOR, start),
            format!("{}{}{}~", query.pipeline, KEY_SEPARATOR, stop),
        ),
    };
    let opts = ScanOptions::default().with_columns(query.columns.clone());
    let rows = store.scan(table, &range, &opts).await?;
    Ok(FormattedTable::new(decode_rows(&rows, &schema)))
}
