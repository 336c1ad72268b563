//! Wire-format encoders and decoders.
//!
//! Every data endpoint serializes its [`FormattedTable`] into one of four
//! formats: row-oriented JSON (default), CSV text, Parquet (columnar binary)
//! or a VOTable XML document. Decoders exist for all four so round-trip
//! behavior is testable; binary cutout columns travel as base64 text.

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{PortalError, PortalResult};
use crate::store::CellValue;

use super::table::{FormattedTable, Record};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Parquet,
    Votable,
}

impl OutputFormat {
    /// Parse the `output-format` parameter. Unsupported names are a
    /// validation error, reported before any store access.
    pub fn parse(spec: &str) -> PortalResult<Self> {
        match spec.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            "votable" => Ok(Self::Votable),
            other => Err(PortalError::validation(
                "output-format",
                format!(
                    "output format `{}` is not supported; choose among json, csv, parquet, votable",
                    other
                ),
            )),
        }
    }

    pub fn from_params(params: &crate::query::Params) -> PortalResult<Self> {
        match params.str("output-format") {
            Some(spec) => Self::parse(&spec),
            None => Ok(Self::Json),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv",
            Self::Parquet => "application/octet-stream",
            Self::Votable => "application/xml",
        }
    }
}

/// Column-level type used when a format needs a declared schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Double,
    Int,
    Bool,
    Text,
}

fn infer_column_kind(table: &FormattedTable, column: &str) -> ColumnKind {
    let mut seen_int = false;
    let mut seen_double = false;
    let mut seen_bool = false;
    let mut seen_text = false;
    for record in table.records() {
        match record.get(column) {
            Some(CellValue::Int(_)) => seen_int = true,
            Some(CellValue::Double(_)) => seen_double = true,
            Some(CellValue::Bool(_)) => seen_bool = true,
            Some(CellValue::Str(_)) | Some(CellValue::Bytes(_)) => seen_text = true,
            Some(CellValue::Null) | None => {}
        }
    }
    if seen_text {
        ColumnKind::Text
    } else if seen_double {
        ColumnKind::Double
    } else if seen_int {
        ColumnKind::Int
    } else if seen_bool {
        ColumnKind::Bool
    } else {
        ColumnKind::Text
    }
}

/// Serialize a table in the requested format.
pub fn encode(table: &FormattedTable, format: OutputFormat) -> PortalResult<Vec<u8>> {
    match format {
        OutputFormat::Json => encode_json(table),
        OutputFormat::Csv => encode_csv(table),
        OutputFormat::Parquet => encode_parquet(table),
        OutputFormat::Votable => encode_votable(table),
    }
}

/// Deserialize a table from the given format.
pub fn decode(bytes: &[u8], format: OutputFormat) -> PortalResult<FormattedTable> {
    match format {
        OutputFormat::Json => decode_json(bytes),
        OutputFormat::Csv => decode_csv(bytes),
        OutputFormat::Parquet => decode_parquet(bytes),
        OutputFormat::Votable => decode_votable(bytes),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn encode_json(table: &FormattedTable) -> PortalResult<Vec<u8>> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = table
        .records()
        .iter()
        .map(|record| {
            record
                .iter()
                .map(|(col, value)| (col.clone(), value.to_json()))
                .collect()
        })
        .collect();
    serde_json::to_vec(&rows).map_err(|e| PortalError::internal(format!("json encode: {}", e)))
}

fn decode_json(bytes: &[u8]) -> PortalResult<FormattedTable> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_slice(bytes)
        .map_err(|e| PortalError::internal(format!("json decode: {}", e)))?;
    let records = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .filter_map(|(col, value)| {
                    let cell = match value {
                        serde_json::Value::String(s) => CellValue::Str(s),
                        serde_json::Value::Bool(b) => CellValue::Bool(b),
                        serde_json::Value::Number(n) => {
                            if let Some(i) = n.as_i64() {
                                CellValue::Int(i)
                            } else {
                                CellValue::Double(n.as_f64()?)
                            }
                        }
                        serde_json::Value::Null => return None,
                        other => CellValue::Str(other.to_string()),
                    };
                    Some((col, cell))
                })
                .collect::<Record>()
        })
        .collect();
    Ok(FormattedTable::new(records))
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn encode_csv(table: &FormattedTable) -> PortalResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(table.columns())
        .map_err(|e| PortalError::internal(format!("csv encode: {}", e)))?;
    for record in table.records() {
        let row: Vec<String> = table
            .columns()
            .iter()
            .map(|col| record.get(col).map(CellValue::to_text).unwrap_or_default())
            .collect();
        writer
            .write_record(&row)
            .map_err(|e| PortalError::internal(format!("csv encode: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| PortalError::internal(format!("csv encode: {}", e)))
}

fn decode_csv(bytes: &[u8]) -> PortalResult<FormattedTable> {
    let mut reader = csv::Reader::from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PortalError::internal(format!("csv decode: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| PortalError::internal(format!("csv decode: {}", e)))?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(col, value)| (col.clone(), CellValue::Str(value.to_string())))
            .collect();
        records.push(record);
    }
    Ok(FormattedTable::new(records))
}

// ---------------------------------------------------------------------------
// Parquet (arrow)
// ---------------------------------------------------------------------------

fn encode_parquet(table: &FormattedTable) -> PortalResult<Vec<u8>> {
    let internal = |e: String| PortalError::internal(format!("parquet encode: {}", e));

    let mut fields = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();
    for column in table.columns() {
        let kind = infer_column_kind(table, column);
        match kind {
            ColumnKind::Double => {
                let values: Vec<Option<f64>> = table
                    .records()
                    .iter()
                    .map(|r| r.get(column).and_then(CellValue::as_f64))
                    .collect();
                fields.push(Field::new(column, DataType::Float64, true));
                arrays.push(Arc::new(Float64Array::from(values)));
            }
            ColumnKind::Int => {
                let values: Vec<Option<i64>> = table
                    .records()
                    .iter()
                    .map(|r| r.get(column).and_then(CellValue::as_i64))
                    .collect();
                fields.push(Field::new(column, DataType::Int64, true));
                arrays.push(Arc::new(Int64Array::from(values)));
            }
            ColumnKind::Bool => {
                let values: Vec<Option<bool>> = table
                    .records()
                    .iter()
                    .map(|r| match r.get(column) {
                        Some(CellValue::Bool(b)) => Some(*b),
                        _ => None,
                    })
                    .collect();
                fields.push(Field::new(column, DataType::Boolean, true));
                arrays.push(Arc::new(BooleanArray::from(values)));
            }
            ColumnKind::Text => {
                let values: Vec<Option<String>> = table
                    .records()
                    .iter()
                    .map(|r| match r.get(column) {
                        Some(CellValue::Null) | None => None,
                        Some(v) => Some(v.to_text()),
                    })
                    .collect();
                fields.push(Field::new(column, DataType::Utf8, true));
                arrays.push(Arc::new(StringArray::from(values)));
            }
        }
    }

    let schema = Arc::new(Schema::new(fields));
    let mut buffer = Vec::new();
    let mut writer =
        ArrowWriter::try_new(&mut buffer, schema.clone(), None).map_err(|e| internal(e.to_string()))?;
    if !table.is_empty() {
        let batch =
            RecordBatch::try_new(schema, arrays).map_err(|e| internal(e.to_string()))?;
        writer.write(&batch).map_err(|e| internal(e.to_string()))?;
    }
    writer.close().map_err(|e| internal(e.to_string()))?;
    Ok(buffer)
}

fn decode_parquet(bytes: &[u8]) -> PortalResult<FormattedTable> {
    let internal = |e: String| PortalError::internal(format!("parquet decode: {}", e));

    let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))
        .map_err(|e| internal(e.to_string()))?
        .build()
        .map_err(|e| internal(e.to_string()))?;

    let mut records: Vec<Record> = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| internal(e.to_string()))?;
        let schema = batch.schema();
        for row in 0..batch.num_rows() {
            let mut record = Record::new();
            for (idx, field) in schema.fields().iter().enumerate() {
                let array = batch.column(idx);
                if array.is_null(row) {
                    continue;
                }
                let mismatch =
                    || internal(format!("column `{}` does not match its schema", field.name()));
                let cell = match field.data_type() {
                    DataType::Float64 => {
                        let a = array
                            .as_any()
                            .downcast_ref::<Float64Array>()
                            .ok_or_else(mismatch)?;
                        CellValue::Double(a.value(row))
                    }
                    DataType::Int64 => {
                        let a = array
                            .as_any()
                            .downcast_ref::<Int64Array>()
                            .ok_or_else(mismatch)?;
                        CellValue::Int(a.value(row))
                    }
                    DataType::Boolean => {
                        let a = array
                            .as_any()
                            .downcast_ref::<BooleanArray>()
                            .ok_or_else(mismatch)?;
                        CellValue::Bool(a.value(row))
                    }
                    DataType::Utf8 => {
                        let a = array
                            .as_any()
                            .downcast_ref::<StringArray>()
                            .ok_or_else(mismatch)?;
                        CellValue::Str(a.value(row).to_string())
                    }
                    other => {
                        return Err(internal(format!("unsupported column type {:?}", other)))
                    }
                };
                record.insert(field.name().clone(), cell);
            }
            records.push(record);
        }
    }
    Ok(FormattedTable::new(records))
}

// ---------------------------------------------------------------------------
// VOTable XML (quick-xml)
// ---------------------------------------------------------------------------

fn votable_datatype(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Double => "double",
        ColumnKind::Int => "long",
        ColumnKind::Bool => "boolean",
        ColumnKind::Text => "char",
    }
}

fn encode_votable(table: &FormattedTable) -> PortalResult<Vec<u8>> {
    let internal = |e: std::io::Error| PortalError::internal(format!("votable encode: {}", e));

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(internal)?;

    let mut votable = BytesStart::new("VOTABLE");
    votable.push_attribute(("version", "1.4"));
    writer.write_event(Event::Start(votable)).map_err(internal)?;
    writer
        .write_event(Event::Start(BytesStart::new("RESOURCE")))
        .map_err(internal)?;
    writer
        .write_event(Event::Start(BytesStart::new("TABLE")))
        .map_err(internal)?;

    let kinds: Vec<ColumnKind> = table
        .columns()
        .iter()
        .map(|c| infer_column_kind(table, c))
        .collect();
    for (column, kind) in table.columns().iter().zip(&kinds) {
        let mut field = BytesStart::new("FIELD");
        field.push_attribute(("name", column.as_str()));
        field.push_attribute(("datatype", votable_datatype(*kind)));
        if *kind == ColumnKind::Text {
            field.push_attribute(("arraysize", "*"));
        }
        writer.write_event(Event::Empty(field)).map_err(internal)?;
    }

    writer
        .write_event(Event::Start(BytesStart::new("DATA")))
        .map_err(internal)?;
    writer
        .write_event(Event::Start(BytesStart::new("TABLEDATA")))
        .map_err(internal)?;
    for record in table.records() {
        writer
            .write_event(Event::Start(BytesStart::new("TR")))
            .map_err(internal)?;
        for column in table.columns() {
            writer
                .write_event(Event::Start(BytesStart::new("TD")))
                .map_err(internal)?;
            let text = record.get(column).map(CellValue::to_text).unwrap_or_default();
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(internal)?;
            writer
                .write_event(Event::End(BytesEnd::new("TD")))
                .map_err(internal)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("TR")))
            .map_err(internal)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("TABLEDATA")))
        .map_err(internal)?;
    writer
        .write_event(Event::End(BytesEnd::new("DATA")))
        .map_err(internal)?;
    writer
        .write_event(Event::End(BytesEnd::new("TABLE")))
        .map_err(internal)?;
    writer
        .write_event(Event::End(BytesEnd::new("RESOURCE")))
        .map_err(internal)?;
    writer
        .write_event(Event::End(BytesEnd::new("VOTABLE")))
        .map_err(internal)?;

    Ok(writer.into_inner().into_inner())
}

fn decode_votable(bytes: &[u8]) -> PortalResult<FormattedTable> {
    let internal = |e: String| PortalError::internal(format!("votable decode: {}", e));

    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut columns: Vec<(String, String)> = Vec::new();
    let mut records: Vec<Record> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut in_td = false;
    let mut td_text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"FIELD" => {
                let mut name = String::new();
                let mut datatype = String::new();
                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map_err(|e| internal(e.to_string()))?
                        .to_string();
                    match attr.key.as_ref() {
                        b"name" => name = value,
                        b"datatype" => datatype = value,
                        _ => {}
                    }
                }
                columns.push((name, datatype));
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"TR" => current = Vec::new(),
            Ok(Event::Start(e)) if e.name().as_ref() == b"TD" => {
                in_td = true;
                td_text.clear();
            }
            Ok(Event::Text(t)) if in_td => {
                td_text
                    .push_str(&t.unescape().map_err(|e| internal(e.to_string()))?);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"TD" => {
                in_td = false;
                current.push(td_text.clone());
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"TR" => {
                let record: Record = columns
                    .iter()
                    .zip(current.iter())
                    .filter(|(_, text)| !text.is_empty())
                    .map(|((name, datatype), text)| {
                        let cell = match datatype.as_str() {
                            "double" | "float" => text
                                .parse::<f64>()
                                .map(CellValue::Double)
                                .unwrap_or(CellValue::Null),
                            "long" | "int" => text
                                .parse::<i64>()
                                .map(CellValue::Int)
                                .unwrap_or(CellValue::Null),
                            "boolean" => CellValue::Bool(text == "true"),
                            _ => CellValue::Str(text.clone()),
                        };
                        (name.clone(), cell)
                    })
                    .filter(|(_, cell)| !matches!(cell, CellValue::Null))
                    .collect();
                records.push(record);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(internal(e.to_string())),
        }
        buf.clear();
    }

    Ok(FormattedTable::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> FormattedTable {
        let mut a = Record::new();
        a.insert("i:objectId".into(), CellValue::Str("OBJ1".into()));
        a.insert("i:jd".into(), CellValue::Double(2459000.5));
        a.insert("i:candid".into(), CellValue::Int(100));
        a.insert("d:flagged".into(), CellValue::Bool(true));

        let mut b = Record::new();
        b.insert("i:objectId".into(), CellValue::Str("OBJ2".into()));
        b.insert("i:jd".into(), CellValue::Double(2459001.5));
        b.insert("i:candid".into(), CellValue::Int(101));
        // d:flagged missing on purpose; pads to Null

        FormattedTable::new(vec![a, b])
    }

    #[test]
    fn test_parse_format_names() {
        assert_eq!(OutputFormat::parse("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("CSV").unwrap(), OutputFormat::Csv);
        assert!(OutputFormat::parse("yaml").is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let table = sample_table();
        let bytes = encode(&table, OutputFormat::Json).unwrap();
        let back = decode(&bytes, OutputFormat::Json).unwrap();
        assert_eq!(back.value_pairs(), table.value_pairs());
    }

    #[test]
    fn test_csv_roundtrip_preserves_text_pairs() {
        let table = sample_table();
        let bytes = encode(&table, OutputFormat::Csv).unwrap();
        let back = decode(&bytes, OutputFormat::Csv).unwrap();
        assert_eq!(back.value_pairs(), table.value_pairs());
    }

    #[test]
    fn test_parquet_roundtrip() {
        let table = sample_table();
        let bytes = encode(&table, OutputFormat::Parquet).unwrap();
        let back = decode(&bytes, OutputFormat::Parquet).unwrap();
        assert_eq!(back.value_pairs(), table.value_pairs());
    }

    #[test]
    fn test_votable_roundtrip() {
        let table = sample_table();
        let bytes = encode(&table, OutputFormat::Votable).unwrap();
        let back = decode(&bytes, OutputFormat::Votable).unwrap();
        assert_eq!(back.value_pairs(), table.value_pairs());
    }

    #[test]
    fn test_empty_table_encodes_in_every_format() {
        let table = FormattedTable::empty();
        for format in [
            OutputFormat::Json,
            OutputFormat::Csv,
            OutputFormat::Parquet,
            OutputFormat::Votable,
        ] {
            let bytes = encode(&table, format).unwrap();
            let back = decode(&bytes, format).unwrap();
            assert!(back.is_empty());
        }
    }

    #[test]
    fn test_idempotent_serialization() {
        let table = sample_table();
        let first = encode(&table, OutputFormat::Json).unwrap();
        let second = encode(&table, OutputFormat::Json).unwrap();
        assert_eq!(first, second);
    }
}
