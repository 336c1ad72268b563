//! Per-table column schemas and typed cell decoding.
//!
//! Every physical table carries a map of column identifier to primitive
//! type. Scans return raw string cells; the decoder turns them into typed
//! values before formatting. Binary columns (the `b:` family) transport
//! base64 inside the store and decode to raw bytes.

use std::collections::BTreeMap;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Primitive type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Str,
    Double,
    Int,
    Long,
    Boolean,
    Bytes,
}

impl ColumnType {
    /// Parse the stored type name, as written by the schema row.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "string" | "str" => Some(Self::Str),
            "double" | "float" => Some(Self::Double),
            "int" | "integer" => Some(Self::Int),
            "long" => Some(Self::Long),
            "boolean" | "bool" => Some(Self::Boolean),
            "binary" | "bytes" | "fits/image" => Some(Self::Bytes),
            _ => None,
        }
    }
}

/// A decoded cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Str(String),
    Double(f64),
    Int(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    Null,
}

impl CellValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Double(v) => Some(*v as i64),
            Self::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// JSON rendering used by the row-oriented output format.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::Double(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Int(v) => serde_json::Value::Number((*v).into()),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Bytes(b) => {
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            Self::Null => serde_json::Value::Null,
        }
    }

    /// Plain-text rendering used by CSV and row keys.
    pub fn to_text(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Double(v) => format!("{}", v),
            Self::Int(v) => format!("{}", v),
            Self::Bool(b) => format!("{}", b),
            Self::Bytes(b) => base64::engine::general_purpose::STANDARD.encode(b),
            Self::Null => String::new(),
        }
    }
}

/// Schema of one physical table: column identifier to primitive type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    columns: BTreeMap<String, ColumnType>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.insert(name.into(), ty);
        self
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).copied()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Decode a raw cell according to the declared column type.
    ///
    /// Columns absent from the schema decode as strings; the `v:` family is
    /// computed on the fly and never registered. Empty cells decode to
    /// `Null` for numeric types.
    pub fn decode(&self, column: &str, raw: &str) -> CellValue {
        let declared = self.column_type(column).unwrap_or_else(|| {
            if column.starts_with("b:") {
                ColumnType::Bytes
            } else {
                ColumnType::Str
            }
        });
        match declared {
            ColumnType::Str => CellValue::Str(raw.to_string()),
            ColumnType::Double => raw.parse::<f64>().map(CellValue::Double).unwrap_or(CellValue::Null),
            ColumnType::Int | ColumnType::Long => {
                // Some tables store integral columns with a float rendering.
                raw.parse::<i64>()
                    .map(CellValue::Int)
                    .or_else(|_| raw.parse::<f64>().map(|v| CellValue::Int(v as i64)))
                    .unwrap_or(CellValue::Null)
            }
            ColumnType::Boolean => match raw.to_lowercase().as_str() {
                "true" | "t" | "1" => CellValue::Bool(true),
                "false" | "f" | "0" => CellValue::Bool(false),
                _ => CellValue::Null,
            },
            ColumnType::Bytes => base64::engine::general_purpose::STANDARD
                .decode(raw)
                .map(CellValue::Bytes)
                .unwrap_or(CellValue::Null),
        }
    }
}
