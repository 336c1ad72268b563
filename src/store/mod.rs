//! Store layer: gateway trait, scan options, schemas, index registry and the
//! in-memory wide-column backend.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod provision;
pub mod registry;
pub mod scan;
pub mod schema;

pub use error::{ErrorContext, StoreError, StoreResult};
pub use gateway::{RawRow, StoreGateway};
pub use memory::MemoryStore;
pub use provision::{alert_schema, provisioned_memory_store};
pub use registry::Index;
pub use scan::{ColumnFilter, RowRange, ScanOptions, DEFAULT_SCAN_LIMIT};
pub use schema::{CellValue, ColumnType, TableSchema};
