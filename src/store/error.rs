//! Error types for store gateway operations.

use std::fmt;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Structured context attached to store errors.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g. "scan", "put").
    pub operation: Option<String>,
    /// The table involved.
    pub table: Option<String>,
    /// The row key involved, if applicable.
    pub row_key: Option<String>,
    /// Additional details.
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_row_key(mut self, key: impl Into<String>) -> Self {
        self.row_key = Some(key.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref table) = self.table {
            parts.push(format!("table={}", table));
        }
        if let Some(ref key) = self.row_key {
            parts.push(format!("row_key={}", key));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for store gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection to the physical store failed.
    #[error("connection error: {message} {context}")]
    Connection { message: String, context: ErrorContext },

    /// A scan or get could not be executed.
    #[error("scan error: {message} {context}")]
    Scan { message: String, context: ErrorContext },

    /// The requested table is not registered.
    #[error("unknown table: {message} {context}")]
    UnknownTable { message: String, context: ErrorContext },

    /// A cell value could not be decoded to its declared type.
    #[error("decode error: {message} {context}")]
    Decode { message: String, context: ErrorContext },

    /// A put was rejected by the store.
    #[error("write error: {message} {context}")]
    Write { message: String, context: ErrorContext },
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn scan(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Scan {
            message: message.into(),
            context,
        }
    }

    pub fn unknown_table(table: impl Into<String>) -> Self {
        let table = table.into();
        Self::UnknownTable {
            message: table.clone(),
            context: ErrorContext::default().with_table(table),
        }
    }

    pub fn decode(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Decode {
            message: message.into(),
            context,
        }
    }

    pub fn write(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Write {
            message: message.into(),
            context,
        }
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Connection { context, .. }
            | Self::Scan { context, .. }
            | Self::UnknownTable { context, .. }
            | Self::Decode { context, .. }
            | Self::Write { context, .. } => context,
        }
    }
}
