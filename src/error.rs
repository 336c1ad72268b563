//! Engine-level error taxonomy.
//!
//! Validation failures are raised before any store access and carry the
//! offending parameter. Upstream failures come from live external services
//! and are never retried. Schema mismatches reject ingestion rows before any
//! write, with a field diff for the caller.

use crate::store::StoreError;

pub type PortalResult<T> = Result<T, PortalError>;

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// Missing, conflicting or out-of-range request parameter.
    #[error("invalid parameter `{param}`: {message}")]
    Validation {
        param: String,
        /// Mutually-exclusive group the parameter belongs to, when the
        /// violation is a group conflict.
        group: Option<String>,
        message: String,
    },

    /// Failure of an external resolver, skymap or catalog fetch.
    #[error("upstream service `{provider}` failed ({status}): {message}")]
    Upstream {
        provider: String,
        status: String,
        message: String,
    },

    /// Ingestion row fields do not match the registered pipeline schema.
    #[error("schema mismatch for pipeline `{pipeline}`: missing {missing:?}, unexpected {unexpected:?}")]
    SchemaMismatch {
        pipeline: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PortalError {
    pub fn validation(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            param: param.into(),
            group: None,
            message: message.into(),
        }
    }

    pub fn validation_in_group(
        param: impl Into<String>,
        group: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            param: param.into(),
            group: Some(group.into()),
            message: message.into(),
        }
    }

    pub fn upstream(
        provider: impl Into<String>,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Upstream {
            provider: provider.into(),
            status: status.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
