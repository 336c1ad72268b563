//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::PortalError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub struct AppError(pub PortalError);

impl From<PortalError> for AppError {
    fn from(err: PortalError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self.0 {
            PortalError::Validation {
                ref param,
                ref group,
                ..
            } => {
                let mut details = serde_json::json!({ "parameter": param });
                if let Some(group) = group {
                    details["group"] = serde_json::Value::String(group.clone());
                }
                (
                    StatusCode::BAD_REQUEST,
                    ApiError::new("BAD_REQUEST", self.0.to_string()).with_details(details),
                )
            }
            PortalError::Upstream { ref provider, .. } => (
                StatusCode::BAD_GATEWAY,
                ApiError::new("UPSTREAM_ERROR", self.0.to_string())
                    .with_details(serde_json::json!({ "provider": provider })),
            ),
            PortalError::SchemaMismatch {
                ref missing,
                ref unexpected,
                ..
            } => (
                StatusCode::BAD_REQUEST,
                ApiError::new("SCHEMA_MISMATCH", self.0.to_string()).with_details(
                    serde_json::json!({ "missing": missing, "unexpected": unexpected }),
                ),
            ),
            PortalError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("STORE_ERROR", self.0.to_string()),
            ),
            PortalError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", self.0.to_string()),
            ),
        };
        (status, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let response = AppError(PortalError::validation("radius", "too big")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_maps_to_502() {
        let response =
            AppError(PortalError::upstream("sesame", "503", "down")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_schema_mismatch_maps_to_400() {
        let err = PortalError::SchemaMismatch {
            pipeline: "nir".to_string(),
            missing: vec!["err".to_string()],
            unexpected: vec!["snr".to_string()],
        };
        let response = AppError(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
