//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Each data endpoint answers POST with data and GET with its argument
    // descriptions.
    let api_v1 = Router::new()
        .route("/objects", get(handlers::objects_args).post(handlers::get_objects))
        .route("/explorer", get(handlers::explorer_args).post(handlers::explore))
        .route("/latests", get(handlers::latests_args).post(handlers::latests))
        .route("/anomaly", get(handlers::anomaly_args).post(handlers::anomaly))
        .route("/sso", get(handlers::sso_args).post(handlers::sso_objects))
        .route("/tracklet", get(handlers::tracklet_args).post(handlers::tracklet))
        .route("/cutouts", get(handlers::cutouts_args).post(handlers::cutouts))
        .route("/xmatch", get(handlers::xmatch_args).post(handlers::crossmatch))
        .route("/skymap", get(handlers::skymap_args).post(handlers::skymap_crossmatch))
        .route("/statistics", get(handlers::statistics_args).post(handlers::statistics))
        .route("/random", get(handlers::random_args).post(handlers::random_sample))
        .route("/resolver", get(handlers::resolver_args).post(handlers::resolve_name))
        .route("/metadata", get(handlers::metadata_args).post(handlers::metadata))
        .route("/ingest", get(handlers::ingest_args).post(handlers::ingest));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_v1)
        // Allow large skymap and catalog payloads.
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    use super::*;
    use crate::engine::fixtures;
    use crate::store::provisioned_memory_store;

    fn app() -> Router {
        create_router(AppState::new(Arc::new(fixtures::seeded_store())))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_objects_post_returns_rows() {
        let request = Request::post("/api/v1/objects")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"objectId": "OBJ1"}"#))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_objects_get_returns_arg_docs() {
        let response = app()
            .oneshot(Request::get("/api/v1/objects").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body.as_array().unwrap().iter().any(|a| a["name"] == "objectId"));
    }

    #[tokio::test]
    async fn test_validation_error_is_400_with_parameter() {
        let request = Request::post("/api/v1/explorer")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"ra": 10.0, "dec": 0.0, "radius": 100000.0}"#,
            ))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(body["details"]["parameter"], "radius");
    }

    #[tokio::test]
    async fn test_empty_result_is_200_empty_table() {
        let request = Request::post("/api/v1/objects")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"objectId": "NOPE"}"#))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_csv_output_format() {
        let request = Request::post("/api/v1/objects")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"objectId": "OBJ1", "output-format": "csv"}"#,
            ))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/csv"
        );
    }

    #[tokio::test]
    async fn test_router_creation_with_empty_store() {
        let _router = create_router(AppState::new(Arc::new(provisioned_memory_store())));
    }
}
