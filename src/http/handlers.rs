//! HTTP handlers for the REST API.
//!
//! Every data endpoint takes a flat JSON parameter map and delegates to the
//! query validator and the engine; a GET on the same path returns the
//! argument descriptions. Tabular results serialize in the requested wire
//! format.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use super::dto::{self, ArgDoc, HealthResponse, IngestResponse};
use super::error::AppError;
use super::state::AppState;
use crate::cutout::{fetch_cutout, CutoutData};
use crate::engine::{cone, ingest, metadata, objects, random, resolver, skymap, sso, stats, timeline, xmatch};
use crate::error::PortalError;
use crate::format::formatter::group_by_object;
use crate::format::{encode, FormattedTable, OutputFormat};
use crate::query::{
    AnomalyQuery, CutoutQuery, ExplorerQuery, IngestDownload, IngestUpload, LatestsQuery,
    MetadataPut, ObjectQuery, Params, RandomQuery, ResolverQuery, SkymapQuery, SsoQuery,
    StatsQuery, TrackletQuery, XmatchQuery,
};

/// Result type for handlers.
pub type HandlerResult = Result<Response, AppError>;

fn params_from(body: serde_json::Value) -> Result<Params, AppError> {
    match body {
        serde_json::Value::Object(map) => Ok(Params::new(map)),
        _ => Err(AppError(PortalError::validation(
            "body",
            "expected a JSON object of parameters",
        ))),
    }
}

/// Serialize a table in the requested wire format with its content type.
fn table_response(table: &FormattedTable, params: &Params) -> HandlerResult {
    let format = OutputFormat::from_params(params)?;
    let bytes = encode(table, format)?;
    Ok(([(header::CONTENT_TYPE, format.content_type())], bytes).into_response())
}

// =============================================================================
// Health
// =============================================================================

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Data endpoints
// =============================================================================

/// POST /api/v1/objects
pub async fn get_objects(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let query = ObjectQuery::from_params(&params)?;
    let table = objects::fetch_objects(state.store.as_ref(), &query).await?;
    table_response(&table, &params)
}

/// POST /api/v1/explorer
pub async fn explore(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let table = match ExplorerQuery::from_params(&params)? {
        ExplorerQuery::ObjectIds(object_ids) => {
            let query = ObjectQuery {
                object_ids,
                columns: crate::store::ColumnFilter::All,
                truncated: false,
                with_upper_limits: false,
            };
            let table = objects::fetch_objects(state.store.as_ref(), &query).await?;
            // the explorer summarizes: one row per object, most recent alert
            FormattedTable::new(group_by_object(table.into_records()))
        }
        ExplorerQuery::Cone(cone_query) => {
            cone::cone_search(state.store.as_ref(), &cone_query).await?
        }
        ExplorerQuery::DateWindow { start, stop, limit } => {
            timeline::date_range(state.store.as_ref(), start, stop, limit).await?
        }
    };
    table_response(&table, &params)
}

/// POST /api/v1/latests
pub async fn latests(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let query = LatestsQuery::from_params(&params)?;
    let table = timeline::class_latest(state.store.as_ref(), &query).await?;
    table_response(&table, &params)
}

/// POST /api/v1/anomaly
pub async fn anomaly(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let query = AnomalyQuery::from_params(&params)?;
    let table = timeline::anomalies(state.store.as_ref(), &query).await?;
    table_response(&table, &params)
}

/// POST /api/v1/sso
pub async fn sso_objects(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let query = SsoQuery::from_params(&params)?;
    let table = sso::sso_search(state.store.as_ref(), &query).await?;
    table_response(&table, &params)
}

/// POST /api/v1/tracklet
pub async fn tracklet(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let query = TrackletQuery::from_params(&params)?;
    let table = sso::tracklet_search(state.store.as_ref(), &query).await?;
    table_response(&table, &params)
}

/// POST /api/v1/cutouts
pub async fn cutouts(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let query = CutoutQuery::from_params(&params)?;
    match fetch_cutout(state.store.as_ref(), &query).await? {
        CutoutData::Png(bytes) => {
            Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
        }
        CutoutData::Fits(bytes) => {
            Ok(([(header::CONTENT_TYPE, "application/fits")], bytes).into_response())
        }
        CutoutData::Array(image) => {
            let rows: Vec<&[f64]> = image.data.chunks(image.width).collect();
            Ok(Json(serde_json::json!({
                "width": image.width,
                "height": image.height,
                "data": rows,
            }))
            .into_response())
        }
    }
}

/// POST /api/v1/xmatch
pub async fn crossmatch(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let query = XmatchQuery::from_params(&params)?;
    let table = xmatch::crossmatch(state.store.as_ref(), &query).await?;
    table_response(&table, &params)
}

/// POST /api/v1/skymap
pub async fn skymap_crossmatch(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let query = SkymapQuery::from_params(&params)?;
    let table = skymap::skymap_search(state.store.as_ref(), &state.services, &query).await?;
    table_response(&table, &params)
}

/// POST /api/v1/statistics
pub async fn statistics(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let query = StatsQuery::from_params(&params)?;
    let table = stats::statistics(state.store.as_ref(), &query).await?;
    table_response(&table, &params)
}

/// POST /api/v1/random
pub async fn random_sample(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let query = RandomQuery::from_params(&params)?;
    let table = random::random_objects(state.store.as_ref(), &query).await?;
    table_response(&table, &params)
}

/// POST /api/v1/resolver
pub async fn resolve_name(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    let query = ResolverQuery::from_params(&params)?;
    let table = resolver::resolve(state.store.as_ref(), &state.services, &query).await?;
    table_response(&table, &params)
}

/// POST /api/v1/metadata
///
/// Presence of `username` selects a write; otherwise `objectId` fetches one
/// object's annotation and `internal_name` reverse-looks the name up.
pub async fn metadata(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    if params.has("username") {
        let entry = MetadataPut::from_params(&params)?;
        metadata::put_metadata(state.store.as_ref(), &entry).await?;
        return Ok(Json(serde_json::json!({ "status": "ok" })).into_response());
    }
    let table = if params.has("objectId") {
        metadata::metadata_by_object(state.store.as_ref(), &params.required_str("objectId")?)
            .await?
    } else if params.has("internal_name") {
        metadata::metadata_by_internal_name(
            state.store.as_ref(),
            &params.required_str("internal_name")?,
        )
        .await?
    } else {
        return Err(AppError(PortalError::validation(
            "objectId",
            "one of `objectId` or `internal_name` is required",
        )));
    };
    table_response(&table, &params)
}

/// POST /api/v1/ingest
///
/// Presence of `payload` selects an upload; `dates` selects a download.
pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> HandlerResult {
    let params = params_from(body)?;
    if params.has("payload") {
        let query = IngestUpload::from_params(&params)?;
        let rows = ingest::upload(state.store.as_ref(), &query).await?;
        return Ok(Json(IngestResponse {
            status: "ok".to_string(),
            rows,
        })
        .into_response());
    }
    let query = IngestDownload::from_params(&params)?;
    let table = ingest::download(state.store.as_ref(), &query).await?;
    table_response(&table, &params)
}

// =============================================================================
// Argument descriptions (GET on each data endpoint)
// =============================================================================

pub async fn objects_args() -> Json<Vec<ArgDoc>> {
    Json(dto::objects_args())
}

pub async fn explorer_args() -> Json<Vec<ArgDoc>> {
    Json(dto::explorer_args())
}

pub async fn latests_args() -> Json<Vec<ArgDoc>> {
    Json(dto::latests_args())
}

pub async fn anomaly_args() -> Json<Vec<ArgDoc>> {
    Json(dto::anomaly_args())
}

pub async fn sso_args() -> Json<Vec<ArgDoc>> {
    Json(dto::sso_args())
}

pub async fn tracklet_args() -> Json<Vec<ArgDoc>> {
    Json(dto::tracklet_args())
}

pub async fn cutouts_args() -> Json<Vec<ArgDoc>> {
    Json(dto::cutouts_args())
}

pub async fn xmatch_args() -> Json<Vec<ArgDoc>> {
    Json(dto::xmatch_args())
}

pub async fn skymap_args() -> Json<Vec<ArgDoc>> {
    Json(dto::skymap_args())
}

pub async fn statistics_args() -> Json<Vec<ArgDoc>> {
    Json(dto::statistics_args())
}

pub async fn random_args() -> Json<Vec<ArgDoc>> {
    Json(dto::random_args())
}

pub async fn resolver_args() -> Json<Vec<ArgDoc>> {
    Json(dto::resolver_args())
}

pub async fn metadata_args() -> Json<Vec<ArgDoc>> {
    Json(dto::metadata_args())
}

pub async fn ingest_args() -> Json<Vec<ArgDoc>> {
    Json(dto::ingest_args())
}
