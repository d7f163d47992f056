//! Record REST API Routes
//!
//! Every successful mutation is published to the event hub after the store
//! commits, tagged with the caller's session so it is not echoed back.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tindur_core::{
    normalize_text, parse_date, ChangeKind, CreateRecordRequest, ListFilter, RecordId,
    UpdateRecordRequest,
};

use crate::error::ApiResult;
use crate::extract::OriginSession;
use crate::hub::EventHub;
use crate::services::PersistenceService;
use crate::state::AppState;

/// Query parameters for listing records.
///
/// `type` and `date` are accepted as aliases of `category` and `dateCeiling`.
/// Empty values place no constraint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRecordsQuery {
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub category_alias: Option<String>,
    #[serde(rename = "dateCeiling")]
    pub date_ceiling: Option<String>,
    #[serde(rename = "date")]
    pub date_alias: Option<String>,
}

impl ListRecordsQuery {
    pub fn into_filter(self) -> ApiResult<ListFilter> {
        let category = normalize_text(self.category).or(normalize_text(self.category_alias));
        let date_ceiling = normalize_text(self.date_ceiling)
            .or(normalize_text(self.date_alias))
            .map(|d| parse_date(&d))
            .transpose()?;
        Ok(ListFilter {
            category,
            date_ceiling,
        })
    }
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/records - Grouped view of matching records
pub async fn list_records(
    State(service): State<Arc<PersistenceService>>,
    Query(query): Query<ListRecordsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = query.into_filter()?;
    let view = service.list(&filter).await?;
    Ok(Json(view))
}

/// POST /api/v1/records - Create a record
pub async fn create_record(
    State(service): State<Arc<PersistenceService>>,
    State(hub): State<Arc<EventHub>>,
    OriginSession(origin): OriginSession,
    payload: Result<Json<CreateRecordRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let record = service.create(req).await?;

    hub.publish(ChangeKind::Create, &record, origin);

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/v1/records/:id - Get a record by ID
pub async fn get_record(
    State(service): State<Arc<PersistenceService>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let record = service.get(RecordId(id)).await?;
    Ok(Json(record))
}

/// PATCH /api/v1/records/:id - Partially update a record
///
/// Publishes `move` when the lane changed and `update` otherwise.
pub async fn update_record(
    State(service): State<Arc<PersistenceService>>,
    State(hub): State<Arc<EventHub>>,
    OriginSession(origin): OriginSession,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateRecordRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let delta = service.update(RecordId(id), req).await?;

    hub.publish(delta.kind(), &delta.after, origin);

    Ok(Json(delta.after))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .route("/:id", get(get_record).patch(update_record))
}
