use aeroflow_core::{BoardingGroup, BoardingQueueEntry, BoardingStats, QueueEntryView};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{Claims, DESK, OPERATIONS};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub booking_id: Uuid,
    #[serde(default)]
    pub boarding_group: Option<BoardingGroup>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/boarding/queue", post(enqueue))
        .route("/api/boarding/flight/{flight_id}", get(list_queue))
        .route("/api/boarding/flight/{flight_id}/stats", get(stats))
        .route("/api/boarding/{id}", get(get_entry).delete(remove))
        .route("/api/boarding/{id}/call", put(call))
        .route("/api/boarding/{id}/boarding", put(mark_boarding))
        .route("/api/boarding/{id}/boarded", put(mark_boarded))
        .route("/api/boarding/{id}/missed", put(mark_missed))
}

/// POST /api/boarding/queue
pub async fn enqueue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<BoardingQueueEntry>), AppError> {
    claims.require(DESK)?;
    let entry = state.services.boarding.enqueue(req.booking_id, req.boarding_group).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/boarding/flight/:flight_id
pub async fn list_queue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Vec<QueueEntryView>>, AppError> {
    claims.require(OPERATIONS)?;
    Ok(Json(state.services.boarding.list(flight_id).await?))
}

/// GET /api/boarding/flight/:flight_id/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<BoardingStats>, AppError> {
    claims.require(OPERATIONS)?;
    Ok(Json(state.services.boarding.stats(flight_id).await?))
}

/// GET /api/boarding/:id
pub async fn get_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardingQueueEntry>, AppError> {
    claims.require(OPERATIONS)?;
    Ok(Json(state.services.boarding.get(id).await?))
}

/// PUT /api/boarding/:id/call
pub async fn call(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardingQueueEntry>, AppError> {
    claims.require(OPERATIONS)?;
    Ok(Json(state.services.boarding.call(id).await?))
}

/// PUT /api/boarding/:id/boarding
pub async fn mark_boarding(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardingQueueEntry>, AppError> {
    claims.require(OPERATIONS)?;
    Ok(Json(state.services.boarding.mark_boarding(id).await?))
}

/// PUT /api/boarding/:id/boarded
///
/// Also moves the linked booking to `boarded`.
pub async fn mark_boarded(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardingQueueEntry>, AppError> {
    claims.require(OPERATIONS)?;
    Ok(Json(state.services.boarding.mark_boarded(id).await?))
}

/// PUT /api/boarding/:id/missed
pub async fn mark_missed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardingQueueEntry>, AppError> {
    claims.require(OPERATIONS)?;
    Ok(Json(state.services.boarding.mark_missed(id).await?))
}

/// DELETE /api/boarding/:id
pub async fn remove(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardingQueueEntry>, AppError> {
    claims.require(OPERATIONS)?;
    Ok(Json(state.services.boarding.remove(id).await?))
}
