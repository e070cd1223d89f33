use aeroflow_core::repository::BookingFilter;
use aeroflow_core::{Booking, BookingPatch, BookingStatus, NewBooking};
use aeroflow_shared::{Page, PageRequest};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::flights::non_blank;
use crate::middleware::auth::{Claims, DESK, OPERATIONS};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBookingsQuery {
    pub status: Option<String>,
    pub flight_id: Option<Uuid>,
    pub passenger_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListBookingsQuery {
    fn filter(&self) -> Result<BookingFilter, AppError> {
        Ok(BookingFilter {
            status: non_blank(&self.status).map(BookingStatus::parse).transpose()?,
            flight_id: self.flight_id,
            passenger_id: self.passenger_id,
            search: non_blank(&self.search).map(str::to_string),
        })
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings", get(list_bookings).post(create_booking))
        .route("/api/bookings/reference/{reference}", get(find_by_reference))
        .route(
            "/api/bookings/{id}",
            get(get_booking).put(update_booking).delete(cancel_booking),
        )
        .route("/api/bookings/{id}/checkin", put(check_in))
        .route("/api/bookings/{id}/board", put(board))
}

/// GET /api/bookings
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Page<Booking>>, AppError> {
    claims.require(DESK)?;
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.limit);
    Ok(Json(state.services.bookings.list(&filter, page).await?))
}

/// POST /api/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewBooking>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    claims.require(DESK)?;
    let booking = state.services.bookings.create(req).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /api/bookings/reference/:reference
pub async fn find_by_reference(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(reference): Path<String>,
) -> Result<Json<Booking>, AppError> {
    claims.require(DESK)?;
    Ok(Json(state.services.bookings.find_by_reference(&reference).await?))
}

/// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    claims.require(DESK)?;
    Ok(Json(state.services.bookings.get(id).await?))
}

/// PUT /api/bookings/:id
pub async fn update_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<BookingPatch>,
) -> Result<Json<Booking>, AppError> {
    claims.require(DESK)?;
    Ok(Json(state.services.bookings.update(id, req).await?))
}

/// DELETE /api/bookings/:id
///
/// Cancels; the record is kept with status `cancelled`.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    claims.require(OPERATIONS)?;
    Ok(Json(state.services.bookings.cancel(id).await?))
}

/// PUT /api/bookings/:id/checkin
pub async fn check_in(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    claims.require(DESK)?;
    Ok(Json(state.services.bookings.check_in(id).await?))
}

/// PUT /api/bookings/:id/board
pub async fn board(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    claims.require(OPERATIONS)?;
    Ok(Json(state.services.bookings.board(id).await?))
}
