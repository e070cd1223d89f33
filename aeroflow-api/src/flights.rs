use aeroflow_catalog::SeatMap;
use aeroflow_core::repository::{FlightFilter, FlightSort};
use aeroflow_core::{Flight, FlightPatch, FlightStatus, NewFlight};
use aeroflow_shared::{Page, PageRequest};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{Claims, ADMIN, OPERATIONS};
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFlightsQuery {
    pub status: Option<String>,
    pub destination: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl ListFlightsQuery {
    fn filter(&self) -> Result<FlightFilter, AppError> {
        let status = self
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(FlightStatus::parse)
            .transpose()?;
        Ok(FlightFilter {
            status,
            destination: non_blank(&self.destination).map(str::to_ascii_uppercase),
            search: non_blank(&self.search).map(str::to_string),
            sort_by: self.sort_by.as_deref().map(FlightSort::parse).unwrap_or_default(),
            descending: self.order.as_deref().is_some_and(|o| o.eq_ignore_ascii_case("desc")),
        })
    }
}

pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: FlightStatus,
}

/// Flight reads are open to anonymous callers.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/flights", get(list_flights))
        .route("/api/flights/{id}", get(get_flight))
        .route("/api/flights/{id}/seats", get(seat_map))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/flights", post(create_flight))
        .route("/api/flights/{id}", put(update_flight).delete(delete_flight))
        .route("/api/flights/{id}/status", patch(update_status))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/flights
pub async fn list_flights(
    State(state): State<AppState>,
    Query(query): Query<ListFlightsQuery>,
) -> Result<Json<Page<Flight>>, AppError> {
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.limit);
    Ok(Json(state.services.flights.list(&filter, page).await?))
}

/// GET /api/flights/:id
pub async fn get_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Flight>, AppError> {
    Ok(Json(state.services.flights.get(id).await?))
}

/// GET /api/flights/:id/seats
pub async fn seat_map(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SeatMap>, AppError> {
    Ok(Json(state.services.flights.seat_map(id).await?))
}

/// POST /api/flights
pub async fn create_flight(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewFlight>,
) -> Result<(StatusCode, Json<Flight>), AppError> {
    claims.require(ADMIN)?;
    let flight = state.services.flights.create(req).await?;
    Ok((StatusCode::CREATED, Json(flight)))
}

/// PUT /api/flights/:id
pub async fn update_flight(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<FlightPatch>,
) -> Result<Json<Flight>, AppError> {
    claims.require(ADMIN)?;
    Ok(Json(state.services.flights.update(id, req).await?))
}

/// PATCH /api/flights/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Flight>, AppError> {
    claims.require(OPERATIONS)?;
    Ok(Json(state.services.flights.update_status(id, req.status).await?))
}

/// DELETE /api/flights/:id
pub async fn delete_flight(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Flight>, AppError> {
    claims.require(ADMIN)?;
    Ok(Json(state.services.flights.delete(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_builds_filter() {
        let query = ListFlightsQuery {
            status: Some("Delayed".into()),
            destination: Some(" lhr ".into()),
            search: Some("  ".into()),
            sort_by: Some("flightNumber".into()),
            order: Some("DESC".into()),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.status, Some(FlightStatus::Delayed));
        assert_eq!(filter.destination.as_deref(), Some("LHR"));
        assert!(filter.search.is_none());
        assert_eq!(filter.sort_by, FlightSort::FlightNumber);
        assert!(filter.descending);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let query = ListFlightsQuery { status: Some("landed".into()), ..Default::default() };
        assert!(matches!(query.filter(), Err(AppError::ValidationError(_))));
    }
}
