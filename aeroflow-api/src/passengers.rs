use aeroflow_core::{NewPassenger, Passenger, PassengerPatch};
use aeroflow_shared::{Page, PageRequest};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::flights::non_blank;
use crate::middleware::auth::{Claims, ADMIN, DESK};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListPassengersQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// All passenger routes require authentication.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/passengers", get(list_passengers).post(create_passenger))
        .route("/api/passengers/search/passport/{passport}", get(find_by_passport))
        .route(
            "/api/passengers/{id}",
            get(get_passenger).put(update_passenger).delete(delete_passenger),
        )
}

/// GET /api/passengers
pub async fn list_passengers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListPassengersQuery>,
) -> Result<Json<Page<Passenger>>, AppError> {
    claims.require(DESK)?;
    let page = PageRequest::new(query.page, query.limit);
    let passengers = state.services.passengers.list(non_blank(&query.search), page).await?;
    Ok(Json(passengers))
}

/// POST /api/passengers
pub async fn create_passenger(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewPassenger>,
) -> Result<(StatusCode, Json<Passenger>), AppError> {
    claims.require(DESK)?;
    let passenger = state.services.passengers.create(req).await?;
    Ok((StatusCode::CREATED, Json(passenger)))
}

/// GET /api/passengers/search/passport/:passport
pub async fn find_by_passport(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(passport): Path<String>,
) -> Result<Json<Passenger>, AppError> {
    claims.require(DESK)?;
    Ok(Json(state.services.passengers.find_by_passport(&passport).await?))
}

/// GET /api/passengers/:id
pub async fn get_passenger(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Passenger>, AppError> {
    claims.require(DESK)?;
    Ok(Json(state.services.passengers.get(id).await?))
}

/// PUT /api/passengers/:id
pub async fn update_passenger(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<PassengerPatch>,
) -> Result<Json<Passenger>, AppError> {
    claims.require(DESK)?;
    Ok(Json(state.services.passengers.update(id, req).await?))
}

/// DELETE /api/passengers/:id
pub async fn delete_passenger(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Passenger>, AppError> {
    claims.require(ADMIN)?;
    Ok(Json(state.services.passengers.delete(id).await?))
}
