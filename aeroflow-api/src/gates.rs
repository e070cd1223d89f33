use aeroflow_catalog::GateAvailability;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::auth::{Claims, DESK};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableGatesQuery {
    pub aircraft_type: Option<String>,
    pub date_time: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/gates/available", get(available_gates))
}

/// GET /api/gates/available?aircraftType=&dateTime=
pub async fn available_gates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<AvailableGatesQuery>,
) -> Result<Json<Vec<GateAvailability>>, AppError> {
    claims.require(DESK)?;

    let (Some(aircraft), Some(date_time)) = (query.aircraft_type, query.date_time) else {
        return Err(AppError::ValidationError(
            "Please provide aircraftType and dateTime".to_string(),
        ));
    };
    let at = parse_date_time(&date_time)?;

    Ok(Json(state.services.flights.available_gates(&aircraft, at).await?))
}

fn parse_date_time(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::ValidationError(format!("Invalid dateTime '{}'", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_time() {
        let at = parse_date_time("2025-06-01T10:00:00+02:00").unwrap();
        assert_eq!(at.to_rfc3339(), "2025-06-01T08:00:00+00:00");
        assert!(parse_date_time("tomorrow").is_err());
    }
}
