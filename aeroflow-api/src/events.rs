use std::convert::Infallible;

use aeroflow_core::events::DomainEvent;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    /// Only forward events for this flight.
    pub flight_id: Option<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/events", get(stream_events))
}

/// GET /api/events
pub async fn stream_events(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = flight_scoped(state.events.subscribe(), query.flight_id).filter_map(|event| async move {
        let sse = Event::default().event(event.name()).json_data(event.payload()).ok()?;
        Some(Ok::<_, Infallible>(sse))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Events from `rx`, limited to one flight when `room` is set.
/// Lagged receivers skip what they missed.
fn flight_scoped(
    rx: broadcast::Receiver<DomainEvent>,
    room: Option<Uuid>,
) -> impl Stream<Item = DomainEvent> {
    BroadcastStream::new(rx).filter_map(move |result| async move {
        let event = result.ok()?;
        if room.is_some_and(|id| id != event.flight_id()) {
            return None;
        }
        Some(event)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use aeroflow_core::{Flight, FlightStatus, NewFlight, PerClass};
    use aeroflow_store::{BusinessRules, MemoryStore};
    use chrono::Utc;

    use crate::state::AuthConfig;

    fn state() -> AppState {
        let auth = AuthConfig { secret: "test-secret".to_string(), expiration: 3600 };
        let (state, _notifications) =
            AppState::new(Arc::new(MemoryStore::new()), &BusinessRules::default(), auth, None);
        state
    }

    async fn create_flight(state: &AppState, number: &str) -> Flight {
        let departure = Utc::now() + chrono::Duration::days(1);
        state
            .services
            .flights
            .create(NewFlight {
                flight_number: number.to_string(),
                airline: "AeroFlow".to_string(),
                aircraft: "A320".to_string(),
                origin: "JFK".to_string(),
                destination: "LAX".to_string(),
                departure_time: departure,
                arrival_time: departure + chrono::Duration::hours(6),
                gate: None,
                status: None,
                capacity: Some(PerClass::new(0, 0, 10)),
                price: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_room_filter_drops_other_flights() {
        let state = state();
        let watched = create_flight(&state, "EV100").await;
        let other = create_flight(&state, "EV200").await;

        let mut scoped = Box::pin(flight_scoped(state.events.subscribe(), Some(watched.id)));
        let mut all = Box::pin(flight_scoped(state.events.subscribe(), None));

        state.services.flights.update_status(other.id, FlightStatus::Delayed).await.unwrap();
        state.services.flights.update_status(watched.id, FlightStatus::Boarding).await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(1), scoped.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.flight_id(), watched.id);
        assert_eq!(first.name(), "flight-updated");

        let seen = tokio::time::timeout(Duration::from_secs(1), all.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen.flight_id(), other.id);
    }
}
