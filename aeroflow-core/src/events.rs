use aeroflow_shared::models::events::{
    PassengerNotification, BOARDING_UPDATED, BOOKING_UPDATED, FLIGHT_UPDATED,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::boarding::BoardingQueueEntry;
use crate::booking::Booking;
use crate::flight::Flight;

/// What happened to the record carried by a [`DomainEvent`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Change {
    Created,
    Updated,
    StatusChanged,
    GateChanged,
    CheckedIn,
    Called,
    Boarding,
    Boarded,
    Missed,
    Cancelled,
    Removed,
    Deleted,
}

/// State change pushed to live subscribers after a successful write.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    FlightUpdated { change: Change, flight: Flight },
    BoardingUpdated { change: Change, entry: BoardingQueueEntry },
    BookingUpdated { change: Change, booking: Booking },
}

impl DomainEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::FlightUpdated { .. } => FLIGHT_UPDATED,
            DomainEvent::BoardingUpdated { .. } => BOARDING_UPDATED,
            DomainEvent::BookingUpdated { .. } => BOOKING_UPDATED,
        }
    }

    /// Subscribers filter on this.
    pub fn flight_id(&self) -> Uuid {
        match self {
            DomainEvent::FlightUpdated { flight, .. } => flight.id,
            DomainEvent::BoardingUpdated { entry, .. } => entry.flight_id,
            DomainEvent::BookingUpdated { booking, .. } => booking.flight_id,
        }
    }

    pub fn change(&self) -> Change {
        match self {
            DomainEvent::FlightUpdated { change, .. }
            | DomainEvent::BoardingUpdated { change, .. }
            | DomainEvent::BookingUpdated { change, .. } => *change,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            DomainEvent::FlightUpdated { change, flight } => {
                json!({ "type": change, "flightId": flight.id, "flight": flight })
            }
            DomainEvent::BoardingUpdated { change, entry } => {
                json!({ "type": change, "flightId": entry.flight_id, "entry": entry })
            }
            DomainEvent::BookingUpdated { change, booking } => {
                json!({ "type": change, "flightId": booking.flight_id, "booking": booking })
            }
        }
    }
}

/// Fire-and-forget sink for live updates and passenger notifications.
///
/// Implementations must not block the caller and must not fail the
/// operation that produced the event.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DomainEvent);
    fn notify(&self, notification: PassengerNotification);
}

/// Discards everything. Used by tests and tools that run without subscribers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: DomainEvent) {}
    fn notify(&self, _notification: PassengerNotification) {}
}
