pub mod boarding;
pub mod booking;
pub mod events;
pub mod flight;
pub mod passenger;
pub mod repository;

pub use boarding::{BoardingGroup, BoardingQueueEntry, BoardingStats, QueueEntryView, QueueStatus};
pub use booking::{Baggage, Booking, BookingPatch, BookingStatus, NewBooking};
pub use flight::{Flight, FlightPatch, FlightStatus, NewFlight, PerClass, SeatClass};
pub use passenger::{NewPassenger, Passenger, PassengerPatch};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Internal service error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(what: &str) -> Self {
        CoreError::NotFound(format!("{} not found", what))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Trim a free-text field and reject it when nothing is left.
pub fn required(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_user_facing() {
        assert_eq!(CoreError::not_found("Booking").to_string(), "Booking not found");
        assert_eq!(CoreError::conflict("Seat already taken").to_string(), "Seat already taken");
        assert_eq!(
            CoreError::validation("bad").to_string(),
            "Validation failed: bad"
        );
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required("name", "  Alice ").unwrap(), "Alice");
        assert!(matches!(required("name", "   "), Err(CoreError::Validation(_))));
    }
}
