use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flight::SeatClass;
use crate::{CoreError, CoreResult};

/// Reservation lifecycle. Forward only, except cancellation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Confirmed,
    CheckedIn,
    Boarded,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked-in",
            BookingStatus::Boarded => "boarded",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "checked-in" => Ok(BookingStatus::CheckedIn),
            "boarded" => Ok(BookingStatus::Boarded),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(CoreError::validation(format!("Unknown booking status '{}'", other))),
        }
    }

    /// Counts against seat and capacity limits.
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    /// Eligible for the boarding queue.
    pub fn is_checked_in(&self) -> bool {
        matches!(self, BookingStatus::CheckedIn | BookingStatus::Boarded)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Baggage {
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub booking_reference: String,
    pub flight_id: Uuid,
    pub passenger_id: Uuid,
    pub seat_number: Option<String>,
    pub class: SeatClass,
    pub status: BookingStatus,
    pub baggage: Vec<Baggage>,
    pub check_in_time: Option<DateTime<Utc>>,
    pub boarding_time: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(request: NewBooking, booking_reference: String) -> CoreResult<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            booking_reference,
            flight_id: request.flight_id,
            passenger_id: request.passenger_id,
            seat_number: request.seat_number.as_deref().map(normalize_seat).transpose()?,
            class: request.class,
            status: BookingStatus::Confirmed,
            baggage: request.baggage,
            check_in_time: None,
            boarding_time: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn holds_seat(&self, seat: &str) -> bool {
        self.status.is_active() && self.seat_number.as_deref() == Some(seat)
    }

    /// confirmed → checked-in
    pub fn check_in(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        match self.status {
            BookingStatus::Cancelled => {
                Err(CoreError::conflict("Cannot check-in a cancelled booking"))
            }
            BookingStatus::CheckedIn | BookingStatus::Boarded => {
                Err(CoreError::conflict("Booking already checked-in"))
            }
            BookingStatus::Confirmed => {
                self.status = BookingStatus::CheckedIn;
                self.check_in_time = Some(now);
                self.updated_at = now;
                Ok(())
            }
        }
    }

    /// checked-in → boarded
    pub fn board(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != BookingStatus::CheckedIn {
            return Err(CoreError::conflict("Passenger must check-in first"));
        }
        self.status = BookingStatus::Boarded;
        self.boarding_time = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Boarding finalized from the gate queue. Idempotent for an already boarded booking.
    pub fn finalize_boarding(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        match self.status {
            BookingStatus::Boarded => {
                if self.boarding_time.is_none() {
                    self.boarding_time = Some(now);
                    self.updated_at = now;
                }
                Ok(())
            }
            BookingStatus::CheckedIn => self.board(now),
            BookingStatus::Confirmed | BookingStatus::Cancelled => {
                Err(CoreError::conflict("Passenger must check-in first"))
            }
        }
    }

    /// Soft cancellation; the record is kept.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        match self.status {
            BookingStatus::Boarded => Err(CoreError::conflict(
                "Cannot cancel a booking that has already boarded",
            )),
            BookingStatus::Cancelled => Err(CoreError::conflict("Booking already cancelled")),
            BookingStatus::Confirmed | BookingStatus::CheckedIn => {
                self.status = BookingStatus::Cancelled;
                self.cancelled_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
        }
    }
}

/// Seat numbers are a row number followed by a column letter, e.g. `12C`.
pub fn normalize_seat(value: &str) -> CoreResult<String> {
    let seat = value.trim().to_ascii_uppercase();
    let split = seat.find(|c: char| !c.is_ascii_digit()).unwrap_or(seat.len());
    let (row, column) = seat.split_at(split);
    let row_ok = !row.is_empty() && !row.starts_with('0') && row.len() <= 3;
    let column_ok = column.len() == 1 && column.chars().all(|c| c.is_ascii_uppercase());
    if !row_ok || !column_ok {
        return Err(CoreError::validation(format!("Invalid seat number '{}'", value.trim())));
    }
    Ok(seat)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub flight_id: Uuid,
    pub passenger_id: Uuid,
    #[serde(default)]
    pub seat_number: Option<String>,
    pub class: SeatClass,
    #[serde(default)]
    pub baggage: Vec<Baggage>,
}

/// Fields a booking update may touch. Status only moves through the lifecycle operations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPatch {
    pub seat_number: Option<String>,
    pub class: Option<SeatClass>,
    pub baggage: Option<Vec<Baggage>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking() -> Booking {
        Booking::new(
            NewBooking {
                flight_id: Uuid::new_v4(),
                passenger_id: Uuid::new_v4(),
                seat_number: Some(" 1a ".to_string()),
                class: SeatClass::Economy,
                baggage: vec![],
            },
            "ABC123".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_booking_lifecycle() {
        let mut booking = booking();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.seat_number.as_deref(), Some("1A"));

        let now = Utc::now();
        booking.check_in(now).unwrap();
        assert_eq!(booking.status, BookingStatus::CheckedIn);
        assert_eq!(booking.check_in_time, Some(now));

        booking.board(now).unwrap();
        assert_eq!(booking.status, BookingStatus::Boarded);
        assert!(booking.boarding_time.is_some());
    }

    #[test]
    fn test_board_requires_check_in() {
        let mut booking = booking();
        let err = booking.board(Utc::now()).unwrap_err();
        assert_eq!(err, CoreError::conflict("Passenger must check-in first"));
    }

    #[test]
    fn test_double_check_in_rejected() {
        let mut booking = booking();
        booking.check_in(Utc::now()).unwrap();
        let err = booking.check_in(Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Booking already checked-in");
    }

    #[test]
    fn test_boarded_booking_cannot_cancel() {
        let mut booking = booking();
        booking.check_in(Utc::now()).unwrap();
        booking.board(Utc::now()).unwrap();
        let err = booking.cancel(Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Cannot cancel a booking that has already boarded");
    }

    #[test]
    fn test_cancel_is_terminal() {
        let mut booking = booking();
        booking.cancel(Utc::now()).unwrap();
        assert!(!booking.status.is_active());
        assert!(booking.cancelled_at.is_some());
        assert!(!booking.holds_seat("1A"));
        assert!(booking.check_in(Utc::now()).is_err());
        assert!(booking.cancel(Utc::now()).is_err());
    }

    #[test]
    fn test_finalize_boarding_is_idempotent() {
        let mut booking = booking();
        booking.check_in(Utc::now()).unwrap();
        booking.finalize_boarding(Utc::now()).unwrap();
        let first = booking.boarding_time;
        booking.finalize_boarding(Utc::now()).unwrap();
        assert_eq!(booking.boarding_time, first);
    }

    #[test]
    fn test_seat_format() {
        assert_eq!(normalize_seat("12c").unwrap(), "12C");
        assert!(normalize_seat("C12").is_err());
        assert!(normalize_seat("012A").is_err());
        assert!(normalize_seat("12AB").is_err());
        assert!(normalize_seat("").is_err());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(BookingStatus::CheckedIn).unwrap(), "checked-in");
        assert_eq!(BookingStatus::parse("checked-in").unwrap(), BookingStatus::CheckedIn);
    }

    #[test]
    fn test_baggage_type_field() {
        let bag: Baggage = serde_json::from_str(r#"{"weight": 23.5, "type": "checked"}"#).unwrap();
        assert_eq!(bag.kind.as_deref(), Some("checked"));
    }
}
