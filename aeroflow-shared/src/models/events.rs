use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pii::Masked;

/// SSE event names pushed to connected clients.
pub const FLIGHT_UPDATED: &str = "flight-updated";
pub const BOARDING_UPDATED: &str = "boarding-updated";
pub const BOOKING_UPDATED: &str = "booking-updated";

/// Topic used when notifications are shipped to Kafka.
pub const NOTIFICATION_TOPIC: &str = "passenger.notifications";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    BookingConfirmation,
    CheckInConfirmation,
    FlightStatusUpdate,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingConfirmation => "booking-confirmation",
            NotificationKind::CheckInConfirmation => "check-in-confirmation",
            NotificationKind::FlightStatusUpdate => "flight-status-update",
        }
    }

    pub fn subject(&self, booking_reference: &str, flight_number: &str) -> String {
        match self {
            NotificationKind::BookingConfirmation => {
                format!("Booking Confirmation - {}", booking_reference)
            }
            NotificationKind::CheckInConfirmation => {
                format!("Check-in Confirmed - Flight {}", flight_number)
            }
            NotificationKind::FlightStatusUpdate => {
                format!("Flight Status Update - {}", flight_number)
            }
        }
    }
}

/// Outbound passenger message. Delivery is best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerNotification {
    pub kind: NotificationKind,
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub passenger_name: String,
    pub email: Masked<String>,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub seat_number: Option<String>,
    pub gate: Option<String>,
    pub flight_status: String,
    pub created_at: i64,
}

impl PassengerNotification {
    pub fn subject(&self) -> String {
        self.kind.subject(&self.booking_reference, &self.flight_number)
    }
}
