use aeroflow_core::{Booking, Flight, Passenger};
use aeroflow_shared::models::events::{NotificationKind, PassengerNotification};
use chrono::Utc;

pub fn passenger_notification(
    kind: NotificationKind,
    booking: &Booking,
    passenger: &Passenger,
    flight: &Flight,
) -> PassengerNotification {
    PassengerNotification {
        kind,
        booking_id: booking.id,
        booking_reference: booking.booking_reference.clone(),
        passenger_name: passenger.name.clone(),
        email: passenger.email.clone(),
        flight_number: flight.flight_number.clone(),
        origin: flight.origin.clone(),
        destination: flight.destination.clone(),
        departure_time: flight.departure_time,
        seat_number: booking.seat_number.clone(),
        gate: flight.gate.clone(),
        flight_status: flight.status.as_str().to_string(),
        created_at: Utc::now().timestamp(),
    }
}
