use aeroflow_shared::{Page, PageRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::boarding::{BoardingQueueEntry, QueueEntryView};
use crate::booking::{Booking, BookingStatus};
use crate::flight::{Flight, FlightStatus};
use crate::passenger::Passenger;
use crate::CoreError;

// ============================================================================
// Errors
// ============================================================================

/// Uniqueness rules every store backend enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    FlightNumber,
    PassportNumber,
    BookingReference,
    Seat,
    QueueBooking,
    QueuePosition,
}

impl Constraint {
    pub fn message(&self) -> &'static str {
        match self {
            Constraint::FlightNumber => "Flight number already exists",
            Constraint::PassportNumber => "Passenger with this passport number already exists",
            Constraint::BookingReference => "Booking reference already exists",
            Constraint::Seat => "Seat already taken",
            Constraint::QueueBooking => "Passenger already in boarding queue",
            Constraint::QueuePosition => "Boarding queue position already taken",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{}", .constraint.message())]
    Duplicate { constraint: Constraint },
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn duplicate(constraint: Constraint) -> Self {
        StoreError::Duplicate { constraint }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => CoreError::not_found(what),
            StoreError::Duplicate { constraint } => CoreError::conflict(constraint.message()),
            StoreError::Backend(message) => CoreError::Internal(message),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Listing filters
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlightSort {
    #[default]
    DepartureTime,
    ArrivalTime,
    FlightNumber,
}

impl FlightSort {
    pub fn parse(value: &str) -> Self {
        match value {
            "arrivalTime" => FlightSort::ArrivalTime,
            "flightNumber" => FlightSort::FlightNumber,
            _ => FlightSort::DepartureTime,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlightFilter {
    pub status: Option<FlightStatus>,
    pub destination: Option<String>,
    /// Substring over flight number, origin and destination.
    pub search: Option<String>,
    pub sort_by: FlightSort,
    pub descending: bool,
}

impl FlightFilter {
    pub fn matches(&self, flight: &Flight) -> bool {
        if let Some(status) = self.status {
            if flight.status != status {
                return false;
            }
        }
        if let Some(destination) = &self.destination {
            if !flight.destination.eq_ignore_ascii_case(destination) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_ascii_uppercase();
            return flight.flight_number.contains(&needle)
                || flight.origin.contains(&needle)
                || flight.destination.contains(&needle);
        }
        true
    }

    /// Sort in place according to `sort_by`/`descending`. Ties break on id.
    pub fn sort(&self, flights: &mut [Flight]) {
        flights.sort_by(|a, b| {
            let ordering = match self.sort_by {
                FlightSort::DepartureTime => a.departure_time.cmp(&b.departure_time),
                FlightSort::ArrivalTime => a.arrival_time.cmp(&b.arrival_time),
                FlightSort::FlightNumber => a.flight_number.cmp(&b.flight_number),
            }
            .then_with(|| a.id.cmp(&b.id));
            if self.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub flight_id: Option<Uuid>,
    pub passenger_id: Option<Uuid>,
    /// Case-insensitive substring of the booking reference.
    pub search: Option<String>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.map_or(true, |s| booking.status == s)
            && self.flight_id.map_or(true, |id| booking.flight_id == id)
            && self.passenger_id.map_or(true, |id| booking.passenger_id == id)
            && self.search.as_deref().map_or(true, |needle| {
                booking.booking_reference.contains(&needle.to_ascii_uppercase())
            })
    }
}

// ============================================================================
// Repositories
// ============================================================================

/// Repository trait for flight data access
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn insert_flight(&self, flight: &Flight) -> StoreResult<()>;

    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>>;

    async fn list_flights(&self, filter: &FlightFilter, page: PageRequest) -> StoreResult<Page<Flight>>;

    /// Flights currently claiming `gate` that depart inside `[from, to]`.
    async fn flights_at_gate(
        &self,
        gate: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Flight>>;

    /// Every flight claiming any gate with a departure inside `[from, to]`.
    async fn gate_claims(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Flight>>;

    async fn update_flight(&self, flight: &Flight) -> StoreResult<()>;

    async fn delete_flight(&self, id: Uuid) -> StoreResult<()>;
}

/// Repository trait for passenger data access
#[async_trait]
pub trait PassengerRepository: Send + Sync {
    async fn insert_passenger(&self, passenger: &Passenger) -> StoreResult<()>;

    async fn get_passenger(&self, id: Uuid) -> StoreResult<Option<Passenger>>;

    async fn find_passenger_by_passport(&self, passport: &str) -> StoreResult<Option<Passenger>>;

    async fn list_passengers(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> StoreResult<Page<Passenger>>;

    async fn update_passenger(&self, passenger: &Passenger) -> StoreResult<()>;

    async fn delete_passenger(&self, id: Uuid) -> StoreResult<()>;
}

/// Repository trait for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Rejects a taken reference or a seat held by another non-cancelled booking.
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()>;

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    async fn find_booking_by_reference(&self, reference: &str) -> StoreResult<Option<Booking>>;

    async fn booking_reference_exists(&self, reference: &str) -> StoreResult<bool>;

    async fn list_bookings(&self, filter: &BookingFilter, page: PageRequest) -> StoreResult<Page<Booking>>;

    /// All bookings on a flight, cancelled ones included.
    async fn bookings_for_flight(&self, flight_id: Uuid) -> StoreResult<Vec<Booking>>;

    async fn count_bookings_for_flight(&self, flight_id: Uuid) -> StoreResult<usize>;

    async fn count_bookings_for_passenger(&self, passenger_id: Uuid) -> StoreResult<usize>;

    async fn update_booking(&self, booking: &Booking) -> StoreResult<()>;

    /// Persist a cancelled booking and drop its queue entry in one step.
    async fn cancel_booking(&self, booking: &Booking) -> StoreResult<Option<BoardingQueueEntry>>;
}

/// Repository trait for boarding queue data access
#[async_trait]
pub trait BoardingRepository: Send + Sync {
    /// Rejects a second entry for the same booking or a reused (flight, group, position).
    async fn insert_entry(&self, entry: &BoardingQueueEntry) -> StoreResult<()>;

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<BoardingQueueEntry>>;

    async fn find_entry_by_booking(&self, booking_id: Uuid) -> StoreResult<Option<BoardingQueueEntry>>;

    async fn entries_for_flight(&self, flight_id: Uuid) -> StoreResult<Vec<BoardingQueueEntry>>;

    /// Entries joined with booking and passenger, sorted by group priority then position.
    async fn queue_view(&self, flight_id: Uuid) -> StoreResult<Vec<QueueEntryView>>;

    async fn update_entry(&self, entry: &BoardingQueueEntry) -> StoreResult<()>;

    /// Persist a boarded entry together with its boarded booking.
    async fn record_boarded(&self, entry: &BoardingQueueEntry, booking: &Booking) -> StoreResult<()>;

    async fn delete_entry(&self, id: Uuid) -> StoreResult<()>;
}

/// Everything the services need from one backend.
pub trait AirportStore:
    FlightRepository + PassengerRepository + BookingRepository + BoardingRepository
{
}

impl<T> AirportStore for T where
    T: FlightRepository + PassengerRepository + BookingRepository + BoardingRepository
{
}

/// Sort queue rows by group priority, then position.
pub fn sort_queue(rows: &mut [QueueEntryView]) {
    rows.sort_by_key(|row| row.entry.sort_key());
}
