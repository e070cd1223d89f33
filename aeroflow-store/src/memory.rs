use std::collections::HashMap;

use aeroflow_core::repository::{
    sort_queue, BoardingRepository, BookingFilter, BookingRepository, Constraint, FlightFilter,
    FlightRepository, PassengerRepository, StoreError, StoreResult,
};
use aeroflow_core::{BoardingQueueEntry, Booking, Flight, Passenger, QueueEntryView};
use aeroflow_shared::{Page, PageRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    flights: HashMap<Uuid, Flight>,
    passengers: HashMap<Uuid, Passenger>,
    bookings: HashMap<Uuid, Booking>,
    queue: HashMap<Uuid, BoardingQueueEntry>,
}

impl Tables {
    fn check_flight_number(&self, flight: &Flight) -> StoreResult<()> {
        let taken = self
            .flights
            .values()
            .any(|f| f.id != flight.id && f.flight_number == flight.flight_number);
        if taken {
            return Err(StoreError::duplicate(Constraint::FlightNumber));
        }
        Ok(())
    }

    fn check_passport(&self, passenger: &Passenger) -> StoreResult<()> {
        let taken = self
            .passengers
            .values()
            .any(|p| p.id != passenger.id && p.passport() == passenger.passport());
        if taken {
            return Err(StoreError::duplicate(Constraint::PassportNumber));
        }
        Ok(())
    }

    fn check_seat(&self, booking: &Booking) -> StoreResult<()> {
        let Some(seat) = booking.seat_number.as_deref() else {
            return Ok(());
        };
        if !booking.status.is_active() {
            return Ok(());
        }
        let taken = self.bookings.values().any(|b| {
            b.id != booking.id && b.flight_id == booking.flight_id && b.holds_seat(seat)
        });
        if taken {
            return Err(StoreError::duplicate(Constraint::Seat));
        }
        Ok(())
    }

    fn flights_in_window(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> impl Iterator<Item = &Flight> + '_ {
        self.flights.values().filter(move |f| {
            f.claimed_gate().is_some() && f.departure_time >= from && f.departure_time <= to
        })
    }

    fn view(&self, entry: &BoardingQueueEntry) -> Option<QueueEntryView> {
        let booking = self.bookings.get(&entry.booking_id)?;
        let passenger = self.passengers.get(&entry.passenger_id);
        Some(QueueEntryView {
            entry: entry.clone(),
            booking_reference: booking.booking_reference.clone(),
            seat_number: booking.seat_number.clone(),
            class: booking.class,
            passenger_name: passenger.map(|p| p.name.clone()),
            passport_number: passenger.map(|p| p.passport_number.clone()),
        })
    }
}

/// Process-local store. One lock guards every table so multi-table writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn insert_flight(&self, flight: &Flight) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.check_flight_number(flight)?;
        tables.flights.insert(flight.id, flight.clone());
        Ok(())
    }

    async fn get_flight(&self, id: Uuid) -> StoreResult<Option<Flight>> {
        Ok(self.tables.read().await.flights.get(&id).cloned())
    }

    async fn list_flights(&self, filter: &FlightFilter, page: PageRequest) -> StoreResult<Page<Flight>> {
        let tables = self.tables.read().await;
        let mut flights: Vec<Flight> = tables
            .flights
            .values()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect();
        filter.sort(&mut flights);
        Ok(Page::from_sorted(flights, page))
    }

    async fn flights_at_gate(
        &self,
        gate: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Flight>> {
        let tables = self.tables.read().await;
        Ok(tables
            .flights_in_window(from, to)
            .filter(|f| f.claimed_gate() == Some(gate))
            .cloned()
            .collect())
    }

    async fn gate_claims(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> StoreResult<Vec<Flight>> {
        let tables = self.tables.read().await;
        Ok(tables.flights_in_window(from, to).cloned().collect())
    }

    async fn update_flight(&self, flight: &Flight) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.flights.contains_key(&flight.id) {
            return Err(StoreError::NotFound("Flight"));
        }
        tables.check_flight_number(flight)?;
        tables.flights.insert(flight.id, flight.clone());
        Ok(())
    }

    async fn delete_flight(&self, id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .flights
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("Flight"))
    }
}

#[async_trait]
impl PassengerRepository for MemoryStore {
    async fn insert_passenger(&self, passenger: &Passenger) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.check_passport(passenger)?;
        tables.passengers.insert(passenger.id, passenger.clone());
        Ok(())
    }

    async fn get_passenger(&self, id: Uuid) -> StoreResult<Option<Passenger>> {
        Ok(self.tables.read().await.passengers.get(&id).cloned())
    }

    async fn find_passenger_by_passport(&self, passport: &str) -> StoreResult<Option<Passenger>> {
        let tables = self.tables.read().await;
        Ok(tables.passengers.values().find(|p| p.passport() == passport).cloned())
    }

    async fn list_passengers(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> StoreResult<Page<Passenger>> {
        let tables = self.tables.read().await;
        let mut passengers: Vec<Passenger> = tables
            .passengers
            .values()
            .filter(|p| search.map_or(true, |needle| p.matches(needle)))
            .cloned()
            .collect();
        passengers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(Page::from_sorted(passengers, page))
    }

    async fn update_passenger(&self, passenger: &Passenger) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.passengers.contains_key(&passenger.id) {
            return Err(StoreError::NotFound("Passenger"));
        }
        tables.check_passport(passenger)?;
        tables.passengers.insert(passenger.id, passenger.clone());
        Ok(())
    }

    async fn delete_passenger(&self, id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .passengers
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("Passenger"))
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .bookings
            .values()
            .any(|b| b.booking_reference == booking.booking_reference)
        {
            return Err(StoreError::duplicate(Constraint::BookingReference));
        }
        tables.check_seat(booking)?;
        tables.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn find_booking_by_reference(&self, reference: &str) -> StoreResult<Option<Booking>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .find(|b| b.booking_reference == reference)
            .cloned())
    }

    async fn booking_reference_exists(&self, reference: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.bookings.values().any(|b| b.booking_reference == reference))
    }

    async fn list_bookings(&self, filter: &BookingFilter, page: PageRequest) -> StoreResult<Page<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(Page::from_sorted(bookings, page))
    }

    async fn bookings_for_flight(&self, flight_id: Uuid) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.flight_id == flight_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }

    async fn count_bookings_for_flight(&self, flight_id: Uuid) -> StoreResult<usize> {
        let tables = self.tables.read().await;
        Ok(tables.bookings.values().filter(|b| b.flight_id == flight_id).count())
    }

    async fn count_bookings_for_passenger(&self, passenger_id: Uuid) -> StoreResult<usize> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.passenger_id == passenger_id)
            .count())
    }

    async fn update_booking(&self, booking: &Booking) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.bookings.contains_key(&booking.id) {
            return Err(StoreError::NotFound("Booking"));
        }
        tables.check_seat(booking)?;
        tables.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn cancel_booking(&self, booking: &Booking) -> StoreResult<Option<BoardingQueueEntry>> {
        let mut tables = self.tables.write().await;
        if !tables.bookings.contains_key(&booking.id) {
            return Err(StoreError::NotFound("Booking"));
        }
        tables.bookings.insert(booking.id, booking.clone());
        let entry_id = tables
            .queue
            .values()
            .find(|e| e.booking_id == booking.id)
            .map(|e| e.id);
        Ok(entry_id.and_then(|id| tables.queue.remove(&id)))
    }
}

#[async_trait]
impl BoardingRepository for MemoryStore {
    async fn insert_entry(&self, entry: &BoardingQueueEntry) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.queue.values().any(|e| e.booking_id == entry.booking_id) {
            return Err(StoreError::duplicate(Constraint::QueueBooking));
        }
        let position_taken = tables.queue.values().any(|e| {
            e.flight_id == entry.flight_id
                && e.boarding_group == entry.boarding_group
                && e.queue_position == entry.queue_position
        });
        if position_taken {
            return Err(StoreError::duplicate(Constraint::QueuePosition));
        }
        tables.queue.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<BoardingQueueEntry>> {
        Ok(self.tables.read().await.queue.get(&id).cloned())
    }

    async fn find_entry_by_booking(&self, booking_id: Uuid) -> StoreResult<Option<BoardingQueueEntry>> {
        let tables = self.tables.read().await;
        Ok(tables.queue.values().find(|e| e.booking_id == booking_id).cloned())
    }

    async fn entries_for_flight(&self, flight_id: Uuid) -> StoreResult<Vec<BoardingQueueEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<BoardingQueueEntry> = tables
            .queue
            .values()
            .filter(|e| e.flight_id == flight_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.sort_key());
        Ok(entries)
    }

    async fn queue_view(&self, flight_id: Uuid) -> StoreResult<Vec<QueueEntryView>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<QueueEntryView> = tables
            .queue
            .values()
            .filter(|e| e.flight_id == flight_id)
            .filter_map(|e| tables.view(e))
            .collect();
        sort_queue(&mut rows);
        Ok(rows)
    }

    async fn update_entry(&self, entry: &BoardingQueueEntry) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.queue.get_mut(&entry.id) {
            Some(slot) => {
                *slot = entry.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("Queue entry")),
        }
    }

    async fn record_boarded(&self, entry: &BoardingQueueEntry, booking: &Booking) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.queue.contains_key(&entry.id) {
            return Err(StoreError::NotFound("Queue entry"));
        }
        if !tables.bookings.contains_key(&booking.id) {
            return Err(StoreError::NotFound("Booking"));
        }
        tables.queue.insert(entry.id, entry.clone());
        tables.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn delete_entry(&self, id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .queue
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("Queue entry"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeroflow_core::{BoardingGroup, NewBooking, NewFlight, PerClass, SeatClass};
    use chrono::Duration;

    fn flight(number: &str) -> Flight {
        let departure = Utc::now() + Duration::days(1);
        NewFlight {
            flight_number: number.to_string(),
            airline: "AeroFlow".to_string(),
            aircraft: "A320".to_string(),
            origin: "JFK".to_string(),
            destination: "SFO".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(6),
            gate: Some("A1".to_string()),
            status: None,
            capacity: None,
            price: None,
        }
        .into_flight(PerClass::new(0, 20, 150), PerClass::new(0, 600, 200))
        .unwrap()
    }

    fn booking(flight_id: Uuid, reference: &str, seat: Option<&str>) -> Booking {
        Booking::new(
            NewBooking {
                flight_id,
                passenger_id: Uuid::new_v4(),
                seat_number: seat.map(str::to_string),
                class: SeatClass::Economy,
                baggage: vec![],
            },
            reference.to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_unique_flight_number() {
        let store = MemoryStore::new();
        store.insert_flight(&flight("AA1")).await.unwrap();
        let err = store.insert_flight(&flight("AA1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { constraint: Constraint::FlightNumber }));
    }

    #[tokio::test]
    async fn test_seat_constraint_ignores_cancelled() {
        let store = MemoryStore::new();
        let flight_id = Uuid::new_v4();
        let mut first = booking(flight_id, "AAAAA1", Some("1A"));
        store.insert_booking(&first).await.unwrap();

        let err = store.insert_booking(&booking(flight_id, "AAAAA2", Some("1A"))).await.unwrap_err();
        assert_eq!(err.to_string(), "Seat already taken");

        first.cancel(Utc::now()).unwrap();
        assert!(store.cancel_booking(&first).await.unwrap().is_none());
        store.insert_booking(&booking(flight_id, "AAAAA3", Some("1A"))).await.unwrap();

        // same seat on another flight is fine
        store.insert_booking(&booking(Uuid::new_v4(), "AAAAA4", Some("1A"))).await.unwrap();
        let err = store.insert_booking(&booking(Uuid::new_v4(), "AAAAA4", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { constraint: Constraint::BookingReference }));
        assert!(store.booking_reference_exists("AAAAA4").await.unwrap());
    }

    #[tokio::test]
    async fn test_queue_constraints_and_cancel_cascade() {
        let store = MemoryStore::new();
        let flight_id = Uuid::new_v4();
        let mut booking = booking(flight_id, "QQQQQ1", None);
        booking.check_in(Utc::now()).unwrap();
        store.insert_booking(&booking).await.unwrap();

        let entry = BoardingQueueEntry::new(&booking, BoardingGroup::Group2, 1);
        store.insert_entry(&entry).await.unwrap();
        let again = BoardingQueueEntry::new(&booking, BoardingGroup::Group2, 2);
        assert!(matches!(
            store.insert_entry(&again).await,
            Err(StoreError::Duplicate { constraint: Constraint::QueueBooking })
        ));

        booking.cancel(Utc::now()).unwrap();
        let removed = store.cancel_booking(&booking).await.unwrap();
        assert_eq!(removed.map(|e| e.id), Some(entry.id));
        assert!(store.get_entry(entry.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_gate_claims_window() {
        let store = MemoryStore::new();
        let f = flight("AA2");
        store.insert_flight(&f).await.unwrap();
        let hits = store
            .flights_at_gate("A1", f.departure_time - Duration::hours(2), f.departure_time)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        let misses = store
            .gate_claims(f.departure_time + Duration::minutes(1), f.departure_time + Duration::hours(2))
            .await
            .unwrap();
        assert!(misses.is_empty());
    }
}
