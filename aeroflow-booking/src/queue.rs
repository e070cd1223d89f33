use std::sync::Arc;

use aeroflow_core::boarding::next_queue_position;
use aeroflow_core::events::{Change, DomainEvent, EventPublisher};
use aeroflow_core::repository::AirportStore;
use aeroflow_core::{
    BoardingGroup, BoardingQueueEntry, BoardingStats, Booking, CoreError, CoreResult,
    QueueEntryView, QueueStatus,
};
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::info;
use uuid::Uuid;

use crate::locks::FlightLocks;

/// Per-flight boarding queue, FIFO within each boarding group.
pub struct BoardingQueue {
    store: Arc<dyn AirportStore>,
    locks: FlightLocks,
    publisher: Arc<dyn EventPublisher>,
}

impl BoardingQueue {
    pub fn new(
        store: Arc<dyn AirportStore>,
        locks: FlightLocks,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self { store, locks, publisher }
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<BoardingQueueEntry> {
        self.store
            .get_entry(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Queue entry"))
    }

    /// Queue a checked-in booking. The group defaults from the booking's class.
    pub async fn enqueue(
        &self,
        booking_id: Uuid,
        group: Option<BoardingGroup>,
    ) -> CoreResult<BoardingQueueEntry> {
        let flight_id = self.booking(booking_id).await?.flight_id;
        let guard = self.locks.lock(flight_id).await;
        let booking = self.booking(booking_id).await?;

        if !booking.status.is_checked_in() {
            return Err(CoreError::conflict("Passenger must check-in first"));
        }
        if self.store.find_entry_by_booking(booking.id).await?.is_some() {
            return Err(CoreError::conflict("Passenger already in boarding queue"));
        }

        let group = group.unwrap_or_else(|| BoardingGroup::default_for(booking.class));
        let existing = self.store.entries_for_flight(flight_id).await?;
        let position = next_queue_position(&existing, flight_id, group);

        let entry = BoardingQueueEntry::new(&booking, group, position);
        self.store.insert_entry(&entry).await?;
        drop(guard);

        info!(
            entry_id = %entry.id,
            booking = %booking.booking_reference,
            group = group.as_str(),
            position,
            "Passenger queued for boarding"
        );
        self.publisher.publish(DomainEvent::BoardingUpdated {
            change: Change::Created,
            entry: entry.clone(),
        });
        Ok(entry)
    }

    pub async fn call(&self, id: Uuid) -> CoreResult<BoardingQueueEntry> {
        self.move_entry(id, QueueStatus::Called, Change::Called).await
    }

    pub async fn mark_boarding(&self, id: Uuid) -> CoreResult<BoardingQueueEntry> {
        self.move_entry(id, QueueStatus::Boarding, Change::Boarding).await
    }

    pub async fn mark_missed(&self, id: Uuid) -> CoreResult<BoardingQueueEntry> {
        self.move_entry(id, QueueStatus::Missed, Change::Missed).await
    }

    /// Board the entry and its booking in one write.
    pub async fn mark_boarded(&self, id: Uuid) -> CoreResult<BoardingQueueEntry> {
        let (_guard, mut entry) = self.locked_entry(id).await?;
        let now = Utc::now();
        entry.transition(QueueStatus::Boarded, now)?;

        let mut booking = self.booking(entry.booking_id).await?;
        booking.finalize_boarding(now)?;
        self.store.record_boarded(&entry, &booking).await?;

        info!(entry_id = %entry.id, booking = %booking.booking_reference, "Passenger boarded");
        self.publisher.publish(DomainEvent::BoardingUpdated {
            change: Change::Boarded,
            entry: entry.clone(),
        });
        self.publisher.publish(DomainEvent::BookingUpdated { change: Change::Boarded, booking });
        Ok(entry)
    }

    /// Delete the entry. Remaining positions keep their numbers.
    pub async fn remove(&self, id: Uuid) -> CoreResult<BoardingQueueEntry> {
        let (_guard, entry) = self.locked_entry(id).await?;
        self.store.delete_entry(entry.id).await?;

        info!(entry_id = %entry.id, "Queue entry removed");
        self.publisher.publish(DomainEvent::BoardingUpdated {
            change: Change::Removed,
            entry: entry.clone(),
        });
        Ok(entry)
    }

    /// Entries for the flight, sorted by group priority then position.
    pub async fn list(&self, flight_id: Uuid) -> CoreResult<Vec<QueueEntryView>> {
        self.ensure_flight(flight_id).await?;
        Ok(self.store.queue_view(flight_id).await?)
    }

    pub async fn stats(&self, flight_id: Uuid) -> CoreResult<BoardingStats> {
        self.ensure_flight(flight_id).await?;
        let checked_in = self
            .store
            .bookings_for_flight(flight_id)
            .await?
            .iter()
            .filter(|b| b.status.is_checked_in())
            .count();
        let entries = self.store.entries_for_flight(flight_id).await?;
        Ok(BoardingStats::tally(checked_in, &entries))
    }

    async fn move_entry(
        &self,
        id: Uuid,
        target: QueueStatus,
        change: Change,
    ) -> CoreResult<BoardingQueueEntry> {
        let (_guard, mut entry) = self.locked_entry(id).await?;
        entry.transition(target, Utc::now())?;
        self.store.update_entry(&entry).await?;

        info!(entry_id = %entry.id, status = target.as_str(), "Queue entry updated");
        self.publisher.publish(DomainEvent::BoardingUpdated { change, entry: entry.clone() });
        Ok(entry)
    }

    async fn locked_entry(&self, id: Uuid) -> CoreResult<(OwnedMutexGuard<()>, BoardingQueueEntry)> {
        let flight_id = self.get(id).await?.flight_id;
        let guard = self.locks.lock(flight_id).await;
        let entry = self.get(id).await?;
        Ok((guard, entry))
    }

    async fn booking(&self, id: Uuid) -> CoreResult<Booking> {
        self.store
            .get_booking(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking"))
    }

    async fn ensure_flight(&self, id: Uuid) -> CoreResult<()> {
        match self.store.get_flight(id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::not_found("Flight")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture;
    use aeroflow_core::{BookingStatus, Flight, NewBooking, PerClass, SeatClass};

    async fn checked_in(
        f: &crate::testing::Fixture,
        flight: &Flight,
        passport: &str,
        class: SeatClass,
    ) -> Booking {
        let passenger = f.passenger(passport).await;
        let booking = f
            .services
            .bookings
            .create(NewBooking {
                flight_id: flight.id,
                passenger_id: passenger.id,
                seat_number: None,
                class,
                baggage: vec![],
            })
            .await
            .unwrap();
        f.services.bookings.check_in(booking.id).await.unwrap()
    }

    #[tokio::test]
    async fn test_group_positions_scenario() {
        let f = fixture().await;
        let flight = f.flight("QF1", PerClass::new(0, 10, 10)).await;
        let b1 = checked_in(&f, &flight, "Q0000001", SeatClass::Business).await;
        let b2 = checked_in(&f, &flight, "Q0000002", SeatClass::Business).await;
        let b3 = checked_in(&f, &flight, "Q0000003", SeatClass::Economy).await;

        let e1 = f.services.boarding.enqueue(b1.id, None).await.unwrap();
        assert_eq!(e1.boarding_group, BoardingGroup::Group1);
        assert_eq!(e1.queue_position, 1);
        assert_eq!(e1.status, QueueStatus::Waiting);

        let e2 = f.services.boarding.enqueue(b2.id, None).await.unwrap();
        assert_eq!(e2.queue_position, 2);

        let e3 = f.services.boarding.enqueue(b3.id, None).await.unwrap();
        assert_eq!(e3.boarding_group, BoardingGroup::Group2);
        assert_eq!(e3.queue_position, 1);
    }

    #[tokio::test]
    async fn test_enqueue_preconditions() {
        let f = fixture().await;
        let flight = f.flight("QF2", PerClass::new(0, 0, 10)).await;
        let passenger = f.passenger("Q1000001").await;
        let booking = f
            .services
            .bookings
            .create(NewBooking {
                flight_id: flight.id,
                passenger_id: passenger.id,
                seat_number: None,
                class: SeatClass::Economy,
                baggage: vec![],
            })
            .await
            .unwrap();

        let err = f.services.boarding.enqueue(booking.id, None).await.unwrap_err();
        assert_eq!(err, CoreError::conflict("Passenger must check-in first"));

        f.services.bookings.check_in(booking.id).await.unwrap();
        f.services.boarding.enqueue(booking.id, Some(BoardingGroup::Priority)).await.unwrap();
        let err = f.services.boarding.enqueue(booking.id, None).await.unwrap_err();
        assert_eq!(err, CoreError::conflict("Passenger already in boarding queue"));

        let err = f.services.boarding.enqueue(Uuid::new_v4(), None).await.unwrap_err();
        assert_eq!(err, CoreError::not_found("Booking"));
    }

    #[tokio::test]
    async fn test_boarded_cascades_to_booking() {
        let f = fixture().await;
        let flight = f.flight("QF3", PerClass::new(0, 0, 10)).await;
        let booking = checked_in(&f, &flight, "Q2000001", SeatClass::Economy).await;
        let entry = f.services.boarding.enqueue(booking.id, None).await.unwrap();

        f.services.boarding.call(entry.id).await.unwrap();
        f.services.boarding.mark_boarding(entry.id).await.unwrap();
        let boarded = f.services.boarding.mark_boarded(entry.id).await.unwrap();
        assert_eq!(boarded.status, QueueStatus::Boarded);
        assert!(boarded.boarded_at.is_some());

        let booking = f.services.bookings.get(booking.id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Boarded);
        assert!(booking.boarding_time.is_some());

        let err = f.services.boarding.call(entry.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot move queue entry from boarded to called");
    }

    #[tokio::test]
    async fn test_removal_keeps_gaps_and_positions_never_reused() {
        let f = fixture().await;
        let flight = f.flight("QF4", PerClass::new(0, 0, 10)).await;
        let b1 = checked_in(&f, &flight, "Q3000001", SeatClass::Economy).await;
        let b2 = checked_in(&f, &flight, "Q3000002", SeatClass::Economy).await;
        let b3 = checked_in(&f, &flight, "Q3000003", SeatClass::Economy).await;

        let e1 = f.services.boarding.enqueue(b1.id, None).await.unwrap();
        let e2 = f.services.boarding.enqueue(b2.id, None).await.unwrap();
        f.services.boarding.remove(e1.id).await.unwrap();

        let e3 = f.services.boarding.enqueue(b3.id, None).await.unwrap();
        assert_eq!(e3.queue_position, 3);

        let queue = f.services.boarding.list(flight.id).await.unwrap();
        let positions: Vec<u32> = queue.iter().map(|v| v.entry.queue_position).collect();
        assert_eq!(positions, vec![2, 3]);
        assert_eq!(queue[0].entry.id, e2.id);

        assert_eq!(
            f.services.boarding.remove(e1.id).await.unwrap_err(),
            CoreError::not_found("Queue entry")
        );
    }

    #[tokio::test]
    async fn test_listing_orders_by_group_priority() {
        let f = fixture().await;
        let flight = f.flight("QF5", PerClass::new(0, 10, 10)).await;
        let general = checked_in(&f, &flight, "Q4000001", SeatClass::Economy).await;
        let business = checked_in(&f, &flight, "Q4000002", SeatClass::Business).await;
        let priority = checked_in(&f, &flight, "Q4000003", SeatClass::Economy).await;

        f.services.boarding.enqueue(general.id, Some(BoardingGroup::General)).await.unwrap();
        f.services.boarding.enqueue(business.id, None).await.unwrap();
        f.services.boarding.enqueue(priority.id, Some(BoardingGroup::Priority)).await.unwrap();

        let queue = f.services.boarding.list(flight.id).await.unwrap();
        let groups: Vec<BoardingGroup> = queue.iter().map(|v| v.entry.boarding_group).collect();
        assert_eq!(
            groups,
            vec![BoardingGroup::Priority, BoardingGroup::Group1, BoardingGroup::General]
        );
        assert_eq!(queue[1].booking_reference, business.booking_reference);
        assert_eq!(queue[1].passenger_name.as_deref(), Some("Passenger Q4000002"));
    }

    #[tokio::test]
    async fn test_missed_and_stats() {
        let f = fixture().await;
        let flight = f.flight("QF6", PerClass::new(0, 0, 10)).await;
        let b1 = checked_in(&f, &flight, "Q5000001", SeatClass::Economy).await;
        let b2 = checked_in(&f, &flight, "Q5000002", SeatClass::Economy).await;
        checked_in(&f, &flight, "Q5000003", SeatClass::Economy).await;

        let e1 = f.services.boarding.enqueue(b1.id, None).await.unwrap();
        let e2 = f.services.boarding.enqueue(b2.id, None).await.unwrap();
        f.services.boarding.call(e1.id).await.unwrap();
        f.services.boarding.mark_missed(e1.id).await.unwrap();
        assert!(f.services.boarding.mark_boarded(e1.id).await.is_err());
        f.services.boarding.mark_boarded(e2.id).await.unwrap();

        let stats = f.services.boarding.stats(flight.id).await.unwrap();
        assert_eq!(
            stats,
            BoardingStats { total: 3, waiting: 0, called: 0, boarding: 0, boarded: 1, missed: 1 }
        );
    }

    #[tokio::test]
    async fn test_cancel_drops_queue_entry() {
        let f = fixture().await;
        let flight = f.flight("QF7", PerClass::new(0, 0, 10)).await;
        let booking = checked_in(&f, &flight, "Q6000001", SeatClass::Economy).await;
        let entry = f.services.boarding.enqueue(booking.id, None).await.unwrap();

        f.services.bookings.cancel(booking.id).await.unwrap();
        assert!(matches!(
            f.services.boarding.get(entry.id).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ledger_board_moves_queue_entry() {
        let f = fixture().await;
        let flight = f.flight("QF8", PerClass::new(0, 0, 10)).await;
        let booking = checked_in(&f, &flight, "Q7000001", SeatClass::Economy).await;
        let entry = f.services.boarding.enqueue(booking.id, None).await.unwrap();

        f.services.bookings.board(booking.id).await.unwrap();
        let entry = f.services.boarding.get(entry.id).await.unwrap();
        assert_eq!(entry.status, QueueStatus::Boarded);
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_assigns_distinct_positions() {
        let f = fixture().await;
        let flight = f.flight("QF9", PerClass::new(0, 0, 20)).await;
        let mut bookings = Vec::new();
        for i in 0..8 {
            bookings.push(checked_in(&f, &flight, &format!("Q80000{:02}", i), SeatClass::Economy).await);
        }

        let tasks: Vec<_> = bookings
            .into_iter()
            .map(|b| {
                let services = f.services.clone();
                tokio::spawn(async move { services.boarding.enqueue(b.id, None).await })
            })
            .collect();

        let mut positions = Vec::new();
        for task in tasks {
            positions.push(task.await.unwrap().unwrap().queue_position);
        }
        positions.sort_unstable();
        assert_eq!(positions, (1..=8).collect::<Vec<u32>>());
    }
}
