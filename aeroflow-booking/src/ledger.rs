use std::sync::Arc;

use aeroflow_core::booking::normalize_seat;
use aeroflow_core::events::{Change, DomainEvent, EventPublisher};
use aeroflow_core::repository::{AirportStore, BookingFilter};
use aeroflow_core::{
    BoardingQueueEntry, Booking, BookingPatch, BookingStatus, CoreError, CoreResult, Flight,
    NewBooking, Passenger, QueueStatus, SeatClass,
};
use aeroflow_shared::models::events::NotificationKind;
use aeroflow_shared::{Page, PageRequest};
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};
use uuid::Uuid;

use crate::locks::FlightLocks;
use crate::notify::passenger_notification;
use crate::reference::generate_reference;
use crate::rules::Rules;

/// Reservations: seat uniqueness, capacity and the booking lifecycle.
pub struct BookingLedger {
    store: Arc<dyn AirportStore>,
    locks: FlightLocks,
    publisher: Arc<dyn EventPublisher>,
    rules: Rules,
}

impl BookingLedger {
    pub fn new(
        store: Arc<dyn AirportStore>,
        locks: FlightLocks,
        publisher: Arc<dyn EventPublisher>,
        rules: Rules,
    ) -> Self {
        Self { store, locks, publisher, rules }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get(&self, id: Uuid) -> CoreResult<Booking> {
        self.store
            .get_booking(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking"))
    }

    pub async fn find_by_reference(&self, reference: &str) -> CoreResult<Booking> {
        self.store
            .find_booking_by_reference(&reference.trim().to_ascii_uppercase())
            .await?
            .ok_or_else(|| CoreError::not_found("Booking"))
    }

    pub async fn list(&self, filter: &BookingFilter, page: PageRequest) -> CoreResult<Page<Booking>> {
        Ok(self.store.list_bookings(filter, page).await?)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub async fn create(&self, request: NewBooking) -> CoreResult<Booking> {
        let seat = request.seat_number.as_deref().map(normalize_seat).transpose()?;
        self.flight(request.flight_id).await?;
        let passenger = self.passenger(request.passenger_id).await?;

        let guard = self.locks.lock(request.flight_id).await;
        let flight = self.flight(request.flight_id).await?;
        let active = self.active_bookings(flight.id).await?;

        if let Some(seat) = &seat {
            if active.iter().any(|b| b.holds_seat(seat)) {
                return Err(CoreError::conflict("Seat already taken"));
            }
        }
        if active.len() as u32 >= flight.total_capacity() {
            return Err(CoreError::conflict("Flight is full"));
        }
        self.check_class_capacity(&flight, request.class, &active)?;

        let reference = self.unique_reference().await?;
        let booking = Booking::new(NewBooking { seat_number: seat, ..request }, reference)?;
        self.store.insert_booking(&booking).await?;
        drop(guard);

        info!(
            booking_id = %booking.id,
            reference = %booking.booking_reference,
            flight = %flight.flight_number,
            "Booking confirmed"
        );
        self.publisher.publish(DomainEvent::BookingUpdated {
            change: Change::Created,
            booking: booking.clone(),
        });
        self.publisher.notify(passenger_notification(
            NotificationKind::BookingConfirmation,
            &booking,
            &passenger,
            &flight,
        ));
        Ok(booking)
    }

    pub async fn update(&self, id: Uuid, patch: BookingPatch) -> CoreResult<Booking> {
        let (_guard, mut booking) = self.locked_booking(id).await?;
        match booking.status {
            BookingStatus::Cancelled => {
                return Err(CoreError::conflict("Cannot update a cancelled booking"))
            }
            BookingStatus::Boarded => {
                return Err(CoreError::conflict("Cannot update a booking that has already boarded"))
            }
            BookingStatus::Confirmed | BookingStatus::CheckedIn => {}
        }

        let seat = patch.seat_number.as_deref().map(normalize_seat).transpose()?;
        let seat_changes = seat.is_some() && seat != booking.seat_number;
        let class_changes = patch.class.is_some_and(|c| c != booking.class);

        if seat_changes || class_changes {
            let others: Vec<Booking> = self
                .active_bookings(booking.flight_id)
                .await?
                .into_iter()
                .filter(|b| b.id != booking.id)
                .collect();
            if let Some(seat) = seat.as_deref().filter(|_| seat_changes) {
                if others.iter().any(|b| b.holds_seat(seat)) {
                    return Err(CoreError::conflict("Seat already taken"));
                }
            }
            if let Some(class) = patch.class.filter(|_| class_changes) {
                let flight = self.flight(booking.flight_id).await?;
                self.check_class_capacity(&flight, class, &others)?;
            }
        }

        if let Some(seat) = seat {
            booking.seat_number = Some(seat);
        }
        if let Some(class) = patch.class {
            booking.class = class;
        }
        if let Some(baggage) = patch.baggage {
            booking.baggage = baggage;
        }
        booking.updated_at = Utc::now();
        self.store.update_booking(&booking).await?;

        self.publisher.publish(DomainEvent::BookingUpdated {
            change: Change::Updated,
            booking: booking.clone(),
        });
        Ok(booking)
    }

    pub async fn check_in(&self, id: Uuid) -> CoreResult<Booking> {
        let (guard, mut booking) = self.locked_booking(id).await?;
        booking.check_in(Utc::now())?;
        self.store.update_booking(&booking).await?;
        drop(guard);

        info!(booking_id = %booking.id, reference = %booking.booking_reference, "Passenger checked in");
        self.publisher.publish(DomainEvent::BookingUpdated {
            change: Change::CheckedIn,
            booking: booking.clone(),
        });
        self.notify(NotificationKind::CheckInConfirmation, &booking).await;
        Ok(booking)
    }

    /// checked-in → boarded. A live queue entry for the booking is boarded with it.
    pub async fn board(&self, id: Uuid) -> CoreResult<Booking> {
        let (_guard, mut booking) = self.locked_booking(id).await?;
        let now = Utc::now();
        booking.board(now)?;

        let entry = match self.store.find_entry_by_booking(booking.id).await? {
            Some(mut entry) if entry.status.can_become(QueueStatus::Boarded) => {
                entry.transition(QueueStatus::Boarded, now)?;
                self.store.record_boarded(&entry, &booking).await?;
                Some(entry)
            }
            _ => {
                self.store.update_booking(&booking).await?;
                None
            }
        };

        info!(booking_id = %booking.id, reference = %booking.booking_reference, "Passenger boarded");
        if let Some(entry) = entry {
            self.publisher.publish(DomainEvent::BoardingUpdated { change: Change::Boarded, entry });
        }
        self.publisher.publish(DomainEvent::BookingUpdated {
            change: Change::Boarded,
            booking: booking.clone(),
        });
        Ok(booking)
    }

    /// Soft cancel. The booking's queue entry, if any, is removed in the same write.
    pub async fn cancel(&self, id: Uuid) -> CoreResult<Booking> {
        let (_guard, mut booking) = self.locked_booking(id).await?;
        booking.cancel(Utc::now())?;
        let removed: Option<BoardingQueueEntry> = self.store.cancel_booking(&booking).await?;

        info!(booking_id = %booking.id, reference = %booking.booking_reference, "Booking cancelled");
        if let Some(entry) = removed {
            self.publisher.publish(DomainEvent::BoardingUpdated { change: Change::Removed, entry });
        }
        self.publisher.publish(DomainEvent::BookingUpdated {
            change: Change::Cancelled,
            booking: booking.clone(),
        });
        Ok(booking)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Read the booking, take its flight's lock, then re-read under the lock.
    async fn locked_booking(&self, id: Uuid) -> CoreResult<(OwnedMutexGuard<()>, Booking)> {
        let flight_id = self.get(id).await?.flight_id;
        let guard = self.locks.lock(flight_id).await;
        let booking = self.get(id).await?;
        Ok((guard, booking))
    }

    async fn active_bookings(&self, flight_id: Uuid) -> CoreResult<Vec<Booking>> {
        Ok(self
            .store
            .bookings_for_flight(flight_id)
            .await?
            .into_iter()
            .filter(|b| b.status.is_active())
            .collect())
    }

    fn check_class_capacity(
        &self,
        flight: &Flight,
        class: SeatClass,
        active: &[Booking],
    ) -> CoreResult<()> {
        if !self.rules.enforce_class_capacity {
            return Ok(());
        }
        let taken = active
            .iter()
            .filter(|b| b.class == class)
            .count() as u32;
        if taken >= flight.capacity.get(class) {
            return Err(CoreError::conflict(format!(
                "No seats left in {} class",
                class.as_str()
            )));
        }
        Ok(())
    }

    async fn unique_reference(&self) -> CoreResult<String> {
        for _ in 0..self.rules.reference_max_attempts.max(1) {
            let candidate = generate_reference();
            if !self.store.booking_reference_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(CoreError::Internal(
            "Could not allocate a unique booking reference".to_string(),
        ))
    }

    async fn flight(&self, id: Uuid) -> CoreResult<Flight> {
        self.store
            .get_flight(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Flight"))
    }

    async fn passenger(&self, id: Uuid) -> CoreResult<Passenger> {
        self.store
            .get_passenger(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Passenger"))
    }

    /// Best-effort: a lookup failure only skips the message.
    async fn notify(&self, kind: NotificationKind, booking: &Booking) {
        let flight = self.flight(booking.flight_id).await;
        let passenger = self.passenger(booking.passenger_id).await;
        match (flight, passenger) {
            (Ok(flight), Ok(passenger)) => self
                .publisher
                .notify(passenger_notification(kind, booking, &passenger, &flight)),
            (Err(e), _) | (_, Err(e)) => {
                warn!(booking_id = %booking.id, error = %e, "Skipping passenger notification")
            }
        }
    }
}
