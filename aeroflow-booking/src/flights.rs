use std::collections::HashSet;
use std::sync::Arc;

use aeroflow_catalog::{find_gate_conflict, AircraftCatalog, GateAvailability, GateCatalog, SeatMap};
use aeroflow_core::events::{Change, DomainEvent, EventPublisher};
use aeroflow_core::repository::{AirportStore, FlightFilter};
use aeroflow_core::{
    CoreError, CoreResult, Flight, FlightPatch, FlightStatus, NewFlight, PerClass, SeatClass,
};
use aeroflow_shared::models::events::NotificationKind;
use aeroflow_shared::{Page, PageRequest};
use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;
use tracing::{info, warn};
use uuid::Uuid;

use crate::locks::FlightLocks;
use crate::notify::passenger_notification;
use crate::rules::Rules;

/// Canonical flight records, gate assignment and seat maps.
pub struct FlightRegistry {
    store: Arc<dyn AirportStore>,
    locks: FlightLocks,
    publisher: Arc<dyn EventPublisher>,
    aircraft: Arc<AircraftCatalog>,
    gates: Arc<GateCatalog>,
    rules: Rules,
}

impl FlightRegistry {
    pub fn new(
        store: Arc<dyn AirportStore>,
        locks: FlightLocks,
        publisher: Arc<dyn EventPublisher>,
        aircraft: Arc<AircraftCatalog>,
        gates: Arc<GateCatalog>,
        rules: Rules,
    ) -> Self {
        Self { store, locks, publisher, aircraft, gates, rules }
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Flight> {
        self.store
            .get_flight(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Flight"))
    }

    pub async fn list(&self, filter: &FlightFilter, page: PageRequest) -> CoreResult<Page<Flight>> {
        Ok(self.store.list_flights(filter, page).await?)
    }

    pub async fn create(&self, request: NewFlight) -> CoreResult<Flight> {
        let (capacity, price) = self.aircraft_defaults(&request.aircraft, request.capacity.is_some())?;
        let flight = request.into_flight(capacity, price)?;

        let _gates = self.gate_guard(flight.claimed_gate().is_some()).await;
        self.ensure_gate_free(&flight).await?;
        self.store.insert_flight(&flight).await?;

        info!(flight_id = %flight.id, flight = %flight.flight_number, "Flight created");
        self.publisher.publish(DomainEvent::FlightUpdated {
            change: Change::Created,
            flight: flight.clone(),
        });
        Ok(flight)
    }

    pub async fn update(&self, id: Uuid, patch: FlightPatch) -> CoreResult<Flight> {
        let _flight_guard = self.locks.lock(id).await;
        let _gates = self.gate_guard(patch.touches_gate()).await;

        let mut flight = self.get(id).await?;
        let previous_status = flight.status;
        if let Some(aircraft) = &patch.aircraft {
            self.aircraft_defaults(aircraft, patch.capacity.is_some())?;
        }
        let resizes = patch.capacity.is_some();
        flight.apply_patch(patch)?;

        if resizes {
            self.ensure_capacity_covers_bookings(&flight).await?;
        }
        self.ensure_gate_free(&flight).await?;
        self.store.update_flight(&flight).await?;

        info!(flight_id = %flight.id, flight = %flight.flight_number, "Flight updated");
        self.publisher.publish(DomainEvent::FlightUpdated {
            change: Change::Updated,
            flight: flight.clone(),
        });
        if flight.status != previous_status {
            self.notify_status(&flight).await;
        }
        Ok(flight)
    }

    pub async fn update_status(&self, id: Uuid, status: FlightStatus) -> CoreResult<Flight> {
        let _flight_guard = self.locks.lock(id).await;
        let mut flight = self.get(id).await?;
        let reclaims_gate = status.holds_gate() && !flight.status.holds_gate();
        let _gates = self.gate_guard(reclaims_gate).await;

        flight.status = status;
        flight.updated_at = Utc::now();
        if reclaims_gate {
            self.ensure_gate_free(&flight).await?;
        }
        self.store.update_flight(&flight).await?;

        info!(flight_id = %flight.id, flight = %flight.flight_number, status = status.as_str(), "Flight status changed");
        self.publisher.publish(DomainEvent::FlightUpdated {
            change: Change::StatusChanged,
            flight: flight.clone(),
        });
        self.notify_status(&flight).await;
        Ok(flight)
    }

    /// Only flights no booking has ever referenced can be deleted.
    pub async fn delete(&self, id: Uuid) -> CoreResult<Flight> {
        let _guard = self.locks.lock(id).await;
        let flight = self.get(id).await?;
        if self.store.count_bookings_for_flight(id).await? > 0 {
            return Err(CoreError::conflict("Cannot delete a flight with existing bookings"));
        }
        self.store.delete_flight(id).await?;

        info!(flight_id = %flight.id, flight = %flight.flight_number, "Flight deleted");
        self.publisher.publish(DomainEvent::FlightUpdated {
            change: Change::Deleted,
            flight: flight.clone(),
        });
        Ok(flight)
    }

    pub async fn seat_map(&self, id: Uuid) -> CoreResult<SeatMap> {
        let flight = self.get(id).await?;
        let active: Vec<_> = self
            .store
            .bookings_for_flight(id)
            .await?
            .into_iter()
            .filter(|b| b.status.is_active())
            .collect();
        let booked = PerClass::tally(active.iter().map(|b| b.class));
        let occupied: HashSet<String> = active.into_iter().filter_map(|b| b.seat_number).collect();
        self.aircraft.seat_map(&flight, &occupied, booked)
    }

    /// Compatible gates for `aircraft` and whether each is free around `at`.
    pub async fn available_gates(
        &self,
        aircraft: &str,
        at: DateTime<Utc>,
    ) -> CoreResult<Vec<GateAvailability>> {
        let window = self.rules.gate_window;
        let (from, to) = window.bounds(at);
        let claims = self.store.gate_claims(from, to).await?;
        Ok(self
            .gates
            .available_gates(self.aircraft.category_of(aircraft), at, window, &claims))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Capacity and fares of a known aircraft type. An unknown type is only
    /// accepted when the caller supplies the capacity itself.
    fn aircraft_defaults(
        &self,
        code: &str,
        capacity_given: bool,
    ) -> CoreResult<(PerClass<u32>, PerClass<u32>)> {
        match self.aircraft.get(code) {
            Some(aircraft) => Ok((aircraft.capacity, aircraft.default_price)),
            None if capacity_given => Ok((PerClass::default(), PerClass::default())),
            None => Err(CoreError::validation(format!("Unknown aircraft type '{}'", code.trim()))),
        }
    }

    async fn gate_guard(&self, needed: bool) -> Option<OwnedMutexGuard<()>> {
        if needed && self.rules.enforce_gate_windows {
            Some(self.locks.lock_gates().await)
        } else {
            None
        }
    }

    async fn ensure_gate_free(&self, flight: &Flight) -> CoreResult<()> {
        if !self.rules.enforce_gate_windows {
            return Ok(());
        }
        let Some(gate) = flight.claimed_gate() else {
            return Ok(());
        };
        let window = self.rules.gate_window;
        let (from, to) = window.bounds(flight.departure_time);
        let claims = self.store.flights_at_gate(gate, from, to).await?;
        match find_gate_conflict(&claims, gate, flight.departure_time, window, Some(flight.id)) {
            Some(other) => Err(CoreError::conflict(format!(
                "Gate {} is already assigned to flight {}",
                gate, other.flight_number
            ))),
            None => Ok(()),
        }
    }

    /// Status-update message to everyone holding a live booking on the flight.
    /// Active bookings must still fit after a capacity change.
    async fn ensure_capacity_covers_bookings(&self, flight: &Flight) -> CoreResult<()> {
        let booked = PerClass::tally(
            self.store
                .bookings_for_flight(flight.id)
                .await?
                .iter()
                .filter(|b| b.status.is_active())
                .map(|b| b.class),
        );
        if booked.total() > flight.total_capacity() {
            return Err(CoreError::conflict(format!(
                "Capacity {} is below the {} active bookings",
                flight.total_capacity(),
                booked.total()
            )));
        }
        if self.rules.enforce_class_capacity {
            for class in SeatClass::ALL {
                if booked.get(class) > flight.capacity.get(class) {
                    return Err(CoreError::conflict(format!(
                        "Capacity of {} class is below its {} active bookings",
                        class.as_str(),
                        booked.get(class)
                    )));
                }
            }
        }
        Ok(())
    }

    async fn notify_status(&self, flight: &Flight) {
        let bookings = match self.store.bookings_for_flight(flight.id).await {
            Ok(bookings) => bookings,
            Err(e) => {
                warn!(flight_id = %flight.id, error = %e, "Could not load bookings for status notification");
                return;
            }
        };
        for booking in bookings.iter().filter(|b| b.status.is_active()) {
            match self.store.get_passenger(booking.passenger_id).await {
                Ok(Some(passenger)) => self.publisher.notify(passenger_notification(
                    NotificationKind::FlightStatusUpdate,
                    booking,
                    &passenger,
                    flight,
                )),
                Ok(None) => {
                    warn!(booking_id = %booking.id, "Passenger missing for status notification")
                }
                Err(e) => {
                    warn!(booking_id = %booking.id, error = %e, "Skipping status notification")
                }
            }
        }
    }
}
