use std::sync::Arc;

use aeroflow_core::passenger::normalize_passport;
use aeroflow_core::repository::AirportStore;
use aeroflow_core::{CoreError, CoreResult, NewPassenger, Passenger, PassengerPatch};
use aeroflow_shared::{Page, PageRequest};
use tracing::info;
use uuid::Uuid;

/// Passenger identities, keyed by passport number.
pub struct PassengerRegistry {
    store: Arc<dyn AirportStore>,
}

impl PassengerRegistry {
    pub fn new(store: Arc<dyn AirportStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, request: NewPassenger) -> CoreResult<Passenger> {
        let passenger = request.into_passenger()?;
        self.store.insert_passenger(&passenger).await?;
        info!(passenger_id = %passenger.id, passport = %passenger.passport_number, "Passenger registered");
        Ok(passenger)
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Passenger> {
        self.store
            .get_passenger(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Passenger"))
    }

    pub async fn find_by_passport(&self, passport: &str) -> CoreResult<Passenger> {
        self.store
            .find_passenger_by_passport(&normalize_passport(passport)?)
            .await?
            .ok_or_else(|| CoreError::not_found("Passenger"))
    }

    pub async fn list(&self, search: Option<&str>, page: PageRequest) -> CoreResult<Page<Passenger>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.store.list_passengers(search, page).await?)
    }

    pub async fn update(&self, id: Uuid, patch: PassengerPatch) -> CoreResult<Passenger> {
        let mut passenger = self.get(id).await?;
        passenger.apply_patch(patch)?;
        self.store.update_passenger(&passenger).await?;
        Ok(passenger)
    }

    pub async fn delete(&self, id: Uuid) -> CoreResult<Passenger> {
        let passenger = self.get(id).await?;
        if self.store.count_bookings_for_passenger(id).await? > 0 {
            return Err(CoreError::conflict("Cannot delete passenger with existing bookings"));
        }
        self.store.delete_passenger(id).await?;
        info!(passenger_id = %passenger.id, "Passenger deleted");
        Ok(passenger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, new_passenger};
    use aeroflow_core::{NewBooking, PerClass, SeatClass};

    #[tokio::test]
    async fn test_passport_is_unique() {
        let f = fixture().await;
        f.services.passengers.create(new_passenger("X1234567")).await.unwrap();
        let err = f.services.passengers.create(new_passenger("x1234567")).await.unwrap_err();
        assert_eq!(err, CoreError::conflict("Passenger with this passport number already exists"));
    }

    #[tokio::test]
    async fn test_passport_change_rechecks_uniqueness() {
        let f = fixture().await;
        f.services.passengers.create(new_passenger("Y0000001")).await.unwrap();
        let other = f.services.passengers.create(new_passenger("Y0000002")).await.unwrap();

        let clash = PassengerPatch { passport_number: Some("y0000001".to_string()), ..Default::default() };
        assert!(matches!(
            f.services.passengers.update(other.id, clash).await,
            Err(CoreError::Conflict(_))
        ));

        let rename = PassengerPatch { name: Some("Renamed".to_string()), ..Default::default() };
        assert_eq!(f.services.passengers.update(other.id, rename).await.unwrap().name, "Renamed");
    }

    #[tokio::test]
    async fn test_find_and_search() {
        let f = fixture().await;
        let created = f.services.passengers.create(new_passenger("Z0000001")).await.unwrap();
        f.services.passengers.create(new_passenger("Z0000002")).await.unwrap();

        let found = f.services.passengers.find_by_passport(" z0000001 ").await.unwrap();
        assert_eq!(found.id, created.id);

        let page = f
            .services
            .passengers
            .list(Some("z0000002"), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].passport(), "Z0000002");

        let all = f.services.passengers.list(Some("  "), PageRequest::new(Some(1), Some(1))).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.pages, 2);
        assert_eq!(all.count, 1);
    }

    #[tokio::test]
    async fn test_delete_blocked_by_bookings() {
        let f = fixture().await;
        let flight = f.flight("PX1", PerClass::new(0, 0, 5)).await;
        let passenger = f.passenger("W0000001").await;
        f.services
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

        let err = f.services.passengers.delete(passenger.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete passenger with existing bookings");

        let free = f.passenger("W0000002").await;
        f.services.passengers.delete(free.id).await.unwrap();
        assert!(f.services.passengers.get(free.id).await.is_err());
    }
}
