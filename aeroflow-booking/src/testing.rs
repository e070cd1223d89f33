use std::sync::{Arc, Mutex};

use aeroflow_catalog::{AircraftCatalog, GateCatalog};
use aeroflow_core::events::{DomainEvent, EventPublisher};
use aeroflow_core::{Flight, NewFlight, NewPassenger, Passenger, PerClass};
use aeroflow_shared::models::events::PassengerNotification;
use aeroflow_store::MemoryStore;
use chrono::{Duration, NaiveDate, Utc};

use crate::{AirportServices, Rules};

/// Captures everything published so tests can assert on it.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
    notifications: Mutex<Vec<PassengerNotification>>,
}

impl RecordingPublisher {
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }

    pub fn notifications(&self) -> Vec<PassengerNotification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn notify(&self, notification: PassengerNotification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

pub struct Fixture {
    pub services: AirportServices,
    pub publisher: Arc<RecordingPublisher>,
}

pub async fn fixture() -> Fixture {
    let publisher = Arc::new(RecordingPublisher::default());
    let services = AirportServices::new(
        Arc::new(MemoryStore::new()),
        publisher.clone(),
        Arc::new(AircraftCatalog::standard()),
        Arc::new(GateCatalog::standard()),
        Rules::default(),
    );
    Fixture { services, publisher }
}

pub fn new_passenger(passport: &str) -> NewPassenger {
    NewPassenger {
        name: format!("Passenger {}", passport),
        email: format!("{}@example.com", passport.to_lowercase()),
        phone: "+15550100".to_string(),
        passport_number: passport.to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        nationality: "Canada".to_string(),
        user_id: None,
    }
}

impl Fixture {
    /// Gate-less A320 flight with the given capacity.
    pub async fn flight(&self, number: &str, capacity: PerClass<u32>) -> Flight {
        let departure = Utc::now() + Duration::days(1);
        self.services
            .flights
            .create(NewFlight {
                flight_number: number.to_string(),
                airline: "AeroFlow".to_string(),
                aircraft: "A320".to_string(),
                origin: "JFK".to_string(),
                destination: "LAX".to_string(),
                departure_time: departure,
                arrival_time: departure + Duration::hours(6),
                gate: None,
                status: None,
                capacity: Some(capacity),
                price: None,
            })
            .await
            .unwrap()
    }

    pub async fn passenger(&self, passport: &str) -> Passenger {
        self.services.passengers.create(new_passenger(passport)).await.unwrap()
    }
}
