pub mod flights;
pub mod ledger;
pub mod locks;
pub mod notify;
pub mod passengers;
pub mod queue;
pub mod reference;
pub mod rules;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use aeroflow_catalog::{AircraftCatalog, GateCatalog};
use aeroflow_core::events::EventPublisher;
use aeroflow_core::repository::AirportStore;

pub use flights::FlightRegistry;
pub use ledger::BookingLedger;
pub use locks::FlightLocks;
pub use passengers::PassengerRegistry;
pub use queue::BoardingQueue;
pub use rules::Rules;

/// The airport services wired to one store, one lock registry and one publisher.
#[derive(Clone)]
pub struct AirportServices {
    pub flights: Arc<FlightRegistry>,
    pub passengers: Arc<PassengerRegistry>,
    pub bookings: Arc<BookingLedger>,
    pub boarding: Arc<BoardingQueue>,
}

impl AirportServices {
    pub fn new(
        store: Arc<dyn AirportStore>,
        publisher: Arc<dyn EventPublisher>,
        aircraft: Arc<AircraftCatalog>,
        gates: Arc<GateCatalog>,
        rules: Rules,
    ) -> Self {
        let locks = FlightLocks::new();
        Self {
            flights: Arc::new(FlightRegistry::new(
                store.clone(),
                locks.clone(),
                publisher.clone(),
                aircraft,
                gates,
                rules,
            )),
            passengers: Arc::new(PassengerRegistry::new(store.clone())),
            bookings: Arc::new(BookingLedger::new(
                store.clone(),
                locks.clone(),
                publisher.clone(),
                rules,
            )),
            boarding: Arc::new(BoardingQueue::new(store, locks, publisher)),
        }
    }
}
