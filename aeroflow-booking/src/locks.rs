use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-flight async mutexes serialising read-validate-write sequences.
///
/// Seat, capacity and queue-position checks for one flight run under that
/// flight's guard. Gate assignment spans flights, so it has its own guard.
#[derive(Clone, Default)]
pub struct FlightLocks {
    flights: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
    gates: Arc<Mutex<()>>,
}

impl FlightLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle slots of other flights are dropped on the way in. A slot is idle
    /// when the map holds its only reference: no guard and no waiter.
    pub async fn lock(&self, flight_id: Uuid) -> OwnedMutexGuard<()> {
        let slot = {
            let mut flights = self.flights.lock().await;
            flights.retain(|id, slot| *id == flight_id || Arc::strong_count(slot) > 1);
            flights.entry(flight_id).or_default().clone()
        };
        slot.lock_owned().await
    }

    pub async fn lock_gates(&self) -> OwnedMutexGuard<()> {
        self.gates.clone().lock_owned().await
    }
}
