use std::sync::Arc;

use aeroflow_booking::{AirportServices, Rules};
use aeroflow_catalog::{AircraftCatalog, GateCatalog, GateWindow};
use aeroflow_core::events::DomainEvent;
use aeroflow_core::repository::AirportStore;
use aeroflow_shared::models::events::PassengerNotification;
use aeroflow_store::{BusinessRules, RedisClient};
use tokio::sync::{broadcast, mpsc};

use crate::worker::ApiPublisher;

const EVENT_BUFFER: usize = 256;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub services: AirportServices,
    pub events: broadcast::Sender<DomainEvent>,
    pub auth: AuthConfig,
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit_per_minute: i64,
}

impl AppState {
    /// Wires the services over `store`. The returned receiver feeds the
    /// notification worker.
    pub fn new(
        store: Arc<dyn AirportStore>,
        business_rules: &BusinessRules,
        auth: AuthConfig,
        redis: Option<Arc<RedisClient>>,
    ) -> (Self, mpsc::Receiver<PassengerNotification>) {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (outbox, notifications) = mpsc::channel(business_rules.notification_buffer.max(1));
        let publisher = Arc::new(ApiPublisher::new(events.clone(), outbox));

        let services = AirportServices::new(
            store,
            publisher,
            Arc::new(AircraftCatalog::standard()),
            Arc::new(GateCatalog::standard()),
            rules_from(business_rules),
        );

        let state = Self {
            services,
            events,
            auth,
            redis,
            rate_limit_per_minute: business_rules.rate_limit_per_minute,
        };
        (state, notifications)
    }
}

pub fn rules_from(config: &BusinessRules) -> Rules {
    Rules {
        enforce_class_capacity: config.enforce_class_capacity,
        enforce_gate_windows: config.enforce_gate_windows,
        gate_window: GateWindow::minutes(config.gate_window_minutes),
        reference_max_attempts: config.reference_max_attempts.max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_follow_config() {
        let config = BusinessRules {
            gate_window_minutes: 30,
            enforce_class_capacity: false,
            reference_max_attempts: 0,
            ..BusinessRules::default()
        };
        let rules = rules_from(&config);
        assert!(!rules.enforce_class_capacity);
        assert!(rules.enforce_gate_windows);
        assert_eq!(rules.reference_max_attempts, 1);

        let now = chrono::Utc::now();
        assert!(rules.gate_window.contains(now, now + chrono::Duration::minutes(30)));
        assert!(!rules.gate_window.contains(now, now + chrono::Duration::minutes(31)));
    }
}
