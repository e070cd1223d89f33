use std::time::Duration;

use aeroflow_shared::models::events::{PassengerNotification, NOTIFICATION_TOPIC};
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum ProduceError {
    #[error("could not encode notification: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("kafka delivery failed: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// Ships passenger notifications to `NOTIFICATION_TOPIC`, keyed by booking
/// reference so one booking's messages stay ordered within a partition.
#[derive(Clone)]
pub struct NotificationProducer {
    producer: FutureProducer,
    topic: String,
}

impl NotificationProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer, topic: NOTIFICATION_TOPIC.to_string() })
    }

    pub async fn publish_notification(
        &self,
        notification: &PassengerNotification,
    ) -> Result<(), ProduceError> {
        let payload = encode_notification(notification)?;
        let key = notification.booking_reference.as_str();
        let headers = OwnedHeaders::new().insert(Header {
            key: "kind",
            value: Some(notification.kind.as_str()),
        });
        let record = FutureRecord::to(&self.topic).key(key).payload(payload.as_str()).headers(headers);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(
                    topic = %self.topic,
                    booking = key,
                    kind = notification.kind.as_str(),
                    partition = delivery.partition,
                    offset = delivery.offset,
                    "Notification delivered"
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!(topic = %self.topic, booking = key, "Failed to send notification: {}", e);
                Err(e.into())
            }
        }
    }
}

/// Wire body of a notification record.
pub fn encode_notification(notification: &PassengerNotification) -> Result<String, serde_json::Error> {
    serde_json::to_string(notification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeroflow_shared::models::events::NotificationKind;
    use aeroflow_shared::pii::Masked;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_kind_header_matches_encoded_body() {
        for kind in [
            NotificationKind::BookingConfirmation,
            NotificationKind::CheckInConfirmation,
            NotificationKind::FlightStatusUpdate,
        ] {
            let notification = PassengerNotification {
                kind,
                booking_id: Uuid::new_v4(),
                booking_reference: "QX7K2M".to_string(),
                passenger_name: "Ada Lovelace".to_string(),
                email: Masked("ada@example.com".to_string()),
                flight_number: "AF100".to_string(),
                origin: "JFK".to_string(),
                destination: "LHR".to_string(),
                departure_time: Utc::now(),
                seat_number: Some("12C".to_string()),
                gate: None,
                flight_status: "scheduled".to_string(),
                created_at: Utc::now().timestamp(),
            };

            let body: serde_json::Value =
                serde_json::from_str(&encode_notification(&notification).unwrap()).unwrap();
            assert_eq!(body["kind"], kind.as_str());
            assert_eq!(body["bookingReference"], "QX7K2M");
        }
    }
}
