use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{required, CoreError, CoreResult};

// ============================================================================
// Fare classes
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SeatClass {
    Economy,
    Business,
    First,
}

impl SeatClass {
    pub const ALL: [SeatClass; 3] = [SeatClass::First, SeatClass::Business, SeatClass::Economy];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeatClass::Economy => "economy",
            SeatClass::Business => "business",
            SeatClass::First => "first",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "economy" => Ok(SeatClass::Economy),
            "business" => Ok(SeatClass::Business),
            "first" => Ok(SeatClass::First),
            other => Err(CoreError::validation(format!("Unknown class '{}'", other))),
        }
    }
}

/// One value per fare class. Used for seat capacity and fares.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerClass<T> {
    #[serde(default)]
    pub first: T,
    #[serde(default)]
    pub business: T,
    #[serde(default)]
    pub economy: T,
}

impl<T: Copy> PerClass<T> {
    pub const fn new(first: T, business: T, economy: T) -> Self {
        Self { first, business, economy }
    }

    pub fn get(&self, class: SeatClass) -> T {
        match class {
            SeatClass::First => self.first,
            SeatClass::Business => self.business,
            SeatClass::Economy => self.economy,
        }
    }
}

impl PerClass<u32> {
    /// Aggregate seat count across all classes.
    pub fn total(&self) -> u32 {
        self.first + self.business + self.economy
    }

    /// Number of occurrences of each class in `classes`.
    pub fn tally(classes: impl IntoIterator<Item = SeatClass>) -> Self {
        let mut counts = Self::default();
        for class in classes {
            match class {
                SeatClass::First => counts.first += 1,
                SeatClass::Business => counts.business += 1,
                SeatClass::Economy => counts.economy += 1,
            }
        }
        counts
    }
}

// ============================================================================
// Flight
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    Scheduled,
    Boarding,
    Departed,
    Delayed,
    Cancelled,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "scheduled",
            FlightStatus::Boarding => "boarding",
            FlightStatus::Departed => "departed",
            FlightStatus::Delayed => "delayed",
            FlightStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> CoreResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(FlightStatus::Scheduled),
            "boarding" => Ok(FlightStatus::Boarding),
            "departed" => Ok(FlightStatus::Departed),
            "delayed" => Ok(FlightStatus::Delayed),
            "cancelled" => Ok(FlightStatus::Cancelled),
            other => Err(CoreError::validation(format!("Unknown flight status '{}'", other))),
        }
    }

    /// Statuses in which a flight still claims its gate.
    pub fn holds_gate(&self) -> bool {
        matches!(
            self,
            FlightStatus::Scheduled | FlightStatus::Boarding | FlightStatus::Delayed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub airline: String,
    pub aircraft: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub gate: Option<String>,
    pub status: FlightStatus,
    pub capacity: PerClass<u32>,
    pub price: PerClass<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flight {
    pub fn total_capacity(&self) -> u32 {
        self.capacity.total()
    }

    /// Gate this flight is currently claiming, if any.
    pub fn claimed_gate(&self) -> Option<&str> {
        match &self.gate {
            Some(gate) if self.status.holds_gate() && !gate.is_empty() => Some(gate.as_str()),
            _ => None,
        }
    }

    pub fn validate_schedule(&self) -> CoreResult<()> {
        if self.arrival_time <= self.departure_time {
            return Err(CoreError::validation("Arrival time must be after departure time"));
        }
        Ok(())
    }

    /// Apply a partial update. Reference data (aircraft defaults) is resolved by the caller.
    pub fn apply_patch(&mut self, patch: FlightPatch) -> CoreResult<()> {
        if let Some(number) = patch.flight_number {
            self.flight_number = normalize_code("Flight number", &number)?;
        }
        if let Some(airline) = patch.airline {
            self.airline = required("Airline", &airline)?;
        }
        if let Some(aircraft) = patch.aircraft {
            self.aircraft = normalize_code("Aircraft", &aircraft)?;
        }
        if let Some(origin) = patch.origin {
            self.origin = normalize_code("Origin", &origin)?;
        }
        if let Some(destination) = patch.destination {
            self.destination = normalize_code("Destination", &destination)?;
        }
        if let Some(departure) = patch.departure_time {
            self.departure_time = departure;
        }
        if let Some(arrival) = patch.arrival_time {
            self.arrival_time = arrival;
        }
        if let Some(gate) = patch.gate {
            self.gate = normalize_gate(&gate);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(capacity) = patch.capacity {
            self.capacity = capacity;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        self.validate_schedule()?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Uppercased, trimmed identifier such as a flight number or airport code.
pub fn normalize_code(field: &str, value: &str) -> CoreResult<String> {
    Ok(required(field, value)?.to_ascii_uppercase())
}

/// An empty gate string clears the assignment.
pub fn normalize_gate(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_uppercase())
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlight {
    pub flight_number: String,
    pub airline: String,
    pub aircraft: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    #[serde(default)]
    pub gate: Option<String>,
    #[serde(default)]
    pub status: Option<FlightStatus>,
    #[serde(default)]
    pub capacity: Option<PerClass<u32>>,
    #[serde(default)]
    pub price: Option<PerClass<u32>>,
}

impl NewFlight {
    /// Build the record. `defaults` are the aircraft type's capacity and fares.
    pub fn into_flight(
        self,
        default_capacity: PerClass<u32>,
        default_price: PerClass<u32>,
    ) -> CoreResult<Flight> {
        let now = Utc::now();
        let flight = Flight {
            id: Uuid::new_v4(),
            flight_number: normalize_code("Flight number", &self.flight_number)?,
            airline: required("Airline", &self.airline)?,
            aircraft: normalize_code("Aircraft", &self.aircraft)?,
            origin: normalize_code("Origin", &self.origin)?,
            destination: normalize_code("Destination", &self.destination)?,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            gate: self.gate.as_deref().and_then(normalize_gate),
            status: self.status.unwrap_or(FlightStatus::Scheduled),
            capacity: self.capacity.unwrap_or(default_capacity),
            price: self.price.unwrap_or(default_price),
            created_at: now,
            updated_at: now,
        };
        flight.validate_schedule()?;
        Ok(flight)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightPatch {
    pub flight_number: Option<String>,
    pub airline: Option<String>,
    pub aircraft: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub gate: Option<String>,
    pub status: Option<FlightStatus>,
    pub capacity: Option<PerClass<u32>>,
    pub price: Option<PerClass<u32>>,
}

impl FlightPatch {
    pub fn touches_gate(&self) -> bool {
        self.gate.is_some()
            || self.departure_time.is_some()
            || self.status.is_some()
            || self.aircraft.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_tally_counts_each_class() {
        use SeatClass::*;
        let counts = PerClass::tally([Economy, First, Economy, Economy]);
        assert_eq!(counts, PerClass::new(1, 0, 3));
        assert_eq!(counts.total(), 4);
    }

    fn new_flight() -> NewFlight {
        let departure = Utc::now() + Duration::days(1);
        NewFlight {
            flight_number: " aa100 ".to_string(),
            airline: "American".to_string(),
            aircraft: "a320".to_string(),
            origin: "jfk".to_string(),
            destination: "lax".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(6),
            gate: Some("a3".to_string()),
            status: None,
            capacity: Some(PerClass::new(0, 0, 2)),
            price: None,
        }
    }

    #[test]
    fn test_new_flight_normalizes_and_defaults() {
        let flight = new_flight()
            .into_flight(PerClass::new(0, 20, 150), PerClass::new(0, 600, 200))
            .unwrap();
        assert_eq!(flight.flight_number, "AA100");
        assert_eq!(flight.origin, "JFK");
        assert_eq!(flight.gate.as_deref(), Some("A3"));
        assert_eq!(flight.status, FlightStatus::Scheduled);
        assert_eq!(flight.total_capacity(), 2);
        assert_eq!(flight.price.get(SeatClass::Business), 600);
    }

    #[test]
    fn test_arrival_must_follow_departure() {
        let mut request = new_flight();
        request.arrival_time = request.departure_time;
        let err = request
            .into_flight(PerClass::default(), PerClass::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_partial_capacity_defaults_missing_classes_to_zero() {
        let capacity: PerClass<u32> = serde_json::from_str(r#"{"economy": 2}"#).unwrap();
        assert_eq!(capacity, PerClass::new(0, 0, 2));
        assert_eq!(capacity.total(), 2);
    }

    #[test]
    fn test_claimed_gate_ignores_inactive_flights() {
        let mut flight = new_flight()
            .into_flight(PerClass::default(), PerClass::default())
            .unwrap();
        assert_eq!(flight.claimed_gate(), Some("A3"));
        flight.status = FlightStatus::Departed;
        assert_eq!(flight.claimed_gate(), None);
    }

    #[test]
    fn test_patch_clears_gate_and_revalidates() {
        let mut flight = new_flight()
            .into_flight(PerClass::default(), PerClass::default())
            .unwrap();
        flight
            .apply_patch(FlightPatch { gate: Some(String::new()), ..Default::default() })
            .unwrap();
        assert!(flight.gate.is_none());

        let bad = FlightPatch {
            arrival_time: Some(flight.departure_time - Duration::hours(1)),
            ..Default::default()
        };
        assert!(flight.apply_patch(bad).is_err());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(FlightStatus::Delayed).unwrap(), "delayed");
        assert_eq!(FlightStatus::parse("Boarding").unwrap(), FlightStatus::Boarding);
        assert!(FlightStatus::parse("landed").is_err());
    }
}
