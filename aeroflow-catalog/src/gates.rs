use aeroflow_core::{Flight, FlightStatus};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::aircraft::AircraftCategory;

/// Default half-width of the occupation window around a departure.
pub const DEFAULT_GATE_WINDOW_MINUTES: i64 = 120;

#[derive(Debug, Clone)]
pub struct Terminal {
    pub code: &'static str,
    pub name: &'static str,
    pub gates: Vec<String>,
    pub categories: Vec<AircraftCategory>,
}

impl Terminal {
    fn new(
        code: &'static str,
        name: &'static str,
        gate_count: u8,
        categories: Vec<AircraftCategory>,
    ) -> Self {
        Self {
            code,
            name,
            gates: (1..=gate_count).map(|n| format!("{}{}", code, n)).collect(),
            categories,
        }
    }

    pub fn accepts(&self, category: Option<AircraftCategory>) -> bool {
        category.map_or(true, |c| self.categories.contains(&c))
    }
}

/// Flight currently holding a gate inside the window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateOccupant {
    pub flight_id: Uuid,
    pub flight_number: String,
    pub departure_time: DateTime<Utc>,
    pub status: FlightStatus,
}

impl From<&Flight> for GateOccupant {
    fn from(flight: &Flight) -> Self {
        Self {
            flight_id: flight.id,
            flight_number: flight.flight_number.clone(),
            departure_time: flight.departure_time,
            status: flight.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateAvailability {
    pub gate: String,
    pub terminal: &'static str,
    pub terminal_name: &'static str,
    pub types: Vec<AircraftCategory>,
    pub available: bool,
    pub occupied_by: Option<GateOccupant>,
}

/// Time span around a departure during which a gate stays claimed.
#[derive(Debug, Clone, Copy)]
pub struct GateWindow {
    half_width: Duration,
}

impl GateWindow {
    pub fn minutes(minutes: i64) -> Self {
        Self { half_width: Duration::minutes(minutes.max(0)) }
    }

    pub fn bounds(&self, at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (at - self.half_width, at + self.half_width)
    }

    pub fn contains(&self, at: DateTime<Utc>, departure: DateTime<Utc>) -> bool {
        let (from, to) = self.bounds(at);
        departure >= from && departure <= to
    }
}

impl Default for GateWindow {
    fn default() -> Self {
        Self::minutes(DEFAULT_GATE_WINDOW_MINUTES)
    }
}

/// Static terminal/gate layout of the airport.
#[derive(Debug, Clone)]
pub struct GateCatalog {
    terminals: Vec<Terminal>,
}

impl GateCatalog {
    pub fn standard() -> Self {
        use AircraftCategory::*;
        Self {
            terminals: vec![
                Terminal::new("A", "Terminal A - Domestic", 12, vec![NarrowBody, Regional]),
                Terminal::new("B", "Terminal B - International", 10, vec![WideBody, NarrowBody]),
                Terminal::new("C", "Terminal C - International Wide-body", 8, vec![WideBody]),
                Terminal::new("D", "Terminal D - Regional", 6, vec![Regional, NarrowBody]),
            ],
        }
    }

    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }

    pub fn contains(&self, gate: &str) -> bool {
        self.terminals.iter().any(|t| t.gates.iter().any(|g| g == gate))
    }

    /// Gates whose terminal handles `category`. `None` (unknown aircraft) yields every gate.
    pub fn compatible_gates(
        &self,
        category: Option<AircraftCategory>,
    ) -> impl Iterator<Item = (&Terminal, &str)> + '_ {
        self.terminals
            .iter()
            .filter(move |t| t.accepts(category))
            .flat_map(|t| t.gates.iter().map(move |g| (t, g.as_str())))
    }

    /// Availability of every compatible gate at `at`. `flights` may contain any
    /// flights; only those claiming a gate inside the window count.
    pub fn available_gates(
        &self,
        category: Option<AircraftCategory>,
        at: DateTime<Utc>,
        window: GateWindow,
        flights: &[Flight],
    ) -> Vec<GateAvailability> {
        self.compatible_gates(category)
            .map(|(terminal, gate)| {
                let occupant = find_gate_conflict(flights, gate, at, window, None);
                GateAvailability {
                    gate: gate.to_string(),
                    terminal: terminal.code,
                    terminal_name: terminal.name,
                    types: terminal.categories.clone(),
                    available: occupant.is_none(),
                    occupied_by: occupant.map(GateOccupant::from),
                }
            })
            .collect()
    }
}

impl Default for GateCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// First flight other than `exclude` holding `gate` with a departure inside the window.
pub fn find_gate_conflict<'a>(
    flights: &'a [Flight],
    gate: &str,
    at: DateTime<Utc>,
    window: GateWindow,
    exclude: Option<Uuid>,
) -> Option<&'a Flight> {
    flights.iter().find(|flight| {
        Some(flight.id) != exclude
            && flight.claimed_gate() == Some(gate)
            && window.contains(at, flight.departure_time)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeroflow_core::{NewFlight, PerClass};

    fn flight_at_gate(gate: &str, departure: DateTime<Utc>) -> Flight {
        NewFlight {
            flight_number: "X1".to_string(),
            airline: "Test Air".to_string(),
            aircraft: "A320".to_string(),
            origin: "JFK".to_string(),
            destination: "BOS".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(1),
            gate: Some(gate.to_string()),
            status: None,
            capacity: None,
            price: None,
        }
        .into_flight(PerClass::new(0, 20, 150), PerClass::default())
        .unwrap()
    }

    fn gate<'a>(list: &'a [GateAvailability], code: &str) -> &'a GateAvailability {
        list.iter().find(|g| g.gate == code).unwrap()
    }

    #[test]
    fn test_gate_window_scenario() {
        let catalog = GateCatalog::standard();
        let t = Utc::now() + Duration::days(3);
        let flights = vec![flight_at_gate("A3", t + Duration::hours(1))];
        let narrow = Some(AircraftCategory::NarrowBody);

        let now = catalog.available_gates(narrow, t, GateWindow::default(), &flights);
        let a3 = gate(&now, "A3");
        assert!(!a3.available);
        assert_eq!(a3.occupied_by.as_ref().unwrap().flight_number, "X1");

        let later = catalog.available_gates(narrow, t + Duration::hours(5), GateWindow::default(), &flights);
        assert!(gate(&later, "A3").available);
    }

    #[test]
    fn test_window_edges_are_inclusive() {
        let t = Utc::now();
        let flights = vec![flight_at_gate("B2", t + Duration::hours(2))];
        assert!(find_gate_conflict(&flights, "B2", t, GateWindow::default(), None).is_some());
        assert!(find_gate_conflict(&flights, "B2", t - Duration::minutes(1), GateWindow::default(), None).is_none());
    }

    #[test]
    fn test_inactive_flights_release_gate() {
        let t = Utc::now();
        let mut flight = flight_at_gate("A1", t);
        flight.status = FlightStatus::Cancelled;
        assert!(find_gate_conflict(&[flight], "A1", t, GateWindow::default(), None).is_none());
    }

    #[test]
    fn test_conflict_ignores_excluded_flight() {
        let t = Utc::now();
        let flight = flight_at_gate("A1", t);
        let id = flight.id;
        assert!(find_gate_conflict(&[flight], "A1", t, GateWindow::default(), Some(id)).is_none());
    }

    #[test]
    fn test_compatibility_by_category() {
        let catalog = GateCatalog::standard();
        let wide: Vec<_> = catalog
            .compatible_gates(Some(AircraftCategory::WideBody))
            .map(|(_, g)| g.to_string())
            .collect();
        assert_eq!(wide.len(), 18);
        assert!(wide.iter().all(|g| g.starts_with('B') || g.starts_with('C')));

        let narrow = catalog.compatible_gates(Some(AircraftCategory::NarrowBody)).count();
        assert_eq!(narrow, 28);

        assert_eq!(catalog.compatible_gates(None).count(), 36);
        assert!(catalog.contains("D6"));
        assert!(!catalog.contains("D7"));
    }
}
