use std::collections::{BTreeMap, HashSet};
use std::ops::RangeInclusive;

use aeroflow_core::{CoreError, CoreResult, Flight, PerClass, SeatClass};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Gate compatibility category of an airframe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AircraftCategory {
    NarrowBody,
    WideBody,
    Regional,
}

/// Contiguous block of rows sharing one class and column set.
#[derive(Debug, Clone)]
pub struct SeatBlock {
    pub class: SeatClass,
    pub rows: RangeInclusive<u16>,
    pub columns: &'static str,
}

impl SeatBlock {
    fn new(class: SeatClass, rows: RangeInclusive<u16>, columns: &'static str) -> Self {
        Self { class, rows, columns }
    }

    pub fn seats(&self) -> impl Iterator<Item = String> + '_ {
        self.rows
            .clone()
            .flat_map(move |row| self.columns.chars().map(move |col| format!("{}{}", row, col)))
    }
}

#[derive(Debug, Clone)]
pub struct AircraftType {
    pub code: &'static str,
    pub name: &'static str,
    pub category: AircraftCategory,
    pub capacity: PerClass<u32>,
    pub default_price: PerClass<u32>,
    pub layout: Vec<SeatBlock>,
}

// ============================================================================
// Seat map
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatState {
    pub seat_number: String,
    pub occupied: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CabinMap {
    pub class: SeatClass,
    pub available: usize,
    pub seats: Vec<SeatState>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatMap {
    pub flight_id: Uuid,
    pub flight_number: String,
    pub aircraft: String,
    pub cabins: Vec<CabinMap>,
}

/// Immutable aircraft reference data, built once at start-up.
#[derive(Debug, Clone)]
pub struct AircraftCatalog {
    types: BTreeMap<&'static str, AircraftType>,
}

impl AircraftCatalog {
    pub fn standard() -> Self {
        use SeatClass::*;

        let types = vec![
            AircraftType {
                code: "A320",
                name: "Airbus A320",
                category: AircraftCategory::NarrowBody,
                capacity: PerClass::new(0, 20, 150),
                default_price: PerClass::new(0, 600, 200),
                layout: vec![
                    SeatBlock::new(Business, 1..=5, "ABCD"),
                    SeatBlock::new(Economy, 6..=30, "ABCDEF"),
                ],
            },
            AircraftType {
                code: "A330",
                name: "Airbus A330",
                category: AircraftCategory::WideBody,
                capacity: PerClass::new(8, 36, 200),
                default_price: PerClass::new(1500, 800, 300),
                layout: vec![
                    SeatBlock::new(First, 1..=2, "ABCD"),
                    SeatBlock::new(Business, 3..=11, "ABCD"),
                    SeatBlock::new(Economy, 12..=36, "ABCDEFGH"),
                ],
            },
            AircraftType {
                code: "B737",
                name: "Boeing 737",
                category: AircraftCategory::NarrowBody,
                capacity: PerClass::new(0, 16, 126),
                default_price: PerClass::new(0, 550, 180),
                layout: vec![
                    SeatBlock::new(Business, 1..=4, "ABCD"),
                    SeatBlock::new(Economy, 5..=25, "ABCDEF"),
                ],
            },
            AircraftType {
                code: "B777",
                name: "Boeing 777",
                category: AircraftCategory::WideBody,
                capacity: PerClass::new(8, 40, 264),
                default_price: PerClass::new(2000, 1000, 400),
                layout: vec![
                    SeatBlock::new(First, 1..=2, "ABCD"),
                    SeatBlock::new(Business, 3..=12, "ABCD"),
                    SeatBlock::new(Economy, 13..=45, "ABCDEFGH"),
                ],
            },
            AircraftType {
                code: "B787",
                name: "Boeing 787 Dreamliner",
                category: AircraftCategory::WideBody,
                capacity: PerClass::new(0, 28, 224),
                default_price: PerClass::new(0, 900, 350),
                layout: vec![
                    SeatBlock::new(Business, 1..=7, "ABCD"),
                    SeatBlock::new(Economy, 8..=35, "ABCDEFGH"),
                ],
            },
            AircraftType {
                code: "A380",
                name: "Airbus A380",
                category: AircraftCategory::WideBody,
                capacity: PerClass::new(14, 76, 429),
                default_price: PerClass::new(3000, 1500, 500),
                layout: vec![
                    SeatBlock::new(First, 1..=3, "ABEFJK"),
                    SeatBlock::new(Business, 4..=22, "ABDEGH"),
                    SeatBlock::new(Economy, 23..=66, "ABCDEFGHJK"),
                ],
            },
        ];

        Self {
            types: types.into_iter().map(|t| (t.code, t)).collect(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&AircraftType> {
        self.types.get(code.trim().to_ascii_uppercase().as_str())
    }

    pub fn require(&self, code: &str) -> CoreResult<&AircraftType> {
        self.get(code)
            .ok_or_else(|| CoreError::validation(format!("Unknown aircraft type '{}'", code.trim())))
    }

    pub fn category_of(&self, code: &str) -> Option<AircraftCategory> {
        self.get(code).map(|t| t.category)
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    /// Seat layout of `flight`'s aircraft with the seats in `occupied` flagged.
    ///
    /// `available` never exceeds what the flight's own capacity leaves after
    /// the `booked` counts, seatless bookings included.
    pub fn seat_map(
        &self,
        flight: &Flight,
        occupied: &HashSet<String>,
        booked: PerClass<u32>,
    ) -> CoreResult<SeatMap> {
        let aircraft = self.require(&flight.aircraft)?;
        let cabins = SeatClass::ALL
            .iter()
            .filter_map(|class| {
                let seats: Vec<SeatState> = aircraft
                    .layout
                    .iter()
                    .filter(|block| block.class == *class)
                    .flat_map(|block| block.seats())
                    .map(|seat_number| SeatState {
                        occupied: occupied.contains(&seat_number),
                        seat_number,
                    })
                    .collect();
                if seats.is_empty() {
                    return None;
                }
                let free = seats.iter().filter(|s| !s.occupied).count();
                let remaining = flight.capacity.get(*class).saturating_sub(booked.get(*class)) as usize;
                Some(CabinMap {
                    class: *class,
                    available: free.min(remaining),
                    seats,
                })
            })
            .collect();

        Ok(SeatMap {
            flight_id: flight.id,
            flight_number: flight.flight_number.clone(),
            aircraft: aircraft.code.to_string(),
            cabins,
        })
    }
}

impl Default for AircraftCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeroflow_core::NewFlight;
    use chrono::{Duration, Utc};

    #[test]
    fn test_layouts_cover_capacity() {
        let catalog = AircraftCatalog::standard();
        for code in ["A320", "A330", "B737", "B777", "B787", "A380"] {
            let aircraft = catalog.get(code).unwrap();
            for class in SeatClass::ALL {
                let seats: usize = aircraft
                    .layout
                    .iter()
                    .filter(|b| b.class == class)
                    .map(|b| b.seats().count())
                    .sum();
                assert!(seats as u32 >= aircraft.capacity.get(class), "{} {:?}", code, class);
            }
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = AircraftCatalog::standard();
        assert_eq!(catalog.get("a320").unwrap().capacity.total(), 170);
        assert_eq!(catalog.category_of("B777"), Some(AircraftCategory::WideBody));
        assert!(matches!(catalog.require("F100"), Err(CoreError::Validation(_))));
    }

    fn flight_on(catalog: &AircraftCatalog, aircraft: &str) -> Flight {
        let departure = Utc::now() + Duration::days(2);
        let capacity = catalog.get(aircraft).unwrap().capacity;
        NewFlight {
            flight_number: "BA10".to_string(),
            airline: "British".to_string(),
            aircraft: aircraft.to_string(),
            origin: "LHR".to_string(),
            destination: "DUB".to_string(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(1),
            gate: None,
            status: None,
            capacity: None,
            price: None,
        }
        .into_flight(capacity, PerClass::default())
        .unwrap()
    }

    #[test]
    fn test_seat_map_flags_occupied() {
        let catalog = AircraftCatalog::standard();
        let flight = flight_on(&catalog, "B737");

        let occupied: HashSet<String> = ["1A".to_string(), "5C".to_string()].into();
        let map = catalog.seat_map(&flight, &occupied, PerClass::new(0, 1, 1)).unwrap();

        assert_eq!(map.cabins.len(), 2);
        let business = &map.cabins[0];
        assert_eq!(business.class, SeatClass::Business);
        assert_eq!(business.seats.len(), 16);
        assert_eq!(business.available, 15);
        assert!(business.seats[0].occupied);
        assert_eq!(map.cabins[1].available, 125);
    }

    #[test]
    fn test_available_is_capped_by_flight_capacity() {
        let catalog = AircraftCatalog::standard();
        let flight = flight_on(&catalog, "A380");

        let map = catalog.seat_map(&flight, &HashSet::new(), PerClass::default()).unwrap();
        let economy = map.cabins.iter().find(|c| c.class == SeatClass::Economy).unwrap();
        assert_eq!(economy.seats.len(), 440);
        assert_eq!(economy.available, 429);

        // Seatless bookings still consume capacity.
        let occupied: HashSet<String> = ["30A".to_string()].into();
        let map = catalog.seat_map(&flight, &occupied, PerClass::new(0, 0, 5)).unwrap();
        let economy = map.cabins.iter().find(|c| c.class == SeatClass::Economy).unwrap();
        assert_eq!(economy.available, 424);
    }
}
