pub mod aircraft;
pub mod gates;

pub use aircraft::{AircraftCatalog, AircraftCategory, AircraftType, SeatMap};
pub use gates::{find_gate_conflict, GateAvailability, GateCatalog, GateWindow};
