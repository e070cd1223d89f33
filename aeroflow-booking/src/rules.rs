use aeroflow_catalog::GateWindow;

/// Tunable rule switches for the booking services.
#[derive(Debug, Clone, Copy)]
pub struct Rules {
    /// Reject a booking when its own class is full, not only the whole flight.
    pub enforce_class_capacity: bool,
    /// Reject flight writes that put two active flights on one gate inside the window.
    pub enforce_gate_windows: bool,
    pub gate_window: GateWindow,
    pub reference_max_attempts: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            enforce_class_capacity: true,
            enforce_gate_windows: true,
            gate_window: GateWindow::default(),
            reference_max_attempts: 32,
        }
    }
}
