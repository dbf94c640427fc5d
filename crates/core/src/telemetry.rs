//! Telemetry sink seam.
//!
//! Every subsystem reports timing/outcome events through [`TelemetrySink`].
//! Delivery is fire-and-forget: a sink must never fail or block the caller.

use std::sync::Mutex;

/// Receives timing and outcome events from the scheduler and layout engine.
///
/// Event names are dotted lowercase (e.g. `load.completed`,
/// `layout.persistence_error`); payloads are small JSON objects.
pub trait TelemetrySink: Send + Sync {
    fn record(&self, event: &str, payload: serde_json::Value);
}

/// Sink that discards everything. Default when no backend is wired.
#[derive(Debug, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&self, _event: &str, _payload: serde_json::Value) {}
}

/// In-memory capture sink for tests and diagnostics.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, in order.
    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.events.lock().unwrap().clone()
    }

    /// Count of events with the given name.
    pub fn count(&self, event: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn record(&self, event: &str, payload: serde_json::Value) {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), payload));
    }
}
