//! Fault telemetry sinks
//!
//! Reports are fire-and-forget: a sink cannot fail the caller.

use parking_lot::Mutex;
use tracing::error;

use super::Fault;

/// Receives fault reports
pub trait TelemetrySink: Send + Sync {
    fn report(&self, fault: &Fault);
}

/// Logs faults through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn report(&self, fault: &Fault) {
        error!(
            role = %fault.role,
            kind = %fault.kind,
            phase = %fault.phase,
            epoch = fault.epoch,
            message = %fault.message,
            "View fault"
        );
    }
}

/// Collects faults in memory
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    reports: Mutex<Vec<Fault>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Fault> {
        self.reports.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn report(&self, fault: &Fault) {
        self.reports.lock().push(fault.clone());
    }
}
