//! Role container
//!
//! A single container per session shows the active role's view. The
//! controller runs the switch state machine, the supervisor isolates view
//! failures, and telemetry receives every fault.

mod controller;
mod fault;
mod state;
mod supervisor;
mod telemetry;

pub use controller::{ContainerController, ContainerDeps, RenderOutput};
pub use fault::{Fallback, Fault, FaultKind, LifecyclePhase};
pub use state::{ContainerPhase, ContainerState, ContainerStatus};
pub use supervisor::ViewSupervisor;
pub use telemetry::{MemoryTelemetry, TelemetrySink, TracingTelemetry};
