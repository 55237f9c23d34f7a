//! Faults contained by the view supervisor.
//!
//! A fault is a value, not an [`Error`]: it is terminal for the affected
//! container only and is rendered as a [`Fallback`].

use std::any::Any;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::role::RoleId;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Resolving the view failed
    ViewLoadFailure,
    /// A mounted view errored or panicked
    ViewRuntimeError,
    /// Resolution exceeded the transition timeout
    TransitionTimeout,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultKind::ViewLoadFailure => write!(f, "view_load_failure"),
            FaultKind::ViewRuntimeError => write!(f, "view_runtime_error"),
            FaultKind::TransitionTimeout => write!(f, "transition_timeout"),
        }
    }
}

/// Lifecycle call during which the fault happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Load,
    Mount,
    Update,
    Render,
    Unmount,
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecyclePhase::Load => "load",
            LifecyclePhase::Mount => "mount",
            LifecyclePhase::Update => "update",
            LifecyclePhase::Render => "render",
            LifecyclePhase::Unmount => "unmount",
        };
        f.write_str(s)
    }
}

/// A contained view failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub role: RoleId,
    pub kind: FaultKind,
    pub phase: LifecyclePhase,
    pub message: String,
    /// Mount epoch the fault belongs to
    pub epoch: u64,
    pub occurred_at: DateTime<Utc>,
}

impl Fault {
    pub fn new(role: RoleId, kind: FaultKind, phase: LifecyclePhase, message: impl Into<String>) -> Self {
        Self {
            role,
            kind,
            phase,
            message: message.into(),
            epoch: 0,
            occurred_at: Utc::now(),
        }
    }

    pub fn load_failure(role: RoleId, error: &Error) -> Self {
        let message = match error {
            Error::ViewLoadFailed { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self::new(role, FaultKind::ViewLoadFailure, LifecyclePhase::Load, message)
    }

    /// A view factory panicked while resolving
    pub fn load_panic(role: RoleId, payload: &(dyn Any + Send)) -> Self {
        Self::new(
            role,
            FaultKind::ViewLoadFailure,
            LifecyclePhase::Load,
            format!("panicked: {}", panic_message(payload)),
        )
    }

    pub fn timeout(role: RoleId, limit: Duration) -> Self {
        Self::new(
            role,
            FaultKind::TransitionTimeout,
            LifecyclePhase::Load,
            format!("view did not resolve within {}ms", limit.as_millis()),
        )
    }

    pub fn runtime(role: RoleId, phase: LifecyclePhase, message: impl Into<String>) -> Self {
        Self::new(role, FaultKind::ViewRuntimeError, phase, message)
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} view fault ({}) during {}: {}",
            self.role, self.kind, self.phase, self.message
        )
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// What the container shows instead of a faulted view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    pub role: RoleId,
    pub fault: Fault,
    /// Manual reload is offered; there is no automatic retry
    pub can_reload: bool,
}

impl Fallback {
    pub fn for_fault(fault: Fault) -> Self {
        Self {
            role: fault.role,
            fault,
            can_reload: true,
        }
    }
}
