//! Container state machine types.

use serde::{Deserialize, Serialize};

use crate::role::RoleId;

/// Lifecycle phase of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerPhase {
    /// One view mounted, matching `current_role`
    Idle,
    /// A view is being resolved; nothing mounted
    Transitioning,
    /// The view for `current_role` failed; the fallback is shown
    Errored,
}

impl std::fmt::Display for ContainerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerPhase::Idle => write!(f, "idle"),
            ContainerPhase::Transitioning => write!(f, "transitioning"),
            ContainerPhase::Errored => write!(f, "errored"),
        }
    }
}

/// Mutable container state. Only the controller writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerState {
    pub phase: ContainerPhase,
    pub current_role: RoleId,
    pub previous_role: Option<RoleId>,
    /// Incremented once per completed switch
    pub mount_epoch: u64,
}

impl ContainerState {
    /// Fresh state about to resolve `initial`.
    pub fn new(initial: RoleId) -> Self {
        Self {
            phase: ContainerPhase::Transitioning,
            current_role: initial,
            previous_role: None,
            mount_epoch: 0,
        }
    }
}

/// Snapshot published to observers after every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub phase: ContainerPhase,
    pub current_role: RoleId,
    pub previous_role: Option<RoleId>,
    /// Role being resolved while transitioning
    pub target_role: Option<RoleId>,
    pub mount_epoch: u64,
    /// Transitions started, including restarts
    pub transitions: u64,
    /// Resolutions discarded as stale
    pub discarded: u64,
}

impl ContainerStatus {
    pub fn is_transitioning(&self) -> bool {
        self.phase == ContainerPhase::Transitioning
    }

    pub fn has_error(&self) -> bool {
        self.phase == ContainerPhase::Errored
    }
}
