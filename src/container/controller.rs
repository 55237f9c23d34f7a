//! Container controller
//!
//! Observes the session's active role and drives the container through
//! `Idle -> Transitioning -> Idle | Errored`. View resolution runs on spawned
//! tasks; results come back over a channel tagged with a request ticket and
//! the mount epoch they started from. The last request wins: anything else is
//! counted and dropped without being mounted.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinError;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::config::ContainerSettings;
use crate::error::{self, Error};
use crate::role::{RoleId, RoleRegistry};
use crate::session::SessionState;
use crate::storage::StorageNamespace;
use crate::view::{ViewContext, ViewFrame, ViewHandle, ViewRegistry, ViewUpdate};

use super::{
    ContainerPhase, ContainerState, ContainerStatus, Fallback, Fault, TelemetrySink,
    ViewSupervisor,
};

/// Result of one resolution task
struct Resolution {
    ticket: u64,
    base_epoch: u64,
    role: RoleId,
    outcome: std::result::Result<ViewHandle, Fault>,
}

/// The in-flight request
#[derive(Debug, Clone, Copy)]
struct Pending {
    ticket: u64,
    base_epoch: u64,
    target: RoleId,
    requested_at: Instant,
}

/// What the container currently shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderOutput {
    /// Loading indicator while a view resolves
    Loading {
        target: RoleId,
        previous: Option<RoleId>,
    },
    /// The mounted view's frame
    Frame(ViewFrame),
    /// Fallback for a faulted role
    Fallback(Fallback),
    /// Nothing to show
    Blank,
}

/// Shared services a controller is built from
#[derive(Clone)]
pub struct ContainerDeps {
    pub catalog: Arc<RoleRegistry>,
    pub views: Arc<ViewRegistry>,
    pub storage: StorageNamespace,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub settings: ContainerSettings,
}

/// Drives the single role container of a session
pub struct ContainerController {
    deps: ContainerDeps,
    identity: String,
    roles_rx: watch::Receiver<RoleId>,

    state: ContainerState,
    supervisor: ViewSupervisor,
    pending: Option<Pending>,
    next_ticket: u64,
    transitions: u64,
    discarded: u64,

    results_tx: mpsc::UnboundedSender<Resolution>,
    results_rx: mpsc::UnboundedReceiver<Resolution>,
    status_tx: watch::Sender<ContainerStatus>,
}

impl ContainerController {
    /// Attach to `session` and start resolving its active role.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(session: &SessionState, deps: ContainerDeps) -> Self {
        let mut roles_rx = session.subscribe();
        let initial = *roles_rx.borrow_and_update();

        let state = ContainerState::new(initial);
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(ContainerStatus {
            phase: state.phase,
            current_role: initial,
            previous_role: None,
            target_role: Some(initial),
            mount_epoch: 0,
            transitions: 0,
            discarded: 0,
        });

        let mut controller = Self {
            supervisor: ViewSupervisor::new(deps.telemetry.clone()),
            deps,
            identity: session.identity_id().to_string(),
            roles_rx,
            state,
            pending: None,
            next_ticket: 0,
            transitions: 0,
            discarded: 0,
            results_tx,
            results_rx,
            status_tx,
        };

        info!(identity = %controller.identity, role = %initial, "Container started");
        controller.begin_transition(initial);
        controller
    }

    // ─────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────

    pub fn state(&self) -> &ContainerState {
        &self.state
    }

    pub fn phase(&self) -> ContainerPhase {
        self.state.phase
    }

    pub fn current_role(&self) -> RoleId {
        self.state.current_role
    }

    pub fn is_transitioning(&self) -> bool {
        self.state.phase == ContainerPhase::Transitioning
    }

    pub fn has_error(&self) -> bool {
        self.state.phase == ContainerPhase::Errored
    }

    /// The fault behind the errored state
    pub fn fault(&self) -> Option<&Fault> {
        self.supervisor.fault()
    }

    pub fn status(&self) -> ContainerStatus {
        ContainerStatus {
            phase: self.state.phase,
            current_role: self.state.current_role,
            previous_role: self.state.previous_role,
            target_role: self.pending.map(|p| p.target),
            mount_epoch: self.state.mount_epoch,
            transitions: self.transitions,
            discarded: self.discarded,
        }
    }

    /// Status snapshots, published after every state change
    pub fn subscribe(&self) -> watch::Receiver<ContainerStatus> {
        self.status_tx.subscribe()
    }

    // ─────────────────────────────────────────────────────────────
    // Requests
    // ─────────────────────────────────────────────────────────────

    /// Pick up the latest active-role change, if any.
    ///
    /// Returns true when a change was observed.
    pub fn observe(&mut self) -> bool {
        match self.roles_rx.has_changed() {
            Ok(true) => {
                let role = *self.roles_rx.borrow_and_update();
                self.request(role);
                true
            }
            Ok(false) => false,
            Err(_) => {
                debug!("Session role channel closed");
                false
            }
        }
    }

    /// Ask the container to show `role`.
    pub fn request(&mut self, role: RoleId) {
        match self.state.phase {
            ContainerPhase::Idle | ContainerPhase::Errored if role == self.state.current_role => {
                debug!(role = %role, phase = %self.state.phase, "Role already current, ignoring");
                return;
            }
            ContainerPhase::Transitioning if self.pending.map(|p| p.target) == Some(role) => {
                debug!(role = %role, "Role already being resolved, ignoring");
                return;
            }
            _ => {}
        }
        self.begin_transition(role);
    }

    /// Re-resolve the current role after a fault.
    ///
    /// Returns false unless the container is errored.
    pub fn reload(&mut self) -> bool {
        if self.state.phase != ContainerPhase::Errored {
            debug!(phase = %self.state.phase, "Reload ignored, container not errored");
            return false;
        }
        let role = self.state.current_role;
        info!(role = %role, "Reloading faulted view");
        self.supervisor.clear_fault();
        self.state.phase = ContainerPhase::Transitioning;
        self.begin_transition(role);
        true
    }

    fn begin_transition(&mut self, target: RoleId) {
        if self.state.phase != ContainerPhase::Transitioning {
            self.leave_current();
        } else if let Some(superseded) = self.pending {
            debug!(
                superseded = %superseded.target,
                ticket = superseded.ticket,
                role = %target,
                "Restarting transition"
            );
        }

        self.next_ticket += 1;
        self.transitions += 1;
        let pending = Pending {
            ticket: self.next_ticket,
            base_epoch: self.state.mount_epoch,
            target,
            requested_at: Instant::now(),
        };
        self.pending = Some(pending);
        self.state.phase = ContainerPhase::Transitioning;

        info!(
            role = %target,
            previous = ?self.state.previous_role,
            ticket = pending.ticket,
            epoch = pending.base_epoch,
            "Transition started"
        );

        self.spawn_resolution(pending);
        self.publish();
    }

    /// Unmount the settled view and forget its fault.
    fn leave_current(&mut self) {
        let leaving = self.state.current_role;
        self.state.previous_role = Some(leaving);
        self.supervisor.unmount();
        self.supervisor.clear_fault();

        if self.deps.settings.clear_on_switch {
            if let Err(e) = self.deps.storage.clear_role_keys(leaving) {
                warn!(role = %leaving, error = %e, "Failed to clear role keys on switch");
            }
        }
    }

    fn spawn_resolution(&self, pending: Pending) {
        let views = self.deps.views.clone();
        let tx = self.results_tx.clone();
        let dwell = self.deps.settings.dwell();
        let limit = self.deps.settings.transition_timeout();
        let role = pending.target;

        tokio::spawn(async move {
            // Own task, so a panicking factory comes back as a JoinError.
            let mut load = tokio::spawn(async move { views.resolve(role).await });
            let outcome = match limit {
                Some(limit) => match time::timeout(limit, &mut load).await {
                    Ok(joined) => load_outcome(role, joined),
                    Err(_) => {
                        load.abort();
                        Err(Fault::timeout(role, limit))
                    }
                },
                None => load_outcome(role, load.await),
            };

            // Hold the loading phase for the dwell time even when resolution is instant.
            time::sleep_until(pending.requested_at + dwell).await;

            let resolution = Resolution {
                ticket: pending.ticket,
                base_epoch: pending.base_epoch,
                role,
                outcome,
            };
            if tx.send(resolution).is_err() {
                debug!(role = %role, "Container gone, dropping resolution");
            }
        });
    }

    // ─────────────────────────────────────────────────────────────
    // Resolutions
    // ─────────────────────────────────────────────────────────────

    /// Wait until the container is no longer transitioning.
    pub async fn settle(&mut self) -> ContainerStatus {
        while self.state.phase == ContainerPhase::Transitioning {
            match self.results_rx.recv().await {
                Some(resolution) => {
                    self.apply(resolution);
                }
                None => break,
            }
        }
        self.status()
    }

    /// Apply resolutions that have already arrived, without waiting.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(resolution) = self.results_rx.try_recv() {
            if self.apply(resolution) {
                applied += 1;
            }
        }
        applied
    }

    fn apply(&mut self, resolution: Resolution) -> bool {
        let is_current = matches!(
            self.pending,
            Some(p) if p.ticket == resolution.ticket && p.base_epoch == self.state.mount_epoch
        );
        if !is_current {
            self.discarded += 1;
            debug!(
                role = %resolution.role,
                ticket = resolution.ticket,
                epoch = resolution.base_epoch,
                "Discarding stale resolution"
            );
            self.publish();
            return false;
        }

        self.pending = None;
        self.state.mount_epoch += 1;
        self.state.current_role = resolution.role;
        let epoch = self.state.mount_epoch;

        self.state.phase = match resolution.outcome {
            Ok(handle) => {
                let ctx = self.context_for(resolution.role, epoch);
                match self.supervisor.mount(handle, ctx) {
                    Ok(()) => ContainerPhase::Idle,
                    Err(_) => ContainerPhase::Errored,
                }
            }
            Err(fault) => {
                self.supervisor.fail(Fault { epoch, ..fault });
                ContainerPhase::Errored
            }
        };

        info!(
            role = %resolution.role,
            epoch,
            phase = %self.state.phase,
            "Transition complete"
        );
        self.publish();
        true
    }

    fn context_for(&self, role: RoleId, epoch: u64) -> ViewContext {
        ViewContext {
            role,
            epoch,
            identity: self.identity.clone(),
            config: self.deps.catalog.get(role).clone(),
            storage: self.deps.storage.scoped(role, Some(&self.identity)),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Mounted view
    // ─────────────────────────────────────────────────────────────

    /// Forward an update to the mounted view.
    ///
    /// Returns false when no view is mounted or the view faulted.
    pub fn dispatch(&mut self, update: &ViewUpdate) -> bool {
        if self.state.phase != ContainerPhase::Idle {
            debug!(action = %update.action, phase = %self.state.phase, "No mounted view, update dropped");
            return false;
        }
        match self.supervisor.update(update) {
            Ok(delivered) => delivered,
            Err(_) => {
                self.state.phase = ContainerPhase::Errored;
                self.publish();
                false
            }
        }
    }

    pub fn render(&mut self) -> RenderOutput {
        match self.state.phase {
            ContainerPhase::Transitioning => RenderOutput::Loading {
                target: self.pending.map(|p| p.target).unwrap_or(self.state.current_role),
                previous: self.state.previous_role,
            },
            ContainerPhase::Errored => self
                .supervisor
                .fallback()
                .map(RenderOutput::Fallback)
                .unwrap_or(RenderOutput::Blank),
            ContainerPhase::Idle => match self.supervisor.render() {
                Ok(Some(frame)) => RenderOutput::Frame(frame),
                Ok(None) => RenderOutput::Blank,
                Err(fault) => {
                    self.state.phase = ContainerPhase::Errored;
                    self.publish();
                    RenderOutput::Fallback(Fallback::for_fault(fault))
                }
            },
        }
    }

    /// Unmount the view and stop. In-flight resolutions are dropped.
    pub fn teardown(mut self) {
        self.supervisor.unmount();
        if let Some(p) = self.pending {
            debug!(role = %p.target, ticket = p.ticket, "Abandoning in-flight transition");
        }
        info!(
            identity = %self.identity,
            role = %self.state.current_role,
            epoch = self.state.mount_epoch,
            "Container torn down"
        );
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status());
    }
}

/// Map a finished load task to the view or the fault it ends in.
fn load_outcome(
    role: RoleId,
    joined: std::result::Result<error::Result<ViewHandle>, JoinError>,
) -> std::result::Result<ViewHandle, Fault> {
    match joined {
        Ok(result) => result.map_err(|e| Fault::load_failure(role, &e)),
        Err(e) if e.is_panic() => {
            warn!(role = %role, "View factory panicked during load");
            Err(Fault::load_panic(role, &*e.into_panic()))
        }
        Err(e) => Err(Fault::load_failure(role, &Error::view_load_failed(role, e.to_string()))),
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
