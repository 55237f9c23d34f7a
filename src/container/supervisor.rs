//! View supervisor
//!
//! Owns the mounted view and wraps every lifecycle call. Returned errors and
//! panics alike become a [`Fault`] that is recorded, reported to telemetry and
//! rendered as a [`Fallback`]. Nothing escapes to the controller or the shell.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::role::RoleId;
use crate::view::{RoleView, ViewContext, ViewFrame, ViewHandle, ViewUpdate};

use super::fault::panic_message;
use super::{Fallback, Fault, LifecyclePhase, TelemetrySink};

struct MountedView {
    view: Box<dyn RoleView>,
    ctx: ViewContext,
}

/// Error boundary around the single mounted view
pub struct ViewSupervisor {
    telemetry: Arc<dyn TelemetrySink>,
    mounted: Option<MountedView>,
    fault: Option<Fault>,
}

impl ViewSupervisor {
    pub fn new(telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            telemetry,
            mounted: None,
            fault: None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    pub fn mounted_role(&self) -> Option<RoleId> {
        self.mounted.as_ref().map(|m| m.ctx.role)
    }

    /// The fault currently shown, if any
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    pub fn fallback(&self) -> Option<Fallback> {
        self.fault.clone().map(Fallback::for_fault)
    }

    /// Mount a freshly resolved view.
    ///
    /// Any view still mounted is unmounted first, so at most one is live.
    pub fn mount(&mut self, handle: ViewHandle, ctx: ViewContext) -> std::result::Result<(), Fault> {
        if self.mounted.is_some() {
            warn!(role = %ctx.role, "Mount requested while a view is mounted, unmounting it first");
            self.unmount();
        }
        self.fault = None;

        let mut view = handle.into_view();
        match guarded(ctx.role, ctx.epoch, LifecyclePhase::Mount, || view.mount(&ctx)) {
            Ok(()) => {
                debug!(role = %ctx.role, epoch = ctx.epoch, "View mounted");
                self.mounted = Some(MountedView { view, ctx });
                Ok(())
            }
            Err(fault) => {
                drop(view);
                self.fail(fault.clone());
                Err(fault)
            }
        }
    }

    /// Forward an update. Returns false when nothing is mounted.
    pub fn update(&mut self, update: &ViewUpdate) -> std::result::Result<bool, Fault> {
        let Some(mounted) = self.mounted.as_mut() else {
            return Ok(false);
        };
        let MountedView { view, ctx } = mounted;
        let outcome = guarded(ctx.role, ctx.epoch, LifecyclePhase::Update, || view.update(ctx, update));
        match outcome {
            Ok(()) => Ok(true),
            Err(fault) => {
                self.discard();
                self.fail(fault.clone());
                Err(fault)
            }
        }
    }

    /// Render the mounted view, if any.
    pub fn render(&mut self) -> std::result::Result<Option<ViewFrame>, Fault> {
        let Some(mounted) = self.mounted.as_ref() else {
            return Ok(None);
        };
        let MountedView { view, ctx } = mounted;
        match guarded(ctx.role, ctx.epoch, LifecyclePhase::Render, || view.render(ctx)) {
            Ok(frame) => Ok(Some(frame)),
            Err(fault) => {
                self.discard();
                self.fail(fault.clone());
                Err(fault)
            }
        }
    }

    /// Unmount and drop the current view.
    ///
    /// A failing unmount is reported but does not put the container into the
    /// errored state: the view is being left either way.
    pub fn unmount(&mut self) -> Option<Fault> {
        let MountedView { mut view, ctx } = self.mounted.take()?;
        let outcome = guarded(ctx.role, ctx.epoch, LifecyclePhase::Unmount, || view.unmount(&ctx));
        drop(view);
        match outcome {
            Ok(()) => {
                debug!(role = %ctx.role, epoch = ctx.epoch, "View unmounted");
                None
            }
            Err(fault) => {
                self.report(&fault);
                Some(fault)
            }
        }
    }

    /// Record a fault raised outside a lifecycle call (load failure, timeout).
    pub fn fail(&mut self, fault: Fault) {
        self.report(&fault);
        self.fault = Some(fault);
    }

    /// Drop a broken view without calling back into it.
    fn discard(&mut self) {
        if let Some(mounted) = self.mounted.take() {
            debug!(role = %mounted.ctx.role, epoch = mounted.ctx.epoch, "Discarding faulted view");
        }
    }

    fn report(&self, fault: &Fault) {
        let sink = &self.telemetry;
        if panic::catch_unwind(AssertUnwindSafe(|| sink.report(fault))).is_err() {
            warn!(role = %fault.role, "Telemetry sink panicked while reporting fault");
        }
    }
}

/// Run one lifecycle call, converting errors and panics into a fault.
fn guarded<T>(
    role: RoleId,
    epoch: u64,
    phase: LifecyclePhase,
    call: impl FnOnce() -> Result<T>,
) -> std::result::Result<T, Fault> {
    let fault = match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(e)) => Fault::runtime(role, phase, e.to_string()),
        Err(payload) => Fault::runtime(role, phase, format!("panicked: {}", panic_message(&*payload))),
    };
    Err(Fault { epoch, ..fault })
}
