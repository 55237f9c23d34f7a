//! View trait definitions
//!
//! Every role's dashboard implements the same lifecycle contract, and is
//! produced by a [`ViewFactory`] that the view registry resolves lazily.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::role::{RoleConfig, RoleId};
use crate::storage::RoleStorage;

// ─────────────────────────────────────────────────────────────────
// View Context
// ─────────────────────────────────────────────────────────────────

/// Everything a mounted view may touch.
#[derive(Debug, Clone)]
pub struct ViewContext {
    /// Role the view was mounted for
    pub role: RoleId,

    /// Mount generation this view belongs to
    pub epoch: u64,

    /// Signed-in identity
    pub identity: String,

    /// Catalog entry for the role
    pub config: RoleConfig,

    /// Storage scoped to (role, identity)
    pub storage: RoleStorage,
}

// ─────────────────────────────────────────────────────────────────
// Updates & Frames
// ─────────────────────────────────────────────────────────────────

/// An opaque update forwarded from the shell to the mounted view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewUpdate {
    /// Action name, interpreted by the view
    pub action: String,

    /// Action payload
    #[serde(default)]
    pub payload: Value,
}

impl ViewUpdate {
    pub fn new(action: impl Into<String>, payload: Value) -> Self {
        Self {
            action: action.into(),
            payload,
        }
    }
}

/// A rendered view, opaque to the container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewFrame {
    pub role: RoleId,
    pub epoch: u64,
    pub title: String,
    pub body: Value,
}

// ─────────────────────────────────────────────────────────────────
// RoleView Trait
// ─────────────────────────────────────────────────────────────────

/// Lifecycle contract for a role's view.
///
/// Calls happen on the container's single logical thread. Errors and panics
/// from any method are caught by the supervisor.
pub trait RoleView: Send {
    /// Role this view renders
    fn role(&self) -> RoleId;

    /// Attach the view. Called exactly once per handle.
    fn mount(&mut self, ctx: &ViewContext) -> Result<()>;

    /// Apply an update from the shell.
    fn update(&mut self, ctx: &ViewContext, update: &ViewUpdate) -> Result<()>;

    /// Produce the current frame.
    fn render(&self, ctx: &ViewContext) -> Result<ViewFrame>;

    /// Detach the view. The handle is dropped afterwards.
    fn unmount(&mut self, ctx: &ViewContext) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────
// ViewFactory Trait
// ─────────────────────────────────────────────────────────────────

/// Deferred constructor for role views.
#[async_trait]
pub trait ViewFactory: Send + Sync {
    /// Factory name for logs
    fn name(&self) -> &'static str;

    /// Fetch or construct a fresh view for `role`.
    async fn load(&self, role: RoleId) -> Result<Box<dyn RoleView>>;
}

// ─────────────────────────────────────────────────────────────────
// View Handle
// ─────────────────────────────────────────────────────────────────

/// A resolved, not yet mounted view. Never reused across activations.
pub struct ViewHandle {
    role: RoleId,
    view: Box<dyn RoleView>,
}

impl ViewHandle {
    pub fn new(role: RoleId, view: Box<dyn RoleView>) -> Self {
        Self { role, view }
    }

    pub fn role(&self) -> RoleId {
        self.role
    }

    pub fn into_view(self) -> Box<dyn RoleView> {
        self.view
    }
}

impl std::fmt::Debug for ViewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewHandle")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
