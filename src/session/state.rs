//! Session state: which identity is signed in, the roles it holds, and which
//! role is active.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::role::RoleId;

/// Credentials-free sign-in result handed over by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignIn {
    /// Opaque identity id
    pub identity_id: String,

    /// Roles granted at sign-in
    #[serde(default)]
    pub held_roles: Vec<RoleId>,

    /// Role to activate, defaults to the base role
    #[serde(default)]
    pub active_role: Option<RoleId>,
}

impl SignIn {
    pub fn new(identity_id: impl Into<String>) -> Self {
        Self {
            identity_id: identity_id.into(),
            held_roles: Vec::new(),
            active_role: None,
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.held_roles.extend(roles);
        self
    }

    pub fn with_active(mut self, role: RoleId) -> Self {
        self.active_role = Some(role);
        self
    }
}

/// The signed-in session.
///
/// `active_role` is always a member of `held_roles`, and the base role is
/// always held. Every write of `active_role` is published to subscribers.
#[derive(Debug)]
pub struct SessionState {
    session_id: Uuid,
    identity_id: String,
    held_roles: BTreeSet<RoleId>,
    active_role: RoleId,
    started_at: DateTime<Utc>,
    role_tx: watch::Sender<RoleId>,
}

impl SessionState {
    /// Start a session from a sign-in grant.
    pub fn start(grant: SignIn, base_role: RoleId) -> Self {
        let mut held_roles: BTreeSet<RoleId> = grant.held_roles.into_iter().collect();
        held_roles.insert(base_role);

        let active_role = grant.active_role.unwrap_or(base_role);
        held_roles.insert(active_role);

        let (role_tx, _) = watch::channel(active_role);
        let session_id = Uuid::new_v4();

        info!(
            session_id = %session_id,
            identity = %grant.identity_id,
            active_role = %active_role,
            held = held_roles.len(),
            "Session started"
        );

        Self {
            session_id,
            identity_id: grant.identity_id,
            held_roles,
            active_role,
            started_at: Utc::now(),
            role_tx,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn identity_id(&self) -> &str {
        &self.identity_id
    }

    pub fn held_roles(&self) -> &BTreeSet<RoleId> {
        &self.held_roles
    }

    pub fn holds(&self, role: RoleId) -> bool {
        self.held_roles.contains(&role)
    }

    pub fn active_role(&self) -> RoleId {
        self.active_role
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Grant an additional role. Returns false if it was already held.
    pub fn add_role(&mut self, role: RoleId) -> bool {
        let added = self.held_roles.insert(role);
        if added {
            info!(session_id = %self.session_id, role = %role, "Role added to session");
        }
        added
    }

    /// Make `role` active, implicitly granting it when not held.
    ///
    /// Publishes a change event even when `role` is already active; the
    /// container treats that as a no-op.
    pub fn set_active_role(&mut self, role: RoleId) {
        if self.add_role(role) {
            debug!(role = %role, "Active role implicitly granted");
        }
        self.active_role = role;
        self.role_tx.send_replace(role);
        debug!(session_id = %self.session_id, role = %role, "Active role set");
    }

    /// Observe active-role changes.
    pub fn subscribe(&self) -> watch::Receiver<RoleId> {
        self.role_tx.subscribe()
    }
}
