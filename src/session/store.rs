//! Session lifecycle: at most one signed-in session at a time.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::role::RoleId;

use super::{SessionState, SignIn};

/// Owns the current session, if any.
#[derive(Debug)]
pub struct SessionStore {
    base_role: RoleId,
    current: Option<SessionState>,
}

impl SessionStore {
    pub fn new(base_role: RoleId) -> Self {
        Self {
            base_role,
            current: None,
        }
    }

    pub fn base_role(&self) -> RoleId {
        self.base_role
    }

    /// Start a session, replacing any existing one.
    pub fn init(&mut self, grant: SignIn) -> &mut SessionState {
        if let Some(old) = self.current.take() {
            warn!(
                session_id = %old.session_id(),
                identity = %old.identity_id(),
                "Replacing active session"
            );
        }
        self.current.insert(SessionState::start(grant, self.base_role))
    }

    /// End the session, returning it.
    pub fn teardown(&mut self) -> Option<SessionState> {
        let session = self.current.take();
        if let Some(ref s) = session {
            info!(session_id = %s.session_id(), identity = %s.identity_id(), "Session ended");
        }
        session
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn get(&self) -> Result<&SessionState> {
        self.current.as_ref().ok_or(Error::NoActiveSession)
    }

    pub fn get_mut(&mut self) -> Result<&mut SessionState> {
        self.current.as_mut().ok_or(Error::NoActiveSession)
    }
}
