//! Role shell
//!
//! The surface the host application talks to: sign-in and sign-out, the held
//! roles, the role switcher, and the container showing the active role.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::config::ShellConfig;
use crate::container::{
    ContainerController, ContainerDeps, ContainerStatus, Fault, RenderOutput, TracingTelemetry,
};
use crate::error::{Error, Result};
use crate::role::{RoleId, RoleRegistry};
use crate::session::{IdentityProvider, SessionState, SessionStore, SignIn};
use crate::storage::{open_store, StorageNamespace};
use crate::view::{DashboardFactory, ViewRegistry, ViewUpdate};

/// One signed-in identity and its role container
pub struct RoleShell {
    deps: ContainerDeps,
    sessions: SessionStore,
    controller: Option<ContainerController>,
}

impl RoleShell {
    pub fn new(deps: ContainerDeps) -> Self {
        let base_role = deps.catalog.default_role();
        Self {
            deps,
            sessions: SessionStore::new(base_role),
            controller: None,
        }
    }

    /// Shell wired from configuration: catalog, store and built-in dashboards
    pub fn from_config(config: &ShellConfig) -> Result<Self> {
        let catalog = Arc::new(config.load_catalog()?);
        let store = open_store(config.storage.backend, &config.data_dir())?;

        let views = Arc::new(ViewRegistry::new());
        views.register_all(Arc::new(DashboardFactory::new(catalog.clone())));

        Ok(Self::new(ContainerDeps {
            catalog,
            views,
            storage: StorageNamespace::new(config.storage.namespace.clone(), store),
            telemetry: Arc::new(TracingTelemetry),
            settings: config.container.clone(),
        }))
    }

    pub fn catalog(&self) -> &RoleRegistry {
        &self.deps.catalog
    }

    pub fn views(&self) -> &Arc<ViewRegistry> {
        &self.deps.views
    }

    pub fn storage(&self) -> &StorageNamespace {
        &self.deps.storage
    }

    // ─────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────

    /// Start a session and its container. Any current session ends first.
    pub fn sign_in(&mut self, grant: SignIn) -> Result<()> {
        if self.sessions.is_active() {
            self.sign_out()?;
        }
        let session = self.sessions.init(grant);
        self.controller = Some(ContainerController::start(session, self.deps.clone()));
        Ok(())
    }

    /// Sign in through an identity provider
    pub fn sign_in_with(&mut self, provider: &dyn IdentityProvider, identity_id: &str) -> Result<()> {
        let grant = provider.sign_in(identity_id)?;
        self.sign_in(grant)
    }

    /// Tear down the container and end the session.
    pub fn sign_out(&mut self) -> Result<()> {
        if let Some(controller) = self.controller.take() {
            controller.teardown();
        }
        let session = self.sessions.teardown().ok_or(Error::NoActiveSession)?;
        info!(identity = %session.identity_id(), "Signed out");
        Ok(())
    }

    pub fn is_signed_in(&self) -> bool {
        self.sessions.is_active()
    }

    pub fn session(&self) -> Result<&SessionState> {
        self.sessions.get()
    }

    // ─────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────

    /// Grant a role. Returns false if it was already held.
    pub fn add_role(&mut self, role: RoleId) -> Result<bool> {
        Ok(self.sessions.get_mut()?.add_role(role))
    }

    /// Switch the active role; the container follows asynchronously.
    pub fn set_active_role(&mut self, role: RoleId) -> Result<()> {
        self.sessions.get_mut()?.set_active_role(role);
        self.controller_mut()?.observe();
        Ok(())
    }

    /// Switch by raw role id
    pub fn set_active_role_str(&mut self, role_id: &str) -> Result<()> {
        let role = role_id.parse::<RoleId>().map_err(|_| Error::UnknownRole {
            role_id: role_id.to_string(),
        })?;
        self.set_active_role(role)
    }

    pub fn active_role(&self) -> Result<RoleId> {
        Ok(self.sessions.get()?.active_role())
    }

    pub fn held_roles(&self) -> Result<BTreeSet<RoleId>> {
        Ok(self.sessions.get()?.held_roles().clone())
    }

    /// Whether the current role may open `sector`
    pub fn can_access_sector(&self, sector: &str) -> Result<bool> {
        let role = self.current_role()?;
        Ok(self.deps.catalog.can_access_sector(role.slug(), sector))
    }

    // ─────────────────────────────────────────────────────────────
    // Container
    // ─────────────────────────────────────────────────────────────

    fn controller(&self) -> Result<&ContainerController> {
        self.controller.as_ref().ok_or(Error::NoActiveSession)
    }

    fn controller_mut(&mut self) -> Result<&mut ContainerController> {
        self.controller.as_mut().ok_or(Error::NoActiveSession)
    }

    /// Role the container is showing (or last showed)
    pub fn current_role(&self) -> Result<RoleId> {
        Ok(self.controller()?.current_role())
    }

    pub fn is_transitioning(&self) -> bool {
        self.controller.as_ref().is_some_and(|c| c.is_transitioning())
    }

    pub fn has_error(&self) -> bool {
        self.controller.as_ref().is_some_and(|c| c.has_error())
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.controller.as_ref().and_then(|c| c.fault())
    }

    pub fn status(&self) -> Result<ContainerStatus> {
        Ok(self.controller()?.status())
    }

    pub fn subscribe(&self) -> Result<watch::Receiver<ContainerStatus>> {
        Ok(self.controller()?.subscribe())
    }

    /// Wait for the in-flight transition, if any, to finish.
    pub async fn settle(&mut self) -> Result<ContainerStatus> {
        Ok(self.controller_mut()?.settle().await)
    }

    /// Apply already-finished resolutions without waiting.
    pub fn poll(&mut self) -> Result<usize> {
        Ok(self.controller_mut()?.drain())
    }

    /// Retry the faulted view. Returns false if nothing is faulted.
    pub fn reload(&mut self) -> Result<bool> {
        Ok(self.controller_mut()?.reload())
    }

    pub fn render(&mut self) -> Result<RenderOutput> {
        Ok(self.controller_mut()?.render())
    }

    /// Forward an update to the mounted view. Returns whether it was delivered.
    pub fn dispatch(&mut self, update: ViewUpdate) -> Result<bool> {
        Ok(self.controller_mut()?.dispatch(&update))
    }
}
