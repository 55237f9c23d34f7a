//! Mock view factory for testing
//!
//! Scriptable per-role latency and failures, plus call counts that let tests
//! verify lifecycle ordering and the single-mount invariant.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;

use crate::error::{Error, Result};
use crate::role::RoleId;

use super::{RoleView, ViewContext, ViewFactory, ViewFrame, ViewUpdate};

// ─────────────────────────────────────────────────────────────────
// Mock Configuration
// ─────────────────────────────────────────────────────────────────

/// How a scripted lifecycle call misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Return an error
    Error,
    /// Panic
    Panic,
}

/// Per-role behavior of mock views
#[derive(Debug, Clone, Default)]
pub struct MockViewConfig {
    /// Simulated fetch latency
    pub load_delay: Duration,

    /// Fail the factory load itself
    pub load: Option<MockFailure>,
    pub mount: Option<MockFailure>,
    pub update: Option<MockFailure>,
    pub render: Option<MockFailure>,
    pub unmount: Option<MockFailure>,
}

impl MockViewConfig {
    pub fn delayed(load_delay: Duration) -> Self {
        Self {
            load_delay,
            ..Default::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Call Counts
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
struct RoleCounts {
    loads: u32,
    mounts: u32,
    updates: u32,
    renders: u32,
    unmounts: u32,
}

#[derive(Debug, Default)]
struct CounterState {
    roles: HashMap<RoleId, RoleCounts>,
    events: Vec<String>,
    live: usize,
    max_live: usize,
}

/// Shared call counts across every view a factory produced
#[derive(Debug, Default)]
pub struct MockCounters {
    state: RwLock<CounterState>,
}

impl MockCounters {
    fn record(&self, role: RoleId, event: &str, bump: impl FnOnce(&mut RoleCounts)) {
        let mut state = self.state.write();
        bump(state.roles.entry(role).or_default());
        state.events.push(format!("{}:{}", event, role));
    }

    fn count(&self, role: RoleId, pick: impl FnOnce(&RoleCounts) -> u32) -> u32 {
        self.state.read().roles.get(&role).map(pick).unwrap_or(0)
    }

    pub fn loads(&self, role: RoleId) -> u32 {
        self.count(role, |c| c.loads)
    }

    pub fn mounts(&self, role: RoleId) -> u32 {
        self.count(role, |c| c.mounts)
    }

    pub fn updates(&self, role: RoleId) -> u32 {
        self.count(role, |c| c.updates)
    }

    pub fn renders(&self, role: RoleId) -> u32 {
        self.count(role, |c| c.renders)
    }

    pub fn unmounts(&self, role: RoleId) -> u32 {
        self.count(role, |c| c.unmounts)
    }

    /// Views currently mounted and not yet unmounted or dropped
    pub fn live(&self) -> usize {
        self.state.read().live
    }

    /// Highest number of simultaneously mounted views seen
    pub fn max_live(&self) -> usize {
        self.state.read().max_live
    }

    /// Lifecycle events in order, formatted as `<event>:<role>`
    pub fn events(&self) -> Vec<String> {
        self.state.read().events.clone()
    }

    fn attach(&self) {
        let mut state = self.state.write();
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
    }

    fn detach(&self) {
        let mut state = self.state.write();
        state.live = state.live.saturating_sub(1);
    }
}

// ─────────────────────────────────────────────────────────────────
// Mock Factory
// ─────────────────────────────────────────────────────────────────

/// Factory producing [`MockView`]s
#[derive(Default)]
pub struct MockViewFactory {
    default: MockViewConfig,
    roles: HashMap<RoleId, MockViewConfig>,
    counters: Arc<MockCounters>,
}

impl MockViewFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behavior for roles without their own entry
    pub fn with_default(mut self, config: MockViewConfig) -> Self {
        self.default = config;
        self
    }

    /// Behavior for one role
    pub fn with_role(mut self, role: RoleId, config: MockViewConfig) -> Self {
        self.roles.insert(role, config);
        self
    }

    pub fn counters(&self) -> Arc<MockCounters> {
        self.counters.clone()
    }

    fn config_for(&self, role: RoleId) -> &MockViewConfig {
        self.roles.get(&role).unwrap_or(&self.default)
    }
}

#[async_trait]
impl ViewFactory for MockViewFactory {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn load(&self, role: RoleId) -> Result<Box<dyn RoleView>> {
        let config = self.config_for(role).clone();
        self.counters.record(role, "load", |c| c.loads += 1);

        if !config.load_delay.is_zero() {
            tokio::time::sleep(config.load_delay).await;
        }

        match config.load {
            Some(MockFailure::Error) => {
                return Err(Error::view_load_failed(role, "mock load failure"));
            }
            Some(MockFailure::Panic) => panic!("mock load panic for {}", role),
            None => {}
        }

        Ok(Box::new(MockView {
            role,
            config,
            counters: self.counters.clone(),
            mounted: false,
            updates: Vec::new(),
        }))
    }
}

// ─────────────────────────────────────────────────────────────────
// Mock View
// ─────────────────────────────────────────────────────────────────

/// A view that records its lifecycle and fails on command
pub struct MockView {
    role: RoleId,
    config: MockViewConfig,
    counters: Arc<MockCounters>,
    mounted: bool,
    updates: Vec<String>,
}

impl MockView {
    fn trip(&self, failure: Option<MockFailure>, phase: &str) -> Result<()> {
        match failure {
            Some(MockFailure::Error) => {
                Err(Error::view_runtime(self.role, format!("mock {} error", phase)))
            }
            Some(MockFailure::Panic) => panic!("mock {} panic in {} view", phase, self.role),
            None => Ok(()),
        }
    }
}

impl RoleView for MockView {
    fn role(&self) -> RoleId {
        self.role
    }

    fn mount(&mut self, _ctx: &ViewContext) -> Result<()> {
        self.counters.record(self.role, "mount", |c| c.mounts += 1);
        self.trip(self.config.mount, "mount")?;
        self.mounted = true;
        self.counters.attach();
        Ok(())
    }

    fn update(&mut self, _ctx: &ViewContext, update: &ViewUpdate) -> Result<()> {
        self.counters.record(self.role, "update", |c| c.updates += 1);
        self.trip(self.config.update, "update")?;
        self.updates.push(update.action.clone());
        Ok(())
    }

    fn render(&self, ctx: &ViewContext) -> Result<ViewFrame> {
        self.counters.record(self.role, "render", |c| c.renders += 1);
        self.trip(self.config.render, "render")?;
        Ok(ViewFrame {
            role: self.role,
            epoch: ctx.epoch,
            title: format!("mock {}", self.role),
            body: json!({ "updates": self.updates }),
        })
    }

    fn unmount(&mut self, _ctx: &ViewContext) -> Result<()> {
        self.counters.record(self.role, "unmount", |c| c.unmounts += 1);
        if self.mounted {
            self.mounted = false;
            self.counters.detach();
        }
        self.trip(self.config.unmount, "unmount")
    }
}

impl Drop for MockView {
    fn drop(&mut self) {
        if self.mounted {
            self.counters.detach();
        }
    }
}
