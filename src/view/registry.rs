//! View Registry
//!
//! Maps each role to the factory that builds its view. Nothing is loaded until
//! a role is resolved, so roles that are never activated cost nothing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::role::RoleId;

use super::{ViewFactory, ViewHandle};

/// Registry of deferred view factories
pub struct ViewRegistry {
    factories: RwLock<HashMap<RoleId, Arc<dyn ViewFactory>>>,
    loads: RwLock<HashMap<RoleId, u64>>,
}

impl ViewRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            loads: RwLock::new(HashMap::new()),
        }
    }

    /// Register the factory for one role, replacing any previous one
    pub fn register(&self, role: RoleId, factory: Arc<dyn ViewFactory>) {
        info!(role = %role, factory = factory.name(), "View factory registered");
        self.factories.write().insert(role, factory);
    }

    /// Register one factory for every role
    pub fn register_all(&self, factory: Arc<dyn ViewFactory>) {
        for role in RoleId::all() {
            self.register(*role, factory.clone());
        }
    }

    /// Roles with a registered factory
    pub fn registered_roles(&self) -> Vec<RoleId> {
        let factories = self.factories.read();
        RoleId::all()
            .iter()
            .filter(|r| factories.contains_key(r))
            .copied()
            .collect()
    }

    /// Lazily build a fresh view for `role`.
    ///
    /// A missing factory or a factory error is a load failure.
    pub async fn resolve(&self, role: RoleId) -> Result<ViewHandle> {
        // Clone out of the lock before awaiting.
        let factory = self.factories.read().get(&role).cloned();
        let factory = factory.ok_or_else(|| {
            Error::view_load_failed(role, "no view registered for this role")
        })?;

        *self.loads.write().entry(role).or_insert(0) += 1;
        debug!(role = %role, factory = factory.name(), "Resolving view");

        let view = factory.load(role).await.map_err(|e| match e {
            Error::ViewLoadFailed { .. } => e,
            other => Error::view_load_failed(role, other.to_string()),
        })?;

        if view.role() != role {
            warn!(requested = %role, produced = %view.role(), "Factory produced view for wrong role");
            return Err(Error::view_load_failed(
                role,
                format!("factory produced a view for '{}'", view.role()),
            ));
        }

        Ok(ViewHandle::new(role, view))
    }

    /// How many times `role` has been resolved
    pub fn load_count(&self, role: RoleId) -> u64 {
        self.loads.read().get(&role).copied().unwrap_or(0)
    }

    /// Roles resolved at least once
    pub fn loaded_roles(&self) -> Vec<RoleId> {
        let loads = self.loads.read();
        RoleId::all()
            .iter()
            .filter(|r| loads.get(r).copied().unwrap_or(0) > 0)
            .copied()
            .collect()
    }
}

impl Default for ViewRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{MockFailure, MockViewConfig, MockViewFactory};

    #[tokio::test]
    async fn test_resolve_is_lazy() {
        let registry = ViewRegistry::new();
        registry.register_all(Arc::new(MockViewFactory::new()));

        assert!(registry.loaded_roles().is_empty());

        let handle = registry.resolve(RoleId::Farmer).await.unwrap();
        assert_eq!(handle.role(), RoleId::Farmer);
        assert_eq!(registry.loaded_roles(), vec![RoleId::Farmer]);
        assert_eq!(registry.load_count(RoleId::Citizen), 0);
    }

    #[tokio::test]
    async fn test_resolve_returns_fresh_handles() {
        let factory = Arc::new(MockViewFactory::new());
        let registry = ViewRegistry::new();
        registry.register(RoleId::Student, factory.clone());

        registry.resolve(RoleId::Student).await.unwrap();
        registry.resolve(RoleId::Student).await.unwrap();

        assert_eq!(registry.load_count(RoleId::Student), 2);
        assert_eq!(factory.counters().loads(RoleId::Student), 2);
    }

    #[tokio::test]
    async fn test_missing_factory_is_load_failure() {
        let registry = ViewRegistry::new();
        let err = registry.resolve(RoleId::Business).await.unwrap_err();
        assert!(matches!(err, Error::ViewLoadFailed { .. }));
    }

    #[tokio::test]
    async fn test_factory_error_is_load_failure() {
        let factory = MockViewFactory::new().with_role(
            RoleId::Citizen,
            MockViewConfig {
                load: Some(MockFailure::Error),
                ..Default::default()
            },
        );
        let registry = ViewRegistry::new();
        registry.register(RoleId::Citizen, Arc::new(factory));

        let err = registry.resolve(RoleId::Citizen).await.unwrap_err();
        assert!(matches!(err, Error::ViewLoadFailed { .. }));
    }

    #[test]
    fn test_registered_roles() {
        let registry = ViewRegistry::new();
        registry.register(RoleId::Farmer, Arc::new(MockViewFactory::new()));
        registry.register(RoleId::Citizen, Arc::new(MockViewFactory::new()));
        assert_eq!(registry.registered_roles(), vec![RoleId::Citizen, RoleId::Farmer]);
    }
}
