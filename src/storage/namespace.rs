//! Storage namespacing: per-role key derivation over a shared store.
//!
//! Key format (stable, part of the storage contract):
//!
//! ```text
//! <namespace>:<roleId>:<identityId>:<baseKey>   with an identity
//! <namespace>:<roleId>:<baseKey>                without one
//! ```
//!
//! Every key of a role starts with `<namespace>:<roleId>:`. Role slugs never
//! contain `:`, so no role's prefix is a prefix of another role's keys.
//!
//! [`RoleStorage`] rejects base keys containing `:`. Without that, the base key
//! `u1:plots` with no identity would derive the same key as `plots` under
//! identity `u1`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::role::RoleId;

use super::kv::KeyValueStore;

/// Derives and manages role-isolated keys in a shared store.
#[derive(Clone)]
pub struct StorageNamespace {
    namespace: String,
    store: Arc<dyn KeyValueStore>,
}

impl StorageNamespace {
    pub fn new(namespace: impl Into<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            namespace: namespace.into(),
            store,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// `<namespace>:<roleId>:`
    pub fn role_prefix(&self, role: RoleId) -> String {
        format!("{}:{}:", self.namespace, role.slug())
    }

    /// Derive the persisted key for `base_key`.
    pub fn derive_key(&self, role: RoleId, base_key: &str, identity: Option<&str>) -> String {
        match identity {
            Some(id) if !id.is_empty() => format!("{}{}:{}", self.role_prefix(role), id, base_key),
            _ => format!("{}{}", self.role_prefix(role), base_key),
        }
    }

    /// Every persisted key under `role`.
    pub fn role_keys(&self, role: RoleId) -> Result<Vec<String>> {
        self.store.keys_with_prefix(&self.role_prefix(role))
    }

    /// Delete every key under `role`, returning how many were removed.
    pub fn clear_role_keys(&self, role: RoleId) -> Result<usize> {
        let removed = self.store.delete_prefix(&self.role_prefix(role))?;
        info!(role = %role, removed, namespace = %self.namespace, "Cleared role keys");
        Ok(removed)
    }

    /// Storage handle a view uses for its own state.
    pub fn scoped(&self, role: RoleId, identity: Option<&str>) -> RoleStorage {
        RoleStorage {
            namespace: self.clone(),
            role,
            identity: identity.map(str::to_string),
        }
    }
}

impl std::fmt::Debug for StorageNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageNamespace")
            .field("namespace", &self.namespace)
            .field("store", &self.store.name())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────
// Role Storage
// ─────────────────────────────────────────────────────────────────

/// Typed storage bound to one (role, identity) pair.
///
/// A view only ever sees this handle, so it cannot address another role's keys.
#[derive(Debug, Clone)]
pub struct RoleStorage {
    namespace: StorageNamespace,
    role: RoleId,
    identity: Option<String>,
}

impl RoleStorage {
    pub fn role(&self) -> RoleId {
        self.role
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Full key for `base_key`.
    ///
    /// Fails with [`Error::InvalidStorageKey`] when `base_key` is empty or contains `:`.
    pub fn key(&self, base_key: &str) -> Result<String> {
        if base_key.is_empty() || base_key.contains(':') {
            return Err(Error::InvalidStorageKey {
                key: base_key.to_string(),
            });
        }
        Ok(self
            .namespace
            .derive_key(self.role, base_key, self.identity.as_deref()))
    }

    pub fn get<T: DeserializeOwned>(&self, base_key: &str) -> Result<Option<T>> {
        let key = self.key(base_key)?;
        match self.namespace.store.get(&key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| Error::StorageRead {
                    key,
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&self, base_key: &str, value: &T) -> Result<()> {
        let key = self.key(base_key)?;
        debug!(key = %key, "Role storage write");
        self.namespace.store.set(&key, serde_json::to_value(value)?)
    }

    pub fn remove(&self, base_key: &str) -> Result<bool> {
        self.namespace.store.delete(&self.key(base_key)?)
    }
}
