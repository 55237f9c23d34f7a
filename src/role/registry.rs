//! Role registry: the static catalog of role capability metadata.
//!
//! The bundled catalog is compiled in from `config/roles.toml`; a replacement
//! catalog can be loaded from disk. Lookups by raw id never fail: an unknown
//! id resolves to the default role so presentation code cannot crash on it.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::types::{RoleConfig, RoleId, SectorId};

pub const BUNDLED_CATALOG: &str = include_str!("../../config/roles.toml");

/// On-disk catalog layout.
#[derive(Debug, Deserialize)]
struct Catalog {
    roles: Vec<RoleConfig>,
}

/// Registry of role configurations.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    roles: HashMap<RoleId, RoleConfig>,
    default_role: RoleId,
}

impl RoleRegistry {
    /// Registry backed by the bundled catalog, with `citizen` as default.
    pub fn bundled() -> Result<Self> {
        Self::from_toml(BUNDLED_CATALOG)
    }

    /// Load a catalog file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(path = %path.display(), "Loading role catalog");
        Self::from_toml(&content)
    }

    /// Parse a catalog. Every [`RoleId`] must appear exactly once.
    pub fn from_toml(content: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(content).map_err(|e| Error::RoleCatalogInvalid {
            reason: format!("Failed to parse catalog: {}", e),
        })?;

        let mut roles = HashMap::new();
        for config in catalog.roles {
            let id = config.id;
            if roles.insert(id, config).is_some() {
                return Err(Error::RoleCatalogInvalid {
                    reason: format!("Role '{}' is defined more than once", id),
                });
            }
        }

        if let Some(missing) = RoleId::all().iter().find(|r| !roles.contains_key(r)) {
            return Err(Error::RoleCatalogInvalid {
                reason: format!("Role '{}' has no catalog entry", missing),
            });
        }

        Ok(Self {
            roles,
            default_role: RoleId::default(),
        })
    }

    /// Replace the role that unknown ids fall back to.
    pub fn with_default_role(mut self, role: RoleId) -> Self {
        self.default_role = role;
        self
    }

    /// The designated default role.
    pub fn default_role(&self) -> RoleId {
        self.default_role
    }

    /// Config for a known role.
    pub fn get(&self, role: RoleId) -> &RoleConfig {
        // Construction guarantees every RoleId is present.
        &self.roles[&role]
    }

    /// Config for a raw role id, falling back to the default role.
    pub fn lookup(&self, role_id: &str) -> &RoleConfig {
        match role_id.parse::<RoleId>() {
            Ok(role) => self.get(role),
            Err(_) => {
                warn!(
                    role_id = %role_id,
                    fallback = %self.default_role,
                    "Unknown role, using default role config"
                );
                self.get(self.default_role)
            }
        }
    }

    /// Whether `role_id` may open `sector`.
    pub fn can_access_sector(&self, role_id: &str, sector: &str) -> bool {
        self.lookup(role_id).can_access(&SectorId::new(sector))
    }

    /// All role configs in catalog order.
    pub fn list(&self) -> Vec<&RoleConfig> {
        RoleId::all().iter().map(|r| self.get(*r)).collect()
    }
}
