//! Core types for roles.
//!
//! A role is an immutable capability profile an identity can hold. The set of
//! roles is closed: every role is a [`RoleId`] variant, and the catalog
//! supplies the display and sector metadata for each one.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Role Id
// ─────────────────────────────────────────────────────────────────

/// The roles an identity can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleId {
    /// Base role every signed-in identity holds.
    Citizen,
    /// Enrolled learner.
    Student,
    /// Registered business owner.
    Business,
    /// Registered agricultural producer.
    Farmer,
    /// Public official with cross-sector monitoring rights.
    GovernmentOfficial,
}

impl RoleId {
    /// Slug used in storage keys, catalog files and CLI args.
    pub fn slug(&self) -> &'static str {
        match self {
            RoleId::Citizen => "citizen",
            RoleId::Student => "student",
            RoleId::Business => "business",
            RoleId::Farmer => "farmer",
            RoleId::GovernmentOfficial => "government-official",
        }
    }

    /// All roles in catalog order.
    pub fn all() -> &'static [RoleId] {
        &[
            RoleId::Citizen,
            RoleId::Student,
            RoleId::Business,
            RoleId::Farmer,
            RoleId::GovernmentOfficial,
        ]
    }
}

impl Default for RoleId {
    fn default() -> Self {
        RoleId::Citizen
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for RoleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "citizen" => Ok(RoleId::Citizen),
            "student" => Ok(RoleId::Student),
            "business" => Ok(RoleId::Business),
            "farmer" => Ok(RoleId::Farmer),
            "government-official" | "government_official" | "government" | "official" => {
                Ok(RoleId::GovernmentOfficial)
            }
            _ => Err(format!(
                "Unknown role '{}'. Valid: citizen, student, business, farmer, government-official",
                s
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Sector Id
// ─────────────────────────────────────────────────────────────────

/// A permission/domain tag such as `health` or `industry`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorId(String);

impl SectorId {
    /// Sector ids compare case-insensitively; they are stored lowercase.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────
// Role Config (loaded from the catalog)
// ─────────────────────────────────────────────────────────────────

/// Presentation metadata for the role switcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMetadata {
    /// Human-readable name.
    pub name: String,

    /// One-line description.
    #[serde(default)]
    pub description: String,

    /// Icon identifier, opaque to the container.
    #[serde(default)]
    pub icon: String,

    /// Accent colour, opaque to the container.
    #[serde(default)]
    pub accent: String,
}

/// Capability metadata for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Which role this entry describes.
    pub id: RoleId,

    /// Presentation metadata.
    pub display: DisplayMetadata,

    /// Sectors this role may open.
    #[serde(default)]
    pub sector_access: BTreeSet<SectorId>,

    /// Monitoring roles can open every sector.
    #[serde(default)]
    pub can_monitor: bool,
}

impl RoleConfig {
    /// Whether this role may open `sector`.
    pub fn can_access(&self, sector: &SectorId) -> bool {
        self.can_monitor || self.sector_access.contains(sector)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_slug_roundtrip() {
        for role in RoleId::all() {
            assert_eq!(role.slug().parse::<RoleId>().unwrap(), *role);
        }
    }

    #[test]
    fn test_role_from_str_aliases() {
        assert_eq!("FARMER".parse::<RoleId>().unwrap(), RoleId::Farmer);
        assert_eq!(
            "government_official".parse::<RoleId>().unwrap(),
            RoleId::GovernmentOfficial
        );
        assert!("xyz".parse::<RoleId>().is_err());
    }

    #[test]
    fn test_serde_uses_slug() {
        let json = serde_json::to_string(&RoleId::GovernmentOfficial).unwrap();
        assert_eq!(json, "\"government-official\"");
        let parsed: RoleId = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(parsed, RoleId::Student);
    }

    #[test]
    fn test_sector_normalized() {
        assert_eq!(SectorId::new(" Health "), SectorId::new("health"));
        assert_eq!(SectorId::new("Health").as_str(), "health");
    }

    #[test]
    fn test_monitor_grants_every_sector() {
        let config = RoleConfig {
            id: RoleId::GovernmentOfficial,
            display: DisplayMetadata {
                name: "Official".into(),
                description: String::new(),
                icon: String::new(),
                accent: String::new(),
            },
            sector_access: BTreeSet::new(),
            can_monitor: true,
        };
        assert!(config.can_access(&SectorId::new("industry")));
    }
}
