//! Role system: the closed set of roles an identity can hold.
//!
//! Each signed-in identity holds one or more roles (citizen, student,
//! business, farmer, government official). A role defines display metadata and
//! which sectors its dashboard may open.

pub mod registry;
pub mod types;

pub use registry::RoleRegistry;
pub use types::{DisplayMetadata, RoleConfig, RoleId, SectorId};
