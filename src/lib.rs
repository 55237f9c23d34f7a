//! Role Container - role-scoped views for multi-role identities
//!
//! One signed-in identity can hold several roles (citizen, student, business
//! owner, farmer, government official). This crate keeps exactly one role
//! active at a time and shows that role's view through a container that:
//! - loads views asynchronously, keeping a loading state visible while it does
//! - lets the most recent role request win, dropping stale resolutions
//! - contains a crashing view to its own fallback without affecting the shell
//! - scopes persisted view state per role so roles never see each other's data

pub mod config;
pub mod container;
pub mod error;
pub mod logging;
pub mod role;
pub mod session;
pub mod shell;
pub mod storage;
pub mod view;

pub use config::ShellConfig;
pub use container::{ContainerController, ContainerPhase, ContainerStatus, RenderOutput};
pub use error::{Error, Result};
pub use role::{RoleId, RoleRegistry};
pub use session::{SessionState, SignIn};
pub use shell::RoleShell;

/// Current version of the role container
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
