//! Role views
//!
//! The lifecycle contract every role view implements, the lazy registry that
//! resolves them, and the built-in dashboard.

mod traits;
mod registry;
mod dashboard;
mod mock;

pub use traits::*;
pub use registry::*;
pub use dashboard::{DashboardFactory, DashboardView};
pub use mock::{MockCounters, MockFailure, MockView, MockViewConfig, MockViewFactory};
