//! Signed-in session: identity, held roles, active role.

mod identity;
mod state;
mod store;

pub use identity::{IdentityProvider, StaticIdentityProvider};
pub use state::{SessionState, SignIn};
pub use store::SessionStore;
