//! Identity providers
//!
//! Authentication happens elsewhere; a provider only maps an identity id to
//! the roles it was granted.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::IdentitySettings;
use crate::error::{Error, Result};

use super::SignIn;

/// Source of sign-in grants
pub trait IdentityProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    /// Grant for `identity_id`
    fn sign_in(&self, identity_id: &str) -> Result<SignIn>;
}

/// Fixed table of identities, usually from `[[session.identities]]`.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    identities: BTreeMap<String, SignIn>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &[IdentitySettings]) -> Self {
        let mut provider = Self::new();
        for identity in settings {
            let mut grant = SignIn::new(identity.id.clone()).with_roles(identity.roles.iter().copied());
            grant.active_role = identity.active;
            provider.insert(grant);
        }
        provider
    }

    pub fn insert(&mut self, grant: SignIn) {
        self.identities.insert(grant.identity_id.clone(), grant);
    }

    /// Known identity ids in order
    pub fn identity_ids(&self) -> Vec<&str> {
        self.identities.keys().map(String::as_str).collect()
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    fn sign_in(&self, identity_id: &str) -> Result<SignIn> {
        debug!(identity = %identity_id, provider = self.name(), "Resolving identity");
        self.identities
            .get(identity_id)
            .cloned()
            .ok_or_else(|| Error::IdentityNotFound {
                identity_id: identity_id.to_string(),
            })
    }
}
