//! Role lookup used by authorization guards.
//!
//! A lookup distinguishes three outcomes: the user has the role, the user does not
//! have the role, and the lookup itself failed. Callers must not treat a failure
//! as either answer.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tastelog_config::RoleConfig;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleLookupError {
    #[error("role lookup unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait RoleLookup: Send + Sync + std::fmt::Debug {
    async fn has_role(&self, user_id: &str, role: &str) -> Result<bool, RoleLookupError>;
}

/// Role assignments fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleLookup {
    assignments: HashMap<String, HashSet<String>>,
}

impl StaticRoleLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RoleConfig) -> Self {
        config
            .admin_user_ids
            .iter()
            .fold(Self::new(), |lookup, id| lookup.grant(id, ADMIN_ROLE))
    }

    #[must_use]
    pub fn grant(mut self, user_id: &str, role: &str) -> Self {
        self.assignments
            .entry(user_id.to_string())
            .or_default()
            .insert(role.to_string());
        self
    }
}

#[async_trait]
impl RoleLookup for StaticRoleLookup {
    async fn has_role(&self, user_id: &str, role: &str) -> Result<bool, RoleLookupError> {
        Ok(self
            .assignments
            .get(user_id)
            .is_some_and(|roles| roles.contains(role)))
    }
}
