//! Directory lookups
//!
//! The directory maps a principal to its role flags. Real deployments plug in
//! an adapter for their directory service; [`StaticDirectory`] serves a fixed
//! membership table and backs development setups and tests.

use crate::models::{Principal, RoleFlagSet, RoleFlags};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Resolves a principal to role flags
///
/// Calls may suspend on network I/O. Retry and timeout policy belongs to the
/// implementation, not to the caller.
#[async_trait]
pub trait DirectoryAdapter: Send + Sync {
    async fn roles_for(&self, principal: &Principal) -> Result<RoleFlags, DirectoryError>;
}

#[async_trait]
impl<T: DirectoryAdapter + ?Sized> DirectoryAdapter for Arc<T> {
    async fn roles_for(&self, principal: &Principal) -> Result<RoleFlags, DirectoryError> {
        (**self).roles_for(principal).await
    }
}

/// Fixed group membership table
///
/// A flag is set when the principal belongs to the flag's directory group.
/// Unknown principals hold no groups, so every flag reads `false`.
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    role_set: Arc<RoleFlagSet>,
    memberships: HashMap<Principal, BTreeSet<String>>,
}

impl StaticDirectory {
    pub fn new(role_set: Arc<RoleFlagSet>) -> Self {
        Self {
            role_set,
            memberships: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_member<I, G>(mut self, principal: Principal, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<String>,
    {
        self.memberships
            .entry(principal)
            .or_default()
            .extend(groups.into_iter().map(Into::into));
        self
    }
}

#[async_trait]
impl DirectoryAdapter for StaticDirectory {
    async fn roles_for(&self, principal: &Principal) -> Result<RoleFlags, DirectoryError> {
        let groups = self.memberships.get(principal);
        let roles = self
            .role_set
            .names()
            .map(|flag| {
                let member = match (groups, self.role_set.group_for(flag)) {
                    (Some(groups), Some(group)) => groups.contains(group),
                    _ => false,
                };
                (flag, member)
            })
            .collect();

        tracing::debug!(principal = %principal, known = groups.is_some(), "Static directory lookup");
        Ok(roles)
    }
}
