use crate::error::{IdentityError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Authenticated actor identifier (domain user name or service name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// # Errors
    ///
    /// [`IdentityError::EmptyPrincipal`] for empty or whitespace-only names.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IdentityError::EmptyPrincipal);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Role flag values for one principal at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleFlags(BTreeMap<String, bool>);

impl RoleFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    /// `true` only when the flag is present and set
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).unwrap_or(false)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: bool) {
        self.0.insert(name.into(), value);
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: bool) -> Self {
        self.insert(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for RoleFlags {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, value)| (name.into(), value)).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[(S, bool); N]> for RoleFlags {
    fn from(pairs: [(S, bool); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// The statically configured set of recognised role flags
///
/// Each flag maps to the directory group whose members hold it. Filtering
/// role data is a membership check against this set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFlagSet {
    groups: BTreeMap<String, String>,
}

impl RoleFlagSet {
    /// Build from `(flag name, directory group)` pairs
    ///
    /// # Errors
    ///
    /// [`IdentityError::InvalidRoleFlagSet`] for an empty set or an empty flag name.
    pub fn new<I, N, G>(flags: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, G)>,
        N: Into<String>,
        G: Into<String>,
    {
        let mut groups = BTreeMap::new();
        for (name, group) in flags {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(IdentityError::InvalidRoleFlagSet("empty flag name".to_string()));
            }
            groups.insert(name, group.into());
        }

        if groups.is_empty() {
            return Err(IdentityError::InvalidRoleFlagSet(
                "at least one role flag is required".to_string(),
            ));
        }

        Ok(Self { groups })
    }

    /// Flags whose directory group is the flag name itself
    ///
    /// # Errors
    ///
    /// Same as [`RoleFlagSet::new`].
    pub fn from_names<I, N>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self::new(names.into_iter().map(|name| {
            let name = name.into();
            (name.clone(), name)
        }))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn group_for(&self, name: &str) -> Option<&str> {
        self.groups.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Restrict `flags` to this set, recording every recognised flag
    ///
    /// Unrecognised names are dropped and recognised flags missing from
    /// `flags` are recorded as `false`, so the result always has exactly one
    /// entry per recognised flag.
    pub fn complete(&self, flags: &RoleFlags) -> RoleFlags {
        self.names()
            .map(|name| (name, flags.is_set(name)))
            .collect()
    }
}
