//! Per-principal session cache
//!
//! Holds the most recently issued credential for each principal so repeat
//! traffic inside the expiry window skips the directory.

use auth_identity::{Clock, Credential, Principal};
use dashmap::DashMap;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CacheError {
    #[error("Credential for '{actual}' cannot be cached under '{expected}'")]
    PrincipalMismatch { expected: String, actual: String },
}

/// Storage seam for issued credentials
///
/// Every operation is atomic per principal. Expired credentials read as absent.
pub trait SessionStore: Send + Sync + Debug {
    /// Live credential for `principal`, if any
    fn lookup(&self, principal: &Principal) -> Option<Credential>;

    /// Replace the entry for `principal`; the last store wins
    ///
    /// # Errors
    ///
    /// [`CacheError::PrincipalMismatch`] when the credential was issued to someone else.
    fn store(&self, principal: &Principal, credential: Credential) -> Result<(), CacheError>;

    /// Drop the entry for `principal`. Idempotent.
    fn invalidate(&self, principal: &Principal);
}

/// In-process session cache keyed by principal
#[derive(Debug)]
pub struct InMemorySessionCache {
    entries: DashMap<Principal, Credential>,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of principals holding a live credential
    pub fn live_entries(&self) -> usize {
        let now = self.clock.now();
        self.entries.iter().filter(|entry| !entry.value().is_expired_at(now)).count()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for InMemorySessionCache {
    fn lookup(&self, principal: &Principal) -> Option<Credential> {
        let now = self.clock.now();

        // The read guard must be released before evicting on the same shard
        {
            let entry = self.entries.get(principal)?;
            if !entry.value().is_expired_at(now) {
                return Some(entry.value().clone());
            }
        }

        // A concurrent store may have replaced the entry with a live one
        if self
            .entries
            .remove_if(principal, |_, credential| credential.is_expired_at(now))
            .is_some()
        {
            tracing::debug!(principal = %principal, "Evicted expired credential");
        }
        None
    }

    fn store(&self, principal: &Principal, credential: Credential) -> Result<(), CacheError> {
        if credential.principal() != principal.as_str() {
            return Err(CacheError::PrincipalMismatch {
                expected: principal.to_string(),
                actual: credential.principal().to_string(),
            });
        }

        self.entries.insert(principal.clone(), credential);
        Ok(())
    }

    fn invalidate(&self, principal: &Principal) {
        self.entries.remove(principal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_identity::{CredentialCodec, CredentialIssuer, ManualClock, RoleFlagSet, RoleFlags, SigningSecret};

    fn fixture() -> (InMemorySessionCache, CredentialIssuer, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let issuer = CredentialIssuer::new(
            Arc::new(CredentialCodec::new(&SigningSecret::generate())),
            Arc::new(RoleFlagSet::from_names(["isAdmin"]).unwrap()),
            chrono::Duration::seconds(60),
            clock.clone(),
        );
        (InMemorySessionCache::new(clock.clone()), issuer, clock)
    }

    #[test]
    fn test_store_then_lookup() {
        let (cache, issuer, _) = fixture();
        let alice = Principal::new("alice").unwrap();
        let credential = issuer.issue(&alice, &RoleFlags::new()).unwrap();

        assert_eq!(cache.lookup(&alice), None);
        cache.store(&alice, credential.clone()).unwrap();
        assert_eq!(cache.lookup(&alice), Some(credential));
        assert_eq!(cache.live_entries(), 1);
    }

    #[test]
    fn test_expired_reads_as_absent() {
        let (cache, issuer, clock) = fixture();
        let alice = Principal::new("alice").unwrap();
        cache.store(&alice, issuer.issue(&alice, &RoleFlags::new()).unwrap()).unwrap();

        clock.advance(chrono::Duration::seconds(59));
        assert!(cache.lookup(&alice).is_some());

        clock.advance(chrono::Duration::seconds(1));
        assert!(cache.lookup(&alice).is_none());
        assert_eq!(cache.live_entries(), 0);
    }

    #[test]
    fn test_rejects_foreign_credential() {
        let (cache, issuer, _) = fixture();
        let alice = Principal::new("alice").unwrap();
        let bob = Principal::new("bob").unwrap();
        let credential = issuer.issue(&bob, &RoleFlags::new()).unwrap();

        assert_eq!(
            cache.store(&alice, credential),
            Err(CacheError::PrincipalMismatch {
                expected: "alice".to_string(),
                actual: "bob".to_string(),
            })
        );
        assert!(cache.lookup(&alice).is_none());
    }

    #[test]
    fn test_newer_store_supersedes() {
        let (cache, issuer, _) = fixture();
        let alice = Principal::new("alice").unwrap();
        let first = issuer.issue(&alice, &RoleFlags::new()).unwrap();
        let second = issuer.issue(&alice, &RoleFlags::from([("isAdmin", true)])).unwrap();

        cache.store(&alice, first).unwrap();
        cache.store(&alice, second.clone()).unwrap();
        assert_eq!(cache.lookup(&alice), Some(second));
    }

    #[test]
    fn test_invalidate_leaves_no_entry_behind() {
        let (cache, issuer, _) = fixture();
        let alice = Principal::new("alice").unwrap();
        cache.store(&alice, issuer.issue(&alice, &RoleFlags::new()).unwrap()).unwrap();

        cache.invalidate(&alice);
        cache.invalidate(&alice);
        for n in 0..100 {
            cache.invalidate(&Principal::new(format!("stranger-{n}")).unwrap());
        }

        assert!(cache.lookup(&alice).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expired_lookup_evicts() {
        let (cache, issuer, clock) = fixture();
        let alice = Principal::new("alice").unwrap();
        cache.store(&alice, issuer.issue(&alice, &RoleFlags::new()).unwrap()).unwrap();

        clock.advance(chrono::Duration::seconds(60));
        assert_eq!(cache.len(), 1);
        assert!(cache.lookup(&alice).is_none());
        assert_eq!(cache.len(), 0);
        assert!(cache.lookup(&alice).is_none());
    }
}
