use crate::clock::Clock;
use crate::credential::{Credential, CredentialClaims, CredentialCodec};
use crate::error::{IdentityError, Result};
use crate::models::{Principal, RoleFlagSet, RoleFlags};
use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

/// Builds signed, time-bounded credentials from directory data
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    codec: Arc<CredentialCodec>,
    role_set: Arc<RoleFlagSet>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CredentialIssuer {
    pub fn new(
        codec: Arc<CredentialCodec>,
        role_set: Arc<RoleFlagSet>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            codec,
            role_set,
            ttl,
            clock,
        }
    }

    pub fn codec(&self) -> &CredentialCodec {
        &self.codec
    }

    pub fn role_set(&self) -> &RoleFlagSet {
        &self.role_set
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Claims a credential issued now for `principal` would carry
    ///
    /// Every recognised flag is present; anything outside the role set is dropped.
    ///
    /// # Errors
    ///
    /// [`IdentityError::ExpiryOutOfRange`] when now plus `ttl` is not a representable time.
    pub fn reference_claims(&self, principal: &Principal, roles: &RoleFlags) -> Result<CredentialClaims> {
        let issued_at = self.clock.now();
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(IdentityError::ExpiryOutOfRange)?;

        Ok(CredentialClaims {
            principal: principal.as_str().to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            roles: self.role_set.complete(roles),
        })
    }

    /// Sign a fresh credential expiring `ttl` from now
    ///
    /// # Errors
    ///
    /// [`IdentityError::ExpiryOutOfRange`] for an unrepresentable expiry, or
    /// [`IdentityError::Signing`] if encoding fails.
    pub fn issue(&self, principal: &Principal, roles: &RoleFlags) -> Result<Credential> {
        let claims = self.reference_claims(principal, roles)?;
        let token = self.codec.sign(&claims)?;

        tracing::debug!(
            principal = %principal,
            expires_at = %claims.expires_at(),
            "Issued credential"
        );

        Ok(Credential::new(token, claims))
    }
}
