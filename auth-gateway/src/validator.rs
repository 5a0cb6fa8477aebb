//! Credential validation for subsequent hops
//!
//! A presented credential is never trusted on its own claims. The validator
//! recomputes what a credential for the principal would carry right now, from
//! a fresh directory lookup, and rejects anything that differs.

use auth_identity::{
    CredentialClaims, CredentialIssuer, DirectoryAdapter, DirectoryError, IdentityError, Principal, RoleFlags,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("No credential presented")]
    TokenMissing,

    #[error("No principal named for the presented credential")]
    PrincipalMissing,

    #[error("Credential claims do not match the directory")]
    TokenStaleClaims,

    #[error("Credential expired")]
    TokenExpired,

    #[error("Credential signature invalid")]
    TokenSignatureInvalid,

    #[error(transparent)]
    DirectoryUnavailable(#[from] DirectoryError),

    /// The reference claims could not be built
    #[error(transparent)]
    Reference(#[from] IdentityError),
}

impl ValidationError {
    /// Machine-readable rejection reason
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::TokenMissing => "no-token",
            ValidationError::PrincipalMissing => "no-principal",
            ValidationError::TokenStaleClaims => "stale-claims",
            ValidationError::TokenExpired => "expired",
            ValidationError::TokenSignatureInvalid => "signature-invalid",
            ValidationError::DirectoryUnavailable(_) => "directory-unavailable",
            ValidationError::Reference(_) => "reference-claims-unavailable",
        }
    }
}

/// A credential that passed every check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCredential {
    pub claims: CredentialClaims,
    /// Role flags just read from the directory, restricted to the role set
    pub fresh_roles: RoleFlags,
}

#[derive(Clone)]
pub struct CredentialValidator {
    issuer: CredentialIssuer,
    directory: Arc<dyn DirectoryAdapter>,
}

impl CredentialValidator {
    pub fn new(issuer: CredentialIssuer, directory: Arc<dyn DirectoryAdapter>) -> Self {
        Self { issuer, directory }
    }

    /// Check `presented` against a fresh expectation for `principal`
    ///
    /// Signature and expiry are checked before the directory is consulted, so
    /// forged or stale tokens cost no directory round-trip.
    ///
    /// # Errors
    ///
    /// The first failed check, as a [`ValidationError`].
    pub async fn validate(
        &self,
        presented: Option<&str>,
        principal: &Principal,
    ) -> Result<ValidatedCredential, ValidationError> {
        let token = presented
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ValidationError::TokenMissing)?;

        let claims = self
            .issuer
            .codec()
            .verify(token)
            .map_err(|_| ValidationError::TokenSignatureInvalid)?;

        if claims.is_expired_at(self.issuer.clock().now()) {
            return Err(ValidationError::TokenExpired);
        }

        let roles = self.directory.roles_for(principal).await?;
        let reference = self.issuer.reference_claims(principal, &roles)?;

        if !claims_match(&claims, &reference, principal, self.issuer.role_set().names()) {
            tracing::debug!(
                principal = %principal,
                presented_principal = %claims.principal,
                "Presented claims differ from the directory"
            );
            return Err(ValidationError::TokenStaleClaims);
        }

        Ok(ValidatedCredential {
            claims,
            fresh_roles: reference.roles,
        })
    }
}

impl std::fmt::Debug for CredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialValidator")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

fn claims_match<'a>(
    presented: &CredentialClaims,
    reference: &CredentialClaims,
    principal: &Principal,
    mut flags: impl Iterator<Item = &'a str>,
) -> bool {
    flags.all(|flag| presented.roles.get(flag) == reference.roles.get(flag))
        && presented.principal == reference.principal
        && presented.is_for(principal)
}
