//! Signed session credentials
//!
//! A credential is an HS256 JWT whose payload carries the principal (`id`),
//! one boolean per recognised role flag, and the `iat`/`exp` timestamps.
//! Expiry is not enforced here: callers compare `exp` against their own
//! [`Clock`](crate::clock::Clock) so it can be simulated.

use crate::error::{IdentityError, Result};
use crate::models::{Principal, RoleFlags};
use crate::secret::SigningSecret;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Credential payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Principal the credential was issued to
    #[serde(rename = "id")]
    pub principal: String,

    /// Issued at (seconds since epoch)
    pub iat: i64,

    /// Expiration (seconds since epoch)
    pub exp: i64,

    /// Unique credential identifier
    pub jti: String,

    /// One entry per recognised role flag
    #[serde(flatten)]
    pub roles: RoleFlags,
}

impl CredentialClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Expired once `now` reaches `exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn is_for(&self, principal: &Principal) -> bool {
        self.principal == principal.as_str()
    }
}

/// An issued credential: the wire token plus its decoded claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    claims: CredentialClaims,
}

impl Credential {
    pub(crate) fn new(token: String, claims: CredentialClaims) -> Self {
        Self { token, claims }
    }

    /// Bearer value handed to clients
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &CredentialClaims {
        &self.claims
    }

    pub fn principal(&self) -> &str {
        &self.claims.principal
    }

    pub fn roles(&self) -> &RoleFlags {
        &self.claims.roles
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.claims.is_expired_at(now)
    }
}

/// HS256 signing and verification under the shared secret
pub struct CredentialCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl CredentialCodec {
    pub fn new(secret: &SigningSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an injected clock by the caller
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.expose()),
            decoding_key: DecodingKey::from_secret(secret.expose()),
            validation,
        }
    }

    /// # Errors
    ///
    /// [`IdentityError::Signing`] if the claims cannot be encoded.
    pub fn sign(&self, claims: &CredentialClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| IdentityError::Signing(e.to_string()))
    }

    /// Verify the signature and decode the payload, without checking expiry
    ///
    /// # Errors
    ///
    /// [`IdentityError::InvalidCredential`] for malformed tokens, other
    /// algorithms, and signatures that do not verify.
    pub fn verify(&self, token: &str) -> Result<CredentialClaims> {
        decode::<CredentialClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| IdentityError::InvalidCredential(e.to_string()))
    }
}

impl std::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn codec(passphrase: &str) -> CredentialCodec {
        CredentialCodec::new(&SigningSecret::from_passphrase(&SecretString::new(passphrase.to_string())))
    }

    fn claims() -> CredentialClaims {
        CredentialClaims {
            principal: "alice".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_086_400,
            jti: "c1".to_string(),
            roles: RoleFlags::from([("isAdmin", false), ("isViewer", true)]),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let codec = codec("secret");
        let token = codec.sign(&claims()).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), claims());
    }

    #[test]
    fn test_payload_layout() {
        let json = serde_json::to_value(claims()).unwrap();
        assert_eq!(json["id"], "alice");
        assert_eq!(json["isViewer"], true);
        assert_eq!(json["isAdmin"], false);
        assert_eq!(json["exp"], 1_700_086_400);
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = codec("secret").sign(&claims()).unwrap();
        assert!(matches!(
            codec("other").verify(&token),
            Err(IdentityError::InvalidCredential(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(codec("secret").verify("not-a-token").is_err());
        assert!(codec("secret").verify("").is_err());
    }

    #[test]
    fn test_expiry_boundary() {
        let claims = claims();
        let exp = claims.expires_at();
        assert!(!claims.is_expired_at(exp - chrono::Duration::seconds(1)));
        assert!(claims.is_expired_at(exp));
    }
}
