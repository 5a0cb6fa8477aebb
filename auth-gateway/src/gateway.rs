//! Gateway assembly
//!
//! [`SessionGateway`] bundles everything the pipeline stages share: the role
//! set, issuer, validator, session store and the two external adapters. It is
//! cheap to clone and is used as axum router state.

use crate::cache::{InMemorySessionCache, SessionStore};
use crate::error::{GatewayError, Result};
use crate::handshake::{HandshakeAdapter, TrustedHeaderHandshake};
use crate::metadata::RoleHeaders;
use crate::validator::CredentialValidator;
use auth_identity::{
    Clock, CredentialCodec, CredentialIssuer, DirectoryAdapter, Principal, RoleFlagSet, SigningSecret,
    StaticDirectory, SystemClock,
};
use axum::http::{HeaderName, StatusCode};
use config_engine::{GatewayConfig, MAX_EXPIRES_IN_SECS};
use std::sync::Arc;

#[derive(Clone)]
pub struct SessionGateway {
    inner: Arc<GatewayInner>,
}

pub(crate) struct GatewayInner {
    pub(crate) role_set: Arc<RoleFlagSet>,
    pub(crate) role_headers: RoleHeaders,
    pub(crate) issuer: CredentialIssuer,
    pub(crate) validator: CredentialValidator,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) directory: Arc<dyn DirectoryAdapter>,
    pub(crate) handshake: Arc<dyn HandshakeAdapter>,
    pub(crate) trusted_principal: Principal,
    pub(crate) own_host: String,
    pub(crate) verify_failure_status: StatusCode,
}

impl SessionGateway {
    /// Gateway with the bundled adapters: trusted-header handshake, static directory, in-memory cache
    ///
    /// # Errors
    ///
    /// [`GatewayError::InvalidConfiguration`] if the configuration cannot produce a gateway.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        SessionGatewayBuilder::from_config(config)?.build()
    }

    /// Start from configuration and swap adapters before building
    ///
    /// # Errors
    ///
    /// Same as [`SessionGateway::from_config`].
    pub fn builder(config: &GatewayConfig) -> Result<SessionGatewayBuilder> {
        SessionGatewayBuilder::from_config(config)
    }

    pub(crate) fn inner(&self) -> &GatewayInner {
        &self.inner
    }

    pub fn role_set(&self) -> &RoleFlagSet {
        &self.inner.role_set
    }

    pub fn own_host(&self) -> &str {
        &self.inner.own_host
    }

    pub fn session_store(&self) -> &dyn SessionStore {
        self.inner.store.as_ref()
    }

    pub fn issuer(&self) -> &CredentialIssuer {
        &self.inner.issuer
    }

    pub fn validator(&self) -> &CredentialValidator {
        &self.inner.validator
    }

    /// Drop the cached credential for `principal`; the next request re-reads the directory
    pub fn revoke(&self, principal: &Principal) {
        self.inner.store.invalidate(principal);
        tracing::info!(principal = %principal, "Session revoked");
    }
}

impl std::fmt::Debug for SessionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGateway")
            .field("role_set", &self.inner.role_set)
            .field("own_host", &self.inner.own_host)
            .field("trusted_principal", &self.inner.trusted_principal)
            .finish_non_exhaustive()
    }
}

/// Configuration-derived gateway with replaceable adapters
pub struct SessionGatewayBuilder {
    role_set: Arc<RoleFlagSet>,
    secret: SigningSecret,
    ttl: chrono::Duration,
    trusted_principal: Principal,
    own_host: String,
    verify_failure_status: StatusCode,
    clock: Arc<dyn Clock>,
    handshake: Arc<dyn HandshakeAdapter>,
    static_users: Vec<(Principal, Vec<String>)>,
    directory: Option<Arc<dyn DirectoryAdapter>>,
    store: Option<Arc<dyn SessionStore>>,
}

impl SessionGatewayBuilder {
    /// # Errors
    ///
    /// [`GatewayError::InvalidConfiguration`] for an unusable role set, principal,
    /// header name, expiry, or an unresolvable own host.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let invalid = GatewayError::InvalidConfiguration;

        let role_set = RoleFlagSet::new(config.role_flag_groups()).map_err(|e| invalid(e.to_string()))?;
        if config.expires_in_secs > MAX_EXPIRES_IN_SECS {
            return Err(invalid(format!("expires_in_secs {} out of range", config.expires_in_secs)));
        }
        let ttl = chrono::Duration::from_std(config.expires_in()).map_err(|e| invalid(e.to_string()))?;
        let trusted_principal =
            Principal::new(config.trusted_service_principal.as_str()).map_err(|e| invalid(e.to_string()))?;
        let own_host = config.resolve_own_host().map_err(|e| invalid(e.to_string()))?;
        let verify_failure_status = StatusCode::from_u16(config.verify_failure_status.status_code())
            .map_err(|e| invalid(e.to_string()))?;

        let user_header = HeaderName::from_bytes(config.handshake.user_header.to_ascii_lowercase().as_bytes())
            .map_err(|_| invalid(format!("invalid handshake header '{}'", config.handshake.user_header)))?;
        let handshake = TrustedHeaderHandshake::new(user_header, config.handshake.scheme.as_str())
            .strip_domain(config.handshake.strip_domain)
            .debug(config.handshake.debug);

        let static_users = config
            .directory
            .static_users
            .iter()
            .map(|user| {
                Principal::new(user.principal.as_str())
                    .map(|principal| (principal, user.groups.clone()))
                    .map_err(|e| invalid(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            role_set: Arc::new(role_set),
            secret: SigningSecret::from_config(config.signing_secret.as_ref()),
            ttl,
            trusted_principal,
            own_host,
            verify_failure_status,
            clock: Arc::new(SystemClock),
            handshake: Arc::new(handshake),
            static_users,
            directory: None,
            store: None,
        })
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn directory(mut self, directory: Arc<dyn DirectoryAdapter>) -> Self {
        self.directory = Some(directory);
        self
    }

    #[must_use]
    pub fn handshake(mut self, handshake: Arc<dyn HandshakeAdapter>) -> Self {
        self.handshake = handshake;
        self
    }

    #[must_use]
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// # Errors
    ///
    /// [`GatewayError::InvalidConfiguration`] if a role flag is not a valid header name.
    pub fn build(self) -> Result<SessionGateway> {
        let role_headers = RoleHeaders::new(&self.role_set)
            .map_err(|flag| GatewayError::InvalidConfiguration(format!("role flag '{flag}' cannot be used as a header name")))?;

        let issuer = CredentialIssuer::new(
            Arc::new(CredentialCodec::new(&self.secret)),
            self.role_set.clone(),
            self.ttl,
            self.clock.clone(),
        );

        let directory = match self.directory {
            Some(directory) => directory,
            None => {
                let directory = self
                    .static_users
                    .into_iter()
                    .fold(StaticDirectory::new(self.role_set.clone()), |directory, (principal, groups)| {
                        directory.with_member(principal, groups)
                    });
                Arc::new(directory) as Arc<dyn DirectoryAdapter>
            }
        };

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemorySessionCache::new(self.clock.clone())) as Arc<dyn SessionStore>);

        tracing::info!(
            role_flags = self.role_set.len(),
            own_host = %self.own_host,
            generated_secret = self.secret.is_generated(),
            "Session gateway ready"
        );

        Ok(SessionGateway {
            inner: Arc::new(GatewayInner {
                validator: CredentialValidator::new(issuer.clone(), directory.clone()),
                role_set: self.role_set,
                role_headers,
                issuer,
                store,
                directory,
                handshake: self.handshake,
                trusted_principal: self.trusted_principal,
                own_host: self.own_host,
                verify_failure_status: self.verify_failure_status,
            }),
        })
    }
}
