//! Domain handshake seam
//!
//! The handshake itself (NTLM/Kerberos negotiation) happens in front of the
//! gateway. Adapters turn its outcome into a verdict for the pipeline.

use async_trait::async_trait;
use auth_identity::Principal;
use axum::http::{HeaderMap, HeaderName};
use thiserror::Error;

/// Outcome of a completed handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeVerdict {
    Authenticated(Principal),
    /// The exchange finished without authenticating; the principal is known when the client named one
    Unauthenticated(Option<Principal>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// Refused outright; no cache or directory work may follow
    #[error("Handshake refused")]
    Forbidden,
}

/// Performs the domain authentication exchange for one request
#[async_trait]
pub trait HandshakeAdapter: Send + Sync {
    async fn perform(&self, headers: &HeaderMap) -> Result<HandshakeVerdict, HandshakeError>;

    /// Value for `WWW-Authenticate` when the handshake is refused
    fn scheme(&self) -> &str;
}

/// Trusts a user header set by an authenticating reverse proxy
///
/// A missing header means the proxy never ran the handshake and is refused.
/// An empty header means the handshake completed without a user.
#[derive(Debug, Clone)]
pub struct TrustedHeaderHandshake {
    header: HeaderName,
    strip_domain: bool,
    scheme: String,
    debug: bool,
}

impl TrustedHeaderHandshake {
    pub fn new(header: HeaderName, scheme: impl Into<String>) -> Self {
        Self {
            header,
            strip_domain: true,
            scheme: scheme.into(),
            debug: false,
        }
    }

    #[must_use]
    pub fn strip_domain(mut self, strip: bool) -> Self {
        self.strip_domain = strip;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// `DOMAIN\user` and `user@REALM` become `user`
    fn user_name<'a>(&self, raw: &'a str) -> &'a str {
        let raw = raw.trim();
        if !self.strip_domain {
            return raw;
        }
        let raw = raw.rsplit_once('\\').map_or(raw, |(_, user)| user);
        raw.split_once('@').map_or(raw, |(user, _)| user)
    }
}

#[async_trait]
impl HandshakeAdapter for TrustedHeaderHandshake {
    async fn perform(&self, headers: &HeaderMap) -> Result<HandshakeVerdict, HandshakeError> {
        let Some(value) = headers.get(&self.header) else {
            if self.debug {
                tracing::debug!(header = %self.header, "Handshake header missing");
            }
            return Err(HandshakeError::Forbidden);
        };

        let principal = value
            .to_str()
            .ok()
            .map(|raw| self.user_name(raw))
            .and_then(|name| Principal::new(name).ok());

        if self.debug {
            tracing::debug!(
                header = %self.header,
                principal = ?principal.as_ref().map(Principal::as_str),
                "Handshake header read"
            );
        }

        Ok(match principal {
            Some(principal) => HandshakeVerdict::Authenticated(principal),
            None => HandshakeVerdict::Unauthenticated(None),
        })
    }

    fn scheme(&self) -> &str {
        &self.scheme
    }
}
