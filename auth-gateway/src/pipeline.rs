//! Gateway pipeline stages as axum middleware
//!
//! - [`authenticate`]: handshake, then a cached or freshly issued credential
//! - [`validate_credential`]: checks a credential presented by an upstream hop
//! - [`attach_roles`]: re-reads role flags for an already authenticated principal
//!
//! Each stage is mounted with `axum::middleware::from_fn_with_state` and a
//! [`SessionGateway`] as state.

use crate::error::{GatewayError, Result};
use crate::gateway::SessionGateway;
use crate::handshake::{HandshakeError, HandshakeVerdict};
use crate::metadata::{
    bool_value, set_auth_user, set_session_headers, SessionMetadata, ACCESS_TOKEN_HEADER, AUTH_USER_HEADER,
    IS_AUTHENTICATED_HEADER,
};
use crate::validator::ValidationError;
use auth_identity::{Principal, RoleFlags};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use logger_redacted::fingerprint;

/// Issuance stage
///
/// Runs the handshake, reuses a live cached credential or issues a new one
/// from the directory, and publishes the session on the response headers and
/// as a [`SessionMetadata`] request extension.
///
/// # Errors
///
/// Refused handshakes, failed handshakes, directory and issuance failures.
pub async fn authenticate(State(gateway): State<SessionGateway>, request: Request, next: Next) -> Result<Response> {
    if request
        .extensions()
        .get::<SessionMetadata>()
        .is_some_and(|session| session.authenticated)
    {
        return Ok(next.run(request).await);
    }

    let inner = gateway.inner();
    let (mut parts, body) = request.into_parts();

    let verdict = match inner.handshake.perform(&parts.headers).await {
        Ok(verdict) => verdict,
        Err(HandshakeError::Forbidden) => {
            tracing::debug!(uri = %parts.uri, "Handshake refused");
            return Err(GatewayError::Forbidden {
                location: parts.uri.to_string(),
                scheme: inner.handshake.scheme().to_string(),
            });
        }
    };

    let principal = match verdict {
        HandshakeVerdict::Authenticated(principal) => principal,
        HandshakeVerdict::Unauthenticated(principal) => {
            if let Some(principal) = &principal {
                inner.store.invalidate(principal);
            }
            tracing::info!(
                principal = ?principal.as_ref().map(Principal::as_str),
                "Handshake did not authenticate"
            );

            let mut response = GatewayError::Unauthenticated { principal }.into_response();
            let headers = response.headers_mut();
            inner.role_headers.clear(headers);
            headers.insert(IS_AUTHENTICATED_HEADER, bool_value(false));
            return Ok(response);
        }
    };

    let session = match inner.store.lookup(&principal) {
        Some(credential) => SessionMetadata {
            principal,
            credential,
            authenticated: true,
            from_cache: true,
        },
        None => {
            let roles = inner.directory.roles_for(&principal).await?;
            let credential = inner.issuer.issue(&principal, &roles)?;
            inner.store.store(&principal, credential.clone())?;
            SessionMetadata {
                principal,
                credential,
                authenticated: true,
                from_cache: false,
            }
        }
    };

    tracing::debug!(
        principal = %session.principal,
        from_cache = session.from_cache,
        token = %fingerprint(session.credential.token()),
        "Session established"
    );

    parts.extensions.insert(session.clone());
    let mut response = next.run(Request::from_parts(parts, body)).await;
    set_session_headers(response.headers_mut(), &session, &inner.role_headers);
    Ok(response)
}

/// Validation stage for credentials presented on later hops
///
/// The trusted service principal passes without validation when the request's
/// `Host` is this gateway. Everyone else must present a credential that
/// matches a fresh directory read.
///
/// # Errors
///
/// [`GatewayError::CredentialMismatch`], [`GatewayError::VerificationFailed`],
/// or [`GatewayError::DirectoryUnavailable`].
pub async fn validate_credential(
    State(gateway): State<SessionGateway>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let inner = gateway.inner();
    let headers = request.headers();
    let token = header_str(headers, ACCESS_TOKEN_HEADER).map(str::to_string);
    let user = header_str(headers, AUTH_USER_HEADER).map(str::to_string);
    let origin = header_str(headers, header::HOST.as_str()).map(str::to_string);
    let principal = user.as_deref().and_then(|user| Principal::new(user).ok());

    if principal.as_ref() == Some(&inner.trusted_principal)
        && origin.as_deref().is_some_and(|origin| same_host(origin, &inner.own_host))
    {
        tracing::debug!(principal = %inner.trusted_principal, "Trusted service call");
        return Ok(next.run(request).await);
    }

    let result = match &principal {
        Some(principal) => inner.validator.validate(token.as_deref(), principal).await,
        None => Err(ValidationError::PrincipalMissing),
    };

    match result {
        Ok(validated) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            inner.role_headers.apply(headers, &validated.fresh_roles);
            if let Some(principal) = &principal {
                set_auth_user(headers, principal);
            }
            Ok(response)
        }
        Err(reason) => {
            tracing::warn!(
                user = ?user,
                origin = ?origin,
                reason = reason.reason(),
                token = ?token.as_deref().map(fingerprint),
                "Credential rejected"
            );
            Err(match reason {
                ValidationError::DirectoryUnavailable(err) => GatewayError::DirectoryUnavailable(err),
                ValidationError::Reference(err) => GatewayError::Issuance(err),
                ValidationError::TokenExpired | ValidationError::TokenSignatureInvalid => {
                    GatewayError::VerificationFailed {
                        reason,
                        status: inner.verify_failure_status,
                    }
                }
                ValidationError::TokenMissing | ValidationError::PrincipalMissing | ValidationError::TokenStaleClaims => {
                    GatewayError::CredentialMismatch {
                        reason,
                        host: inner.own_host.clone(),
                        origin,
                        user,
                    }
                }
            })
        }
    }
}

/// Role-refresh stage
///
/// Publishes the current role flags of the `auth-user` principal without
/// issuing a credential. The flags are also inserted as a [`RoleFlags`]
/// request extension.
///
/// # Errors
///
/// [`GatewayError::AuthenticationRequired`] without an `auth-user` header, or
/// [`GatewayError::DirectoryUnavailable`].
pub async fn attach_roles(State(gateway): State<SessionGateway>, mut request: Request, next: Next) -> Result<Response> {
    let inner = gateway.inner();
    let principal = header_str(request.headers(), AUTH_USER_HEADER)
        .and_then(|user| Principal::new(user).ok())
        .ok_or(GatewayError::AuthenticationRequired)?;

    let roles = inner.role_set.complete(&inner.directory.roles_for(&principal).await?);
    request.extensions_mut().insert(roles.clone());

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    inner.role_headers.apply(headers, &roles);
    set_auth_user(headers, &principal);
    Ok(response)
}

/// Current role flags as `{flag: bool}`
///
/// The principal comes from the issuance stage when it ran, otherwise from the
/// `auth-user` header.
///
/// # Errors
///
/// [`GatewayError::AuthenticationRequired`] without a principal, or
/// [`GatewayError::DirectoryUnavailable`].
pub async fn roles_handler(
    State(gateway): State<SessionGateway>,
    session: Option<Extension<SessionMetadata>>,
    headers: HeaderMap,
) -> Result<Json<RoleFlags>> {
    let inner = gateway.inner();
    let principal = session
        .map(|Extension(session)| session.principal)
        .or_else(|| header_str(&headers, AUTH_USER_HEADER).and_then(|user| Principal::new(user).ok()))
        .ok_or(GatewayError::AuthenticationRequired)?;

    let roles = inner.directory.roles_for(&principal).await?;
    Ok(Json(inner.role_set.complete(&roles)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Host names equal once ports are dropped, ignoring ASCII case
fn same_host(origin: &str, own_host: &str) -> bool {
    strip_port(origin).eq_ignore_ascii_case(strip_port(own_host))
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.split_once(']').map_or(host, |(addr, _)| addr.trim_start_matches('['));
    }
    // Bare IPv6 address
    if host.matches(':').count() > 1 {
        return host;
    }
    host.split_once(':').map_or(host, |(name, _)| name)
}
