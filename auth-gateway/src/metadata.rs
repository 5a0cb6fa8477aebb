use auth_identity::{Credential, Principal, RoleFlagSet, RoleFlags};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Bearer credential, on responses from the issuance stage and requests to the validation stage
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";
pub const IS_AUTHENTICATED_HEADER: &str = "is-authenticated";
/// Authenticated principal
pub const AUTH_USER_HEADER: &str = "auth-user";

const SESSION_HEADERS: [&str; 3] = [ACCESS_TOKEN_HEADER, IS_AUTHENTICATED_HEADER, AUTH_USER_HEADER];

/// Session established by the issuance stage, readable by downstream handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    pub principal: Principal,
    pub credential: Credential,
    pub authenticated: bool,
    /// Served from the session cache without a directory lookup
    pub from_cache: bool,
}

impl SessionMetadata {
    pub fn roles(&self) -> &RoleFlags {
        self.credential.roles()
    }
}

/// One response header per recognised role flag, named by the lower-cased flag
#[derive(Debug, Clone)]
pub struct RoleHeaders {
    headers: Vec<(String, HeaderName)>,
}

impl RoleHeaders {
    /// # Errors
    ///
    /// The offending flag name when it is not a valid header name or would
    /// overwrite one of the session headers.
    pub fn new(role_set: &RoleFlagSet) -> Result<Self, String> {
        let headers = role_set
            .names()
            .map(|flag| {
                HeaderName::from_bytes(flag.to_ascii_lowercase().as_bytes())
                    .ok()
                    .filter(|header| !SESSION_HEADERS.contains(&header.as_str()))
                    .map(|header| (flag.to_string(), header))
                    .ok_or_else(|| flag.to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { headers })
    }

    pub fn names(&self) -> impl Iterator<Item = &HeaderName> {
        self.headers.iter().map(|(_, header)| header)
    }

    /// Write every flag, absent ones as `false`
    pub fn apply(&self, headers: &mut HeaderMap, roles: &RoleFlags) {
        for (flag, header) in &self.headers {
            headers.insert(header.clone(), bool_value(roles.is_set(flag)));
        }
    }

    pub fn clear(&self, headers: &mut HeaderMap) {
        self.apply(headers, &RoleFlags::new());
    }
}

pub(crate) fn bool_value(value: bool) -> HeaderValue {
    HeaderValue::from_static(if value { "true" } else { "false" })
}

/// Set `auth-user`, skipping names that cannot travel in a header
pub(crate) fn set_auth_user(headers: &mut HeaderMap, principal: &Principal) {
    match HeaderValue::from_str(principal.as_str()) {
        Ok(value) => {
            headers.insert(AUTH_USER_HEADER, value);
        }
        Err(_) => tracing::warn!(principal = %principal, "Principal cannot be sent as a header value"),
    }
}

pub(crate) fn set_session_headers(headers: &mut HeaderMap, session: &SessionMetadata, roles: &RoleHeaders) {
    if let Ok(token) = HeaderValue::from_str(session.credential.token()) {
        headers.insert(ACCESS_TOKEN_HEADER, token);
    }
    headers.insert(IS_AUTHENTICATED_HEADER, bool_value(session.authenticated));
    set_auth_user(headers, &session.principal);
    roles.apply(headers, session.roles());
}
