// Configuration validation
use crate::error::{ConfigError, Result};
use crate::model::{GatewayConfig, MAX_EXPIRES_IN_SECS};
use std::collections::BTreeSet;

/// Check the invariants the gateway relies on at runtime
///
/// # Errors
///
/// [`ConfigError::ValidationError`] naming the first violated rule.
pub fn validate(config: &GatewayConfig) -> Result<()> {
    if config.expires_in_secs == 0 {
        return Err(invalid("expires_in_secs must be greater than zero"));
    }

    if config.expires_in_secs > MAX_EXPIRES_IN_SECS {
        return Err(invalid(format!(
            "expires_in_secs must not exceed {MAX_EXPIRES_IN_SECS}"
        )));
    }

    if config.role_flags.is_empty() {
        return Err(invalid("role_flags must name at least one flag"));
    }

    let mut seen = BTreeSet::new();
    for flag in &config.role_flags {
        if !is_header_token(&flag.name) {
            return Err(invalid(format!(
                "role flag '{}' is not a valid HTTP header name",
                flag.name
            )));
        }
        if is_reserved_claim(&flag.name) {
            return Err(invalid(format!(
                "role flag '{}' collides with a credential claim",
                flag.name
            )));
        }
        if is_session_header(&flag.name) || flag.name.eq_ignore_ascii_case(&config.handshake.user_header) {
            return Err(invalid(format!(
                "role flag '{}' collides with a session metadata header",
                flag.name
            )));
        }
        if !seen.insert(flag.name.to_ascii_lowercase()) {
            return Err(invalid(format!("role flag '{}' is declared twice", flag.name)));
        }
    }

    if config.trusted_service_principal.trim().is_empty() {
        return Err(invalid("trusted_service_principal must not be empty"));
    }

    if config.handshake.user_header.trim().is_empty() || !is_header_token(&config.handshake.user_header) {
        return Err(invalid("handshake.user_header must be a valid HTTP header name"));
    }

    for user in &config.directory.static_users {
        if user.principal.trim().is_empty() {
            return Err(invalid("directory.static_users entries need a principal"));
        }
    }

    Ok(())
}

/// RFC 9110 `token`: one or more tchar
fn is_header_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
                )
        })
}

fn is_reserved_claim(name: &str) -> bool {
    matches!(name, "id" | "iat" | "exp" | "jti")
}

/// Headers the gateway writes itself; role headers must not shadow them
const SESSION_HEADERS: [&str; 3] = ["x-access-token", "is-authenticated", "auth-user"];

fn is_session_header(name: &str) -> bool {
    SESSION_HEADERS.iter().any(|header| header.eq_ignore_ascii_case(name))
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}
