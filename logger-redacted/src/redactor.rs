use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    // header.payload.signature, base64url segments; the signature may be empty for `alg: none`
    static ref JWT_REGEX: Regex = compile(r"\beyJ[A-Za-z0-9_-]*\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*");
    static ref BEARER_REGEX: Regex = compile(r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+");
}

// Only ever called with the literal patterns above.
#[allow(clippy::unwrap_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

/// Short, stable digest of a credential for log correlation
///
/// Two log lines mentioning the same credential carry the same fingerprint,
/// but the fingerprint cannot be replayed as a credential.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let digest = hasher.finalize();
    general_purpose::URL_SAFE_NO_PAD.encode(digest.get(..9).unwrap_or_default())
}

/// Redaction switches
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_jwts: bool,
    pub redact_bearer_values: bool,
    /// Replace with a fingerprint instead of a fixed mask
    pub hash_for_correlation: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_jwts: true,
            redact_bearer_values: true,
            hash_for_correlation: true,
        }
    }
}

/// Masks credentials embedded in free text before it is logged
#[derive(Debug, Clone, Default)]
pub struct TokenRedactor {
    config: RedactionConfig,
}

impl TokenRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_bearer_values {
            result = BEARER_REGEX
                .replace_all(&result, |caps: &regex::Captures| {
                    let value = caps.get(0).map_or("", |m| m.as_str());
                    format!("Bearer {}", self.mask("TOKEN", value))
                })
                .to_string();
        }

        if self.config.redact_jwts {
            result = JWT_REGEX
                .replace_all(&result, |caps: &regex::Captures| {
                    let value = caps.get(0).map_or("", |m| m.as_str());
                    self.mask("JWT", value)
                })
                .to_string();
        }

        result
    }

    fn mask(&self, label: &str, value: &str) -> String {
        if self.config.hash_for_correlation {
            format!("{label}[{}]", fingerprint(value))
        } else {
            format!("{label}[REDACTED]")
        }
    }
}
