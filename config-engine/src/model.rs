use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Default credential lifetime: 24 hours
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 86_400;

/// Longest credential lifetime accepted, one year
pub const MAX_EXPIRES_IN_SECS: u64 = 365 * 86_400;

/// Default trusted east-west caller
pub const DEFAULT_TRUSTED_SERVICE_PRINCIPAL: &str = "service-brother";

/// Complete gateway configuration, read-only after startup
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Shared HMAC secret for credentials; generated per process when absent
    #[serde(default)]
    pub signing_secret: Option<SecretString>,

    /// Credential lifetime in seconds
    #[serde(default = "default_expires_in_secs")]
    pub expires_in_secs: u64,

    /// Recognised role flags and the directory group each one maps to
    pub role_flags: Vec<RoleFlagConfig>,

    /// Service identity allowed to skip validation when calling from our own host
    #[serde(default = "default_trusted_service_principal")]
    pub trusted_service_principal: String,

    /// Deployment environment key into `host_names` (e.g. DEV, QA, PROD)
    #[serde(default)]
    pub environment: Option<String>,

    /// Public host name per environment
    #[serde(default)]
    pub host_names: BTreeMap<String, String>,

    /// Explicit host name, overrides everything else
    #[serde(default)]
    pub public_host: Option<String>,

    #[serde(default)]
    pub handshake: HandshakeConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,

    /// HTTP status for expired or badly signed credentials
    #[serde(default)]
    pub verify_failure_status: VerifyFailureStatus,

    #[serde(default)]
    pub listen: ListenConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleFlagConfig {
    /// Claim and response header name, e.g. `isAdmin`
    pub name: String,
    /// Directory group granting the flag; defaults to the flag name
    #[serde(default)]
    pub group: Option<String>,
}

/// Settings for the trusted-header handshake adapter
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Header carrying the principal authenticated by the fronting proxy
    pub user_header: String,
    /// Reduce `DOMAIN\user` and `user@REALM` to `user`
    pub strip_domain: bool,
    /// Scheme advertised in `WWW-Authenticate` on forbidden handshakes
    pub scheme: String,
    /// Per-request handshake debug events
    pub debug: bool,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            user_header: "x-remote-user".to_string(),
            strip_domain: true,
            scheme: "NTLM".to_string(),
            debug: false,
        }
    }
}

/// Directory connection parameters
///
/// The connection fields are carried for external directory adapters; the
/// bundled static directory only reads `static_users`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub url: Option<String>,
    pub domain: Option<String>,
    pub base_dn: Option<String>,
    pub bind_user: Option<String>,
    pub bind_password: Option<SecretString>,
    pub static_users: Vec<StaticUserConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticUserConfig {
    pub principal: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyFailureStatus {
    /// 401, an authentication failure
    #[default]
    Unauthorized,
    /// 500, what older clients of the gateway expect
    Legacy,
}

impl VerifyFailureStatus {
    pub fn status_code(self) -> u16 {
        match self {
            VerifyFailureStatus::Unauthorized => 401,
            VerifyFailureStatus::Legacy => 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

fn default_expires_in_secs() -> u64 {
    DEFAULT_EXPIRES_IN_SECS
}

fn default_trusted_service_principal() -> String {
    DEFAULT_TRUSTED_SERVICE_PRINCIPAL.to_string()
}

impl GatewayConfig {
    pub fn expires_in(&self) -> Duration {
        Duration::from_secs(self.expires_in_secs)
    }

    /// Role flags as `(name, group)` pairs, group defaulting to the name
    pub fn role_flag_groups(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.role_flags.iter().map(|flag| {
            let group = flag.group.clone().unwrap_or_else(|| flag.name.clone());
            (flag.name.clone(), group)
        })
    }

    /// Resolve this gateway's own host name from the process environment
    ///
    /// # Errors
    ///
    /// [`crate::ConfigError::UnresolvedHost`] when no source yields a name.
    pub fn resolve_own_host(&self) -> crate::Result<String> {
        self.resolve_own_host_with(|key| std::env::var(key).ok())
    }

    /// Resolution order: `public_host`, `CNAME`, `host_names[environment]`, `HOSTNAME`
    ///
    /// # Errors
    ///
    /// [`crate::ConfigError::UnresolvedHost`] when no source yields a name.
    pub fn resolve_own_host_with<F>(&self, env: F) -> crate::Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        non_empty(self.public_host.clone())
            .or_else(|| non_empty(env("CNAME")))
            .or_else(|| non_empty(self.environment_host()))
            .or_else(|| non_empty(env("HOSTNAME")))
            .ok_or(crate::ConfigError::UnresolvedHost)
    }

    fn environment_host(&self) -> Option<String> {
        let environment = self.environment.as_deref()?;
        self.host_names
            .iter()
            .find(|(env, _)| env.eq_ignore_ascii_case(environment))
            .map(|(_, host)| host.clone())
    }
}
