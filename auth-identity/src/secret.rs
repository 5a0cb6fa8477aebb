use rand::RngCore;
use secrecy::{ExposeSecret, SecretString, SecretVec};

/// Length of a generated secret, in bytes
pub const GENERATED_SECRET_LEN: usize = 256;

/// Shared HMAC secret for signing and verifying credentials
///
/// When no secret is configured one is generated at startup and held only in
/// memory: every credential issued before a restart stops verifying after it.
pub struct SigningSecret {
    bytes: SecretVec<u8>,
    generated: bool,
}

impl SigningSecret {
    pub fn from_passphrase(passphrase: &SecretString) -> Self {
        Self {
            bytes: SecretVec::new(passphrase.expose_secret().as_bytes().to_vec()),
            generated: false,
        }
    }

    pub fn generate() -> Self {
        let mut bytes = vec![0u8; GENERATED_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            bytes: SecretVec::new(bytes),
            generated: true,
        }
    }

    /// Use the configured passphrase, or generate a process-lifetime secret
    pub fn from_config(passphrase: Option<&SecretString>) -> Self {
        match passphrase {
            Some(passphrase) if !passphrase.expose_secret().is_empty() => Self::from_passphrase(passphrase),
            _ => {
                tracing::warn!(
                    "No signing secret configured; generated one for this process. \
                     Credentials issued before a restart will not verify after it"
                );
                Self::generate()
            }
        }
    }

    /// Whether this secret was generated rather than configured
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub(crate) fn expose(&self) -> &[u8] {
        self.bytes.expose_secret()
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecret")
            .field("bytes", &"[REDACTED]")
            .field("generated", &self.generated)
            .finish()
    }
}
