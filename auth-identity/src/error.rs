use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Principal must not be empty")]
    EmptyPrincipal,

    #[error("Invalid role flag set: {0}")]
    InvalidRoleFlagSet(String),

    #[error("Credential signing failed: {0}")]
    Signing(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Credential expiry is outside the representable time range")]
    ExpiryOutOfRange,
}

pub type Result<T> = std::result::Result<T, IdentityError>;
