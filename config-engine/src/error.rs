use error_common::SessionGateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration source could not be read or parsed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Gateway host name could not be resolved: set public_host, CNAME, host_names[environment] or HOSTNAME")]
    UnresolvedHost,
}

impl From<ConfigError> for SessionGateError {
    fn from(err: ConfigError) -> Self {
        SessionGateError::ConfigError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
