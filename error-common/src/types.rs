use thiserror::Error;

/// Startup and process-level failures
#[derive(Error, Debug)]
pub enum SessionGateError {
    /// Network communication errors (bind, accept)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server runtime errors
    #[error("Server error: {0}")]
    ServerError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Logging/tracing initialisation errors
    #[error("Logging error: {0}")]
    LoggingError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SessionGateError {
    /// Short machine-readable category, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            SessionGateError::NetworkError(_) => "network",
            SessionGateError::ServerError(_) => "server",
            SessionGateError::ConfigError(_) => "config",
            SessionGateError::LoggingError(_) => "logging",
            SessionGateError::Other(_) => "other",
        }
    }
}

/// Result type alias for SessionGate startup operations
pub type Result<T> = std::result::Result<T, SessionGateError>;

/// Async logging function for errors
pub async fn log_error(context: &str, error: &SessionGateError) {
    tracing::error!(
        context = context,
        kind = error.kind(),
        error = %error,
        "SessionGate error occurred"
    );
}
