//! Logging for the authentication gateway
//!
//! Credentials issued and validated by the gateway are bearer tokens: anyone
//! holding one is the principal until it expires. They must therefore never
//! appear in logs. This crate provides the subscriber setup used by the
//! gateway binary and the helpers that keep tokens out of log lines:
//!
//! - [`fingerprint`]: short digest of a token for correlating log lines
//! - [`TokenRedactor`]: masks JWT-shaped strings and `Bearer` values in free text
//! - [`init_tracing`]: `EnvFilter` + human-readable or JSON formatter
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{fingerprint, TokenRedactor};
//!
//! let token = "eyJhbGciOiJIUzI1NiJ9.eyJpZCI6ImFsaWNlIn0.c2ln";
//! tracing::info!(credential = %fingerprint(token), "credential issued");
//!
//! let line = TokenRedactor::default().redact(&format!("presented {token}"));
//! assert!(!line.contains(token));
//! ```

pub mod config;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use thiserror::Error;
use tracing_subscriber::{fmt, fmt::time::ChronoUtc, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Tracing subscriber already initialised or failed to install: {0}")]
    Init(String),
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.default_filter`.
///
/// # Errors
///
/// Returns [`LoggerError::Init`] if a global subscriber is already set.
pub fn init_tracing(config: &LoggerConfig) -> Result<(), LoggerError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let result = if config.json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(config.with_source)
                    .with_line_number(config.with_source)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .try_init()
    };

    result.map_err(|e| LoggerError::Init(e.to_string()))
}
