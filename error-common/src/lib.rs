//! Common error handling utilities for SessionGate
//!
//! Process-level error type shared by the gateway binary and its startup
//! path (configuration loading, tracing setup, listener binding). Request
//! level failures are modelled closer to where they happen, in
//! `auth-identity` and `auth-gateway`, and never travel through this type.
//!
//! # Example
//!
//! ```rust
//! use error_common::{SessionGateError, Result};
//!
//! fn bind_port(raw: &str) -> Result<u16> {
//!     raw.parse()
//!         .map_err(|_| SessionGateError::ConfigError(format!("invalid port: {raw}")))
//! }
//!
//! assert!(bind_port("8080").is_ok());
//! assert!(bind_port("http").is_err());
//! ```

pub mod types;

pub use types::*;
