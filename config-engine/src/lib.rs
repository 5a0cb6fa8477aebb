//! Configuration for the SessionGate authentication gateway
//!
//! Configuration is loaded once at startup and is read-only afterwards.
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional YAML file
//! 3. environment variables prefixed `SESSIONGATE__`, `__`-separated
//!
//! # Example
//!
//! ```rust
//! let config = config_engine::from_yaml(r#"
//! expires_in_secs: 3600
//! role_flags:
//!   - name: isAdmin
//!     group: "GI RD ADMINISTRATOR"
//!   - name: isViewer
//! public_host: gateway.example.com
//! "#).unwrap();
//!
//! assert_eq!(config.role_flags.len(), 2);
//! assert_eq!(config.trusted_service_principal, "service-brother");
//! ```

pub mod error;
pub mod model;
pub mod providers;
pub mod validation;

pub use error::*;
pub use model::*;
pub use providers::{from_yaml, load, ENV_PREFIX};
