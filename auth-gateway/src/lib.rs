//! Session gateway for SessionGate
//!
//! Turns a domain handshake into a short-lived signed credential and checks
//! that credential on later hops:
//!
//! - Session cache keyed by principal, so repeat traffic skips the directory
//! - Credential validation against a fresh directory read
//! - Handshake adapter seam with a trusted-header implementation
//! - Pipeline stages as axum middleware
//!
//! # Example
//!
//! ```rust,no_run
//! use auth_gateway::{authenticate, roles_handler, SessionGateway};
//! use axum::{middleware, routing::get, Router};
//!
//! fn app(config: &config_engine::GatewayConfig) -> Result<Router, auth_gateway::GatewayError> {
//!     let gateway = SessionGateway::from_config(config)?;
//!
//!     Ok(Router::new()
//!         .route("/roles", get(roles_handler))
//!         .layer(middleware::from_fn_with_state(gateway.clone(), authenticate))
//!         .with_state(gateway))
//! }
//! ```

pub mod cache;
pub mod error;
pub mod gateway;
pub mod handshake;
pub mod metadata;
pub mod pipeline;
pub mod validator;

pub use cache::*;
pub use error::*;
pub use gateway::*;
pub use handshake::*;
pub use metadata::*;
pub use pipeline::*;
pub use validator::*;
