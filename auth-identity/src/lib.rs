//! Identity and credential primitives for SessionGate
//!
//! This crate provides the pieces the gateway builds its session lifecycle on:
//! - Principals, role flag sets, and role flag values
//! - Signed, time-bounded credentials (HS256 JWT)
//! - Credential issuance against an injectable clock
//! - The directory adapter seam and a static directory
//!
//! # Example
//!
//! ```rust
//! use auth_identity::{
//!     CredentialCodec, CredentialIssuer, Principal, RoleFlagSet, RoleFlags, SigningSecret,
//!     SystemClock,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let secret = SigningSecret::generate();
//!     let issuer = CredentialIssuer::new(
//!         Arc::new(CredentialCodec::new(&secret)),
//!         Arc::new(RoleFlagSet::from_names(["isAdmin", "isViewer"])?),
//!         chrono::Duration::hours(24),
//!         Arc::new(SystemClock),
//!     );
//!
//!     let alice = Principal::new("alice")?;
//!     let credential = issuer.issue(&alice, &RoleFlags::from([("isViewer", true)]))?;
//!     assert_eq!(credential.principal(), "alice");
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod credential;
pub mod directory;
pub mod error;
pub mod issuer;
pub mod models;
pub mod secret;

pub use clock::*;
pub use credential::*;
pub use directory::*;
pub use error::*;
pub use issuer::*;
pub use models::*;
pub use secret::*;
