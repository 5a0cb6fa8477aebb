//! SessionGate server
//!
//! Router assembly for the gateway binary. The pipeline stages themselves
//! live in `auth-gateway`; this crate decides which routes run which stage.

use auth_gateway::{attach_roles, authenticate, roles_handler, validate_credential, SessionGateway, SessionMetadata};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{any, get};
use axum::{Extension, Json, Router};
use logger_redacted::TokenRedactor;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

pub use auth_gateway::GatewayError;

/// Gateway with the bundled adapters, built from loaded configuration
///
/// # Errors
///
/// [`GatewayError::InvalidConfiguration`] if the configuration cannot produce a gateway.
pub fn build_gateway(config: &config_engine::GatewayConfig) -> Result<SessionGateway, GatewayError> {
    SessionGateway::from_config(config)
}

/// Create the main application router with all routes and middleware
pub fn create_app(gateway: SessionGateway) -> Router {
    let issuance = Router::new()
        .route("/api/v1/session", get(session))
        .route("/api/v1/roles", get(roles_handler))
        .layer(from_fn_with_state(gateway.clone(), authenticate));

    let verify = Router::new()
        .route("/api/v1/verify", any(no_content))
        .layer(from_fn_with_state(gateway.clone(), validate_credential));

    let refresh = Router::new()
        .route("/api/v1/refresh-roles", any(no_content))
        .layer(from_fn_with_state(gateway.clone(), attach_roles));

    Router::new()
        .route("/health", get(health))
        .merge(issuance)
        .merge(verify)
        .merge(refresh)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            // Query strings may carry credentials
            let uri = TokenRedactor::default().redact(&request.uri().to_string());
            tracing::info_span!("request", method = %request.method(), uri = %uri)
        }))
        .with_state(gateway)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn session(Extension(session): Extension<SessionMetadata>) -> Json<Value> {
    Json(json!({
        "principal": session.principal,
        "authenticated": session.authenticated,
        "roles": session.roles(),
    }))
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}
