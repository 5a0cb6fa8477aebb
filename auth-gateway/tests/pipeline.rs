#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

//! End-to-end tests for the pipeline stages
//!
//! Each test drives an axum router with `oneshot` and inspects status, JSON
//! body, response headers and the session cache.

use async_trait::async_trait;
use auth_gateway::{
    attach_roles, authenticate, roles_handler, validate_credential, GatewayError, HandshakeAdapter, HandshakeError,
    HandshakeVerdict, SessionGateway, SessionMetadata, SessionStore,
};
use auth_identity::{Clock, DirectoryAdapter, DirectoryError, ManualClock, Principal, RoleFlags};
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::{any, get};
use axum::{Extension, Json, Router};
use config_engine::{GatewayConfig, RoleFlagConfig};
use mockall::mock;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const OWN_HOST: &str = "gateway.corp.example";

mock! {
    pub Directory {}

    #[async_trait]
    impl DirectoryAdapter for Directory {
        async fn roles_for(&self, principal: &Principal) -> Result<RoleFlags, DirectoryError>;
    }
}

/// Handshake double with a fixed outcome
struct FixedHandshake(Result<HandshakeVerdict, HandshakeError>);

#[async_trait]
impl HandshakeAdapter for FixedHandshake {
    async fn perform(&self, _headers: &HeaderMap) -> Result<HandshakeVerdict, HandshakeError> {
        self.0.clone()
    }

    fn scheme(&self) -> &str {
        "Negotiate"
    }
}

fn config(extra: &str) -> GatewayConfig {
    let yaml = format!(
        r#"
signing_secret: "pipeline-test-secret"
expires_in_secs: 86400
public_host: {OWN_HOST}
role_flags:
  - name: isAdmin
  - name: isViewer
{extra}
"#
    );
    config_engine::from_yaml(&yaml).unwrap()
}

fn alice_roles() -> RoleFlags {
    RoleFlags::from([("isAdmin", false), ("isViewer", true)])
}

fn directory_returning(roles: RoleFlags, times: usize) -> MockDirectory {
    let mut directory = MockDirectory::new();
    directory
        .expect_roles_for()
        .times(times)
        .returning(move |_| Ok(roles.clone()));
    directory
}

fn gateway(config: &GatewayConfig, directory: MockDirectory, clock: Arc<ManualClock>) -> SessionGateway {
    SessionGateway::builder(config)
        .unwrap()
        .directory(Arc::new(directory))
        .clock(clock)
        .build()
        .unwrap()
}

async fn session_handler(Extension(session): Extension<SessionMetadata>) -> Json<Value> {
    Json(json!({
        "principal": session.principal.as_str(),
        "fromCache": session.from_cache,
    }))
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn app(gateway: SessionGateway) -> Router {
    let issuance = Router::new()
        .route("/session", get(session_handler))
        .route("/roles", get(roles_handler))
        .layer(from_fn_with_state(gateway.clone(), authenticate));
    let verify = Router::new()
        .route("/verify", any(no_content))
        .layer(from_fn_with_state(gateway.clone(), validate_credential));
    let refresh = Router::new()
        .route("/refresh-roles", any(no_content))
        .layer(from_fn_with_state(gateway.clone(), attach_roles));

    issuance.merge(verify).merge(refresh).with_state(gateway)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn handshake_request(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-remote-user", user)
        .body(Body::empty())
        .unwrap()
}

fn verify_request(token: Option<&str>, user: Option<&str>, host: &str) -> Request<Body> {
    let mut builder = Request::builder().uri("/verify").header(header::HOST, host);
    if let Some(token) = token {
        builder = builder.header("x-access-token", token);
    }
    if let Some(user) = user {
        builder = builder.header("auth-user", user);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn header<'a>(response: &'a Response, name: &str) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

#[tokio::test]
async fn issuance_publishes_credential_and_role_headers() {
    let clock = Arc::new(ManualClock::starting_now());
    let gateway = gateway(&config(""), directory_returning(alice_roles(), 1), clock);
    let app = app(gateway.clone());

    let response = send(&app, handshake_request("/session", "CORP\\alice")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "is-authenticated"), "true");
    assert_eq!(header(&response, "auth-user"), "alice");
    assert_eq!(header(&response, "isadmin"), "false");
    assert_eq!(header(&response, "isviewer"), "true");

    let claims = gateway
        .issuer()
        .codec()
        .verify(header(&response, "x-access-token"))
        .unwrap();
    assert_eq!(claims.principal, "alice");
    assert_eq!(claims.roles, alice_roles());

    assert_eq!(json_body(response).await, json!({ "principal": "alice", "fromCache": false }));
}

#[tokio::test]
async fn cache_hit_skips_the_directory() {
    let clock = Arc::new(ManualClock::starting_now());
    let app = app(gateway(&config(""), directory_returning(alice_roles(), 1), clock.clone()));

    let first = send(&app, handshake_request("/session", "alice")).await;
    let first_token = header(&first, "x-access-token").to_string();

    clock.advance(chrono::Duration::hours(1));
    let second = send(&app, handshake_request("/session", "alice")).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header(&second, "x-access-token"), first_token);
    assert_eq!(json_body(second).await["fromCache"], true);
}

#[tokio::test]
async fn expired_cache_entry_is_reissued() {
    let clock = Arc::new(ManualClock::starting_now());
    let app = app(gateway(&config(""), directory_returning(alice_roles(), 2), clock.clone()));

    let first = send(&app, handshake_request("/session", "alice")).await;
    let first_token = header(&first, "x-access-token").to_string();

    clock.advance(chrono::Duration::seconds(86_400));
    let second = send(&app, handshake_request("/session", "alice")).await;
    assert_ne!(header(&second, "x-access-token"), first_token);
    assert_eq!(json_body(second).await["fromCache"], false);
}

#[tokio::test]
async fn revoke_forces_a_directory_read() {
    let clock = Arc::new(ManualClock::starting_now());
    let gateway = gateway(&config(""), directory_returning(alice_roles(), 2), clock);
    let app = app(gateway.clone());
    let alice = Principal::new("alice").unwrap();

    send(&app, handshake_request("/session", "alice")).await;
    gateway.revoke(&alice);
    gateway.revoke(&alice);
    assert!(gateway.session_store().lookup(&alice).is_none());

    let response = send(&app, handshake_request("/session", "alice")).await;
    assert_eq!(json_body(response).await["fromCache"], false);
}

#[tokio::test]
async fn refused_handshake_touches_nothing() {
    let clock = Arc::new(ManualClock::starting_now());
    let app = app(gateway(&config(""), directory_returning(alice_roles(), 0), clock));

    let request = Request::builder().uri("/session?next=%2Fhome").body(Body::empty()).unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(header(&response, "location"), "/session?next=%2Fhome");
    assert_eq!(header(&response, "www-authenticate"), "NTLM");
}

#[tokio::test]
async fn unauthenticated_handshake_clears_the_cache() {
    let clock = Arc::new(ManualClock::starting_now());
    let config = config("");
    let bob = Principal::new("bob").unwrap();

    let gateway = SessionGateway::builder(&config)
        .unwrap()
        .directory(Arc::new(directory_returning(RoleFlags::new(), 0)))
        .handshake(Arc::new(FixedHandshake(Ok(HandshakeVerdict::Unauthenticated(Some(bob.clone()))))))
        .clock(clock)
        .build()
        .unwrap();

    let stale = gateway.issuer().issue(&bob, &RoleFlags::from([("isAdmin", true)])).unwrap();
    gateway.session_store().store(&bob, stale).unwrap();

    let response = send(&app(gateway.clone()), handshake_request("/session", "bob")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(header(&response, "is-authenticated"), "false");
    assert_eq!(header(&response, "isadmin"), "false");
    assert_eq!(header(&response, "isviewer"), "false");
    assert!(response.headers().get("x-access-token").is_none());
    assert_eq!(
        json_body(response).await,
        json!({ "message": "Unauthorized access", "authUser": "bob" })
    );

    assert!(gateway.session_store().lookup(&bob).is_none());
}

#[tokio::test]
async fn directory_failure_is_503_and_caches_nothing() {
    let clock = Arc::new(ManualClock::starting_now());
    let mut directory = MockDirectory::new();
    directory
        .expect_roles_for()
        .times(1)
        .returning(|_| Err(DirectoryError::Unavailable("connection refused".to_string())));
    let gateway = gateway(&config(""), directory, clock);

    let response = send(&app(gateway.clone()), handshake_request("/session", "alice")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(gateway.session_store().lookup(&Principal::new("alice").unwrap()).is_none());
}

#[tokio::test]
async fn issued_credential_validates_until_expiry() {
    let clock = Arc::new(ManualClock::starting_now());
    let app = app(gateway(&config(""), directory_returning(alice_roles(), 2), clock.clone()));

    let issued = send(&app, handshake_request("/session", "alice")).await;
    let token = header(&issued, "x-access-token").to_string();

    clock.advance(chrono::Duration::seconds(1));
    let response = send(&app, verify_request(Some(&token), Some("alice"), "api.corp.example")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(header(&response, "isviewer"), "true");
    assert_eq!(header(&response, "auth-user"), "alice");

    clock.advance(chrono::Duration::seconds(86_399));
    let response = send(&app, verify_request(Some(&token), Some("alice"), "api.corp.example")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await,
        json!({ "auth": false, "message": "Failed to authenticate token. Maybe token is expired." })
    );
}

#[tokio::test]
async fn role_change_rejects_older_credential() {
    let clock = Arc::new(ManualClock::starting_now());
    let mut directory = MockDirectory::new();
    let mut sequence = mockall::Sequence::new();
    directory
        .expect_roles_for()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(alice_roles()));
    directory
        .expect_roles_for()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(RoleFlags::from([("isAdmin", true), ("isViewer", true)])));
    let app = app(gateway(&config(""), directory, clock));

    let issued = send(&app, handshake_request("/session", "alice")).await;
    let token = header(&issued, "x-access-token").to_string();

    let response = send(&app, verify_request(Some(&token), Some("alice"), "api.corp.example:8443")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        json_body(response).await,
        json!({
            "auth": false,
            "message": "No token provided, or incorrect ones.",
            "host": OWN_HOST,
            "origin": "api.corp.example:8443",
            "user": "alice",
        })
    );
}

#[tokio::test]
async fn credential_presented_for_another_user_is_rejected() {
    let clock = Arc::new(ManualClock::starting_now());
    let app = app(gateway(&config(""), directory_returning(alice_roles(), 2), clock));

    let issued = send(&app, handshake_request("/session", "alice")).await;
    let token = header(&issued, "x-access-token").to_string();

    let response = send(&app, verify_request(Some(&token), Some("mallory"), "api.corp.example")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_token_or_user_is_forbidden() {
    let clock = Arc::new(ManualClock::starting_now());
    let app = app(gateway(&config(""), directory_returning(alice_roles(), 0), clock));

    let response = send(&app, verify_request(None, Some("alice"), "api.corp.example")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, verify_request(Some("abc"), None, "api.corp.example")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["user"], Value::Null);
}

#[tokio::test]
async fn tampered_credential_uses_configured_status() {
    let clock = Arc::new(ManualClock::starting_now());
    let app = app(gateway(
        &config("verify_failure_status: legacy"),
        directory_returning(alice_roles(), 1),
        clock,
    ));

    let issued = send(&app, handshake_request("/session", "alice")).await;
    let token = header(&issued, "x-access-token").to_string();
    let (head, signature) = token.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{head}.{flipped}{}", &signature[1..]);

    let response = send(&app, verify_request(Some(&tampered), Some("alice"), "api.corp.example")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["auth"], false);
}

#[tokio::test]
async fn trusted_service_from_own_host_bypasses_validation() {
    let clock = Arc::new(ManualClock::starting_now());
    let app = app(gateway(&config(""), directory_returning(RoleFlags::new(), 0), clock));

    let response = send(
        &app,
        verify_request(None, Some("service-brother"), "Gateway.Corp.Example:8080"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn trusted_service_from_elsewhere_is_validated() {
    let clock = Arc::new(ManualClock::starting_now());
    let app = app(gateway(&config(""), directory_returning(RoleFlags::new(), 0), clock));

    for host in ["api.corp.example", "gateway.corp.example.evil.test"] {
        let response = send(&app, verify_request(None, Some("service-brother"), host)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{host}");
    }
}

#[tokio::test]
async fn role_refresh_requires_a_user() {
    let clock = Arc::new(ManualClock::starting_now());
    let app = app(gateway(&config(""), directory_returning(alice_roles(), 1), clock));

    let request = Request::builder().uri("/refresh-roles").body(Body::empty()).unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({ "message": "Authentication required" }));

    let request = Request::builder()
        .uri("/refresh-roles")
        .header("auth-user", "alice")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(header(&response, "isadmin"), "false");
    assert_eq!(header(&response, "isviewer"), "true");
    assert_eq!(header(&response, "auth-user"), "alice");
    assert!(response.headers().get("x-access-token").is_none());
}

#[tokio::test]
async fn roles_endpoint_returns_fresh_flags() {
    let clock = Arc::new(ManualClock::starting_now());
    let app = app(gateway(&config(""), directory_returning(alice_roles(), 2), clock));

    let response = send(&app, handshake_request("/roles", "alice")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "isAdmin": false, "isViewer": true }));
}

#[tokio::test]
async fn static_directory_from_config() {
    let config = config(
        r#"
directory:
  static_users:
    - principal: alice
      groups: ["isViewer"]
"#,
    );
    let gateway = SessionGateway::from_config(&config).unwrap();
    let app = app(gateway);

    let response = send(&app, handshake_request("/roles", "alice")).await;
    assert_eq!(json_body(response).await, json!({ "isAdmin": false, "isViewer": true }));

    let response = send(&app, handshake_request("/roles", "nobody")).await;
    assert_eq!(json_body(response).await, json!({ "isAdmin": false, "isViewer": false }));
}

#[tokio::test]
async fn clock_is_shared_with_the_cache() {
    let clock = Arc::new(ManualClock::starting_now());
    let gateway = gateway(&config(""), directory_returning(alice_roles(), 1), clock.clone());
    let alice = Principal::new("alice").unwrap();

    send(&app(gateway.clone()), handshake_request("/session", "alice")).await;
    let cached = gateway.session_store().lookup(&alice).unwrap();
    assert_eq!(cached.expires_at(), clock.now() + chrono::Duration::seconds(86_400));
}

#[tokio::test]
async fn role_flag_shadowing_a_session_header_is_refused() {
    for name in ["Auth-User", "x-access-token", "Is-Authenticated"] {
        let mut config = config("");
        config.role_flags.push(RoleFlagConfig {
            name: name.to_string(),
            group: None,
        });

        let built = SessionGateway::builder(&config).and_then(|builder| {
            builder
                .directory(Arc::new(directory_returning(RoleFlags::new(), 0)))
                .build()
        });
        assert!(matches!(built, Err(GatewayError::InvalidConfiguration(_))), "{name}");
    }
}

#[tokio::test]
async fn excessive_expiry_is_refused() {
    let mut config = config("");
    config.expires_in_secs = u64::MAX;
    assert!(matches!(
        SessionGateway::builder(&config),
        Err(GatewayError::InvalidConfiguration(_))
    ));
}
