// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end behaviour of the filter through the public API: what ends up in
//! the request context and what gets logged.

use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Request, StatusCode},
    routing::get,
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use token_context::{
    token_context_middleware, Claims, ConfigurationError, FilterConfiguration, TokenContext,
    TokenContextFilter, VerificationError, VerifyOptions,
};
use tower::ServiceExt;
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer,
};

const SECRET: &str = "test-secret";

// ---------------------------------------------------------------------------
// Log collector
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct WarnCollector {
    messages: Arc<Mutex<Vec<String>>>,
}

impl<S: Subscriber> Layer<S> for WarnCollector {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.messages.lock().expect("lock poisoned").push(visitor.0);
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// Apply `filter` to a request carrying `authorization`; return the context
/// and every WARN message emitted meanwhile.
fn run_filter(filter: &TokenContextFilter, authorization: Option<&str>) -> (TokenContext, Vec<String>) {
    let collector = WarnCollector::default();
    let messages = Arc::clone(&collector.messages);
    let subscriber = tracing_subscriber::registry().with(collector);

    let mut builder = Request::builder().uri("/");
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    let mut request = builder.body(()).expect("valid request");

    tracing::subscriber::with_default(subscriber, || filter.apply(&mut request));

    let ctx = request
        .extensions()
        .get::<TokenContext>()
        .cloned()
        .expect("context is never left unset");
    let warnings = messages.lock().expect("lock poisoned").clone();
    (ctx, warnings)
}

fn sign(payload: Value, secret: &str) -> String {
    encode(
        &Header::default(),
        &payload,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("signing should succeed")
}

fn now() -> i64 {
    Utc::now().timestamp()
}

fn filter_with(options: VerifyOptions) -> TokenContextFilter {
    TokenContextFilter::new(FilterConfiguration::new(SECRET).with_options(options))
        .expect("valid configuration")
}

fn default_filter() -> TokenContextFilter {
    filter_with(VerifyOptions::default())
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

// ---------------------------------------------------------------------------
// Initialization
// ---------------------------------------------------------------------------

#[test]
fn empty_secret_fails_construction() {
    let err = TokenContextFilter::new(FilterConfiguration::new("")).unwrap_err();
    assert_eq!(err, ConfigurationError::EmptySecret);
    assert_eq!(err.to_string(), "JWT secret cannot be empty");
}

#[test]
fn extra_verify_options_are_honoured() {
    let token = sign(json!({ "data": "test", "aud": "test-audience" }), SECRET);
    let filter = filter_with(VerifyOptions::default().with_audience("test-audience"));

    let (ctx, warnings) = run_filter(&filter, Some(&bearer(&token)));
    assert!(ctx.is_verified());
    assert!(warnings.is_empty());
}

#[test]
fn wrong_audience_is_rejected() {
    let token = sign(json!({ "data": "test", "aud": "wrong-audience" }), SECRET);
    let filter = filter_with(VerifyOptions::default().with_audience("test-audience"));

    let (ctx, warnings) = run_filter(&filter, Some(&bearer(&token)));
    assert_eq!(ctx, TokenContext::empty());
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("JWT validation failed: jwt audience invalid"));
}

// ---------------------------------------------------------------------------
// Token extraction
// ---------------------------------------------------------------------------

#[test]
fn no_authorization_header() {
    let (ctx, warnings) = run_filter(&default_filter(), None);
    assert_eq!(ctx, TokenContext::empty());
    assert!(warnings.is_empty());
}

#[test]
fn non_bearer_authorization_header() {
    let (ctx, warnings) = run_filter(&default_filter(), Some("Basic some-token"));
    assert_eq!(ctx, TokenContext::empty());
    assert!(warnings.is_empty());
}

// ---------------------------------------------------------------------------
// Token validation
// ---------------------------------------------------------------------------

#[test]
fn valid_token_exposes_payload() {
    let token = sign(json!({ "userId": "123", "role": "admin" }), SECRET);
    let (ctx, warnings) = run_filter(&default_filter(), Some(&bearer(&token)));

    let claims = ctx.claims().expect("verified");
    assert_eq!(claims.get("userId"), Some(&json!("123")));
    assert_eq!(claims.get("role"), Some(&json!("admin")));
    assert!(warnings.is_empty());
}

#[test]
fn invalid_token_is_logged() {
    let (ctx, warnings) = run_filter(&default_filter(), Some("Bearer invalid-token"));
    assert_eq!(ctx, TokenContext::empty());
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("JWT validation failed:"));
}

#[test]
fn token_signed_with_other_secret() {
    let token = sign(json!({ "userId": "123" }), "different-secret");
    let (ctx, warnings) = run_filter(&default_filter(), Some(&bearer(&token)));
    assert_eq!(ctx, TokenContext::empty());
    assert_eq!(warnings, vec!["JWT validation failed: invalid signature".to_string()]);
}

#[test]
fn standard_claims_are_numeric() {
    let now = now();
    let token = sign(json!({ "sub": "user123", "iat": now, "exp": now + 3600 }), SECRET);
    let (ctx, _) = run_filter(&default_filter(), Some(&bearer(&token)));

    let claims = ctx.claims().expect("verified");
    assert_eq!(claims.sub(), Some("user123"));
    assert!(claims.get("iat").is_some_and(Value::is_number));
    assert!(claims.get("exp").is_some_and(Value::is_number));
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

#[test]
fn expired_token() {
    let now = now();
    let token = sign(json!({ "data": "test", "iat": now, "exp": now }), SECRET);
    let (ctx, warnings) = run_filter(&default_filter(), Some(&bearer(&token)));
    assert_eq!(ctx, TokenContext::empty());
    assert_eq!(warnings, vec!["JWT validation failed: jwt expired".to_string()]);
}

#[test]
fn not_yet_active_token() {
    let now = now();
    let token = sign(json!({ "data": "test", "iat": now, "nbf": now + 3600 }), SECRET);
    let (ctx, warnings) = run_filter(&default_filter(), Some(&bearer(&token)));
    assert_eq!(ctx, TokenContext::empty());
    assert_eq!(warnings, vec!["JWT validation failed: jwt not active".to_string()]);
}

#[test]
fn unknown_verifier_failure() {
    let filter = TokenContextFilter::with_verifier(
        FilterConfiguration::new(SECRET),
        |_: &str, _: &str, _: &VerifyOptions| -> Result<Claims, VerificationError> {
            Err(VerificationError::Unknown("Unknown error".to_string()))
        },
    )
    .expect("valid configuration");

    let (ctx, warnings) = run_filter(&filter, Some("Bearer some-token"));
    assert_eq!(ctx, TokenContext::empty());
    assert_eq!(warnings, vec!["Unknown JWT error occurred".to_string()]);
}

#[test]
fn repeated_requests_yield_equal_contexts() {
    let filter = default_filter();
    let token = sign(json!({ "sub": "user123", "scope": ["read", "write"] }), SECRET);

    let (first, _) = run_filter(&filter, Some(&bearer(&token)));
    let (second, _) = run_filter(&filter, Some(&bearer(&token)));
    assert!(first.is_verified());
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Router integration
// ---------------------------------------------------------------------------

async fn scope(ctx: TokenContext) -> String {
    ctx.claims()
        .and_then(|claims| claims.get("scope"))
        .map(Value::to_string)
        .unwrap_or_else(|| "none".to_string())
}

#[tokio::test]
async fn router_stage_never_short_circuits() {
    let app = Router::new()
        .route("/scope", get(scope))
        .layer(axum::middleware::from_fn_with_state(
            default_filter(),
            token_context_middleware,
        ));

    let good = sign(json!({ "scope": "read" }), SECRET);
    let expired = sign(json!({ "scope": "read", "exp": now() - 10 }), SECRET);
    let cases = [
        (None, "none"),
        (Some("Basic abc".to_string()), "none"),
        (Some(bearer(&expired)), "none"),
        (Some(bearer(&good)), "\"read\""),
    ];

    for (authorization, expected) in cases {
        let mut builder = Request::builder().uri("/scope");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).expect("valid request"))
            .await
            .expect("infallible");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(String::from_utf8_lossy(&bytes), expected);
    }
}
