//! Test utilities and fixtures for Coursepay integration tests

#![allow(dead_code)]

use axum::Router;
use rusqlite::Connection;
use tempfile::TempDir;

// Re-export the main library crate
pub use coursepay::db::{create_pool, init_db, queries, AppState};
pub use coursepay::models::*;
pub use coursepay::payments::{
    SessionMetadata, StripeCheckoutSession, StripeClient, StripeConfig,
};

/// Webhook secret used by test fixtures and signature helpers.
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test123secret456";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Processor config for tests. The API base points at a closed local port
/// so any accidental processor call fails fast instead of reaching Stripe.
pub fn test_processor_config(webhook_secret: Option<&str>) -> StripeConfig {
    StripeConfig {
        secret_key: "sk_test_xxx".to_string(),
        webhook_secret: webhook_secret.map(|s| s.to_string()),
        api_base: "http://127.0.0.1:9".to_string(),
    }
}

/// Create an AppState backed by a file database in a temp dir.
///
/// File-backed rather than in-memory so every pooled connection sees the
/// same data; the returned TempDir must be kept alive for the state's
/// lifetime.
pub fn create_test_app_state() -> (AppState, TempDir) {
    create_test_app_state_with_secret(Some(TEST_WEBHOOK_SECRET))
}

/// Same as `create_test_app_state` but without a webhook secret, for
/// exercising the dev-only unauthenticated webhook path.
pub fn create_test_app_state_degraded() -> (AppState, TempDir) {
    create_test_app_state_with_secret(None)
}

fn create_test_app_state_with_secret(webhook_secret: Option<&str>) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("coursepay_test.db");
    let pool = create_pool(db_path.to_str().unwrap()).expect("Failed to create pool");
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    let processor = StripeClient::new(&test_processor_config(webhook_secret))
        .expect("Failed to build test processor client");

    let state = AppState {
        db: pool,
        processor,
        base_url: "http://localhost:3000".to_string(),
        success_page_url: "http://localhost:3000/success".to_string(),
        cancel_page_url: "http://localhost:3000/cancel".to_string(),
    };

    (state, dir)
}

/// Create a test course
pub fn create_test_course(conn: &Connection, title: &str, price: f64) -> Course {
    let input = CreateCourse {
        title: title.to_string(),
        description: format!("Description for {}", title),
        thumbnail_url: None,
        price,
    };
    queries::create_course(conn, &input).expect("Failed to create test course")
}

/// Router with all public endpoints
pub fn public_app(state: AppState) -> Router {
    coursepay::handlers::public::router().with_state(state)
}

/// Router with the webhook endpoint
pub fn webhook_app(state: AppState) -> Router {
    coursepay::handlers::webhooks::router().with_state(state)
}

/// Build a checkout session object the way it appears inside webhook
/// events and session retrievals.
pub fn checkout_session(
    session_id: &str,
    payment_status: &str,
    user_id: Option<&str>,
    course_id: Option<&str>,
) -> StripeCheckoutSession {
    StripeCheckoutSession {
        id: session_id.to_string(),
        payment_status: payment_status.to_string(),
        metadata: SessionMetadata {
            user_id: user_id.map(|s| s.to_string()),
            course_id: course_id.map(|s| s.to_string()),
        },
    }
}

/// Serialize a `checkout.session.completed` webhook body.
pub fn checkout_completed_body(
    session_id: &str,
    payment_status: &str,
    user_id: Option<&str>,
    course_id: Option<&str>,
) -> String {
    let mut metadata = serde_json::Map::new();
    if let Some(u) = user_id {
        metadata.insert("user_id".to_string(), serde_json::json!(u));
    }
    if let Some(c) = course_id {
        metadata.insert("course_id".to_string(), serde_json::json!(c));
    }

    serde_json::json!({
        "id": "evt_test_0001",
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "payment_status": payment_status,
                "metadata": metadata,
            }
        }
    })
    .to_string()
}

/// Get current Unix timestamp as a string (for webhook signature tests)
pub fn current_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Get an old timestamp (for testing timestamp rejection)
pub fn old_timestamp() -> String {
    // 10 minutes ago - beyond the 5-minute tolerance
    (chrono::Utc::now().timestamp() - 600).to_string()
}

pub fn compute_stripe_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// A complete, currently-valid `stripe-signature` header for a payload.
pub fn signature_header(payload: &[u8], secret: &str) -> String {
    let timestamp = current_timestamp();
    let signature = compute_stripe_signature(payload, secret, &timestamp);
    format!("t={},v1={}", timestamp, signature)
}
