mod checkout;
mod enrollments;
mod verify;

pub use checkout::*;
pub use enrollments::*;
pub use verify::*;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/checkout", post(create_checkout))
        .route("/verify", get(verify_checkout))
        // Read-only surface for the rest of the platform (access checks)
        .route("/enrollments", get(list_enrollments))
}
