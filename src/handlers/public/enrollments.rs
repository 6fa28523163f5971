use axum::extract::State;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::extractors::{Json, UserId};
use crate::models::Enrollment;

#[derive(Debug, Serialize)]
pub struct EnrollmentsResponse {
    pub ok: bool,
    pub enrollments: Vec<Enrollment>,
}

/// List the caller's enrollments. Read-only; the rest of the platform uses
/// this for dashboards and access checks.
pub async fn list_enrollments(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<EnrollmentsResponse>> {
    let conn = state.db.get()?;
    let enrollments = queries::list_enrollments_for_user(&conn, &user_id)?;

    Ok(Json(EnrollmentsResponse {
        ok: true,
        enrollments,
    }))
}
