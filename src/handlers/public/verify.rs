use axum::extract::State;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::extractors::{Json, Query};
use crate::payments::StripeCheckoutSession;

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub ok: bool,
    /// "enrolled" once fulfilled, "pending" while the session is unpaid
    pub status: &'static str,
    #[serde(rename = "courseId", skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
}

/// Synchronous fallback invoked by the client right after the processor
/// redirects back, before the webhook may have arrived.
///
/// Races the webhook path freely: both converge on the same idempotent
/// enrollment write, so whichever lands second is a no-op. Unlike the
/// webhook path, store failures here propagate - the user is actively
/// waiting for a definitive answer, and the error is retryable.
pub async fn verify_checkout(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifyResponse>> {
    if query.session_id.trim().is_empty() {
        return Err(AppError::BadRequest(msg::SESSION_ID_REQUIRED.into()));
    }

    let session = state
        .processor
        .retrieve_checkout_session(&query.session_id)
        .await?;

    let conn = state.db.get()?;
    Ok(Json(resolve_session(&conn, &session)?))
}

/// Turn a freshly fetched session into a verify result, fulfilling the
/// enrollment if the payment has settled.
///
/// An unpaid session is a legitimate state, not a failure - the user may
/// have abandoned checkout - so it reports `pending` and writes nothing.
/// A paid session lands on the same `ensure_enrolled` call the webhook
/// path uses.
pub fn resolve_session(
    conn: &Connection,
    session: &StripeCheckoutSession,
) -> Result<VerifyResponse> {
    if !session.is_paid() {
        return Ok(VerifyResponse {
            ok: true,
            status: "pending",
            course_id: None,
        });
    }

    let (user_id, course_id) = session
        .enrollment_keys()
        .ok_or_else(|| AppError::BadRequest(msg::SESSION_MISSING_METADATA.into()))?;

    let outcome = queries::ensure_enrolled(conn, user_id, course_id)?;

    if outcome.created {
        tracing::info!(
            "enrollment fulfilled via verify: session={}, user={}, course={}",
            session.id,
            user_id,
            course_id
        );
    } else {
        tracing::debug!(
            "verify found existing enrollment: session={}, user={}, course={}",
            session.id,
            user_id,
            course_id
        );
    }

    Ok(VerifyResponse {
        ok: true,
        status: "enrolled",
        course_id: Some(outcome.enrollment.course_id),
    })
}
