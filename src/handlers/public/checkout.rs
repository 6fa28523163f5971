use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::{Json, UserId};

/// Request body for POST /checkout. The buyer's identity comes from the
/// `x-user-id` header, not the body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub course_id: String,
    /// Where the processor redirects after payment. Defaults to the
    /// configured success page.
    #[serde(default)]
    pub success_url: Option<String>,
    /// Where the processor redirects on abandonment. Defaults to the
    /// configured cancel page.
    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub ok: bool,
    /// Processor-hosted checkout page URL
    pub url: String,
}

/// Create a checkout session for one course.
///
/// No local side effect: the session lives entirely on the processor, and
/// fulfillment happens later via the webhook or the verify fallback.
pub async fn create_checkout(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    if request.course_id.trim().is_empty() {
        return Err(AppError::BadRequest(msg::COURSE_ID_REQUIRED.into()));
    }

    let conn = state.db.get()?;
    let course =
        queries::get_course_by_id(&conn, &request.course_id)?.or_not_found(msg::COURSE_NOT_FOUND)?;
    drop(conn);

    // The success URL carries the processor's session-id placeholder so the
    // redirected page can recover the session and call /verify with it.
    let success_base = request
        .success_url
        .as_deref()
        .unwrap_or(&state.success_page_url);
    let success_url = with_session_placeholder(success_base);
    let cancel_url = request
        .cancel_url
        .clone()
        .unwrap_or_else(|| state.cancel_page_url.clone());

    let session = state
        .processor
        .create_checkout_session(&course, &user_id, &success_url, &cancel_url)
        .await?;

    tracing::info!(
        "checkout session created: session={}, user={}, course={}",
        session.id,
        user_id,
        course.id
    );

    Ok(Json(CheckoutResponse {
        ok: true,
        url: session.url,
    }))
}

/// Append the processor's literal `{CHECKOUT_SESSION_ID}` token as a
/// `session_id` query parameter. The token must not be URL-encoded - the
/// processor substitutes it verbatim at redirect time.
fn with_session_placeholder(base_url: &str) -> String {
    if base_url.contains('?') {
        format!("{}&session_id={{CHECKOUT_SESSION_ID}}", base_url)
    } else {
        format!("{}?session_id={{CHECKOUT_SESSION_ID}}", base_url)
    }
}
