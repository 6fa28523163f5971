use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{msg, AppError, Result};
use crate::models::Course;

type HmacSha256 = Hmac<Sha256>;

/// Upper bound on any single call to the processor. Both the checkout and
/// verify paths surface a timeout as a retryable error to their callers.
const PROCESSOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Processor connection settings, resolved once from the environment.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    /// Absent only in dev mode; the webhook handler runs unauthenticated
    /// (and loudly warns) without it.
    pub webhook_secret: Option<String>,
    /// API endpoint, overridable for tests and local stubs.
    pub api_base: String,
}

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    id: String,
    url: String,
}

/// A freshly created checkout session: the opaque processor id plus the
/// hosted payment page URL the client is redirected to.
#[derive(Debug, Clone)]
pub struct CheckoutSessionLink {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: Option<String>,
    api_base: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(PROCESSOR_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn has_webhook_secret(&self) -> bool {
        self.webhook_secret.is_some()
    }

    /// Create a checkout session for one course.
    ///
    /// Ad-hoc `price_data` is used rather than dashboard-managed prices:
    /// the catalog owns pricing, so the unit amount is derived from the
    /// course record at request time (rounded to the nearest whole unit).
    /// The buyer and course ids ride along in metadata and come back to us
    /// in the completion webhook and on session retrieval.
    pub async fn create_checkout_session(
        &self,
        course: &Course,
        user_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSessionLink> {
        let unit_amount = (course.price.round() as i64).to_string();

        let params: [(&str, &str); 9] = [
            ("mode", "payment"),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("line_items[0][price_data][currency]", "usd"),
            ("line_items[0][price_data][product_data][name]", &course.title),
            ("line_items[0][price_data][unit_amount]", &unit_amount),
            ("line_items[0][quantity]", "1"),
            ("metadata[user_id]", user_id),
            ("metadata[course_id]", &course.id),
        ];

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "checkout session creation failed: {}",
                error_text
            )));
        }

        let session: CreateCheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse processor response: {}", e)))?;

        Ok(CheckoutSessionLink {
            id: session.id,
            url: session.url,
        })
    }

    /// Fetch a session's current state from the processor.
    ///
    /// This is the synchronous fallback path: the client lands back on the
    /// success page before the webhook may have arrived, and asks us to
    /// check directly.
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<StripeCheckoutSession> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.api_base, session_id
            ))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(request_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(msg::SESSION_NOT_FOUND.into()));
        }

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "session retrieval failed: {}",
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse processor response: {}", e)))
    }

    /// Maximum age of a webhook timestamp before it's rejected (in seconds).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    /// Allowed clock skew for timestamps from the future (in seconds).
    const WEBHOOK_CLOCK_SKEW_SECS: i64 = 60;

    /// Verify a webhook request body against its signature header.
    ///
    /// Returns `Ok(false)` for a well-formed header that doesn't match
    /// (wrong secret, tampered payload, stale timestamp) and `Err` for a
    /// header we can't even parse.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or_else(|| AppError::Internal(msg::WEBHOOK_SECRET_MISSING.into()))?;

        let header = SignatureHeader::parse(signature)?;

        // Reject stale timestamps to limit the replay window, and
        // future-dated ones beyond a small skew allowance.
        let age = chrono::Utc::now().timestamp() - header.timestamp;
        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }
        if age < -Self::WEBHOOK_CLOCK_SKEW_SECS {
            tracing::warn!("webhook rejected: timestamp in the future (age={}s)", age);
            return Ok(false);
        }

        // The signed payload is "{timestamp}.{raw body}".
        let signed_payload = format!(
            "{}.{}",
            header.timestamp,
            String::from_utf8_lossy(payload)
        );

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::WEBHOOK_SECRET_MISSING.into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison; the length check leaks nothing since a
        // SHA-256 hex signature is always 64 chars.
        let expected_bytes = expected.as_bytes();
        let provided_bytes = header.v1.as_bytes();
        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

/// Parsed `stripe-signature` header: `t=<unix ts>,v1=<hex hmac>`.
struct SignatureHeader {
    timestamp: i64,
    v1: String,
}

impl SignatureHeader {
    fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut v1 = None;

        for part in header.split(',') {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                v1 = Some(s);
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?
            .parse::<i64>()
            .map_err(|_| AppError::BadRequest(msg::INVALID_TIMESTAMP_IN_SIGNATURE.into()))?;
        let v1 = v1
            .ok_or_else(|| AppError::BadRequest(msg::INVALID_SIGNATURE_FORMAT.into()))?
            .to_string();

        Ok(Self { timestamp, v1 })
    }
}

fn request_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::UpstreamTimeout
    } else {
        AppError::Upstream(e.to_string())
    }
}

// ============ Webhook event payloads ============

/// Outer webhook event envelope - `object` is decoded per event type.
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// A checkout session as embedded in `checkout.session.completed` events
/// and returned by session retrieval.
#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub payment_status: String,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

/// The metadata we attached at session creation, echoed back by the
/// processor. Both fields are optional on the wire: a session created
/// outside this subsystem carries neither.
#[derive(Debug, Default, Deserialize)]
pub struct SessionMetadata {
    pub user_id: Option<String>,
    pub course_id: Option<String>,
}

impl StripeCheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// The (user_id, course_id) pair this session was created for, if the
    /// metadata round-tripped intact.
    pub fn enrollment_keys(&self) -> Option<(&str, &str)> {
        match (
            self.metadata.user_id.as_deref(),
            self.metadata.course_id.as_deref(),
        ) {
            (Some(user_id), Some(course_id)) => Some((user_id, course_id)),
            _ => None,
        }
    }
}
