use serde::{Deserialize, Serialize};

/// The durable record granting a user access to a course.
///
/// At most one row exists per (user_id, course_id) pair for the lifetime of
/// the system; the store's unique index is what enforces it. Rows are never
/// updated or deleted by this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub enrolled_at: i64,
}

/// Result of an `ensure_enrolled` call.
///
/// `created` is true only for the call that actually committed the row -
/// duplicate webhook deliveries and the sync-verify path racing it all see
/// `created = false` with the original enrollment.
#[derive(Debug, Clone)]
pub struct EnrollmentOutcome {
    pub enrollment: Enrollment,
    pub created: bool,
}
