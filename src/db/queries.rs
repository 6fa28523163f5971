use rusqlite::{params, Connection};

use super::from_row::{query_all, query_one, COURSE_COLS, ENROLLMENT_COLS};
use crate::error::{msg, AppError, Result};
use crate::id::EntityType;
use crate::models::{Course, CreateCourse, Enrollment, EnrollmentOutcome};

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============ Courses ============

pub fn create_course(conn: &Connection, input: &CreateCourse) -> Result<Course> {
    let id = EntityType::Course.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO courses (id, title, description, thumbnail_url, price, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &id,
            &input.title,
            &input.description,
            &input.thumbnail_url,
            input.price,
            now
        ],
    )?;

    Ok(Course {
        id,
        title: input.title.clone(),
        description: input.description.clone(),
        thumbnail_url: input.thumbnail_url.clone(),
        price: input.price,
        created_at: now,
    })
}

pub fn get_course_by_id(conn: &Connection, id: &str) -> Result<Option<Course>> {
    query_one(
        conn,
        &format!("SELECT {} FROM courses WHERE id = ?1", COURSE_COLS),
        &[&id],
    )
}

// ============ Enrollments ============

/// Idempotently enroll a user in a course.
///
/// Single `INSERT ... ON CONFLICT DO NOTHING` against the unique
/// (user_id, course_id) index - a conflicting insert means the outcome the
/// caller wanted ("this user is enrolled") already holds, so it is reported
/// as success with `created = false`. There is no read-then-insert window:
/// concurrent webhook redeliveries and the sync-verify path racing each
/// other resolve at the constraint, and exactly one of them commits the row.
pub fn ensure_enrolled(
    conn: &Connection,
    user_id: &str,
    course_id: &str,
) -> Result<EnrollmentOutcome> {
    let id = EntityType::Enrollment.gen_id();
    let enrolled_at = now();

    let inserted = conn.execute(
        "INSERT INTO enrollments (id, user_id, course_id, enrolled_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id, course_id) DO NOTHING",
        params![&id, user_id, course_id, enrolled_at],
    )?;

    if inserted > 0 {
        return Ok(EnrollmentOutcome {
            enrollment: Enrollment {
                id,
                user_id: user_id.to_string(),
                course_id: course_id.to_string(),
                enrolled_at,
            },
            created: true,
        });
    }

    // Conflict: the pair exists. Rows are never deleted, so the fetch
    // cannot miss.
    let existing = get_enrollment(conn, user_id, course_id)?
        .ok_or_else(|| AppError::Internal(msg::ENROLLMENT_VANISHED.into()))?;

    Ok(EnrollmentOutcome {
        enrollment: existing,
        created: false,
    })
}

pub fn get_enrollment(
    conn: &Connection,
    user_id: &str,
    course_id: &str,
) -> Result<Option<Enrollment>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM enrollments WHERE user_id = ?1 AND course_id = ?2",
            ENROLLMENT_COLS
        ),
        &[&user_id, &course_id],
    )
}

/// Read-only query shared with the rest of the platform (dashboards,
/// access checks).
pub fn list_enrollments_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Enrollment>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM enrollments WHERE user_id = ?1 ORDER BY enrolled_at DESC",
            ENROLLMENT_COLS
        ),
        &[&user_id],
    )
}

pub fn count_enrollments(conn: &Connection, user_id: &str, course_id: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM enrollments WHERE user_id = ?1 AND course_id = ?2",
        params![user_id, course_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
