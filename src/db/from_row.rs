//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const COURSE_COLS: &str = "id, title, description, thumbnail_url, price, created_at";

pub const ENROLLMENT_COLS: &str = "id, user_id, course_id, enrolled_at";

// ============ FromRow Implementations ============

impl FromRow for Course {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Course {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            thumbnail_url: row.get(3)?,
            price: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for Enrollment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Enrollment {
            id: row.get(0)?,
            user_id: row.get(1)?,
            course_id: row.get(2)?,
            enrolled_at: row.get(3)?,
        })
    }
}
