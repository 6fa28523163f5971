use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Courses (catalog side owns writes; this subsystem reads pricing)
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            thumbnail_url TEXT,
            price REAL NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- Enrollments (this subsystem exclusively owns writes)
        -- The UNIQUE(user_id, course_id) index is the idempotency boundary:
        -- duplicate fulfillment attempts land on the constraint, not on a
        -- read-then-insert check.
        CREATE TABLE IF NOT EXISTS enrollments (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            course_id TEXT NOT NULL REFERENCES courses(id),
            enrolled_at INTEGER NOT NULL,
            UNIQUE(user_id, course_id)
        );
        CREATE INDEX IF NOT EXISTS idx_enrollments_user ON enrollments(user_id);
        "#,
    )
}
