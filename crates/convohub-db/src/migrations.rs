use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT NOT NULL UNIQUE,
            email         TEXT NOT NULL UNIQUE,
            password      TEXT NOT NULL,
            is_superuser  INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS profiles (
            user_id        INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            bio            TEXT NOT NULL DEFAULT '',
            profile_image  TEXT
        );

        CREATE TABLE IF NOT EXISTS rooms (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            name         TEXT NOT NULL DEFAULT 'New Room',
            host_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            topic        TEXT NOT NULL DEFAULT '',
            description  TEXT NOT NULL DEFAULT '',
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS room_members (
            room_id  INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
            user_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (room_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_room_members_user
            ON room_members(user_id);

        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            room_id     INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_room
            ON messages(room_id, created_at);

        CREATE TABLE IF NOT EXISTS courses (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS teachers (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS teacher_courses (
            teacher_id  INTEGER NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
            course_id   INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            PRIMARY KEY (teacher_id, course_id)
        );

        CREATE TABLE IF NOT EXISTS reviews (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id             INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            teacher_id          INTEGER NOT NULL REFERENCES teachers(id) ON DELETE CASCADE,
            course_id           INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            teaching_style      REAL NOT NULL CHECK (teaching_style BETWEEN 1.0 AND 5.0),
            marking             REAL NOT NULL CHECK (marking BETWEEN 1.0 AND 5.0),
            additional_remarks  TEXT,
            UNIQUE(user_id, teacher_id, course_id)
        );

        CREATE INDEX IF NOT EXISTS idx_reviews_teacher_course
            ON reviews(teacher_id, course_id);

        CREATE TABLE IF NOT EXISTS outstanding_tokens (
            jti         TEXT PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            token       TEXT NOT NULL,
            expires_at  TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_outstanding_tokens_user
            ON outstanding_tokens(user_id);

        CREATE TABLE IF NOT EXISTS blacklisted_tokens (
            jti             TEXT PRIMARY KEY REFERENCES outstanding_tokens(jti) ON DELETE CASCADE,
            blacklisted_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
