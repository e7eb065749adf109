use crate::models::{
    ActivityRow, CourseRow, MemberRow, MessageRow, OutstandingTokenRow, ProfileRow, ReviewRow,
    RoomRow, TeacherCourseRow, TeacherRow, UserRow,
};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, Row, ToSql};

/// Which integrity rule a failed write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
}

/// Classify an error returned by this crate as a constraint violation, if it is one.
pub fn constraint_violation(err: &anyhow::Error) -> Option<ConstraintKind> {
    match err.downcast_ref::<rusqlite::Error>()? {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            match e.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Some(ConstraintKind::Unique)
                }
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(ConstraintKind::ForeignKey),
                rusqlite::ffi::SQLITE_CONSTRAINT_CHECK => Some(ConstraintKind::Check),
                _ => None,
            }
        }
        _ => None,
    }
}

const ROOM_SELECT: &str = "
    SELECT r.id, r.name, r.topic, r.description, r.host_id, u.username, p.profile_image,
           (SELECT COUNT(*) FROM room_members rm WHERE rm.room_id = r.id) AS member_count,
           r.created_at
    FROM rooms r
    JOIN users u ON u.id = r.host_id
    LEFT JOIN profiles p ON p.user_id = r.host_id";

impl Database {
    // -- Users --

    /// Insert an account and its empty profile. Returns the new user id.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            let user_id = tx.last_insert_rowid();
            tx.execute("INSERT INTO profiles (user_id) VALUES (?1)", [user_id])?;
            tx.commit()?;
            Ok(user_id)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", &username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id))
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
                [email],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Returns false when no such user exists.
    pub fn set_superuser(&self, username: &str, is_superuser: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET is_superuser = ?2 WHERE username = ?1",
                rusqlite::params![username, is_superuser],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Profiles --

    pub fn get_profile(&self, user_id: i64) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, user_id))
    }

    /// Only the provided fields are changed. Returns the profile as stored afterwards.
    pub fn update_profile(
        &self,
        user_id: i64,
        bio: Option<&str>,
        profile_image: Option<&str>,
    ) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE profiles
                 SET bio = COALESCE(?2, bio), profile_image = COALESCE(?3, profile_image)
                 WHERE user_id = ?1",
                rusqlite::params![user_id, bio, profile_image],
            )?;
            query_profile(conn, user_id)
        })
    }

    // -- Tokens --

    pub fn record_outstanding_token(
        &self,
        jti: &str,
        user_id: i64,
        token: &str,
        expires_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO outstanding_tokens (jti, user_id, token, expires_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![jti, user_id, token, expires_at],
            )?;
            Ok(())
        })
    }

    pub fn outstanding_tokens_for_user(&self, user_id: i64) -> Result<Vec<OutstandingTokenRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT o.jti, o.user_id, o.expires_at, b.jti IS NOT NULL
                 FROM outstanding_tokens o
                 LEFT JOIN blacklisted_tokens b ON b.jti = o.jti
                 WHERE o.user_id = ?1
                 ORDER BY o.created_at",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(OutstandingTokenRow {
                        jti: row.get(0)?,
                        user_id: row.get(1)?,
                        expires_at: row.get(2)?,
                        blacklisted: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Blacklisting an already blacklisted token is a no-op.
    pub fn blacklist_token(&self, jti: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO blacklisted_tokens (jti) VALUES (?1)",
                [jti],
            )?;
            Ok(())
        })
    }

    pub fn is_token_blacklisted(&self, jti: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let listed = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM blacklisted_tokens WHERE jti = ?1)",
                [jti],
                |row| row.get(0),
            )?;
            Ok(listed)
        })
    }

    // -- Rooms --

    /// Insert a room with its host as the first member. Returns the new room id.
    pub fn create_room(&self, host_id: i64, name: &str, topic: &str, description: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO rooms (host_id, name, topic, description) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![host_id, name, topic, description],
            )?;
            let room_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO room_members (room_id, user_id) VALUES (?1, ?2)",
                [room_id, host_id],
            )?;
            tx.commit()?;
            Ok(room_id)
        })
    }

    pub fn get_room(&self, room_id: i64) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| {
            let sql = format!("{ROOM_SELECT} WHERE r.id = ?1");
            conn.query_row(&sql, [room_id], room_from_row).optional()
        })
    }

    pub fn room_exists(&self, room_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM rooms WHERE id = ?1)",
                [room_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Rooms the user belongs to, newest first.
    pub fn list_rooms_for_member(&self, user_id: i64) -> Result<Vec<RoomRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{ROOM_SELECT}
                 WHERE r.id IN (SELECT room_id FROM room_members WHERE user_id = ?1)
                 ORDER BY r.created_at DESC, r.id DESC"
            );
            query_rooms(conn, &sql, &[&user_id])
        })
    }

    /// All rooms, most members first.
    pub fn list_rooms_by_popularity(&self) -> Result<Vec<RoomRow>> {
        self.with_conn(|conn| {
            let sql = format!("{ROOM_SELECT} ORDER BY member_count DESC, r.created_at DESC, r.id DESC");
            query_rooms(conn, &sql, &[])
        })
    }

    /// Case-insensitive substring match on name or topic.
    pub fn search_rooms(&self, query: &str) -> Result<Vec<RoomRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{ROOM_SELECT}
                 WHERE instr(lower(r.name), lower(?1)) > 0 OR instr(lower(r.topic), lower(?1)) > 0
                 ORDER BY r.created_at DESC, r.id DESC"
            );
            query_rooms(conn, &sql, &[&query])
        })
    }

    /// Only the provided fields are changed. Returns false if the room does not exist.
    pub fn update_room(
        &self,
        room_id: i64,
        name: Option<&str>,
        topic: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE rooms
                 SET name = COALESCE(?2, name),
                     topic = COALESCE(?3, topic),
                     description = COALESCE(?4, description)
                 WHERE id = ?1",
                rusqlite::params![room_id, name, topic, description],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn delete_room(&self, room_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM rooms WHERE id = ?1", [room_id])?;
            Ok(changed == 1)
        })
    }

    pub fn is_member(&self, room_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let member = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM room_members WHERE room_id = ?1 AND user_id = ?2)",
                [room_id, user_id],
                |row| row.get(0),
            )?;
            Ok(member)
        })
    }

    /// Returns false when the user was already a member.
    pub fn add_member(&self, room_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO room_members (room_id, user_id) VALUES (?1, ?2)",
                [room_id, user_id],
            )?;
            Ok(changed == 1)
        })
    }

    /// Batch-fetch members for a set of rooms.
    pub fn members_for_rooms(&self, room_ids: &[i64]) -> Result<Vec<MemberRow>> {
        if room_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT rm.room_id, u.id, u.username, p.profile_image
                 FROM room_members rm
                 JOIN users u ON u.id = rm.user_id
                 LEFT JOIN profiles p ON p.user_id = u.id
                 WHERE rm.room_id IN ({})
                 ORDER BY u.id",
                placeholders(room_ids.len())
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(as_params(room_ids).as_slice(), |row| {
                    Ok(MemberRow {
                        room_id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row.get(2)?,
                        profile_image: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, room_id: i64, user_id: i64, content: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (room_id, user_id, content) VALUES (?1, ?2, ?3)",
                rusqlite::params![room_id, user_id, content],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Every message in a room, newest first.
    pub fn get_room_messages(&self, room_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the author in a single query (eliminates N+1)
            let mut stmt = conn.prepare(
                "SELECT m.id, m.room_id, m.user_id, u.username, p.profile_image, m.content, m.created_at
                 FROM messages m
                 JOIN users u ON u.id = m.user_id
                 LEFT JOIN profiles p ON p.user_id = m.user_id
                 WHERE m.room_id = ?1
                 ORDER BY m.created_at DESC, m.id DESC",
            )?;

            let rows = stmt
                .query_map([room_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        room_id: row.get(1)?,
                        user_id: row.get(2)?,
                        username: row.get(3)?,
                        profile_image: row.get(4)?,
                        content: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Newest messages across all rooms.
    pub fn recent_messages(&self, limit: u32) -> Result<Vec<ActivityRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.content, r.id, r.name, u.id, u.username, m.created_at
                 FROM messages m
                 JOIN rooms r ON r.id = m.room_id
                 JOIN users u ON u.id = m.user_id
                 ORDER BY m.created_at DESC, m.id DESC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map([limit], |row| {
                    Ok(ActivityRow {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        room_id: row.get(2)?,
                        room_name: row.get(3)?,
                        user_id: row.get(4)?,
                        username: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Courses --

    pub fn create_course(&self, name: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO courses (name) VALUES (?1)", [name])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_course(&self, id: i64) -> Result<Option<CourseRow>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id, name FROM courses WHERE id = ?1", [id], course_from_row)
                .optional()
        })
    }

    pub fn list_courses(&self) -> Result<Vec<CourseRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM courses ORDER BY id")?;
            let rows = stmt
                .query_map([], course_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The subset of `ids` that exist.
    pub fn courses_by_ids(&self, ids: &[i64]) -> Result<Vec<CourseRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, name FROM courses WHERE id IN ({}) ORDER BY id",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(as_params(ids).as_slice(), course_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn rename_course(&self, id: i64, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE courses SET name = ?2 WHERE id = ?1",
                rusqlite::params![id, name],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn delete_course(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM courses WHERE id = ?1", [id])?;
            Ok(changed == 1)
        })
    }

    // -- Teachers --

    pub fn create_teacher(&self, name: &str, course_ids: &[i64]) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("INSERT INTO teachers (name) VALUES (?1)", [name])?;
            let teacher_id = tx.last_insert_rowid();
            for course_id in course_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO teacher_courses (teacher_id, course_id) VALUES (?1, ?2)",
                    [teacher_id, *course_id],
                )?;
            }
            tx.commit()?;
            Ok(teacher_id)
        })
    }

    pub fn get_teacher(&self, id: i64) -> Result<Option<TeacherRow>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id, name FROM teachers WHERE id = ?1", [id], |row| {
                Ok(TeacherRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .optional()
        })
    }

    pub fn list_teachers(&self) -> Result<Vec<TeacherRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM teachers ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(TeacherRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch the courses taught by a set of teachers.
    pub fn courses_for_teachers(&self, teacher_ids: &[i64]) -> Result<Vec<TeacherCourseRow>> {
        if teacher_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT tc.teacher_id, c.id, c.name
                 FROM teacher_courses tc
                 JOIN courses c ON c.id = tc.course_id
                 WHERE tc.teacher_id IN ({})
                 ORDER BY c.id",
                placeholders(teacher_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(as_params(teacher_ids).as_slice(), |row| {
                    Ok(TeacherCourseRow {
                        teacher_id: row.get(0)?,
                        course_id: row.get(1)?,
                        course_name: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Rename and/or replace the course set. Returns false if the teacher does not exist.
    pub fn update_teacher(
        &self,
        id: i64,
        name: Option<&str>,
        course_ids: Option<&[i64]>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE teachers SET name = COALESCE(?2, name) WHERE id = ?1",
                rusqlite::params![id, name],
            )?;
            if changed == 0 {
                return Ok(false);
            }
            if let Some(course_ids) = course_ids {
                tx.execute("DELETE FROM teacher_courses WHERE teacher_id = ?1", [id])?;
                for course_id in course_ids {
                    tx.execute(
                        "INSERT OR IGNORE INTO teacher_courses (teacher_id, course_id) VALUES (?1, ?2)",
                        [id, *course_id],
                    )?;
                }
            }
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn delete_teacher(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM teachers WHERE id = ?1", [id])?;
            Ok(changed == 1)
        })
    }

    // -- Reviews --

    pub fn review_exists(&self, user_id: i64, teacher_id: i64, course_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM reviews WHERE user_id = ?1 AND teacher_id = ?2 AND course_id = ?3)",
                [user_id, teacher_id, course_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// The unique (user, teacher, course) index rejects a second review.
    pub fn create_review(
        &self,
        user_id: i64,
        teacher_id: i64,
        course_id: i64,
        teaching_style: f64,
        marking: f64,
        additional_remarks: Option<&str>,
    ) -> Result<ReviewRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reviews (user_id, teacher_id, course_id, teaching_style, marking, additional_remarks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![user_id, teacher_id, course_id, teaching_style, marking, additional_remarks],
            )?;
            Ok(ReviewRow {
                id: conn.last_insert_rowid(),
                user_id,
                teacher_id,
                course_id,
                teaching_style,
                marking,
                additional_remarks: additional_remarks.map(str::to_string),
            })
        })
    }

    pub fn get_reviews(&self, teacher_id: i64, course_id: i64) -> Result<Vec<ReviewRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, teacher_id, course_id, teaching_style, marking, additional_remarks
                 FROM reviews
                 WHERE teacher_id = ?1 AND course_id = ?2
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([teacher_id, course_id], |row| {
                    Ok(ReviewRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        teacher_id: row.get(2)?,
                        course_id: row.get(3)?,
                        teaching_style: row.get(4)?,
                        marking: row.get(5)?,
                        additional_remarks: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_review(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM reviews WHERE id = ?1", [id])?;
            Ok(changed == 1)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &dyn ToSql) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, email, password, is_superuser, created_at FROM users WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row([value], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password: row.get(3)?,
            is_superuser: row.get(4)?,
            created_at: row.get(5)?,
        })
    })
    .optional()
}

fn query_profile(conn: &Connection, user_id: i64) -> Result<Option<ProfileRow>> {
    conn.query_row(
        "SELECT p.user_id, u.email, u.username, p.bio, p.profile_image
         FROM profiles p
         JOIN users u ON u.id = p.user_id
         WHERE p.user_id = ?1",
        [user_id],
        |row| {
            Ok(ProfileRow {
                user_id: row.get(0)?,
                email: row.get(1)?,
                username: row.get(2)?,
                bio: row.get(3)?,
                profile_image: row.get(4)?,
            })
        },
    )
    .optional()
}

fn query_rooms(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<RoomRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, room_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<RoomRow> {
    Ok(RoomRow {
        id: row.get(0)?,
        name: row.get(1)?,
        topic: row.get(2)?,
        description: row.get(3)?,
        host_id: row.get(4)?,
        host_username: row.get(5)?,
        host_image: row.get(6)?,
        member_count: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<CourseRow> {
    Ok(CourseRow {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

fn as_params(ids: &[i64]) -> Vec<&dyn ToSql> {
    ids.iter().map(|id| id as &dyn ToSql).collect()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
