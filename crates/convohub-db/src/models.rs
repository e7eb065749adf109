/// Database row types — these map directly to SQLite rows.
/// Distinct from convohub-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_superuser: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ProfileRow {
    pub user_id: i64,
    pub email: String,
    pub username: String,
    pub bio: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OutstandingTokenRow {
    pub jti: String,
    pub user_id: i64,
    pub expires_at: String,
    pub blacklisted: bool,
}

/// A room joined with its host and member count.
#[derive(Debug, Clone)]
pub struct RoomRow {
    pub id: i64,
    pub name: String,
    pub topic: String,
    pub description: String,
    pub host_id: i64,
    pub host_username: String,
    pub host_image: Option<String>,
    pub member_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MemberRow {
    pub room_id: i64,
    pub user_id: i64,
    pub username: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub room_id: i64,
    pub user_id: i64,
    pub username: String,
    pub profile_image: Option<String>,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ActivityRow {
    pub id: i64,
    pub content: String,
    pub room_id: i64,
    pub room_name: String,
    pub user_id: i64,
    pub username: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CourseRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct TeacherRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct TeacherCourseRow {
    pub teacher_id: i64,
    pub course_id: i64,
    pub course_name: String,
}

#[derive(Debug, Clone)]
pub struct ReviewRow {
    pub id: i64,
    pub user_id: i64,
    pub teacher_id: i64,
    pub course_id: i64,
    pub teaching_style: f64,
    pub marking: f64,
    pub additional_remarks: Option<String>,
}
