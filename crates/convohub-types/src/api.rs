use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims shared by the REST middleware and the chat upgrade handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub token_type: TokenType,
    pub jti: Uuid,
    pub exp: usize,
}

// -- Envelope --

/// Uniform wrapper around every HTTP response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    pub meta: Meta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub message: String,
    pub status: u16,
}

impl<T> Envelope<T> {
    pub fn new(data: T, message: impl Into<String>, status: u16) -> Self {
        Self {
            data,
            meta: Meta {
                message: message.into(),
                status,
            },
        }
    }
}

/// Serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Empty {}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

// -- Users & profiles --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub email: String,
    pub username: String,
    pub bio: String,
    pub profile_image: Option<String>,
}

/// JSON profile update. A new image can only arrive as a multipart upload.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
}

// -- Rooms --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    pub topic: Option<String>,
    pub description: Option<String>,
}

/// Partial update: absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoomRequest {
    pub name: Option<String>,
    pub topic: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomResponse {
    pub id: i64,
    pub name: String,
    pub topic: String,
    pub description: String,
    pub host: UserSummary,
    pub members: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomMessageResponse {
    pub id: i64,
    pub user: UserSummary,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomDetailResponse {
    pub room: RoomResponse,
    pub messages: Vec<RoomMessageResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub room_id: i64,
    pub room_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomSearchHit {
    pub room_id: i64,
    pub room_name: String,
    pub topic: String,
    pub description: String,
    pub host: String,
    pub members_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivityRoom {
    pub room_id: i64,
    pub room_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivityUser {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecentActivity {
    pub message_id: i64,
    pub content: String,
    pub room: ActivityRoom,
    pub user: ActivityUser,
    pub created_at: DateTime<Utc>,
}

// -- Courses & teachers --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CourseRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TeacherResponse {
    pub id: i64,
    pub name: String,
    pub courses: Vec<CourseResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTeacherRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub course_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTeacherRequest {
    pub name: Option<String>,
    pub course_ids: Option<Vec<i64>>,
}

// -- Reviews --

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub teacher_id: Option<i64>,
    pub course_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReviewRequest {
    pub teacher_id: Option<i64>,
    pub course_id: Option<i64>,
    pub teaching_style: Option<f64>,
    pub marking: Option<f64>,
    pub additional_remarks: Option<String>,
}

/// `user`, `teacher` and `course` are ids.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub id: i64,
    pub user: i64,
    pub teacher: i64,
    pub course: i64,
    pub teaching_style: f64,
    pub marking: f64,
    pub additional_remarks: Option<String>,
}
