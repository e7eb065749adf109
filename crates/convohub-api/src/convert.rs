//! Row -> response shaping.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use convohub_db::Database;
use convohub_db::models::{
    ActivityRow, CourseRow, MemberRow, MessageRow, ProfileRow, ReviewRow, RoomRow, TeacherRow,
};
use convohub_types::api::{
    ActivityRoom, ActivityUser, CourseResponse, ProfileResponse, RecentActivity,
    ReviewResponse, RoomMessageResponse, RoomResponse, RoomSearchHit, TeacherResponse, UserSummary,
};

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert.
pub fn timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

/// Load members for a batch of rooms and attach them.
pub fn rooms_with_members(db: &Database, rooms: Vec<RoomRow>) -> anyhow::Result<Vec<RoomResponse>> {
    let ids: Vec<i64> = rooms.iter().map(|r| r.id).collect();
    let mut members = group_members(db.members_for_rooms(&ids)?);

    Ok(rooms
        .into_iter()
        .map(|row| {
            let room_members = members.remove(&row.id).unwrap_or_default();
            room(row, room_members)
        })
        .collect())
}

fn group_members(rows: Vec<MemberRow>) -> HashMap<i64, Vec<UserSummary>> {
    let mut grouped: HashMap<i64, Vec<UserSummary>> = HashMap::new();
    for row in rows {
        grouped.entry(row.room_id).or_default().push(UserSummary {
            id: row.user_id,
            username: row.username,
            profile_image: row.profile_image,
        });
    }
    grouped
}

fn room(row: RoomRow, members: Vec<UserSummary>) -> RoomResponse {
    RoomResponse {
        id: row.id,
        name: row.name,
        topic: row.topic,
        description: row.description,
        host: UserSummary {
            id: row.host_id,
            username: row.host_username,
            profile_image: row.host_image,
        },
        members,
        created_at: timestamp(&row.created_at),
    }
}

pub fn room_message(row: MessageRow) -> RoomMessageResponse {
    RoomMessageResponse {
        id: row.id,
        user: UserSummary {
            id: row.user_id,
            username: row.username,
            profile_image: row.profile_image,
        },
        content: row.content,
        created_at: timestamp(&row.created_at),
    }
}

pub fn search_hit(row: RoomRow) -> RoomSearchHit {
    RoomSearchHit {
        room_id: row.id,
        room_name: row.name,
        topic: row.topic,
        description: row.description,
        host: row.host_username,
        members_count: row.member_count,
        created_at: timestamp(&row.created_at),
    }
}

pub fn activity(row: ActivityRow) -> RecentActivity {
    RecentActivity {
        message_id: row.id,
        content: row.content,
        room: ActivityRoom {
            room_id: row.room_id,
            room_name: row.room_name,
        },
        user: ActivityUser {
            user_id: row.user_id,
            username: row.username,
        },
        created_at: timestamp(&row.created_at),
    }
}

pub fn course(row: CourseRow) -> CourseResponse {
    CourseResponse {
        id: row.id,
        name: row.name,
    }
}

/// Load courses for a batch of teachers and attach them.
pub fn teachers_with_courses(
    db: &Database,
    teachers: Vec<TeacherRow>,
) -> anyhow::Result<Vec<TeacherResponse>> {
    let ids: Vec<i64> = teachers.iter().map(|t| t.id).collect();
    let mut courses: HashMap<i64, Vec<CourseResponse>> = HashMap::new();
    for row in db.courses_for_teachers(&ids)? {
        courses.entry(row.teacher_id).or_default().push(CourseResponse {
            id: row.course_id,
            name: row.course_name,
        });
    }

    Ok(teachers
        .into_iter()
        .map(|t| TeacherResponse {
            courses: courses.remove(&t.id).unwrap_or_default(),
            id: t.id,
            name: t.name,
        })
        .collect())
}

pub fn review(row: ReviewRow) -> ReviewResponse {
    ReviewResponse {
        id: row.id,
        user: row.user_id,
        teacher: row.teacher_id,
        course: row.course_id,
        teaching_style: row.teaching_style,
        marking: row.marking,
        additional_remarks: row.additional_remarks,
    }
}

pub fn profile(row: ProfileRow) -> ProfileResponse {
    ProfileResponse {
        email: row.email,
        username: row.username,
        bio: row.bio,
        profile_image: row.profile_image,
    }
}
