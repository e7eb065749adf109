use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use tracing::info;

use convohub_db::Database;
use convohub_types::api::{
    CreateRoomRequest, Empty, JoinRoomResponse, RecentActivity, RecentQuery, RoomDetailResponse,
    RoomResponse, RoomSearchHit, SearchQuery, UpdateRoomRequest,
};
use convohub_types::models::CurrentUser;

use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::reply::Reply;
use crate::state::AppState;
use crate::validate::name_field;

const DEFAULT_ROOM_NAME: &str = "New Room";
const DEFAULT_RECENT_LIMIT: i64 = 50;
const MAX_RECENT_LIMIT: i64 = 200;

fn room_not_found() -> ApiError {
    ApiError::not_found("Room not found.")
}

fn load_room(db: &Database, room_id: i64) -> ApiResult<RoomResponse> {
    let row = db.get_room(room_id)?.ok_or_else(room_not_found)?;
    convert::rooms_with_members(db, vec![row])?
        .pop()
        .ok_or_else(room_not_found)
}

/// Rooms the caller has joined; falls back to every room by popularity.
pub async fn list_rooms(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Reply<Vec<RoomResponse>>> {
    let rooms = state
        .db_call(move |db| {
            let mut rows = db.list_rooms_for_member(user.id)?;
            if rows.is_empty() {
                rows = db.list_rooms_by_popularity()?;
            }
            Ok(convert::rooms_with_members(db, rows)?)
        })
        .await?;

    Ok(Reply::ok("Rooms fetched successfully", rooms))
}

pub async fn create_room(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<CreateRoomRequest>, ApiError>,
) -> ApiResult<Reply<RoomResponse>> {
    let name = match req.name.as_deref() {
        Some(name) if !name.trim().is_empty() => name_field("Name", name).map_err(ApiError::Validation)?,
        _ => DEFAULT_ROOM_NAME.to_string(),
    };
    let topic = name_field("Topic", req.topic.as_deref().unwrap_or_default())
        .map_err(ApiError::Validation)?;
    let description = req.description.unwrap_or_default().trim().to_string();

    let host_id = user.id;
    let room = state
        .db_call(move |db| {
            let room_id = db.create_room(host_id, &name, &topic, &description)?;
            load_room(db, room_id)
        })
        .await?;

    info!("User {} created room {} ({})", user.username, room.id, room.name);
    Ok(Reply::created("Room created successfully", room))
}

pub async fn get_room(
    State(state): State<AppState>,
    WithRejection(Path(room_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Reply<RoomDetailResponse>> {
    let detail = state
        .db_call(move |db| {
            let room = load_room(db, room_id)?;
            let messages = db
                .get_room_messages(room_id)?
                .into_iter()
                .map(convert::room_message)
                .collect();
            Ok(RoomDetailResponse { room, messages })
        })
        .await?;

    Ok(Reply::ok("Room details and messages fetched successfully", detail))
}

/// Partial update, host only. Serves both PUT and PATCH.
pub async fn update_room(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(room_id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateRoomRequest>, ApiError>,
) -> ApiResult<Reply<RoomResponse>> {
    let room = state
        .db_call(move |db| {
            let room = db.get_room(room_id)?.ok_or_else(room_not_found)?;
            if room.host_id != user.id {
                return Err(ApiError::Forbidden(
                    "You are not authorized to update this room. Only the host can update it.".into(),
                ));
            }

            let name = req
                .name
                .as_deref()
                .map(|n| name_field("Name", n))
                .transpose()
                .map_err(ApiError::Validation)?;
            let topic = req
                .topic
                .as_deref()
                .map(|t| name_field("Topic", t))
                .transpose()
                .map_err(ApiError::Validation)?;
            let description = req.description.map(|d| d.trim().to_string());

            if !db.update_room(room_id, name.as_deref(), topic.as_deref(), description.as_deref())? {
                return Err(room_not_found());
            }
            load_room(db, room_id)
        })
        .await?;

    Ok(Reply::ok("Room updated successfully", room))
}

pub async fn delete_room(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(room_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Reply<Empty>> {
    let user_id = user.id;
    state
        .db_call(move |db| {
            let room = db.get_room(room_id)?.ok_or_else(room_not_found)?;
            if room.host_id != user_id {
                return Err(ApiError::Forbidden(
                    "You are not authorized to delete this room. Only the host can delete it.".into(),
                ));
            }
            if !db.delete_room(room_id)? {
                return Err(room_not_found());
            }
            Ok(())
        })
        .await?;

    info!("User {} deleted room {}", user.username, room_id);
    Ok(Reply::ok("Room deleted successfully", Empty {}))
}

pub async fn join_room(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    WithRejection(Path(room_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Reply<JoinRoomResponse>> {
    let user_id = user.id;
    let joined = state
        .db_call(move |db| {
            let room = db.get_room(room_id)?.ok_or_else(room_not_found)?;
            // INSERT OR IGNORE makes a concurrent double join land here too.
            if !db.add_member(room_id, user_id)? {
                return Err(ApiError::Conflict(
                    "You are already a member of this room.".into(),
                ));
            }
            Ok(JoinRoomResponse {
                room_id: room.id,
                room_name: room.name,
            })
        })
        .await?;

    let message = format!("You have successfully joined the room: {}.", joined.room_name);
    Ok(Reply::ok(message, joined))
}

pub async fn search_rooms(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<SearchQuery>, ApiError>,
) -> ApiResult<Reply<Vec<RoomSearchHit>>> {
    let query = params.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::validation("Query parameter is required."));
    }

    let hits: Vec<RoomSearchHit> = state
        .db_call(move |db| Ok(db.search_rooms(&query)?))
        .await?
        .into_iter()
        .map(convert::search_hit)
        .collect();

    let message = if hits.is_empty() {
        "No rooms found matching the query.".to_string()
    } else {
        format!("{} room(s) found.", hits.len())
    };
    Ok(Reply::ok(message, hits))
}

/// Newest messages across all rooms.
pub async fn recent_activity(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<RecentQuery>, ApiError>,
) -> ApiResult<Reply<Vec<RecentActivity>>> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    if limit <= 0 {
        return Err(ApiError::validation("Limit parameter must be greater than 0."));
    }
    let limit = limit.min(MAX_RECENT_LIMIT) as u32;

    let activities: Vec<RecentActivity> = state
        .db_call(move |db| Ok(db.recent_messages(limit)?))
        .await?
        .into_iter()
        .map(convert::activity)
        .collect();

    let message = if activities.is_empty() {
        "No recent activities found.".to_string()
    } else {
        format!("{} recent activities found.", activities.len())
    };
    Ok(Reply::ok(message, activities))
}
