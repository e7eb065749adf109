use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    response::Response,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use convohub_gateway::connection;

use crate::error::{ApiError, ApiResult};
use crate::middleware::authenticate;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatParams {
    pub token: Option<String>,
}

/// Authenticate from the `token` query parameter and check the room
/// before upgrading. Refused connections get a plain envelope response.
pub async fn chat_socket(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    WithRejection(Path(room_id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Query(params), _): WithRejection<Query<ChatParams>, ApiError>,
) -> ApiResult<Response> {
    let token = params
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Authentication credentials were not provided.".into()))?;
    let user = authenticate(&state, &token).await?;

    if !state.db_call(move |db| Ok(db.room_exists(room_id)?)).await? {
        return Err(ApiError::not_found("Room not found."));
    }

    let hub = state.hub.clone();
    let db = state.db.clone();
    Ok(ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, hub, db, room_id, user)
    }))
}
