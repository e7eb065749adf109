use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{error, info, warn};

use convohub_db::Database;
use convohub_types::events::{ChatCommand, ChatFrame};
use convohub_types::models::CurrentUser;

use crate::hub::RoomHub;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a WebSocket connection to one room. The token was already
/// validated at the HTTP upgrade layer, so the connection is registered
/// straight away.
pub async fn handle_connection(
    socket: WebSocket,
    hub: RoomHub,
    db: Arc<Database>,
    room_id: i64,
    user: CurrentUser,
) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut room_rx) = hub.register(room_id).await;
    info!("{} ({}) connected to room {}", user.username, user.id, room_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward room frames -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                frame = room_rx.recv() => {
                    let Some(frame) = frame else { break };
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to encode chat frame: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read chat frames from client
    let hub_recv = hub.clone();
    let user_recv = user.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    relay_message(&hub_recv, &db, room_id, &user_recv, text.as_str()).await;
                }
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unregister(room_id, conn_id).await;
    info!("{} ({}) disconnected from room {}", user.username, user.id, room_id);
}

/// Persist one inbound frame and fan it out to the room.
///
/// Malformed or empty frames and failed inserts are logged and dropped;
/// the connection stays open. Returns the number of connections reached.
pub async fn relay_message(
    hub: &RoomHub,
    db: &Arc<Database>,
    room_id: i64,
    user: &CurrentUser,
    text: &str,
) -> usize {
    let content = match serde_json::from_str::<ChatCommand>(text) {
        Ok(cmd) => cmd.message,
        Err(e) => {
            warn!(
                "{} ({}) bad chat frame: {} -- raw: {}",
                user.username,
                user.id,
                e,
                text.chars().take(200).collect::<String>()
            );
            return 0;
        }
    };

    if content.trim().is_empty() {
        warn!("{} ({}) sent an empty message to room {}", user.username, user.id, room_id);
        return 0;
    }

    // Run blocking DB insert off the async runtime
    let db = db.clone();
    let user_id = user.id;
    let stored = content.clone();
    let inserted = tokio::task::spawn_blocking(move || db.insert_message(room_id, user_id, &stored)).await;

    match inserted {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            warn!("Failed to store message from {} in room {}: {}", user_id, room_id, e);
            return 0;
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            return 0;
        }
    }

    hub.broadcast(
        room_id,
        ChatFrame {
            message: content,
            user_id,
        },
    )
    .await
}
