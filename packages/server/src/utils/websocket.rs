use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::info;
use werewolf_rules::UserId;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    /// Player the socket belongs to. Without it only room-wide events are sent.
    pub user_id: Option<UserId>,
}

pub async fn handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(params): Query<SocketParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, params.user_id))
}

async fn recv_private(rx: &mut Option<broadcast::Receiver<Message>>) -> Result<Message, RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Forwards the room's event stream, plus the player's own private events, to one
/// client. Clients only listen; intents go through the HTTP API.
pub async fn handle_socket(ws: WebSocket, state: AppState, room_id: String, user_id: Option<UserId>) {
    info!(
        "New WebSocket connection established for room: {} (player {:?})",
        room_id, user_id
    );
    let mut rx = state.get_or_create_room_channel(&room_id).await.subscribe();
    let mut private_rx = match user_id {
        Some(user_id) => Some(
            state
                .get_or_create_player_channel(&room_id, user_id)
                .await
                .subscribe(),
        ),
        None => None,
    };

    let (mut sender, mut receiver) = ws.split();

    let room_id_for_send = room_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                received = rx.recv() => received,
                received = recv_private(&mut private_rx) => received,
            };
            match received {
                Ok(msg) => {
                    if let Err(e) = sender.send(msg).await {
                        info!("room {}: client went away: {}", room_id_for_send, e);
                        break;
                    }
                }
                // 遅いクライアントは取りこぼしを許して続行
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("room {}: client lagged, {} events dropped", room_id_for_send, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }
    info!("WebSocket connection closed for room: {}", room_id);
}
