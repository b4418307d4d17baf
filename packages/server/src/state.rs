use axum::extract::ws::Message;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{broadcast, Mutex};
use werewolf_rules::{RoleCatalog, UserId};

use crate::models::config::EngineConfig;
use crate::models::event::{EventEnvelope, GameEvent};
use crate::models::room::Room;
use crate::services::game_store::GameStore;

#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<Mutex<HashMap<String, Room>>>,
    pub games: GameStore,
    pub catalog: Arc<RoleCatalog>,
    pub config: Arc<EngineConfig>,
    pub channel: Arc<Mutex<HashMap<String, broadcast::Sender<Message>>>>,
    // 本人宛ての情報（占い結果など）はルーム全体に流さない
    pub private_channel: Arc<Mutex<HashMap<(String, UserId), broadcast::Sender<Message>>>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        AppState {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            games: GameStore::new(),
            catalog: Arc::new(RoleCatalog::standard()),
            config: Arc::new(config),
            channel: Arc::new(Mutex::new(HashMap::new())),
            private_channel: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get_or_create_room_channel(&self, room_id: &str) -> broadcast::Sender<Message> {
        let mut channels = self.channel.lock().await;
        if let Some(channel) = channels.get(room_id) {
            channel.clone()
        } else {
            let (tx, _) = broadcast::channel(1000);
            channels.insert(room_id.to_string(), tx.clone());
            tx
        }
    }

    pub async fn get_or_create_player_channel(
        &self,
        room_id: &str,
        user_id: UserId,
    ) -> broadcast::Sender<Message> {
        let mut channels = self.private_channel.lock().await;
        channels
            .entry((room_id.to_string(), user_id))
            .or_insert_with(|| broadcast::channel(100).0)
            .clone()
    }

    /// Publishes an event to the room, or only to its recipient when it has one.
    /// Having no subscribers is not an error.
    pub async fn broadcast(&self, room_id: &str, event: GameEvent) -> Result<(), String> {
        let tx = match event.recipient() {
            Some(user_id) => self.get_or_create_player_channel(room_id, user_id).await,
            None => self.get_or_create_room_channel(room_id).await,
        };
        let envelope = EventEnvelope::new(room_id, event);
        let message_text = serde_json::to_string(&envelope)
            .map_err(|e| format!("Failed to encode event: {}", e))?;

        if tx.receiver_count() > 0 {
            tx.send(Message::Text(message_text))
                .map_err(|e| format!("Failed to broadcast event: {}", e))?;
        }
        Ok(())
    }

    pub async fn broadcast_all(&self, room_id: &str, events: Vec<GameEvent>) {
        for event in events {
            if let Err(e) = self.broadcast(room_id, event).await {
                log::warn!("room {}: {}", room_id, e);
            }
        }
    }
}
