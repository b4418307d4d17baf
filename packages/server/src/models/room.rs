use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use werewolf_rules::UserId;

use super::game::GameId;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum RoomStatus {
    Open,
    InProgress,
    Closed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub name: Option<String>,
    pub members: Vec<UserId>,
    pub max_players: usize,
    pub status: RoomStatus,
    // 役職キー → 人数
    pub role_config: BTreeMap<String, u32>,
    pub current_game: Option<GameId>,
}

impl Room {
    pub fn new(room_id: String, name: Option<String>, max_players: Option<usize>) -> Self {
        Room {
            room_id,
            name,
            members: Vec::new(),
            max_players: max_players.unwrap_or(9),
            status: RoomStatus::Open,
            role_config: BTreeMap::new(),
            current_game: None,
        }
    }

    pub fn configured_role_count(&self) -> u64 {
        self.role_config.values().map(|count| u64::from(*count)).sum()
    }
}
