use std::collections::{BTreeMap, HashMap};

use werewolf_rules::{GameError, UserId};

use crate::{
    models::room::{Room, RoomStatus},
    state::AppState,
};

pub async fn create_room(state: AppState, name: Option<String>, max_players: Option<usize>) -> u32 {
    let mut rooms = state.rooms.lock().await;
    let new_id = rooms
        .keys()
        .filter_map(|k| k.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let new_room = Room::new(new_id.to_string(), name, max_players);
    rooms.insert(new_id.to_string(), new_room);
    new_id
}

pub async fn join_room(state: AppState, room_id: &str, player_id: UserId) -> Result<(), GameError> {
    let mut rooms = state.rooms.lock().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| GameError::NotFound(format!("room {}", room_id)))?;

    // ルームの状態がOpenか確認
    if room.status != RoomStatus::Open {
        return Err(GameError::State(format!("room {} is not open", room_id)));
    }
    if room.members.len() >= room.max_players {
        return Err(GameError::State(format!("room {} is full", room_id)));
    }
    if room.members.contains(&player_id) {
        return Err(GameError::State(format!(
            "player {} already joined room {}",
            player_id, room_id
        )));
    }

    room.members.push(player_id);
    Ok(())
}

pub async fn leave_room(state: AppState, room_id: &str, player_id: UserId) -> Result<(), GameError> {
    let mut rooms = state.rooms.lock().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| GameError::NotFound(format!("room {}", room_id)))?;

    let index = room
        .members
        .iter()
        .position(|id| *id == player_id)
        .ok_or_else(|| GameError::NotFound(format!("player {} in room {}", player_id, room_id)))?;
    room.members.remove(index);
    Ok(())
}

/// Replaces the room's role composition. Every key must exist in the catalog.
pub async fn configure_roles(
    state: AppState,
    room_id: &str,
    role_config: BTreeMap<String, u32>,
) -> Result<(), GameError> {
    for key in role_config.keys() {
        state.catalog.require(key)?;
    }

    let mut rooms = state.rooms.lock().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| GameError::NotFound(format!("room {}", room_id)))?;
    let filtered = role_config
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect();
    let previous = std::mem::replace(&mut room.role_config, filtered);
    if room.configured_role_count() > room.max_players as u64 {
        let requested = room.configured_role_count();
        room.role_config = previous;
        return Err(GameError::Config(format!(
            "{} roles configured for a room of {}",
            requested, room.max_players
        )));
    }
    Ok(())
}

pub async fn get_rooms(state: &AppState) -> HashMap<String, Room> {
    state.rooms.lock().await.clone()
}

pub async fn get_room_info(state: &AppState, room_id: &str) -> Result<Room, GameError> {
    let rooms = state.rooms.lock().await;
    rooms
        .get(room_id)
        .cloned()
        .ok_or_else(|| GameError::NotFound(format!("room {}", room_id)))
}

pub async fn delete_room(state: AppState, room_id: &str) -> bool {
    let mut rooms = state.rooms.lock().await;
    rooms.remove(room_id).is_some()
}
