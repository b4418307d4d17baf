use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use werewolf_rules::day::DaySummary;
use werewolf_rules::death::DeathSignal;
use werewolf_rules::night::{NightSummary, PeekRecord};
use werewolf_rules::{PhaseKind, UserId};

use super::game::GameId;

/// Structured events pushed to a room's broadcast channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum GameEvent {
    GameStarted {
        game_id: GameId,
    },
    PhaseChange {
        game_id: GameId,
        phase: PhaseKind,
        number: u32,
        deadline: Option<DateTime<Utc>>,
    },
    NightResolved {
        game_id: GameId,
        summary: NightSummary,
    },
    DayResolved {
        game_id: GameId,
        summary: DaySummary,
    },
    /// Only meant for `target_player_id`.
    PrivateInfo {
        game_id: GameId,
        target_player_id: UserId,
        peek: PeekRecord,
    },
    DeathTriggered {
        game_id: GameId,
        signal: DeathSignal,
    },
}

impl GameEvent {
    /// The single player an event is addressed to, or `None` for room-wide events.
    pub fn recipient(&self) -> Option<UserId> {
        match self {
            GameEvent::PrivateInfo {
                target_player_id, ..
            } => Some(*target_player_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: uuid::Uuid,
    pub room_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: GameEvent,
}

impl EventEnvelope {
    pub fn new(room_id: &str, event: GameEvent) -> Self {
        EventEnvelope {
            event_id: uuid::Uuid::new_v4(),
            room_id: room_id.to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}
