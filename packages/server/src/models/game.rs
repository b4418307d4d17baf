use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use werewolf_rules::day::DaySummary;
use werewolf_rules::death::DeathSignal;
use werewolf_rules::night::{NightSummary, PeekRecord};
use werewolf_rules::{Action, PhaseKind, PlayerState, UserId};

pub type GameId = u64;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Open,
    Resolved,
    // 締め切りで解決されずに次へ進んだ
    Skipped,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PhaseOutcome {
    Night { summary: NightSummary },
    Day { summary: DaySummary },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Phase {
    pub number: u32,
    pub kind: PhaseKind,
    pub deadline: Option<DateTime<Utc>>,
    pub status: PhaseStatus,
    pub outcome: Option<PhaseOutcome>,
    #[serde(default)]
    pub signals: Vec<DeathSignal>,
}

impl Phase {
    pub fn new(number: u32, kind: PhaseKind, deadline: Option<DateTime<Utc>>) -> Self {
        Phase {
            number,
            kind,
            deadline,
            status: PhaseStatus::Open,
            outcome: None,
            signals: Vec::new(),
        }
    }

    /// Night and the following day share a round: night 1 and day 2 are round 1.
    pub fn round(&self) -> u32 {
        (self.number + 1) / 2
    }

    pub fn is_open(&self) -> bool {
        self.status == PhaseStatus::Open
    }

    pub fn night_summary(&self) -> Option<&NightSummary> {
        match &self.outcome {
            Some(PhaseOutcome::Night { summary }) => Some(summary),
            _ => None,
        }
    }

    pub fn day_summary(&self) -> Option<&DaySummary> {
        match &self.outcome {
            Some(PhaseOutcome::Day { summary }) => Some(summary),
            _ => None,
        }
    }
}

/// Declared intents, one row per (phase, actor).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActionLedger {
    phases: BTreeMap<u32, Vec<Action>>,
}

impl ActionLedger {
    /// Stores `action` for `phase`, replacing the actor's earlier row in place.
    ///
    /// The replaced row keeps its ledger position. Returns true when a row was replaced.
    pub fn upsert(&mut self, phase: u32, action: Action) -> bool {
        let rows = self.phases.entry(phase).or_default();
        match rows.iter_mut().find(|a| a.actor == action.actor) {
            Some(row) => {
                *row = action;
                true
            }
            None => {
                rows.push(action);
                false
            }
        }
    }

    pub fn for_phase(&self, phase: u32) -> &[Action] {
        self.phases.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, phase: u32, actor: UserId) -> Option<&Action> {
        self.for_phase(phase).iter().find(|a| a.actor == actor)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub room_id: String,
    pub created_at: DateTime<Utc>,
    pub finished: bool,
    pub players: Vec<PlayerState>,
    pub phases: Vec<Phase>,
    pub actions: ActionLedger,
    // 楽観的ロック用のバージョン。コミットごとに増える
    pub version: u64,
}

impl GameRecord {
    pub fn new(id: GameId, room_id: String) -> Self {
        GameRecord {
            id,
            room_id,
            created_at: Utc::now(),
            finished: false,
            players: Vec::new(),
            phases: Vec::new(),
            actions: ActionLedger::default(),
            version: 0,
        }
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.phases.last()
    }

    pub fn current_phase_mut(&mut self) -> Option<&mut Phase> {
        self.phases.last_mut()
    }

    /// Most recent phase of `kind`.
    pub fn latest(&self, kind: PhaseKind) -> Option<&Phase> {
        self.phases.iter().rev().find(|p| p.kind == kind)
    }

    pub fn player(&self, user_id: UserId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    /// Appends the next phase. Numbers grow by one and types alternate, starting at night 1.
    pub fn push_phase(&mut self, kind: PhaseKind, deadline: Option<DateTime<Utc>>) -> &Phase {
        let number = self.phases.last().map(|p| p.number + 1).unwrap_or(1);
        self.phases.push(Phase::new(number, kind, deadline));
        &self.phases[self.phases.len() - 1]
    }

    /// Peek results this player has collected over the game.
    pub fn peeks_of(&self, user_id: UserId) -> Vec<PeekRecord> {
        self.phases
            .iter()
            .filter_map(Phase::night_summary)
            .flat_map(|s| s.peeks_for(user_id).cloned())
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicPlayer {
    pub id: UserId,
    pub alive: bool,
    pub is_self: bool,
}

/// What one player may see of a game.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicState {
    pub game_id: GameId,
    pub finished: bool,
    pub phase: Option<PhaseKind>,
    pub phase_number: Option<u32>,
    pub round: Option<u32>,
    pub deadline: Option<DateTime<Utc>>,
    pub players: Vec<PublicPlayer>,
    pub role_key: Option<String>,
    /// The viewer's own declaration for the current phase.
    pub own_action: Option<Action>,
    pub peeks: Vec<PeekRecord>,
}

impl PublicState {
    pub fn for_viewer(game: &GameRecord, viewer: UserId) -> Self {
        let phase = game.current_phase();
        PublicState {
            game_id: game.id,
            finished: game.finished,
            phase: phase.map(|p| p.kind),
            phase_number: phase.map(|p| p.number),
            round: phase.map(Phase::round),
            deadline: phase.and_then(|p| p.deadline),
            players: game
                .players
                .iter()
                .map(|p| PublicPlayer {
                    id: p.user_id,
                    alive: p.alive,
                    is_self: p.user_id == viewer,
                })
                .collect(),
            role_key: game.player(viewer).map(|p| p.role_key.clone()),
            own_action: phase.and_then(|p| game.actions.get(p.number, viewer).cloned()),
            peeks: game.peeks_of(viewer),
        }
    }
}
