//! Phase controller: starts games, assigns roles, resolves phases and advances them.
//!
//! Resolution computes on a snapshot and commits with a version check, so the
//! deaths, the phase status flip and the next phase land together or not at all.
//! A lost race replays the whole resolution from a fresh snapshot.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use werewolf_rules::day::{self, DaySummary};
use werewolf_rules::death::{death_triggers, DeathSignal};
use werewolf_rules::night::{self, NightSummary};
use werewolf_rules::{
    assignment, GameError, PhaseKind, PlayerState, RoleCatalog, Roster, UserId,
};

use crate::{
    models::{
        config::EngineConfig,
        event::GameEvent,
        game::{GameId, GameRecord, Phase, PhaseOutcome, PhaseStatus, PublicState},
        room::RoomStatus,
    },
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// Resolve only when the completion predicate holds.
    #[default]
    WhenReady,
    /// Resolve whatever was declared, e.g. when a deadline expires.
    Force,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "summary", rename_all = "snake_case")]
pub enum ResolveOutcome<T> {
    /// Not ready yet; nothing changed.
    Pending,
    /// This call resolved the phase.
    Resolved(T),
    /// The phase had already been resolved; nothing changed.
    AlreadyResolved(T),
}

impl<T> ResolveOutcome<T> {
    pub fn summary(&self) -> Option<&T> {
        match self {
            ResolveOutcome::Pending => None,
            ResolveOutcome::Resolved(s) | ResolveOutcome::AlreadyResolved(s) => Some(s),
        }
    }

    pub fn is_closed(&self) -> bool {
        !matches!(self, ResolveOutcome::Pending)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResolveOutcome<U> {
        match self {
            ResolveOutcome::Pending => ResolveOutcome::Pending,
            ResolveOutcome::Resolved(s) => ResolveOutcome::Resolved(f(s)),
            ResolveOutcome::AlreadyResolved(s) => ResolveOutcome::AlreadyResolved(f(s)),
        }
    }
}

enum Step<T> {
    Pending,
    Already(T),
    Commit { summary: T, events: Vec<GameEvent> },
}

/// Starts a new game in the room: assigns roles and opens night 1.
///
/// Any unfinished game of the room is finished first, so a room never has two.
pub async fn start_game(state: AppState, room_id: &str) -> Result<GameId, GameError> {
    let mut rooms = state.rooms.lock().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| GameError::NotFound(format!("room {}", room_id)))?;

    if room.members.len() < state.config.min_players {
        return Err(GameError::Config(format!(
            "at least {} players are needed, room {} has {}",
            state.config.min_players,
            room_id,
            room.members.len()
        )));
    }
    // 設定ミスのルームではゲームを作らない
    assignment::build_role_pool(
        &state.catalog,
        &room.role_config,
        room.members.len(),
        &state.config.filler_role,
    )?;

    if let Some(previous) = room.current_game.take() {
        let finished = state
            .games
            .update(previous, |game| {
                game.finished = true;
                Ok(())
            })
            .await;
        if let Err(e) = finished {
            warn!("room {}: could not finish game {}: {}", room_id, previous, e);
        }
    }

    let game_id = state
        .games
        .create(|id| GameRecord::new(id, room_id.to_string()))
        .await;

    if let Err(e) = assign_with(&state, game_id, &room.members, &room.role_config).await {
        state.games.remove(game_id).await;
        return Err(e);
    }

    let night_seconds = state.config.night_duration_seconds;
    let first = state
        .games
        .update(game_id, |game| push_next_phase(game, PhaseKind::Night, night_seconds))
        .await?;

    room.current_game = Some(game_id);
    room.status = RoomStatus::InProgress;
    drop(rooms);

    info!("room {}: game {} started", room_id, game_id);
    state
        .broadcast_all(
            room_id,
            vec![
                GameEvent::GameStarted { game_id },
                phase_change(game_id, &first),
            ],
        )
        .await;
    Ok(game_id)
}

/// Assigns roles for the game from its room's configuration and member list.
pub async fn assign_roles(state: AppState, game_id: GameId) -> Result<Vec<PlayerState>, GameError> {
    let room_id = state.games.snapshot(game_id).await?.room_id;
    let (members, role_config) = {
        let rooms = state.rooms.lock().await;
        let room = rooms
            .get(&room_id)
            .ok_or_else(|| GameError::NotFound(format!("room {}", room_id)))?;
        (room.members.clone(), room.role_config.clone())
    };
    assign_with(&state, game_id, &members, &role_config).await
}

async fn assign_with(
    state: &AppState,
    game_id: GameId,
    members: &[UserId],
    role_config: &BTreeMap<String, u32>,
) -> Result<Vec<PlayerState>, GameError> {
    let pool = assignment::build_role_pool(
        &state.catalog,
        role_config,
        members.len(),
        &state.config.filler_role,
    )?;
    let mut rng = match state.config.role_seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(game_id)),
        None => StdRng::from_entropy(),
    };
    let players = assignment::assign_roles(members, &pool, &mut rng)?;

    state
        .games
        .update(game_id, move |game| {
            if !game.players.is_empty() {
                return Err(GameError::State(format!(
                    "roles of game {} are already assigned",
                    game_id
                )));
            }
            game.players = players;
            Ok(game.players.clone())
        })
        .await
}

/// Opens the next phase of type `to`. An open current phase is marked skipped.
pub async fn advance_phase(
    state: AppState,
    game_id: GameId,
    to: PhaseKind,
    duration_seconds: Option<u64>,
) -> Result<Phase, GameError> {
    let seconds = duration_seconds.unwrap_or_else(|| state.config.duration_for(to));
    let (phase, room_id) = state
        .games
        .update(game_id, |game| {
            let phase = push_next_phase(game, to, seconds)?;
            Ok((phase, game.room_id.clone()))
        })
        .await?;

    info!("game {}: advanced to {:?} {}", game_id, phase.kind, phase.number);
    state
        .broadcast_all(&room_id, vec![phase_change(game_id, &phase)])
        .await;
    Ok(phase)
}

fn push_next_phase(
    game: &mut GameRecord,
    to: PhaseKind,
    duration_seconds: u64,
) -> Result<Phase, GameError> {
    if game.finished {
        return Err(GameError::State(format!("game {} is finished", game.id)));
    }
    let deadline = i64::try_from(duration_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|duration| Utc::now().checked_add_signed(duration))
        .ok_or_else(|| {
            GameError::Config(format!("phase duration of {}s is out of range", duration_seconds))
        })?;
    match game.current_phase_mut() {
        None if to != PhaseKind::Night => {
            return Err(GameError::State("a game opens with a night".to_string()));
        }
        Some(current) if current.kind == to => {
            return Err(GameError::State(format!(
                "phase {} is already {:?}",
                current.number, to
            )));
        }
        Some(current) if current.is_open() => current.status = PhaseStatus::Skipped,
        _ => {}
    }

    Ok(game.push_phase(to, Some(deadline)).clone())
}

fn phase_change(game_id: GameId, phase: &Phase) -> GameEvent {
    GameEvent::PhaseChange {
        game_id,
        phase: phase.kind,
        number: phase.number,
        deadline: phase.deadline,
    }
}

fn signals_for(dead: &[UserId], catalog: &RoleCatalog, players: &[PlayerState]) -> Vec<DeathSignal> {
    let roster = Roster::new(catalog, players);
    dead.iter()
        .flat_map(|id| death_triggers(*id, &roster))
        .collect()
}

async fn resolve_with_retry<T, F>(
    state: &AppState,
    game_id: GameId,
    mut plan: F,
) -> Result<ResolveOutcome<T>, GameError>
where
    F: FnMut(&mut GameRecord) -> Result<Step<T>, GameError>,
{
    let attempts = state.config.max_resolution_retries + 1;
    for attempt in 1..=attempts {
        let mut game = state.games.snapshot(game_id).await?;
        let room_id = game.room_id.clone();

        match plan(&mut game)? {
            Step::Pending => return Ok(ResolveOutcome::Pending),
            Step::Already(summary) => return Ok(ResolveOutcome::AlreadyResolved(summary)),
            Step::Commit { summary, events } => match state.games.commit(game).await {
                Ok(_) => {
                    state.broadcast_all(&room_id, events).await;
                    return Ok(ResolveOutcome::Resolved(summary));
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        "game {}: resolution attempt {}/{} lost a race: {}",
                        game_id, attempt, attempts, e
                    );
                }
                Err(e) => return Err(e),
            },
        }
    }

    Err(GameError::ConcurrencyConflict(format!(
        "game {}: resolution gave up after {} attempts",
        game_id, attempts
    )))
}

/// Resolves the open night, or reports the last night's summary if it is already resolved.
pub async fn resolve_night(
    state: AppState,
    game_id: GameId,
    mode: ResolveMode,
) -> Result<ResolveOutcome<NightSummary>, GameError> {
    let catalog = state.catalog.clone();
    let config = state.config.clone();
    resolve_with_retry(&state, game_id, |game| plan_night(game, &catalog, &config, mode)).await
}

fn plan_night(
    game: &mut GameRecord,
    catalog: &RoleCatalog,
    config: &EngineConfig,
    mode: ResolveMode,
) -> Result<Step<NightSummary>, GameError> {
    if game.finished {
        return Err(GameError::State(format!("game {} is finished", game.id)));
    }
    let current = game
        .current_phase()
        .ok_or_else(|| GameError::State(format!("game {} has not started", game.id)))?;

    if current.kind != PhaseKind::Night || !current.is_open() {
        let night = game
            .latest(PhaseKind::Night)
            .ok_or_else(|| GameError::State("no night has been played".to_string()))?;
        return match night.night_summary() {
            Some(summary) => Ok(Step::Already(summary.clone())),
            None => Err(GameError::State(format!("night {} was skipped", night.number))),
        };
    }

    let number = current.number;
    let resolution = {
        let roster = Roster::new(catalog, &game.players);
        night::resolve(
            game.actions.for_phase(number),
            &roster,
            &config.night,
            mode == ResolveMode::Force,
        )
    };
    let Some(resolution) = resolution else {
        return Ok(Step::Pending);
    };
    // 何も起きない夜は締め切りまで開いたまま
    if mode == ResolveMode::WhenReady && resolution.summary.is_empty() {
        return Ok(Step::Pending);
    }

    let dead = resolution.apply(&mut game.players, number);
    let signals = signals_for(&dead, catalog, &game.players);
    let summary = resolution.summary;

    if let Some(phase) = game.current_phase_mut() {
        phase.status = PhaseStatus::Resolved;
        phase.outcome = Some(PhaseOutcome::Night {
            summary: summary.clone(),
        });
        phase.signals = signals.clone();
    }
    let next = push_next_phase(game, PhaseKind::Day, config.day_duration_seconds)?;
    info!(
        "game {}: night {} resolved, {} dead",
        game.id,
        number,
        dead.len()
    );

    let mut events = vec![GameEvent::NightResolved {
        game_id: game.id,
        summary: summary.redacted(),
    }];
    events.extend(summary.peeks.iter().map(|peek| GameEvent::PrivateInfo {
        game_id: game.id,
        target_player_id: peek.actor,
        peek: peek.clone(),
    }));
    events.extend(signals.into_iter().map(|signal| GameEvent::DeathTriggered {
        game_id: game.id,
        signal,
    }));
    events.push(phase_change(game.id, &next));

    Ok(Step::Commit { summary, events })
}

/// Resolves the open day vote, or reports the last day's summary if it is already resolved.
pub async fn resolve_day_vote(
    state: AppState,
    game_id: GameId,
    mode: ResolveMode,
) -> Result<ResolveOutcome<DaySummary>, GameError> {
    let catalog = state.catalog.clone();
    let config = state.config.clone();
    resolve_with_retry(&state, game_id, |game| plan_day(game, &catalog, &config, mode)).await
}

fn plan_day(
    game: &mut GameRecord,
    catalog: &RoleCatalog,
    config: &EngineConfig,
    mode: ResolveMode,
) -> Result<Step<DaySummary>, GameError> {
    if game.finished {
        return Err(GameError::State(format!("game {} is finished", game.id)));
    }
    let current = game
        .current_phase()
        .ok_or_else(|| GameError::State(format!("game {} has not started", game.id)))?;

    if current.kind != PhaseKind::Day || !current.is_open() {
        let day = game
            .latest(PhaseKind::Day)
            .ok_or_else(|| GameError::State("no day vote has been held".to_string()))?;
        return match day.day_summary() {
            Some(summary) => Ok(Step::Already(summary.clone())),
            None => Err(GameError::State(format!("day {} was skipped", day.number))),
        };
    }

    let number = current.number;
    let resolution = {
        let roster = Roster::new(catalog, &game.players);
        day::resolve(
            game.actions.for_phase(number),
            &roster,
            &config.day,
            mode == ResolveMode::Force,
        )
    };
    let Some(resolution) = resolution else {
        return Ok(Step::Pending);
    };

    let dead = resolution.apply(&mut game.players);
    let signals = signals_for(&dead, catalog, &game.players);
    let summary = resolution.summary;

    if let Some(phase) = game.current_phase_mut() {
        phase.status = PhaseStatus::Resolved;
        phase.outcome = Some(PhaseOutcome::Day {
            summary: summary.clone(),
        });
        phase.signals = signals.clone();
    }
    let next = push_next_phase(game, PhaseKind::Night, config.night_duration_seconds)?;
    info!(
        "game {}: day {} resolved, exiled {:?}",
        game.id, number, summary.exiled
    );

    let mut events = vec![GameEvent::DayResolved {
        game_id: game.id,
        summary: summary.clone(),
    }];
    events.extend(signals.into_iter().map(|signal| GameEvent::DeathTriggered {
        game_id: game.id,
        signal,
    }));
    events.push(phase_change(game.id, &next));

    Ok(Step::Commit { summary, events })
}

/// Phase, deadline and alive list, plus the viewer's own role and peeks.
pub async fn query_public_state(
    state: AppState,
    game_id: GameId,
    viewer: UserId,
) -> Result<PublicState, GameError> {
    let game = state.games.snapshot(game_id).await?;
    Ok(PublicState::for_viewer(&game, viewer))
}

pub async fn end_game(state: AppState, room_id: &str) -> Result<GameId, GameError> {
    let mut rooms = state.rooms.lock().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| GameError::NotFound(format!("room {}", room_id)))?;
    let game_id = room
        .current_game
        .ok_or_else(|| GameError::NotFound(format!("game in room {}", room_id)))?;

    state
        .games
        .update(game_id, |game| {
            game.finished = true;
            Ok(())
        })
        .await?;
    room.status = RoomStatus::Open;
    info!("room {}: game {} ended", room_id, game_id);
    Ok(game_id)
}
