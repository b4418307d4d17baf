use log::{debug, warn};
use serde::{Deserialize, Serialize};
use werewolf_rules::night::NightRules;
use werewolf_rules::{Action, ActionKind, GameError, PhaseKind, RoleCatalog, UserId};

use crate::{
    models::game::{GameId, GameRecord},
    services::game_service::{self, ResolveMode},
    state::AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub actor_id: UserId,
    pub kind: ActionKind,
    #[serde(default)]
    pub target_id: Option<UserId>,
    #[serde(default)]
    pub second_target_id: Option<UserId>,
    /// Phase the client believes is open. A stale number is rejected.
    #[serde(default)]
    pub phase_number: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub phase_number: u32,
    /// The actor already had a row for this phase and it was overwritten.
    pub replaced: bool,
    /// The phase is closed after this submission.
    pub phase_closed: bool,
}

/// Records an intent for the current phase, then tries to resolve the phase.
pub async fn submit_action(
    state: AppState,
    game_id: GameId,
    request: ActionRequest,
) -> Result<SubmitReceipt, GameError> {
    let catalog = state.catalog.clone();
    let rules = state.config.night;
    let (phase_number, phase_kind, replaced) = state
        .games
        .update(game_id, |game| record_action(game, &catalog, &rules, &request))
        .await?;

    debug!(
        "game {}: phase {} {:?} from {} -> {:?}{}",
        game_id,
        phase_number,
        request.kind,
        request.actor_id,
        request.target_id,
        if replaced { " (replaced)" } else { "" }
    );

    let closed = match phase_kind {
        PhaseKind::Night => {
            game_service::resolve_night(state.clone(), game_id, ResolveMode::WhenReady)
                .await
                .map(|o| o.is_closed())
        }
        PhaseKind::Day => {
            game_service::resolve_day_vote(state.clone(), game_id, ResolveMode::WhenReady)
                .await
                .map(|o| o.is_closed())
        }
    };
    // 受理済みの行は残るので、解決の失敗は提出の失敗にしない
    let phase_closed = closed.unwrap_or_else(|e| {
        warn!("game {}: resolution after submission failed: {}", game_id, e);
        false
    });

    Ok(SubmitReceipt {
        phase_number,
        replaced,
        phase_closed,
    })
}

fn record_action(
    game: &mut GameRecord,
    catalog: &RoleCatalog,
    rules: &NightRules,
    request: &ActionRequest,
) -> Result<(u32, PhaseKind, bool), GameError> {
    if game.finished {
        return Err(GameError::State(format!("game {} is finished", game.id)));
    }
    let phase = game
        .current_phase()
        .ok_or_else(|| GameError::State(format!("game {} has not started", game.id)))?;
    if !phase.is_open() {
        return Err(GameError::State(format!("phase {} is closed", phase.number)));
    }
    if let Some(expected) = request.phase_number {
        if expected != phase.number {
            return Err(GameError::State(format!(
                "phase {} is not open, current phase is {}",
                expected, phase.number
            )));
        }
    }
    let (number, kind) = (phase.number, phase.kind);

    let actor = game.player(request.actor_id).ok_or_else(|| {
        GameError::Permission(format!(
            "user {} is not playing game {}",
            request.actor_id, game.id
        ))
    })?;
    if !actor.alive {
        return Err(GameError::Permission(format!(
            "player {} is dead",
            request.actor_id
        )));
    }
    if request.kind.phase() != kind {
        return Err(GameError::State(format!(
            "{:?} cannot be declared during {:?} {}",
            request.kind, kind, number
        )));
    }
    let role = catalog.require(&actor.role_key)?;
    if !role.grants(request.kind) {
        return Err(GameError::Permission(format!(
            "role {} cannot {:?}",
            role.key, request.kind
        )));
    }
    match request.kind {
        ActionKind::WitchHeal if actor.meta.heals_used >= rules.heal_uses_per_game => {
            return Err(GameError::Permission("no healing potion left".to_string()));
        }
        ActionKind::WitchPoison if actor.meta.poisons_used >= rules.poison_uses_per_game => {
            return Err(GameError::Permission("no poison left".to_string()));
        }
        _ => {}
    }

    let target = if request.kind.requires_target() {
        Some(request.target_id.ok_or_else(|| {
            GameError::State(format!("{:?} needs a target", request.kind))
        })?)
    } else {
        request.target_id
    };
    let second_target = if request.kind.requires_second_target() {
        let second = request.second_target_id.ok_or_else(|| {
            GameError::State(format!("{:?} needs two targets", request.kind))
        })?;
        if Some(second) == target {
            return Err(GameError::State(format!(
                "{:?} needs two different targets",
                request.kind
            )));
        }
        Some(second)
    } else {
        None
    };

    for id in target.into_iter().chain(second_target) {
        let player = game
            .player(id)
            .ok_or_else(|| GameError::NotFound(format!("player {} in game {}", id, game.id)))?;
        if !player.alive {
            return Err(GameError::State(format!("player {} is already dead", id)));
        }
    }

    let action = Action {
        actor: request.actor_id,
        kind: request.kind,
        target,
        second_target,
    };
    let replaced = game.actions.upsert(number, action);
    Ok((number, kind, replaced))
}
