//! Night resolution: turns one night's action set into a single outcome.
//!
//! Precedence, for the kill target chosen by plurality of kill actions:
//! a protector on that target wins ("guarded"), otherwise a witch heal on it
//! ("healed"), otherwise the target dies. Poisons are applied independently of
//! that outcome. Peeks, marks, couple binding and charms never touch alive-state.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionKind};
use crate::player::{find_player_mut, PlayerState, Roster, UserId};

/// When a night is ready to resolve without being forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightCompletion {
    /// As soon as one valid kill action exists.
    #[default]
    AnyKill,
    /// Once every living kill-capable player has submitted a kill.
    AllKillers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightRules {
    pub completion: NightCompletion,
    pub heal_uses_per_game: u32,
    pub poison_uses_per_game: u32,
}

impl Default for NightRules {
    fn default() -> Self {
        Self {
            completion: NightCompletion::AnyKill,
            heal_uses_per_game: 1,
            poison_uses_per_game: 1,
        }
    }
}

/// Result of a peek, visible to the peeking player only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeekRecord {
    pub actor: UserId,
    pub target: UserId,
    pub is_werewolf: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NightSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarded: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healed: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub killed: Option<UserId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub poisoned: Vec<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound_pair: Option<(UserId, UserId)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub charmed: Vec<UserId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub marked: Vec<UserId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub peeks: Vec<PeekRecord>,
}

impl NightSummary {
    /// True when no lethal intent was resolved.
    pub fn is_empty(&self) -> bool {
        self.guarded.is_none()
            && self.healed.is_none()
            && self.killed.is_none()
            && self.poisoned.is_empty()
    }

    /// Copy safe to broadcast to the whole room.
    pub fn redacted(&self) -> Self {
        NightSummary {
            peeks: Vec::new(),
            ..self.clone()
        }
    }

    pub fn peeks_for(&self, actor: UserId) -> impl Iterator<Item = &PeekRecord> {
        self.peeks.iter().filter(move |p| p.actor == actor)
    }
}

/// A resolved night plus the bookkeeping needed to apply it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightResolution {
    pub summary: NightSummary,
    pub deaths: Vec<UserId>,
    pub heal_spent_by: Option<UserId>,
    pub poison_spent_by: Vec<UserId>,
}

impl NightResolution {
    /// Writes the outcome into `players` and returns who died.
    pub fn apply(&self, players: &mut [PlayerState], phase_number: u32) -> Vec<UserId> {
        let mut newly_dead = Vec::new();
        for id in &self.deaths {
            if let Some(player) = find_player_mut(players, *id) {
                if player.kill() {
                    newly_dead.push(*id);
                }
            }
        }

        if let Some(player) = self.heal_spent_by.and_then(|id| find_player_mut(players, id)) {
            player.meta.heals_used += 1;
        }
        for id in &self.poison_spent_by {
            if let Some(player) = find_player_mut(players, *id) {
                player.meta.poisons_used += 1;
            }
        }

        if let Some((a, b)) = self.summary.bound_pair {
            if let Some(player) = find_player_mut(players, a) {
                player.meta.bound_to = Some(b);
            }
            if let Some(player) = find_player_mut(players, b) {
                player.meta.bound_to = Some(a);
            }
        }
        for id in &self.summary.charmed {
            if let Some(player) = find_player_mut(players, *id) {
                player.meta.charmed = true;
            }
        }
        for id in &self.summary.marked {
            if let Some(player) = find_player_mut(players, *id) {
                if !player.meta.marked_in.contains(&phase_number) {
                    player.meta.marked_in.push(phase_number);
                }
            }
        }

        newly_dead
    }
}

/// Actions from living actors whose role grants them and whose targets are present.
fn eligible<'a>(actions: &'a [Action], roster: &'a Roster<'a>) -> impl Iterator<Item = &'a Action> {
    actions.iter().filter(move |a| {
        roster.is_alive(a.actor)
            && roster.role_of(a.actor).map(|r| r.grants(a.kind)).unwrap_or(false)
            && (!a.kind.requires_target() || a.target.is_some())
            && (!a.kind.requires_second_target() || a.second_target.is_some())
    })
}

/// Plurality target of the kill actions. Ties go to the target seen first in ledger order.
pub fn kill_target(actions: &[Action], roster: &Roster) -> Option<UserId> {
    let mut tally: Vec<(UserId, u32)> = Vec::new();
    for target in eligible(actions, roster)
        .filter(|a| a.kind == ActionKind::WolfKill)
        .filter_map(|a| a.target)
    {
        match tally.iter_mut().find(|(id, _)| *id == target) {
            Some(entry) => entry.1 += 1,
            None => tally.push((target, 1)),
        }
    }

    let mut best: Option<(UserId, u32)> = None;
    for (id, count) in tally {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((id, count));
        }
    }
    best.map(|(id, _)| id)
}

/// Completion predicate for a night under `rules`.
pub fn is_ready(actions: &[Action], roster: &Roster, rules: &NightRules) -> bool {
    let killers_acted: Vec<UserId> = eligible(actions, roster)
        .filter(|a| a.kind == ActionKind::WolfKill)
        .map(|a| a.actor)
        .collect();

    match rules.completion {
        NightCompletion::AnyKill => !killers_acted.is_empty(),
        NightCompletion::AllKillers => {
            let mut killers = roster
                .living()
                .filter(|p| {
                    roster
                        .role_of(p.user_id)
                        .map(|r| r.grants(ActionKind::WolfKill))
                        .unwrap_or(false)
                })
                .peekable();
            killers.peek().is_some() && killers.all(|p| killers_acted.contains(&p.user_id))
        }
    }
}

/// Resolves one night.
///
/// Returns `None` while the night is not ready, unless `force` is set, in which
/// case whatever was declared is resolved (possibly to an empty summary).
pub fn resolve(
    actions: &[Action],
    roster: &Roster,
    rules: &NightRules,
    force: bool,
) -> Option<NightResolution> {
    if !force && !is_ready(actions, roster, rules) {
        return None;
    }

    let acts: Vec<&Action> = eligible(actions, roster).collect();
    let heals_left = |actor: UserId| {
        roster
            .player(actor)
            .map(|p| p.meta.heals_used < rules.heal_uses_per_game)
            .unwrap_or(false)
    };
    let poisons_left = |actor: UserId| {
        roster
            .player(actor)
            .map(|p| p.meta.poisons_used < rules.poison_uses_per_game)
            .unwrap_or(false)
    };

    let mut summary = NightSummary::default();
    let mut deaths = Vec::new();
    let mut heal_spent_by = None;

    if let Some(target) = kill_target(actions, roster) {
        let guarded = acts
            .iter()
            .any(|a| a.kind == ActionKind::GuardianProtect && a.target == Some(target));
        let healer = acts.iter().find(|a| {
            a.kind == ActionKind::WitchHeal && a.target == Some(target) && heals_left(a.actor)
        });

        if guarded {
            summary.guarded = Some(target);
        } else if let Some(healer) = healer {
            summary.healed = Some(target);
            heal_spent_by = Some(healer.actor);
        } else if roster.is_alive(target) {
            summary.killed = Some(target);
            deaths.push(target);
        }
        debug!("night kill target {} resolved: {:?}", target, summary);
    }

    let mut poison_spent_by = Vec::new();
    for action in acts.iter().filter(|a| a.kind == ActionKind::WitchPoison) {
        let Some(target) = action.target else {
            continue;
        };
        if !poisons_left(action.actor) || poison_spent_by.contains(&action.actor) {
            continue;
        }
        poison_spent_by.push(action.actor);
        if roster.is_alive(target) && !deaths.contains(&target) {
            deaths.push(target);
            summary.poisoned.push(target);
        }
    }

    for action in &acts {
        match action.kind {
            ActionKind::SeerPeek => {
                if let Some((target, role)) = action
                    .target
                    .and_then(|t| roster.role_of(t).map(|r| (t, r)))
                {
                    summary.peeks.push(PeekRecord {
                        actor: action.actor,
                        target,
                        is_werewolf: role.reads_as_werewolf(),
                    });
                }
            }
            ActionKind::RavenMark => {
                if let Some(target) = action.target {
                    if !summary.marked.contains(&target) {
                        summary.marked.push(target);
                    }
                }
            }
            ActionKind::BindCouple => {
                if summary.bound_pair.is_none() {
                    if let (Some(a), Some(b)) = (action.target, action.second_target) {
                        summary.bound_pair = Some((a, b));
                    }
                }
            }
            ActionKind::PiperCharm => {
                for target in action.targets() {
                    if !summary.charmed.contains(&target) {
                        summary.charmed.push(target);
                    }
                }
            }
            _ => {}
        }
    }

    Some(NightResolution {
        summary,
        deaths,
        heal_spent_by,
        poison_spent_by,
    })
}
