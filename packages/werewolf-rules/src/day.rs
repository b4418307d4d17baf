//! Day vote resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionKind};
use crate::catalog::Ability;
use crate::player::{find_player_mut, PlayerState, Roster, UserId};

/// What happens to a tie when no living scapegoat can take the blame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    /// Exile the tied candidate with the lowest id.
    #[default]
    LowestId,
    /// Nobody is exiled.
    NoElimination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DayRules {
    pub tie_policy: TiePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaySummary {
    pub exiled: Option<UserId>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub scapegoat: bool,
    /// Immune-once player who revealed instead of leaving.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed: Option<UserId>,
    /// Role key of a player who won by being exiled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win: Option<String>,
    /// Candidates sharing the top tally, ascending, when there was a tie.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tied: Vec<UserId>,
    pub tally: BTreeMap<UserId, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayResolution {
    pub summary: DaySummary,
}

impl DayResolution {
    /// Writes the outcome into `players` and returns who died.
    pub fn apply(&self, players: &mut [PlayerState]) -> Vec<UserId> {
        if let Some(player) = self.summary.revealed.and_then(|id| find_player_mut(players, id)) {
            player.meta.immunity_spent = true;
        }
        let Some(player) = self.summary.exiled.and_then(|id| find_player_mut(players, id)) else {
            return Vec::new();
        };
        if player.kill() {
            vec![player.user_id]
        } else {
            Vec::new()
        }
    }
}

fn ballots<'a>(actions: &'a [Action], roster: &'a Roster<'a>) -> impl Iterator<Item = &'a Action> {
    actions
        .iter()
        .filter(move |a| a.kind == ActionKind::DayVote && roster.is_alive(a.actor))
}

/// Ballot weight of a voter: double-vote roles count twice.
pub fn vote_weight(roster: &Roster, voter: UserId) -> u32 {
    match roster.ability_of(voter) {
        Some(Ability::DoubleVote) => 2,
        _ => 1,
    }
}

/// Weighted tally of the ballots cast against living players. Abstentions count for nothing.
pub fn tally(actions: &[Action], roster: &Roster) -> BTreeMap<UserId, u32> {
    let mut tally = BTreeMap::new();
    for ballot in ballots(actions, roster) {
        let Some(target) = ballot.target.filter(|t| roster.is_alive(*t)) else {
            continue;
        };
        *tally.entry(target).or_insert(0) += vote_weight(roster, ballot.actor);
    }
    tally
}

/// The tally is complete once every living player has cast a ballot, abstentions included.
pub fn is_complete(actions: &[Action], roster: &Roster) -> bool {
    let voters: Vec<UserId> = ballots(actions, roster).map(|a| a.actor).collect();
    !voters.is_empty() && roster.living().all(|p| voters.contains(&p.user_id))
}

/// Resolves the day vote.
///
/// Returns `None` while the tally is incomplete, unless `force` is set.
pub fn resolve(
    actions: &[Action],
    roster: &Roster,
    rules: &DayRules,
    force: bool,
) -> Option<DayResolution> {
    if !force && !is_complete(actions, roster) {
        return None;
    }

    let mut summary = DaySummary {
        tally: tally(actions, roster),
        ..DaySummary::default()
    };

    let Some(top) = summary.tally.values().copied().max() else {
        return Some(DayResolution { summary });
    };
    // BTreeMap iteration keeps the leaders in ascending id order.
    let leaders: Vec<UserId> = summary
        .tally
        .iter()
        .filter(|(_, count)| **count == top)
        .map(|(id, _)| *id)
        .collect();

    let winner = if leaders.len() > 1 {
        summary.tied = leaders.clone();
        if let Some(goat) = roster.living_with(Ability::Scapegoat).first() {
            summary.exiled = Some(*goat);
            summary.scapegoat = true;
            return Some(DayResolution { summary });
        }
        match rules.tie_policy {
            TiePolicy::LowestId => leaders[0],
            TiePolicy::NoElimination => return Some(DayResolution { summary }),
        }
    } else {
        leaders[0]
    };

    match roster.role_of(winner) {
        Some(role) if role.ability == Ability::SelfEliminationWin => {
            summary.exiled = Some(winner);
            summary.win = Some(role.key.clone());
        }
        Some(role)
            if role.ability == Ability::ImmuneOnce
                && !roster.player(winner).map(|p| p.meta.immunity_spent).unwrap_or(true) =>
        {
            summary.revealed = Some(winner);
        }
        _ => summary.exiled = Some(winner),
    }

    Some(DayResolution { summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RoleCatalog;

    fn vote(actor: UserId, target: Option<UserId>) -> Action {
        Action::new(actor, ActionKind::DayVote, target)
    }

    fn players(roles: &[&str]) -> Vec<PlayerState> {
        roles
            .iter()
            .enumerate()
            .map(|(i, role)| PlayerState::new(i as UserId + 1, *role))
            .collect()
    }

    fn run(actions: &[Action], players: &[PlayerState], rules: DayRules) -> DaySummary {
        let catalog = RoleCatalog::standard();
        let roster = Roster::new(&catalog, players);
        resolve(actions, &roster, &rules, false).unwrap().summary
    }

    #[test]
    fn test_plurality_with_abstention() {
        let table = players(&["villager", "villager", "villager", "werewolf"]);
        let actions = vec![
            vote(1, Some(4)),
            vote(2, Some(4)),
            vote(3, Some(1)),
            vote(4, None),
        ];
        let summary = run(&actions, &table, DayRules::default());
        assert_eq!(summary.exiled, Some(4));
        assert_eq!(summary.tally.get(&4), Some(&2));
        assert!(!summary.scapegoat);
    }

    #[test]
    fn test_double_vote_weight() {
        let table = players(&["village_head", "villager", "villager", "werewolf"]);
        let actions = vec![
            vote(1, Some(4)),
            vote(2, Some(3)),
            vote(3, Some(4)),
            vote(4, Some(3)),
        ];
        let summary = run(&actions, &table, DayRules::default());
        assert_eq!(summary.tally.get(&4), Some(&3));
        assert_eq!(summary.tally.get(&3), Some(&2));
        assert_eq!(summary.exiled, Some(4));
    }

    #[test]
    fn test_tie_sends_scapegoat() {
        let table = players(&["villager", "villager", "scapegoat", "werewolf"]);
        let actions = vec![
            vote(1, Some(4)),
            vote(2, Some(1)),
            vote(3, Some(4)),
            vote(4, Some(1)),
        ];
        let catalog = RoleCatalog::standard();
        let roster = Roster::new(&catalog, &table);
        let resolution = resolve(&actions, &roster, &DayRules::default(), false).unwrap();
        assert_eq!(resolution.summary.exiled, Some(3));
        assert!(resolution.summary.scapegoat);
        assert_eq!(resolution.summary.tied, vec![1, 4]);

        let mut table = table.clone();
        assert_eq!(resolution.apply(&mut table), vec![3]);
        assert!(table[0].alive && table[3].alive);
    }

    #[test]
    fn test_tie_policies_without_scapegoat() {
        let table = players(&["villager", "villager", "villager", "werewolf"]);
        let actions = vec![
            vote(1, Some(4)),
            vote(2, Some(1)),
            vote(3, Some(4)),
            vote(4, Some(1)),
        ];
        let lowest = run(&actions, &table, DayRules::default());
        assert_eq!(lowest.exiled, Some(1));
        assert_eq!(lowest.tied, vec![1, 4]);

        let none = run(
            &actions,
            &table,
            DayRules {
                tie_policy: TiePolicy::NoElimination,
            },
        );
        assert_eq!(none.exiled, None);
        assert_eq!(none.tied, vec![1, 4]);
    }

    #[test]
    fn test_immune_once_reveals_then_falls() {
        let catalog = RoleCatalog::standard();
        let mut table = players(&["idiot", "villager", "villager"]);
        let actions = vec![vote(1, Some(1)), vote(2, Some(1)), vote(3, Some(1))];

        let first = resolve(&actions, &Roster::new(&catalog, &table), &DayRules::default(), false)
            .unwrap();
        assert_eq!(first.summary.revealed, Some(1));
        assert_eq!(first.summary.exiled, None);
        assert!(first.apply(&mut table).is_empty());
        assert!(table[0].alive);
        assert!(table[0].meta.immunity_spent);

        let second = resolve(&actions, &Roster::new(&catalog, &table), &DayRules::default(), false)
            .unwrap();
        assert_eq!(second.summary.exiled, Some(1));
        assert_eq!(second.apply(&mut table), vec![1]);
    }

    #[test]
    fn test_jester_wins_by_exile() {
        let table = players(&["jester", "villager", "villager"]);
        let actions = vec![vote(1, None), vote(2, Some(1)), vote(3, Some(1))];
        let summary = run(&actions, &table, DayRules::default());
        assert_eq!(summary.exiled, Some(1));
        assert_eq!(summary.win.as_deref(), Some("jester"));
    }

    #[test]
    fn test_incomplete_tally_waits() {
        let catalog = RoleCatalog::standard();
        let table = players(&["villager", "villager", "werewolf"]);
        let roster = Roster::new(&catalog, &table);
        assert!(resolve(&[], &roster, &DayRules::default(), false).is_none());
        assert!(resolve(&[vote(1, Some(3))], &roster, &DayRules::default(), false).is_none());

        let forced = resolve(&[], &roster, &DayRules::default(), true).unwrap();
        assert_eq!(forced.summary.exiled, None);
        assert!(forced.summary.tally.is_empty());
    }

    #[test]
    fn test_dead_ballots_do_not_count() {
        let mut table = players(&["villager", "villager", "werewolf"]);
        table[1].kill();
        let actions = vec![vote(1, Some(3)), vote(2, Some(1)), vote(3, Some(1))];
        let summary = run(&actions, &table, DayRules::default());
        // 1 and 3 tie with one ballot each; the dead voter is ignored.
        assert_eq!(summary.tied, vec![1, 3]);
        assert_eq!(summary.exiled, Some(1));
    }
}
