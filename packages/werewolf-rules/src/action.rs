use serde::{Deserialize, Serialize};

use crate::catalog::Ability;
use crate::player::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Night,
    Day,
}

impl PhaseKind {
    pub fn next(self) -> Self {
        match self {
            PhaseKind::Night => PhaseKind::Day,
            PhaseKind::Day => PhaseKind::Night,
        }
    }
}

/// Every intent a player can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    WolfKill,
    SeerPeek,
    WitchHeal,
    WitchPoison,
    GuardianProtect,
    RavenMark,
    BindCouple,
    PiperCharm,
    DayVote,
}

impl ActionKind {
    /// The phase type this action belongs to.
    pub fn phase(self) -> PhaseKind {
        match self {
            ActionKind::DayVote => PhaseKind::Day,
            _ => PhaseKind::Night,
        }
    }

    /// Ability that grants the action. Kills and votes are granted by camp and membership instead.
    pub fn required_ability(self) -> Option<Ability> {
        match self {
            ActionKind::WolfKill | ActionKind::DayVote => None,
            ActionKind::SeerPeek => Some(Ability::Peek),
            ActionKind::WitchHeal | ActionKind::WitchPoison => Some(Ability::Potions),
            ActionKind::GuardianProtect => Some(Ability::Protect),
            ActionKind::RavenMark => Some(Ability::Mark),
            ActionKind::BindCouple => Some(Ability::BindCouple),
            ActionKind::PiperCharm => Some(Ability::Charm),
        }
    }

    /// Day votes may be cast without a target to abstain.
    pub fn requires_target(self) -> bool {
        self != ActionKind::DayVote
    }

    pub fn requires_second_target(self) -> bool {
        matches!(self, ActionKind::BindCouple | ActionKind::PiperCharm)
    }
}

/// A declared intent for one phase. At most one exists per actor and phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub actor: UserId,
    pub kind: ActionKind,
    pub target: Option<UserId>,
    /// Second target of paired abilities.
    pub second_target: Option<UserId>,
}

impl Action {
    pub fn new(actor: UserId, kind: ActionKind, target: Option<UserId>) -> Self {
        Action {
            actor,
            kind,
            target,
            second_target: None,
        }
    }

    pub fn paired(actor: UserId, kind: ActionKind, target: UserId, second_target: UserId) -> Self {
        Action {
            actor,
            kind,
            target: Some(target),
            second_target: Some(second_target),
        }
    }

    /// Both targets, in declaration order.
    pub fn targets(&self) -> impl Iterator<Item = UserId> {
        self.target.into_iter().chain(self.second_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_alternates() {
        assert_eq!(PhaseKind::Night.next(), PhaseKind::Day);
        assert_eq!(PhaseKind::Day.next(), PhaseKind::Night);
    }

    #[test]
    fn test_only_votes_are_day_actions() {
        assert_eq!(ActionKind::DayVote.phase(), PhaseKind::Day);
        assert_eq!(ActionKind::WolfKill.phase(), PhaseKind::Night);
        assert_eq!(ActionKind::PiperCharm.phase(), PhaseKind::Night);
    }

    #[test]
    fn test_action_kind_wire_names() {
        let json = serde_json::to_string(&ActionKind::GuardianProtect).unwrap();
        assert_eq!(json, "\"guardian_protect\"");
        let kind: ActionKind = serde_json::from_str("\"wolf_kill\"").unwrap();
        assert_eq!(kind, ActionKind::WolfKill);
    }
}
