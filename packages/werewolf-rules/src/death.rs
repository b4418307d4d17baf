//! Follow-on activations surfaced when a player dies.
//!
//! Signals are declarative: opening a window for the revenge shot or the
//! take-down is up to whoever drives the game.

use serde::{Deserialize, Serialize};

use crate::catalog::Ability;
use crate::player::{Roster, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum DeathSignal {
    /// The dead player may shoot one player.
    RevengeShot { player: UserId },
    /// The dead player may take one player down with them.
    TakeOneDown { player: UserId },
    /// The dead player was bound to `partner`; paired fate is left to the caller.
    BoundPartner { player: UserId, partner: UserId },
    /// The role has a chained consequence the engine does not resolve.
    UnresolvedChain { player: UserId, role_key: String },
}

/// Signals raised by the death of `dead`.
pub fn death_triggers(dead: UserId, roster: &Roster) -> Vec<DeathSignal> {
    let mut signals = Vec::new();

    if let Some(role) = roster.role_of(dead) {
        match role.ability {
            Ability::RevengeShot => signals.push(DeathSignal::RevengeShot { player: dead }),
            Ability::TakeDownOnDeath => signals.push(DeathSignal::TakeOneDown { player: dead }),
            // TODO: resolve the seduction chain once charmed targets are tracked per seducer
            Ability::Seduce => signals.push(DeathSignal::UnresolvedChain {
                player: dead,
                role_key: role.key.clone(),
            }),
            _ => {}
        }
    }

    if let Some(partner) = roster.player(dead).and_then(|p| p.meta.bound_to) {
        if roster.is_alive(partner) {
            signals.push(DeathSignal::BoundPartner {
                player: dead,
                partner,
            });
        }
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RoleCatalog;
    use crate::player::PlayerState;

    #[test]
    fn test_hunter_and_king_signals() {
        let catalog = RoleCatalog::standard();
        let players = vec![
            PlayerState::new(1, "hunter"),
            PlayerState::new(2, "white_wolf_king"),
            PlayerState::new(3, "villager"),
        ];
        let roster = Roster::new(&catalog, &players);
        assert_eq!(
            death_triggers(1, &roster),
            vec![DeathSignal::RevengeShot { player: 1 }]
        );
        assert_eq!(
            death_triggers(2, &roster),
            vec![DeathSignal::TakeOneDown { player: 2 }]
        );
        assert!(death_triggers(3, &roster).is_empty());
    }

    #[test]
    fn test_seduction_chain_is_flagged() {
        let catalog = RoleCatalog::standard();
        let players = vec![PlayerState::new(1, "wolf_beauty")];
        let roster = Roster::new(&catalog, &players);
        assert_eq!(
            death_triggers(1, &roster),
            vec![DeathSignal::UnresolvedChain {
                player: 1,
                role_key: "wolf_beauty".to_string()
            }]
        );
    }

    #[test]
    fn test_bound_partner_signal() {
        let catalog = RoleCatalog::standard();
        let mut players = vec![PlayerState::new(1, "hunter"), PlayerState::new(2, "villager")];
        players[0].meta.bound_to = Some(2);
        players[0].kill();
        let roster = Roster::new(&catalog, &players);
        let signals = death_triggers(1, &roster);
        assert_eq!(signals.len(), 2);
        assert_eq!(
            signals[1],
            DeathSignal::BoundPartner {
                player: 1,
                partner: 2
            }
        );
        let json = serde_json::to_value(&signals[0]).unwrap();
        assert_eq!(json["signal"], "revenge_shot");
    }
}
