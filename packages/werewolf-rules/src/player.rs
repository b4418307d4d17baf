use serde::{Deserialize, Serialize};

use crate::catalog::{Ability, RoleCatalog, RoleDef};

pub type UserId = u32;

/// Per-player bookkeeping written by resolvers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerMeta {
    /// Set once an immune-once role has survived an exile. Never unset.
    pub immunity_spent: bool,
    pub heals_used: u32,
    pub poisons_used: u32,
    pub bound_to: Option<UserId>,
    pub charmed: bool,
    /// Phase numbers in which this player was marked.
    pub marked_in: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub user_id: UserId,
    pub role_key: String,
    pub alive: bool,
    pub meta: PlayerMeta,
}

impl PlayerState {
    pub fn new(user_id: UserId, role_key: impl Into<String>) -> Self {
        PlayerState {
            user_id,
            role_key: role_key.into(),
            alive: true,
            meta: PlayerMeta::default(),
        }
    }

    /// Flips the player to dead. Returns false when already dead; death never reverses.
    pub fn kill(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        true
    }
}

/// Read-only view joining players to their role definitions.
#[derive(Debug, Clone, Copy)]
pub struct Roster<'a> {
    catalog: &'a RoleCatalog,
    players: &'a [PlayerState],
}

impl<'a> Roster<'a> {
    pub fn new(catalog: &'a RoleCatalog, players: &'a [PlayerState]) -> Self {
        Roster { catalog, players }
    }

    pub fn player(&self, user_id: UserId) -> Option<&'a PlayerState> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn role_of(&self, user_id: UserId) -> Option<&'a RoleDef> {
        self.player(user_id)
            .and_then(|p| self.catalog.get(&p.role_key))
    }

    pub fn ability_of(&self, user_id: UserId) -> Option<Ability> {
        self.role_of(user_id).map(|r| r.ability)
    }

    pub fn is_alive(&self, user_id: UserId) -> bool {
        self.player(user_id).map(|p| p.alive).unwrap_or(false)
    }

    pub fn living(&self) -> impl Iterator<Item = &'a PlayerState> + 'a {
        self.players.iter().filter(|p| p.alive)
    }

    /// Living players whose role carries `ability`, in ascending id order.
    pub fn living_with(&self, ability: Ability) -> Vec<UserId> {
        let catalog = self.catalog;
        let mut ids: Vec<UserId> = self
            .living()
            .filter(|p| catalog.get(&p.role_key).map(|r| r.ability) == Some(ability))
            .map(|p| p.user_id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

pub fn find_player_mut(players: &mut [PlayerState], user_id: UserId) -> Option<&mut PlayerState> {
    players.iter_mut().find(|p| p.user_id == user_id)
}
