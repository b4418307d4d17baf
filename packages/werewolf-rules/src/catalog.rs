//! Role catalog: the immutable table of every role a room may configure.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::error::GameError;

/// Alignment of a role, deciding which side it wins with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Camp {
    Villager,
    Werewolf,
    Neutral,
}

/// What a role is able to do. Resolvers dispatch on this tag, never on the role key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    /// Plain villager.
    None,
    NightKill,
    Peek,
    /// One heal and one poison potion per game.
    Potions,
    Protect,
    /// Shoots someone when dying.
    RevengeShot,
    /// Takes one player down when dying.
    TakeDownOnDeath,
    /// Survives the first exile by revealing.
    ImmuneOnce,
    DoubleVote,
    /// Exiled in place of tied candidates.
    Scapegoat,
    Mark,
    BindCouple,
    Charm,
    /// Charms someone who follows them into death. Chain death has no resolution yet.
    Seduce,
    /// Wins by getting exiled.
    SelfEliminationWin,
    /// Catalogued, but the engine has no resolution logic for it.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDef {
    pub key: String,
    pub name: String,
    pub description: String,
    pub camp: Camp,
    pub ability: Ability,
}

impl RoleDef {
    pub fn new(key: &str, name: &str, description: &str, camp: Camp, ability: Ability) -> Self {
        RoleDef {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            camp,
            ability,
        }
    }

    /// Whether a holder of this role may submit `kind`.
    ///
    /// Every werewolf-camp role joins the nightly kill and anyone may vote by day;
    /// all other actions need the matching ability.
    pub fn grants(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::DayVote => true,
            ActionKind::WolfKill => self.camp == Camp::Werewolf,
            other => other.required_ability() == Some(self.ability),
        }
    }

    /// What an investigative peek reports for a holder of this role.
    ///
    /// Every werewolf-camp role reads as a werewolf, breeder and wild wolves included.
    pub fn reads_as_werewolf(&self) -> bool {
        self.camp == Camp::Werewolf
    }
}

impl fmt::Display for RoleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.key)
    }
}

/// Immutable role table, built once at process start and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    roles: BTreeMap<String, RoleDef>,
}

const STANDARD_ROLES: &[(&str, &str, &str, Camp, Ability)] = &[
    // villager camp
    ("seer", "Seer", "Checks one player's alignment each night", Camp::Villager, Ability::Peek),
    ("witch", "Witch", "Holds one healing and one poison potion", Camp::Villager, Ability::Potions),
    ("hunter", "Hunter", "Takes a shot at someone when dying", Camp::Villager, Ability::RevengeShot),
    ("guardian", "Guardian", "Protects one player each night", Camp::Villager, Ability::Protect),
    ("idiot", "Idiot", "Survives the first exile by revealing", Camp::Villager, Ability::ImmuneOnce),
    ("little_girl", "Little Girl", "Spies on the werewolves at night", Camp::Villager, Ability::Unresolved),
    ("thief", "Thief", "Picks one of two roles at the start", Camp::Villager, Ability::Unresolved),
    ("village_head", "Village Head", "Casts a double vote by day", Camp::Villager, Ability::DoubleVote),
    ("scapegoat", "Scapegoat", "Is exiled whenever the vote ties", Camp::Villager, Ability::Scapegoat),
    ("snow_blender", "Snow Blender", "A special villager variant", Camp::Villager, Ability::Unresolved),
    ("wild_kid", "Wild Kid", "Picks a mentor and turns wolf when the mentor dies", Camp::Villager, Ability::Unresolved),
    ("raven", "Raven", "Marks a player for an extra vote", Camp::Villager, Ability::Mark),
    ("fox", "Fox", "Learns whether three players hide a wolf", Camp::Villager, Ability::Unresolved),
    ("bear", "Bear", "Growls when a neighbour is a wolf", Camp::Villager, Ability::Unresolved),
    ("stutter_judge", "Stutter Judge", "May interrupt the flow once", Camp::Villager, Ability::Unresolved),
    ("knight", "Knight", "Challenges a suspected wolf by day", Camp::Villager, Ability::Unresolved),
    ("changeling", "Changeling", "Swaps role at a set moment", Camp::Villager, Ability::Unresolved),
    ("maid", "Devoted Maid", "Follows her master's orders", Camp::Villager, Ability::Unresolved),
    ("nine_tailed_fox", "Nine-Tailed Fox", "Reads as good but must survive alone", Camp::Villager, Ability::Unresolved),
    ("villager", "Villager", "No ability", Camp::Villager, Ability::None),
    // werewolf camp
    ("werewolf", "Werewolf", "Kills one player each night", Camp::Werewolf, Ability::NightKill),
    ("white_wolf_king", "White Wolf King", "Takes one player down when dying", Camp::Werewolf, Ability::TakeDownOnDeath),
    ("wolfdog", "Wolfdog", "Good by day, wolf by night", Camp::Werewolf, Ability::Unresolved),
    ("breeder_wolf", "Breeder Wolf", "May revive a slain wolf", Camp::Werewolf, Ability::Unresolved),
    ("wild_wolf", "Wild Wolf", "A stronger attacker", Camp::Werewolf, Ability::NightKill),
    ("wolf_beauty", "Wolf Beauty", "Charms one player who dies with her", Camp::Werewolf, Ability::Seduce),
    ("demon", "Demon", "A werewolf with a special power", Camp::Werewolf, Ability::Unresolved),
    // neutral camp
    ("cupid", "Cupid", "Binds two lovers who share one fate", Camp::Neutral, Ability::BindCouple),
    ("piper", "Piper", "Charms two players a night and wins when all are charmed", Camp::Neutral, Ability::Charm),
    ("angel", "Angel", "Wins by dying on the first day", Camp::Neutral, Ability::Unresolved),
    ("jester", "Jester", "Wins by getting exiled", Camp::Neutral, Ability::SelfEliminationWin),
];

impl RoleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full built-in role table. Building it twice yields identical catalogs.
    pub fn standard() -> Self {
        let mut catalog = RoleCatalog::new();
        for (key, name, description, camp, ability) in STANDARD_ROLES {
            catalog.upsert(RoleDef::new(key, name, description, *camp, *ability));
        }
        catalog
    }

    /// Inserts `role`, replacing any definition with the same key. Returns the replaced one.
    pub fn upsert(&mut self, role: RoleDef) -> Option<RoleDef> {
        self.roles.insert(role.key.clone(), role)
    }

    pub fn get(&self, key: &str) -> Option<&RoleDef> {
        self.roles.get(key)
    }

    pub fn require(&self, key: &str) -> Result<&RoleDef, GameError> {
        self.get(key)
            .ok_or_else(|| GameError::Config(format!("unknown role key '{}'", key)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.roles.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleDef> {
        self.roles.values()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_is_idempotent() {
        let first = RoleCatalog::standard();
        let mut second = RoleCatalog::standard();
        for role in first.iter() {
            second.upsert(role.clone());
        }
        assert_eq!(first.len(), second.len());
        assert_eq!(first.len(), STANDARD_ROLES.len());
    }

    #[test]
    fn test_camp_counts() {
        let catalog = RoleCatalog::standard();
        let count = |camp| catalog.iter().filter(|r| r.camp == camp).count();
        assert_eq!(count(Camp::Villager), 20);
        assert_eq!(count(Camp::Werewolf), 7);
        assert_eq!(count(Camp::Neutral), 4);
    }

    #[test]
    fn test_upsert_replaces_by_key() {
        let mut catalog = RoleCatalog::standard();
        let replaced = catalog.upsert(RoleDef::new(
            "villager",
            "Townsfolk",
            "",
            Camp::Villager,
            Ability::None,
        ));
        assert_eq!(replaced.unwrap().name, "Villager");
        assert_eq!(catalog.get("villager").unwrap().name, "Townsfolk");
        assert_eq!(catalog.len(), STANDARD_ROLES.len());
    }

    #[test]
    fn test_peek_reads_by_camp() {
        let catalog = RoleCatalog::standard();
        for key in ["werewolf", "white_wolf_king", "wolfdog", "wolf_beauty", "demon", "breeder_wolf", "wild_wolf"] {
            assert!(catalog.get(key).unwrap().reads_as_werewolf(), "{}", key);
        }
        for key in ["villager", "seer", "nine_tailed_fox", "piper", "jester"] {
            assert!(!catalog.get(key).unwrap().reads_as_werewolf(), "{}", key);
        }
    }

    #[test]
    fn test_grants() {
        let catalog = RoleCatalog::standard();
        let king = catalog.get("white_wolf_king").unwrap();
        assert!(king.grants(ActionKind::WolfKill));
        assert!(!king.grants(ActionKind::SeerPeek));

        let witch = catalog.get("witch").unwrap();
        assert!(witch.grants(ActionKind::WitchHeal));
        assert!(witch.grants(ActionKind::WitchPoison));
        assert!(!witch.grants(ActionKind::WolfKill));
        assert!(witch.grants(ActionKind::DayVote));
    }

    #[test]
    fn test_unknown_role_is_config_error() {
        let catalog = RoleCatalog::standard();
        assert!(matches!(catalog.require("dragon"), Err(GameError::Config(_))));
    }
}
