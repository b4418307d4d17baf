use std::env;

use werewolf_rules::day::{DayRules, TiePolicy};
use werewolf_rules::night::{NightCompletion, NightRules};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub night_duration_seconds: u64,
    pub day_duration_seconds: u64,
    pub min_players: usize,
    // 設定人数に満たない分を埋める役職
    pub filler_role: String,
    // 固定シードで役職を割り当てる（テスト・リプレイ用）
    pub role_seed: Option<u64>,
    pub max_resolution_retries: u32,
    pub night: NightRules,
    pub day: DayRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            night_duration_seconds: 90,
            day_duration_seconds: 120,
            min_players: 5,
            filler_role: "villager".to_string(),
            role_seed: None,
            max_resolution_retries: 3,
            night: NightRules::default(),
            day: DayRules::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let night_duration_seconds = parse_var("WEREWOLF_NIGHT_SECONDS")
            .unwrap_or(defaults.night_duration_seconds);
        let day_duration_seconds =
            parse_var("WEREWOLF_DAY_SECONDS").unwrap_or(defaults.day_duration_seconds);
        let min_players = parse_var("WEREWOLF_MIN_PLAYERS").unwrap_or(defaults.min_players);
        let filler_role = env::var("WEREWOLF_FILLER_ROLE").unwrap_or(defaults.filler_role);
        let role_seed = parse_var("WEREWOLF_ROLE_SEED");
        let max_resolution_retries = parse_var("WEREWOLF_MAX_RESOLUTION_RETRIES")
            .unwrap_or(defaults.max_resolution_retries);

        let tie_policy = match env::var("WEREWOLF_TIE_POLICY").as_deref() {
            Ok("no_elimination") => TiePolicy::NoElimination,
            _ => TiePolicy::LowestId,
        };
        let completion = match env::var("WEREWOLF_NIGHT_COMPLETION").as_deref() {
            Ok("all_killers") => NightCompletion::AllKillers,
            _ => NightCompletion::AnyKill,
        };
        let heal_uses_per_game =
            parse_var("WEREWOLF_HEAL_USES").unwrap_or(defaults.night.heal_uses_per_game);
        let poison_uses_per_game =
            parse_var("WEREWOLF_POISON_USES").unwrap_or(defaults.night.poison_uses_per_game);

        Self {
            night_duration_seconds,
            day_duration_seconds,
            min_players,
            filler_role,
            role_seed,
            max_resolution_retries,
            night: NightRules {
                completion,
                heal_uses_per_game,
                poison_uses_per_game,
            },
            day: DayRules { tie_policy },
        }
    }

    pub fn duration_for(&self, kind: werewolf_rules::PhaseKind) -> u64 {
        match kind {
            werewolf_rules::PhaseKind::Night => self.night_duration_seconds,
            werewolf_rules::PhaseKind::Day => self.day_duration_seconds,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.min_players, 5);
        assert_eq!(config.filler_role, "villager");
        assert_eq!(config.day.tie_policy, TiePolicy::LowestId);
        assert_eq!(config.night.poison_uses_per_game, 1);
        assert_eq!(config.duration_for(werewolf_rules::PhaseKind::Night), 90);
    }
}
