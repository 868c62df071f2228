//! `data/config.json` schema and a process-wide static handle to it,
//! loaded once at startup into a `OnceLock` so every task sees the
//! same immutable snapshot without re-reading disk.

use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Returns the loaded config. Panics if [`load`] has not yet run; the
/// server always loads config before accepting connections, so any
/// call site reachable from a live session can rely on this.
pub fn config() -> &'static Config {
    CONFIG.get().expect("config not loaded yet")
}

/// Loads `config.json` from `data_dir` and installs it as the process
/// static. Returns the parsed config for callers (such as tests) that
/// want it without going through the global.
pub fn load(data_dir: &Path) -> Result<&'static Config, ConfigError> {
    let path = data_dir.join("config.json");
    let text = std::fs::read_to_string(&path)
        .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
    let parsed: Config = serde_json::from_str(&text)
        .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))?;
    Ok(CONFIG.get_or_init(|| parsed))
}

/// Installs a config directly, bypassing disk I/O. Used by tests that
/// want a known-good config without writing a fixture file.
pub fn install_for_test(cfg: Config) -> &'static Config {
    CONFIG.get_or_init(|| cfg)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {0}: {1}")]
    Io(String, String),
    #[error("could not parse {0}: {1}")]
    Parse(String, String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub player_defaults: PlayerDefaults,
    pub gameplay: Gameplay,
    pub progression: Progression,
    pub economy: Economy,
    pub rate_limit: RateLimit,
    pub dropped_item_lifetime_ms: i64,
    pub max_dropped_items_per_location: usize,
    pub item_use_cooldown_ms: i64,
    pub enemy_counter_attack_delay_ms: i64,
    pub combat_round_delay_ms: i64,
    pub combat_timeout_ms: i64,
    pub tick_interval_ms: u64,
    pub starting_location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDefaults {
    pub starting_gold: i64,
    pub base_health: f64,
    pub base_mana: f64,
    pub base_damage: f64,
    pub base_defense: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gameplay {
    pub max_inventory_slots: usize,
    pub flee_success_chance: f64,
    pub enemy_respawn_time_ms: i64,
    pub death_gold_loss_pct: f64,
    pub death_respawn_location: String,
    pub damage_variance: f64,
    pub pvp_gold_loot_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progression {
    pub base_xp_per_level: i64,
    pub xp_multiplier: f64,
    pub health_per_level: f64,
    pub mana_per_level: f64,
    pub damage_per_level: f64,
    pub defense_per_level: f64,
    pub max_level: i32,
    #[serde(default)]
    pub full_heal_on_level_up: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Economy {
    pub shop_buy_multiplier: f64,
    pub shop_sell_multiplier: f64,
    pub healer_cost_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimit {
    pub enabled: bool,
    pub max_accounts_per_ip: u32,
    pub account_creation_cooldown_secs: i64,
    pub login_attempt_window_secs: i64,
    pub max_login_attempts: u32,
}

impl Default for Config {
    /// A conservative default used by tests and by a first boot with no
    /// `config.json` written yet is deliberately *not* provided: a
    /// missing config is a fatal startup error, since gameplay
    /// constants silently defaulting would contradict config being the
    /// single source of truth for things like `damageVariance`.
    fn default() -> Self {
        unimplemented!(
            "Config has no implicit default; load() from data/config.json or use install_for_test"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            player_defaults: PlayerDefaults {
                starting_gold: 0,
                base_health: 20.0,
                base_mana: 10.0,
                base_damage: 2.0,
                base_defense: 0.0,
            },
            gameplay: Gameplay {
                max_inventory_slots: 16,
                flee_success_chance: 0.5,
                enemy_respawn_time_ms: 30_000,
                death_gold_loss_pct: 0.1,
                death_respawn_location: "town_square".into(),
                damage_variance: 0.2,
                pvp_gold_loot_percentage: 0.1,
            },
            progression: Progression {
                base_xp_per_level: 100,
                xp_multiplier: 1.2,
                health_per_level: 10.0,
                mana_per_level: 5.0,
                damage_per_level: 1.0,
                defense_per_level: 1.0,
                max_level: 50,
                full_heal_on_level_up: true,
            },
            economy: Economy {
                shop_buy_multiplier: 1.2,
                shop_sell_multiplier: 0.5,
                healer_cost_factor: 1.0,
            },
            rate_limit: RateLimit {
                enabled: true,
                max_accounts_per_ip: 3,
                account_creation_cooldown_secs: 60,
                login_attempt_window_secs: 300,
                max_login_attempts: 5,
            },
            dropped_item_lifetime_ms: 300_000,
            max_dropped_items_per_location: 50,
            item_use_cooldown_ms: 1000,
            enemy_counter_attack_delay_ms: 500,
            combat_round_delay_ms: 1500,
            combat_timeout_ms: 300_000,
            tick_interval_ms: 1000,
            starting_location: "town_square".into(),
        }
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = sample();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.gameplay.max_inventory_slots, 16);
    }
}
