//! The authoritative per-player record. `Player` is the
//! in-memory copy of the on-disk file for attached players; every
//! meaningful mutation goes through `WorldState` (in `mud-world`) and
//! is written back by the `mud-player` store.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use mud_config::Config;
use mud_core::{ItemId, LocationId, MaterialId, QuestId, RecipeId, Username};
use serde::{Deserialize, Serialize};

use crate::trade::TradeState;

pub const PLAYER_SCHEMA_VERSION: u8 = 1;

fn current_schema_version() -> u8 {
    PLAYER_SCHEMA_VERSION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlotKind {
    Weapon,
    Armor,
    Shield,
    Accessory,
}

impl EquipSlotKind {
    pub const ALL: [EquipSlotKind; 4] = [
        EquipSlotKind::Weapon,
        EquipSlotKind::Armor,
        EquipSlotKind::Shield,
        EquipSlotKind::Accessory,
    ];
}

/// A single inventory slot's contents. Items don't stack; two swords are
/// two entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemInstance {
    pub item_id: ItemId,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stats {
    pub level: i32,
    pub xp: i64,
    pub base_health: f64,
    pub base_mana: f64,
    pub base_damage: f64,
    pub base_defense: f64,
    pub current_health: f64,
    pub current_mana: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    #[serde(default = "current_schema_version")]
    pub schema_version: u8,
    pub id: String,
    pub username: Username,
    pub password_hash: String,
    pub location: LocationId,
    pub stats: Stats,
    pub gold: i64,
    pub inventory: Vec<ItemInstance>,
    pub materials: IndexMap<MaterialId, u64>,
    pub equipped: IndexMap<EquipSlotKind, Option<ItemInstance>>,
    pub known_recipes: IndexSet<RecipeId>,
    pub active_quests: IndexMap<QuestId, i64>,
    pub completed_quests: IndexSet<QuestId>,
    pub quest_items: IndexMap<String, u64>,
    pub one_time_enemies_defeated: HashSet<String>,
    pub one_time_items_picked_up: HashSet<String>,
    pub last_harvest: IndexMap<String, i64>,
    pub last_whisper_from: Option<Username>,
    pub friends: IndexSet<Username>,
    pub pvp_wins: u64,
    pub pvp_losses: u64,
    pub homestone_location: Option<LocationId>,
    pub last_item_use_at: Option<i64>,
    pub banned_until: Option<i64>,
    pub in_pvp_combat: bool,
    #[serde(skip)]
    pub active_trade: Option<TradeState>,
    pub is_gm: bool,
}

impl Player {
    pub fn new(
        id: String,
        username: Username,
        password_hash: String,
        starting_location: LocationId,
        cfg: &Config,
    ) -> Self {
        let mut equipped = IndexMap::new();
        for slot in EquipSlotKind::ALL {
            equipped.insert(slot, None);
        }
        Player {
            schema_version: PLAYER_SCHEMA_VERSION,
            id,
            username,
            password_hash,
            location: starting_location,
            stats: Stats {
                level: 1,
                xp: 0,
                base_health: cfg.player_defaults.base_health,
                base_mana: cfg.player_defaults.base_mana,
                base_damage: cfg.player_defaults.base_damage,
                base_defense: cfg.player_defaults.base_defense,
                current_health: cfg.player_defaults.base_health,
                current_mana: cfg.player_defaults.base_mana,
            },
            gold: cfg.player_defaults.starting_gold,
            inventory: Vec::new(),
            materials: IndexMap::new(),
            equipped,
            known_recipes: IndexSet::new(),
            active_quests: IndexMap::new(),
            completed_quests: IndexSet::new(),
            quest_items: IndexMap::new(),
            one_time_enemies_defeated: HashSet::new(),
            one_time_items_picked_up: HashSet::new(),
            last_harvest: IndexMap::new(),
            last_whisper_from: None,
            friends: IndexSet::new(),
            pvp_wins: 0,
            pvp_losses: 0,
            homestone_location: None,
            last_item_use_at: None,
            banned_until: None,
            in_pvp_combat: false,
            active_trade: None,
            is_gm: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.stats.current_health > 0.0
    }

    pub fn max_health(&self, cfg: &Config) -> f64 {
        self.stats.base_health + cfg.progression.health_per_level * (self.stats.level - 1) as f64
    }

    pub fn max_mana(&self, cfg: &Config) -> f64 {
        self.stats.base_mana + cfg.progression.mana_per_level * (self.stats.level - 1) as f64
    }

    pub fn damage(&self, cfg: &Config) -> f64 {
        self.stats.base_damage + cfg.progression.damage_per_level * (self.stats.level - 1) as f64
    }

    pub fn defense(&self, cfg: &Config) -> f64 {
        self.stats.base_defense + cfg.progression.defense_per_level * (self.stats.level - 1) as f64
    }

    /// XP required to advance from `level` to `level + 1`. Exponential
    /// curve on `xpMultiplier`; see DESIGN.md for why this shape was
    /// chosen over a flat or linear one.
    pub fn xp_to_next_level(level: i32, cfg: &Config) -> i64 {
        let exp = (level - 1).max(0) as i32;
        (cfg.progression.base_xp_per_level as f64 * cfg.progression.xp_multiplier.powi(exp)) as i64
    }

    /// Credits `amount` xp and applies every level-up it unlocks,
    /// capped at `maxLevel`. Re-running this with no new xp is a no-op
    ///, since the loop condition is purely
    /// a function of `xp` and `level`.
    pub fn grant_xp(&mut self, amount: i64, cfg: &Config) -> i32 {
        self.stats.xp += amount;
        let mut levels_gained = 0;
        while self.stats.level < cfg.progression.max_level {
            let needed = Self::xp_to_next_level(self.stats.level, cfg);
            if self.stats.xp < needed {
                break;
            }
            self.stats.xp -= needed;
            self.stats.level += 1;
            levels_gained += 1;
        }
        if levels_gained > 0 {
            if cfg.progression.full_heal_on_level_up {
                self.stats.current_health = self.max_health(cfg);
                self.stats.current_mana = self.max_mana(cfg);
            } else {
                self.stats.current_health = self.stats.current_health.min(self.max_health(cfg));
                self.stats.current_mana = self.stats.current_mana.min(self.max_mana(cfg));
            }
        }
        levels_gained
    }

    pub fn inventory_has_space(&self, cfg: &Config) -> bool {
        self.inventory.len() < cfg.gameplay.max_inventory_slots
    }

    pub fn find_inventory_index(&self, item_id: &ItemId) -> Option<usize> {
        self.inventory.iter().position(|i| &i.item_id == item_id)
    }

    pub fn one_time_key(location: &LocationId, entity_id: &str) -> String {
        format!("{location}.{entity_id}")
    }

    pub fn harvest_key(location: &LocationId, material_id: &MaterialId) -> String {
        format!("{location}_{material_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        serde_json::from_value(serde_json::json!({
            "player_defaults": {"starting_gold": 0, "base_health": 20.0, "base_mana": 10.0, "base_damage": 2.0, "base_defense": 0.0},
            "gameplay": {"max_inventory_slots": 2, "flee_success_chance": 1.0, "enemy_respawn_time_ms": 500, "death_gold_loss_pct": 0.1, "death_respawn_location": "town_square", "damage_variance": 0.0, "pvp_gold_loot_percentage": 0.1},
            "progression": {"base_xp_per_level": 100, "xp_multiplier": 1.0, "health_per_level": 10.0, "mana_per_level": 5.0, "damage_per_level": 1.0, "defense_per_level": 1.0, "max_level": 5, "full_heal_on_level_up": true},
            "economy": {"shop_buy_multiplier": 1.0, "shop_sell_multiplier": 1.0, "healer_cost_factor": 1.0},
            "rate_limit": {"enabled": true, "max_accounts_per_ip": 3, "account_creation_cooldown_secs": 60, "login_attempt_window_secs": 300, "max_login_attempts": 5},
            "dropped_item_lifetime_ms": 300000,
            "max_dropped_items_per_location": 50,
            "item_use_cooldown_ms": 1000,
            "enemy_counter_attack_delay_ms": 500,
            "combat_round_delay_ms": 1500,
            "combat_timeout_ms": 300000,
            "tick_interval_ms": 1000,
            "starting_location": "town_square"
        }))
        .unwrap()
    }

    #[test]
    fn grants_xp_and_levels_up_exactly_once() {
        let cfg = test_config();
        let mut p = Player::new("1".into(), "alice".into(), "hash".into(), "town_square".into(), &cfg);
        let gained = p.grant_xp(100, &cfg);
        assert_eq!(gained, 1);
        assert_eq!(p.stats.level, 2);
        assert_eq!(p.stats.xp, 0);
    }

    #[test]
    fn level_up_is_idempotent_on_repeated_application() {
        let cfg = test_config();
        let mut p = Player::new("1".into(), "alice".into(), "hash".into(), "town_square".into(), &cfg);
        p.grant_xp(100, &cfg);
        let level_after_first = p.stats.level;
        let gained_again = p.grant_xp(0, &cfg);
        assert_eq!(gained_again, 0);
        assert_eq!(p.stats.level, level_after_first);
    }

    #[test]
    fn levels_cap_at_max_level() {
        let cfg = test_config();
        let mut p = Player::new("1".into(), "alice".into(), "hash".into(), "town_square".into(), &cfg);
        p.grant_xp(100_000, &cfg);
        assert_eq!(p.stats.level, cfg.progression.max_level);
    }

    #[test]
    fn max_health_scales_with_level() {
        let cfg = test_config();
        let mut p = Player::new("1".into(), "alice".into(), "hash".into(), "town_square".into(), &cfg);
        assert_eq!(p.max_health(&cfg), 20.0);
        p.grant_xp(100, &cfg);
        assert_eq!(p.max_health(&cfg), 30.0);
    }
}
