//! Write-through, file-per-player persistence. One JSON
//! file per username under the persist root; writes are atomic via a
//! write-then-rename so a crash mid-write never corrupts a record.

use std::path::PathBuf;

use mud_core::Username;
use thiserror::Error;

use crate::player::Player;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read {0}: {1}")]
    Read(String, String),
    #[error("could not write {0}: {1}")]
    Write(String, String),
    #[error("could not parse {0}: {1}")]
    Parse(String, String),
}

pub struct PlayerStore {
    root: PathBuf,
}

impl PlayerStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PlayerStore { root: root.into() }
    }

    fn path_for(&self, username: &Username) -> PathBuf {
        self.root.join(format!("{}.json", username.normalized()))
    }

    pub fn exists(&self, username: &Username) -> bool {
        self.path_for(username).is_file()
    }

    pub fn load(&self, username: &Username) -> Result<Player, StoreError> {
        let path = self.path_for(username);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| StoreError::Read(path.display().to_string(), e.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Parse(path.display().to_string(), e.to_string()))
    }

    /// Writes `player` atomically: serialize to a sibling `.tmp` file,
    /// then rename over the final path. `rename` is atomic on the same
    /// filesystem, so readers never observe a half-written file.
    pub fn save(&self, player: &Player) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| StoreError::Write(self.root.display().to_string(), e.to_string()))?;
        let path = self.path_for(&player.username);
        let tmp_path = path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(player)
            .map_err(|e| StoreError::Write(path.display().to_string(), e.to_string()))?;
        std::fs::write(&tmp_path, text)
            .map_err(|e| StoreError::Write(tmp_path.display().to_string(), e.to_string()))?;
        std::fs::rename(&tmp_path, &path)
            .map_err(|e| StoreError::Write(path.display().to_string(), e.to_string()))?;
        Ok(())
    }

    pub fn delete(&self, username: &Username) -> Result<(), StoreError> {
        let path = self.path_for(username);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Write(path.display().to_string(), e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_config::Config;

    fn cfg() -> Config {
        serde_json::from_value(serde_json::json!({
            "player_defaults": {"starting_gold": 10, "base_health": 20.0, "base_mana": 10.0, "base_damage": 2.0, "base_defense": 0.0},
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
    fn round_trips_a_player_through_disk() {
        let dir = std::env::temp_dir().join(format!("mud-player-store-test-{}", std::process::id()));
        let store = PlayerStore::new(&dir);
        let cfg = cfg();
        let player = Player::new(
            "p1".into(),
            "Alice".into(),
            "hash".into(),
            "town_square".into(),
            &cfg,
        );
        store.save(&player).unwrap();
        assert!(store.exists(&"alice".into()));
        let loaded = store.load(&"ALICE".into()).unwrap();
        assert_eq!(loaded.username.as_str(), "Alice");
        assert_eq!(loaded.gold, 10);
        store.delete(&player.username).unwrap();
        assert!(!store.exists(&player.username));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
