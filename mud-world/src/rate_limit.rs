//! In-memory, process-local rate limiting. Two keyed maps by
//! client IP; nothing here survives a restart, which is intentional.

use std::collections::HashMap;

use mud_config::Config;

#[derive(Debug, Default, Clone)]
struct RegistrationBucket {
    count: u32,
    last_created_at: i64,
}

#[derive(Debug, Default, Clone)]
struct LoginBucket {
    failed_attempts: Vec<i64>,
    blocked_until: Option<i64>,
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    registrations: HashMap<String, RegistrationBucket>,
    logins: HashMap<String, LoginBucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter::default()
    }

    /// Returns `Ok(())` if `ip` may register another account right now,
    /// else `Err` naming which guard tripped. Does not record the
    /// attempt -- call [`Self::record_registration`] after the account
    /// is actually created.
    pub fn check_registration(&self, ip: &str, now_ms: i64, cfg: &Config) -> Result<(), RegistrationDenied> {
        if !cfg.rate_limit.enabled {
            return Ok(());
        }
        if let Some(bucket) = self.registrations.get(ip) {
            if bucket.count >= cfg.rate_limit.max_accounts_per_ip {
                return Err(RegistrationDenied::TooManyAccounts);
            }
            let cooldown_ms = cfg.rate_limit.account_creation_cooldown_secs * 1000;
            if now_ms - bucket.last_created_at < cooldown_ms {
                return Err(RegistrationDenied::CreationCooldown);
            }
        }
        Ok(())
    }

    pub fn record_registration(&mut self, ip: &str, now_ms: i64) {
        let bucket = self.registrations.entry(ip.to_string()).or_default();
        bucket.count += 1;
        bucket.last_created_at = now_ms;
    }

    /// Returns `Err` with remaining seconds if `ip` is currently
    /// blocked from logging in.
    pub fn check_login(&self, ip: &str, now_ms: i64, cfg: &Config) -> Result<(), i64> {
        if !cfg.rate_limit.enabled {
            return Ok(());
        }
        if let Some(bucket) = self.logins.get(ip) {
            if let Some(until) = bucket.blocked_until {
                if now_ms < until {
                    return Err((until - now_ms + 999) / 1000);
                }
            }
        }
        Ok(())
    }

    /// Records a failed login attempt, dropping stale failures outside
    /// the window first. Blocks the IP once the threshold is crossed.
    pub fn record_login_failure(&mut self, ip: &str, now_ms: i64, cfg: &Config) {
        let window_ms = cfg.rate_limit.login_attempt_window_secs * 1000;
        let bucket = self.logins.entry(ip.to_string()).or_default();
        bucket.failed_attempts.retain(|t| now_ms - *t < window_ms);
        bucket.failed_attempts.push(now_ms);
        if bucket.failed_attempts.len() as u32 >= cfg.rate_limit.max_login_attempts {
            bucket.blocked_until = Some(now_ms + window_ms);
        }
    }

    /// A successful login clears the bucket entirely.
    pub fn record_login_success(&mut self, ip: &str) {
        self.logins.remove(ip);
    }

    /// Drops stale buckets; called by the tick scheduler's cleanup pass.
    pub fn cleanup(&mut self, now_ms: i64, cfg: &Config) {
        let window_ms = cfg.rate_limit.login_attempt_window_secs * 1000;
        self.logins.retain(|_, bucket| {
            bucket.failed_attempts.retain(|t| now_ms - *t < window_ms);
            !bucket.failed_attempts.is_empty()
                || bucket.blocked_until.map(|u| u > now_ms).unwrap_or(false)
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationDenied {
    TooManyAccounts,
    CreationCooldown,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        serde_json::from_value(serde_json::json!({
            "player_defaults": {"starting_gold": 0, "base_health": 20.0, "base_mana": 10.0, "base_damage": 2.0, "base_defense": 0.0},
            "gameplay": {"max_inventory_slots": 16, "flee_success_chance": 0.5, "enemy_respawn_time_ms": 500, "death_gold_loss_pct": 0.1, "death_respawn_location": "town_square", "damage_variance": 0.0, "pvp_gold_loot_percentage": 0.1},
            "progression": {"base_xp_per_level": 100, "xp_multiplier": 1.0, "health_per_level": 10.0, "mana_per_level": 5.0, "damage_per_level": 1.0, "defense_per_level": 1.0, "max_level": 5, "full_heal_on_level_up": true},
            "economy": {"shop_buy_multiplier": 1.0, "shop_sell_multiplier": 1.0, "healer_cost_factor": 1.0},
            "rate_limit": {"enabled": true, "max_accounts_per_ip": 2, "account_creation_cooldown_secs": 10, "login_attempt_window_secs": 60, "max_login_attempts": 3},
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
    fn blocks_after_max_accounts_per_ip() {
        let cfg = cfg();
        let mut rl = RateLimiter::new();
        rl.record_registration("1.2.3.4", 0);
        rl.record_registration("1.2.3.4", 100_000);
        assert_eq!(
            rl.check_registration("1.2.3.4", 200_000, &cfg),
            Err(RegistrationDenied::TooManyAccounts)
        );
    }

    #[test]
    fn enforces_creation_cooldown() {
        let cfg = cfg();
        let mut rl = RateLimiter::new();
        rl.record_registration("5.6.7.8", 0);
        assert_eq!(
            rl.check_registration("5.6.7.8", 500, &cfg),
            Err(RegistrationDenied::CreationCooldown)
        );
        assert_eq!(rl.check_registration("5.6.7.8", 20_000, &cfg), Ok(()));
    }

    #[test]
    fn blocks_login_after_max_attempts_and_clears_on_success() {
        let cfg = cfg();
        let mut rl = RateLimiter::new();
        rl.record_login_failure("9.9.9.9", 0, &cfg);
        rl.record_login_failure("9.9.9.9", 1, &cfg);
        rl.record_login_failure("9.9.9.9", 2, &cfg);
        assert!(rl.check_login("9.9.9.9", 3, &cfg).is_err());
        rl.record_login_success("9.9.9.9");
        assert_eq!(rl.check_login("9.9.9.9", 4, &cfg), Ok(()));
    }
}
