//! Registration and login. Both functions are pure decisions
//! over `WorldState` plus the rate limiter and player store; neither
//! touches a socket. The `mud` binary's Session Layer is responsible
//! for turning a successful [`login`] into an [`crate::presence`]
//! displacement when the username is already attached, and for
//! attaching the returned record afterward.

use mud_config::Config;
use mud_core::{time::now_ms, GameError, Username};
use mud_player::{password, Player};

use crate::rate_limit::RegistrationDenied;
use crate::state::WorldState;

/// Usernames are 3-12 ASCII letters, matched case-insensitively
/// elsewhere via [`Username::normalized`].
pub fn validate_username(username: &str) -> Result<(), GameError> {
    let len_ok = (3..=12).contains(&username.len());
    let alpha_ok = !username.is_empty() && username.chars().all(|c| c.is_ascii_alphabetic());
    if len_ok && alpha_ok {
        Ok(())
    } else {
        Err(GameError::AuthUsernameMalformed)
    }
}

/// Creates a new account. Does not attach it -- the caller
/// binds the returned `Player` to a socket once the frame layer is
/// ready to accept outbound traffic.
pub fn register(
    state: &mut WorldState,
    cfg: &Config,
    client_ip: &str,
    username_raw: &str,
    password_raw: &str,
) -> Result<Player, GameError> {
    validate_username(username_raw)?;
    if password_raw.len() < 3 {
        return Err(GameError::AuthPasswordTooShort);
    }

    let now = now_ms();
    state
        .rate_limiter
        .check_registration(client_ip, now, cfg)
        .map_err(|denied| match denied {
            RegistrationDenied::TooManyAccounts => GameError::RateLimitTooManyAccounts,
            RegistrationDenied::CreationCooldown => GameError::RateLimitCreationCooldown,
        })?;

    let username: Username = username_raw.into();
    if state.store.exists(&username) || state.is_attached(&username) {
        return Err(GameError::AuthUsernameTaken);
    }

    let id = uuid::Uuid::new_v4().to_string();
    let hashed = password::hash_password(password_raw);
    let player = Player::new(id, username, hashed, cfg.starting_location.clone().into(), cfg);
    state
        .store
        .save(&player)
        .expect("player store write must succeed");
    state.rate_limiter.record_registration(client_ip, now);
    Ok(player)
}

/// Validates credentials and returns the account's current record
///. Prefers the in-memory copy when the account is already
/// attached so a displacing login sees the latest unsaved state
/// instead of a stale disk copy.
pub fn login(
    state: &mut WorldState,
    cfg: &Config,
    client_ip: &str,
    username_raw: &str,
    password_raw: &str,
) -> Result<Player, GameError> {
    let now = now_ms();
    if let Err(remaining_secs) = state.rate_limiter.check_login(client_ip, now, cfg) {
        return Err(GameError::RateLimitLoginBlocked { remaining_secs });
    }

    let username: Username = username_raw.into();
    let record = match state.player(&username).cloned() {
        Some(attached) => attached,
        None => match state.store.load(&username) {
            Ok(player) => player,
            Err(_) => {
                state.rate_limiter.record_login_failure(client_ip, now, cfg);
                return Err(GameError::AuthInvalidCredentials);
            }
        },
    };

    if let Some(banned_until) = record.banned_until {
        if now < banned_until {
            let remaining_mins = (banned_until - now + 59_999) / 60_000;
            return Err(GameError::AuthBanned(format!("{remaining_mins} more minute(s)")));
        }
    }

    if !password::verify_password(password_raw, &record.password_hash) {
        state.rate_limiter.record_login_failure(client_ip, now, cfg);
        return Err(GameError::AuthInvalidCredentials);
    }

    state.rate_limiter.record_login_success(client_ip);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_data::{Catalog, LoadedWorld};
    use mud_player::PlayerStore;

    fn cfg() -> Config {
        serde_json::from_value(serde_json::json!({
            "player_defaults": {"starting_gold": 10, "base_health": 20.0, "base_mana": 10.0, "base_damage": 2.0, "base_defense": 0.0},
            "gameplay": {"max_inventory_slots": 16, "flee_success_chance": 0.5, "enemy_respawn_time_ms": 500, "death_gold_loss_pct": 0.1, "death_respawn_location": "town_square", "damage_variance": 0.0, "pvp_gold_loot_percentage": 0.1},
            "progression": {"base_xp_per_level": 100, "xp_multiplier": 1.0, "health_per_level": 10.0, "mana_per_level": 5.0, "damage_per_level": 1.0, "defense_per_level": 1.0, "max_level": 5, "full_heal_on_level_up": true},
            "economy": {"shop_buy_multiplier": 1.0, "shop_sell_multiplier": 1.0, "healer_cost_factor": 1.0},
            "rate_limit": {"enabled": true, "max_accounts_per_ip": 3, "account_creation_cooldown_secs": 0, "login_attempt_window_secs": 300, "max_login_attempts": 5},
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

    fn test_state() -> WorldState {
        let loaded = LoadedWorld {
            catalog: Catalog::default(),
            enemy_prototypes: Default::default(),
            ground_item_prototypes: Default::default(),
        };
        let dir = std::env::temp_dir().join(format!("mud-auth-test-{}", std::process::id()));
        WorldState::new(loaded, PlayerStore::new(dir))
    }

    #[test]
    fn rejects_short_usernames() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("thirteenchars").is_err());
    }

    #[test]
    fn rejects_non_letters() {
        assert!(validate_username("bob1").is_err());
    }

    #[test]
    fn register_then_login_round_trips() {
        let cfg = cfg();
        let mut state = test_state();
        let created = register(&mut state, &cfg, "1.1.1.1", "alice", "hunter22").unwrap();
        assert_eq!(created.username.as_str(), "alice");

        let logged_in = login(&mut state, &cfg, "1.1.1.1", "alice", "hunter22").unwrap();
        assert_eq!(logged_in.id, created.id);

        let err = login(&mut state, &cfg, "1.1.1.1", "alice", "wrong").unwrap_err();
        assert_eq!(err, GameError::AuthInvalidCredentials);
    }

    #[test]
    fn rejects_duplicate_registration() {
        let cfg = cfg();
        let mut state = test_state();
        register(&mut state, &cfg, "1.1.1.1", "alice", "hunter22").unwrap();
        let err = register(&mut state, &cfg, "1.1.1.2", "alice", "hunter22").unwrap_err();
        assert_eq!(err, GameError::AuthUsernameTaken);
    }

    #[test]
    fn login_prefers_in_memory_record_when_attached() {
        let cfg = cfg();
        let mut state = test_state();
        let player = register(&mut state, &cfg, "1.1.1.1", "alice", "hunter22").unwrap();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let (disconnect_tx, _disconnect_rx) = tokio::sync::oneshot::channel();
        state.attach_player(player, tx, disconnect_tx);
        state.player_mut(&"alice".into()).unwrap().gold = 999;

        let logged_in = login(&mut state, &cfg, "1.1.1.1", "alice", "hunter22").unwrap();
        assert_eq!(logged_in.gold, 999);
    }
}
