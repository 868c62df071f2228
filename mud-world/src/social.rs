//! Chat and the friends list: `say`, `whisper`/`reply`, and
//! `friend {list|add|remove}` plus the `who` roster. None of this mutates shared room/enemy/trade state, so it
//! lives apart from the engines in `combat.rs`/`trade.rs`/etc, but it
//! still goes through the same `WorldState` + `Emissions` shape as
//! every other handler.

use mud_core::{GameError, MessageType, Username};

use crate::emission::Emissions;
use crate::state::WorldState;

/// Says `text` in the caller's current room.
pub fn say(state: &WorldState, username: &Username, text: &str, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let location = player.location.clone();
    emissions.to_player(username, MessageType::Say, format!("You say: {text}"));
    emissions.to_room(&location, MessageType::Say, format!("{} says: {text}", username.as_str()), Some(username));
    Ok(())
}

/// Whispers `text` to `target`, recording the sender as `target`'s
/// `lastWhisperFrom` so a later `reply` has somewhere to go.
pub fn whisper(
    state: &mut WorldState,
    username: &Username,
    target: &Username,
    text: &str,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    if username.normalized() == target.normalized() {
        return Err(GameError::SocialCannotTargetSelf);
    }
    if !state.is_attached(target) {
        return Err(GameError::SocialTargetOffline);
    }

    if let Some(recipient) = state.player_mut(target) {
        recipient.last_whisper_from = Some(username.clone());
    }

    emissions.to_player(username, MessageType::Whisper, format!("You whisper to {}: {text}", target.as_str()));
    emissions.to_player(target, MessageType::Whisper, format!("{} whispers: {text}", username.as_str()));
    Ok(())
}

/// Replies to whoever last whispered the caller.
pub fn reply(state: &mut WorldState, username: &Username, text: &str, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let target = player.last_whisper_from.clone().ok_or(GameError::SocialNoWhisperTarget)?;
    whisper(state, username, &target, text, emissions)
}

pub fn friend_list(state: &WorldState, username: &Username) -> Result<Vec<Username>, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    Ok(player.friends.iter().cloned().collect())
}

pub fn friend_add(state: &mut WorldState, username: &Username, target: &Username, emissions: &mut Emissions) -> Result<(), GameError> {
    if username.normalized() == target.normalized() {
        return Err(GameError::SocialCannotTargetSelf);
    }
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let already = player.friends.contains(target);
    let player = state.player_mut(username).expect("checked above");
    player.friends.insert(target.clone());

    if already {
        emissions.to_player(username, MessageType::Info, format!("{} is already on your friends list.", target.as_str()));
    } else {
        emissions.to_player(username, MessageType::Success, format!("You add {} to your friends list.", target.as_str()));
    }
    Ok(())
}

pub fn friend_remove(state: &mut WorldState, username: &Username, target: &Username, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    if !player.friends.contains(target) {
        return Err(GameError::SocialNotFriends);
    }
    let player = state.player_mut(username).expect("checked above");
    player.friends.shift_remove(target);
    emissions.to_player(username, MessageType::Success, format!("You remove {} from your friends list.", target.as_str()));
    Ok(())
}

/// Renders the `who` roster: every attached username plus an online
/// marker against the caller's friends list.
pub fn who(state: &WorldState, username: &Username) -> String {
    let friends = state.player(username).map(|p| p.friends.clone()).unwrap_or_default();
    let mut names = state.online_usernames();
    names.sort_by_key(|u| u.normalized());
    if names.is_empty() {
        return "No one else is online.".to_string();
    }
    let lines: Vec<String> = names
        .iter()
        .map(|u| {
            if friends.contains(u) {
                format!("{} (friend)", u.as_str())
            } else {
                u.as_str().to_string()
            }
        })
        .collect();
    format!("Online ({}): {}", lines.len(), lines.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_config::Config;
    use mud_data::{Catalog, LoadedWorld};
    use mud_player::{Player, PlayerStore};

    fn cfg() -> Config {
        serde_json::from_value(serde_json::json!({
            "player_defaults": {"starting_gold": 0, "base_health": 20.0, "base_mana": 10.0, "base_damage": 2.0, "base_defense": 0.0},
            "gameplay": {"max_inventory_slots": 16, "flee_success_chance": 0.5, "enemy_respawn_time_ms": 500, "death_gold_loss_pct": 0.1, "death_respawn_location": "town_square", "damage_variance": 0.0, "pvp_gold_loot_percentage": 0.1},
            "progression": {"base_xp_per_level": 100, "xp_multiplier": 1.0, "health_per_level": 10.0, "mana_per_level": 5.0, "damage_per_level": 1.0, "defense_per_level": 1.0, "max_level": 5, "full_heal_on_level_up": true},
            "economy": {"shop_buy_multiplier": 1.0, "shop_sell_multiplier": 1.0, "healer_cost_factor": 1.0},
            "rate_limit": {"enabled": false, "max_accounts_per_ip": 3, "account_creation_cooldown_secs": 60, "login_attempt_window_secs": 300, "max_login_attempts": 5},
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
        WorldState::new(loaded, PlayerStore::new(std::env::temp_dir().join("mud-social-test")))
    }

    fn attach(state: &mut WorldState, name: &str, cfg: &Config) -> Username {
        let username: Username = name.into();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let (disconnect_tx, _disconnect_rx) = tokio::sync::oneshot::channel();
        let player = Player::new(name.to_string(), username.clone(), "hash".into(), "town_square".into(), cfg);
        state.attach_player(player, tx, disconnect_tx);
        username
    }

    #[test]
    fn reply_targets_the_last_whisperer() {
        let cfg = cfg();
        let mut state = test_state();
        let alice = attach(&mut state, "alice", &cfg);
        let bob = attach(&mut state, "bob", &cfg);
        let mut em = Emissions::new();

        whisper(&mut state, &alice, &bob, "hi", &mut em).unwrap();
        assert_eq!(state.player(&bob).unwrap().last_whisper_from, Some(alice.clone()));

        let mut em = Emissions::new();
        reply(&mut state, &bob, "hey", &mut em).unwrap();
        assert_eq!(state.player(&alice).unwrap().last_whisper_from, Some(bob.clone()));
    }

    #[test]
    fn reply_without_a_whisperer_errors() {
        let cfg = cfg();
        let mut state = test_state();
        let alice = attach(&mut state, "alice", &cfg);
        let mut em = Emissions::new();
        assert_eq!(reply(&mut state, &alice, "hey", &mut em).unwrap_err(), GameError::SocialNoWhisperTarget);
    }

    #[test]
    fn friend_add_then_remove_round_trips() {
        let cfg = cfg();
        let mut state = test_state();
        let alice = attach(&mut state, "alice", &cfg);
        let bob = attach(&mut state, "bob", &cfg);
        let mut em = Emissions::new();
        friend_add(&mut state, &alice, &bob, &mut em).unwrap();
        assert_eq!(friend_list(&state, &alice).unwrap(), vec![bob.clone()]);
        friend_remove(&mut state, &alice, &bob, &mut em).unwrap();
        assert!(friend_list(&state, &alice).unwrap().is_empty());
    }
}
