//! Two-party escrow trade engine. Each trading player carries
//! their own `TradeState` (in `mud-player`); "their" view is always
//! read live off the partner's record rather than mirrored, so trade
//! symmetry holds without extra bookkeeping.

use mud_config::Config;
use mud_core::{GameError, ItemId, MessageType, Username};
use mud_player::{ItemInstance, TradeState};

use crate::emission::Emissions;
use crate::state::WorldState;

pub fn start(
    state: &mut WorldState,
    initiator: &Username,
    target: &Username,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    if initiator.normalized() == target.normalized() {
        return Err(GameError::TradeCannotTradeWithSelf);
    }
    let initiator_player = state.player(initiator).ok_or(GameError::TradePartnerOffline)?;
    if initiator_player.active_trade.is_some() {
        return Err(GameError::TradeAlreadyTrading);
    }
    let initiator_location = initiator_player.location.clone();

    let target_player = state.player(target).ok_or(GameError::TradePartnerOffline)?;
    if target_player.active_trade.is_some() {
        return Err(GameError::TradeAlreadyTrading);
    }
    if target_player.location != initiator_location {
        return Err(GameError::TradeSameRoomRequired);
    }

    let target_player = state.player_mut(target).expect("checked above");
    target_player.active_trade = Some(TradeState::new_pending(initiator.clone(), target.clone()));

    emissions.to_player(
        initiator,
        MessageType::System,
        format!("You offer to trade with {}.", target.as_str()),
    );
    emissions.to_player(
        target,
        MessageType::System,
        format!("{} wants to trade with you. Use `trade accept` to begin.", initiator.as_str()),
    );
    Ok(())
}

/// Accepting is done by the player who received the offer (the one
/// holding the `pending` record); it builds the initiator's own
/// `TradeState` and clears the pending flag on both.
pub fn accept(state: &mut WorldState, acceptor: &Username, emissions: &mut Emissions) -> Result<(), GameError> {
    let acceptor_player = state.player(acceptor).ok_or(GameError::TradePartnerOffline)?;
    let Some(trade) = &acceptor_player.active_trade else {
        return Err(GameError::TradeNoActiveTrade);
    };
    if !trade.pending {
        return Err(GameError::TradeAlreadyTrading);
    }
    let initiator = trade.with.clone();

    if !state.is_attached(&initiator) {
        return Err(GameError::TradePartnerOffline);
    }

    state
        .player_mut(&initiator)
        .expect("checked attached above")
        .active_trade = Some(TradeState {
        pending: false,
        ..TradeState::new_pending(initiator.clone(), acceptor.clone())
    });

    let acceptor_player = state.player_mut(acceptor).expect("checked above");
    acceptor_player
        .active_trade
        .as_mut()
        .expect("checked Some above")
        .pending = false;

    emissions.to_player(&initiator, MessageType::System, format!("{} accepted your trade.", acceptor.as_str()));
    emissions.to_player(acceptor, MessageType::System, "Trade accepted.".to_string());
    Ok(())
}

pub fn add_item(
    state: &mut WorldState,
    username: &Username,
    item_id: &ItemId,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let player = state.player_mut(username).ok_or(GameError::TradePartnerOffline)?;
    let trade = match &player.active_trade {
        Some(t) if !t.pending => player.active_trade.as_ref().unwrap(),
        _ => return Err(GameError::TradeNoActiveTrade),
    };
    let partner = trade.with.clone();
    let idx = player
        .find_inventory_index(item_id)
        .ok_or(GameError::InventoryItemNotFound)?;
    let item = player.inventory.remove(idx);
    let trade = player.active_trade.as_mut().expect("checked above");
    trade.my_items.push(item);
    trade.reset_ready();
    reset_partner_ready(state, &partner);

    emissions.to_player(username, MessageType::Info, format!("You add {} to the trade.", item_id.as_str()));
    emissions.to_player(&partner, MessageType::Info, format!("{} adds an item to the trade.", username.as_str()));
    Ok(())
}

pub fn remove_item(
    state: &mut WorldState,
    username: &Username,
    item_id: &ItemId,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let player = state.player_mut(username).ok_or(GameError::TradePartnerOffline)?;
    let trade = match &player.active_trade {
        Some(t) if !t.pending => player.active_trade.as_mut().unwrap(),
        _ => return Err(GameError::TradeNoActiveTrade),
    };
    let partner = trade.with.clone();
    let idx = trade
        .my_items
        .iter()
        .position(|i| &i.item_id == item_id)
        .ok_or(GameError::InventoryItemNotFound)?;
    let item = trade.my_items.remove(idx);
    trade.reset_ready();
    player.inventory.push(item);
    reset_partner_ready(state, &partner);

    emissions.to_player(username, MessageType::Info, format!("You take {} back from the trade.", item_id.as_str()));
    emissions.to_player(&partner, MessageType::Info, format!("{} takes an item back from the trade.", username.as_str()));
    Ok(())
}

pub fn add_gold(state: &mut WorldState, username: &Username, amount: i64, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player_mut(username).ok_or(GameError::TradePartnerOffline)?;
    if player.gold < amount || amount < 0 {
        return Err(GameError::TradeInsufficientGold);
    }
    let trade = match &player.active_trade {
        Some(t) if !t.pending => player.active_trade.as_ref().unwrap(),
        _ => return Err(GameError::TradeNoActiveTrade),
    };
    let partner = trade.with.clone();
    player.gold -= amount;
    let trade = player.active_trade.as_mut().expect("checked above");
    trade.my_gold += amount;
    trade.reset_ready();
    reset_partner_ready(state, &partner);

    emissions.to_player(username, MessageType::Info, format!("You add {amount} gold to the trade."));
    emissions.to_player(&partner, MessageType::Info, format!("{} adds gold to the trade.", username.as_str()));
    Ok(())
}

pub fn remove_gold(state: &mut WorldState, username: &Username, amount: i64, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player_mut(username).ok_or(GameError::TradePartnerOffline)?;
    let trade = match &player.active_trade {
        Some(t) if !t.pending => player.active_trade.as_mut().unwrap(),
        _ => return Err(GameError::TradeNoActiveTrade),
    };
    if trade.my_gold < amount || amount < 0 {
        return Err(GameError::TradeInsufficientGold);
    }
    let partner = trade.with.clone();
    trade.my_gold -= amount;
    trade.reset_ready();
    player.gold += amount;
    reset_partner_ready(state, &partner);

    emissions.to_player(username, MessageType::Info, format!("You take {amount} gold back from the trade."));
    emissions.to_player(&partner, MessageType::Info, format!("{} takes gold back from the trade.", username.as_str()));
    Ok(())
}

fn reset_partner_ready(state: &mut WorldState, partner: &Username) {
    if let Some(p) = state.player_mut(partner) {
        if let Some(t) = &mut p.active_trade {
            t.reset_ready();
        }
    }
}

/// Marks `username` ready; if the partner is already ready, executes
/// the trade atomically.
pub fn ready(state: &mut WorldState, username: &Username, cfg: &Config, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player_mut(username).ok_or(GameError::TradePartnerOffline)?;
    let trade = match &mut player.active_trade {
        Some(t) if !t.pending => t,
        _ => return Err(GameError::TradeNoActiveTrade),
    };
    let partner = trade.with.clone();
    trade.my_ready = true;

    let partner_ready = state
        .player(&partner)
        .and_then(|p| p.active_trade.as_ref())
        .map(|t| t.my_ready)
        .unwrap_or(false);

    emissions.to_player(username, MessageType::Info, "You are ready to trade.".to_string());
    emissions.to_player(&partner, MessageType::Info, format!("{} is ready to trade.", username.as_str()));

    if partner_ready {
        execute(state, username, &partner, cfg, emissions)?;
    }
    Ok(())
}

/// Pre-checks both sides have room, then atomically swaps escrow
/// contents and gold. On a failed space check, cancels the
/// trade and restores both escrows instead of leaving it dangling.
fn execute(
    state: &mut WorldState,
    a: &Username,
    b: &Username,
    cfg: &Config,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let a_player = state.player(a).expect("a online");
    let b_player = state.player(b).expect("b online");
    let a_trade = a_player.active_trade.as_ref().expect("a trading");
    let b_trade = b_player.active_trade.as_ref().expect("b trading");

    let a_inventory_after = a_player.inventory.len() - a_trade.my_items.len() + b_trade.my_items.len();
    let b_inventory_after = b_player.inventory.len() - b_trade.my_items.len() + a_trade.my_items.len();

    if a_inventory_after > cfg.gameplay.max_inventory_slots || b_inventory_after > cfg.gameplay.max_inventory_slots {
        cancel(state, a, emissions, "not enough inventory space to complete the trade")?;
        return Err(GameError::TradeInsufficientSpaceOnExecute);
    }

    let mut a_trade = state.player_mut(a).unwrap().active_trade.take().expect("a trading");
    let mut b_trade = state.player_mut(b).unwrap().active_trade.take().expect("b trading");

    let a_items: Vec<ItemInstance> = std::mem::take(&mut a_trade.my_items);
    let b_items: Vec<ItemInstance> = std::mem::take(&mut b_trade.my_items);
    let a_gold = a_trade.my_gold;
    let b_gold = b_trade.my_gold;

    {
        let a_player = state.player_mut(a).unwrap();
        a_player.inventory.extend(b_items);
        a_player.gold += b_gold;
    }
    {
        let b_player = state.player_mut(b).unwrap();
        b_player.inventory.extend(a_items);
        b_player.gold += a_gold;
    }

    emissions.to_player(a, MessageType::Success, format!("Trade with {} complete.", b.as_str()));
    emissions.to_player(b, MessageType::Success, format!("Trade with {} complete.", a.as_str()));
    Ok(())
}

/// Cancels any in-progress or pending trade for `username`, restoring
/// escrowed items/gold to both sides and notifying the partner if
/// still online. Used by the explicit `trade cancel` command as well
/// as disconnect, room-change, and movement housekeeping.
pub fn cancel(
    state: &mut WorldState,
    username: &Username,
    emissions: &mut Emissions,
    reason: &str,
) -> Result<(), GameError> {
    let Some(player) = state.player_mut(username) else {
        return Ok(());
    };
    let Some(trade) = player.active_trade.take() else {
        return Err(GameError::TradeNoActiveTrade);
    };
    player.inventory.extend(trade.my_items.clone());
    player.gold += trade.my_gold;
    let partner = trade.with.clone();

    emissions.to_player(username, MessageType::System, format!("Trade cancelled: {reason}."));

    if let Some(partner_player) = state.player_mut(&partner) {
        if let Some(partner_trade) = partner_player.active_trade.take() {
            partner_player.inventory.extend(partner_trade.my_items);
            partner_player.gold += partner_trade.my_gold;
        }
        emissions.to_player(&partner, MessageType::System, format!("Trade with {} was cancelled: {reason}.", username.as_str()));
    }
    Ok(())
}

/// Variant used by housekeeping call sites (disconnect, move, room
/// change) that don't have a human-readable reason handy and should
/// not error when there's nothing to cancel.
pub fn cancel_if_active(state: &mut WorldState, username: &Username, emissions: &mut Emissions, reason: &str) {
    if state.player(username).map(|p| p.active_trade.is_some()).unwrap_or(false) {
        let _ = cancel(state, username, emissions, reason);
    }
}

pub struct TradeStatusView {
    pub partner: Username,
    pub pending: bool,
    pub my_items: Vec<ItemId>,
    pub my_gold: i64,
    pub my_ready: bool,
    pub their_items: Vec<ItemId>,
    pub their_gold: i64,
    pub their_ready: bool,
}

pub fn status(state: &WorldState, username: &Username) -> Result<TradeStatusView, GameError> {
    let player = state.player(username).ok_or(GameError::TradePartnerOffline)?;
    let trade = player.active_trade.as_ref().ok_or(GameError::TradeNoActiveTrade)?;
    let partner_trade = state.player(&trade.with).and_then(|p| p.active_trade.as_ref());
    Ok(TradeStatusView {
        partner: trade.with.clone(),
        pending: trade.pending,
        my_items: trade.my_items.iter().map(|i| i.item_id.clone()).collect(),
        my_gold: trade.my_gold,
        my_ready: trade.my_ready,
        their_items: partner_trade.map(|t| t.my_items.iter().map(|i| i.item_id.clone()).collect()).unwrap_or_default(),
        their_gold: partner_trade.map(|t| t.my_gold).unwrap_or(0),
        their_ready: partner_trade.map(|t| t.my_ready).unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_data::{Catalog, LoadedWorld};
    use mud_player::{Player, PlayerStore};

    fn test_config() -> Config {
        serde_json::from_value(serde_json::json!({
            "player_defaults": {"starting_gold": 50, "base_health": 20.0, "base_mana": 10.0, "base_damage": 2.0, "base_defense": 0.0},
            "gameplay": {"max_inventory_slots": 2, "flee_success_chance": 1.0, "enemy_respawn_time_ms": 500, "death_gold_loss_pct": 0.1, "death_respawn_location": "town_square", "damage_variance": 0.0, "pvp_gold_loot_percentage": 0.1},
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
        WorldState::new(loaded, PlayerStore::new(std::env::temp_dir().join("mud-trade-test")))
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
    fn swap_executes_atomically_on_both_ready() {
        let cfg = test_config();
        let mut state = test_state();
        let alice = attach(&mut state, "alice", &cfg);
        let bob = attach(&mut state, "bob", &cfg);
        state.player_mut(&alice).unwrap().inventory.push(ItemInstance { item_id: "potion".into() });
        state.player_mut(&bob).unwrap().inventory.push(ItemInstance { item_id: "sword".into() });

        let mut em = Emissions::new();
        start(&mut state, &alice, &bob, &mut em).unwrap();
        accept(&mut state, &bob, &mut em).unwrap();
        add_item(&mut state, &alice, &"potion".into(), &mut em).unwrap();
        add_item(&mut state, &bob, &"sword".into(), &mut em).unwrap();
        ready(&mut state, &alice, &cfg, &mut em).unwrap();
        ready(&mut state, &bob, &cfg, &mut em).unwrap();

        assert!(state.player(&alice).unwrap().active_trade.is_none());
        assert!(state.player(&bob).unwrap().active_trade.is_none());
        assert_eq!(state.player(&alice).unwrap().inventory[0].item_id.as_str(), "sword");
        assert_eq!(state.player(&bob).unwrap().inventory[0].item_id.as_str(), "potion");
    }

    #[test]
    fn cancel_restores_escrow_to_both_sides() {
        let cfg = test_config();
        let mut state = test_state();
        let alice = attach(&mut state, "alice", &cfg);
        let bob = attach(&mut state, "bob", &cfg);
        state.player_mut(&alice).unwrap().inventory.push(ItemInstance { item_id: "potion".into() });

        let mut em = Emissions::new();
        start(&mut state, &alice, &bob, &mut em).unwrap();
        accept(&mut state, &bob, &mut em).unwrap();
        add_item(&mut state, &alice, &"potion".into(), &mut em).unwrap();
        add_gold(&mut state, &alice, 10, &mut em).unwrap();

        cancel(&mut state, &alice, &mut em, "test").unwrap();

        assert!(state.player(&alice).unwrap().active_trade.is_none());
        assert!(state.player(&bob).unwrap().active_trade.is_none());
        assert_eq!(state.player(&alice).unwrap().inventory[0].item_id.as_str(), "potion");
        assert_eq!(state.player(&alice).unwrap().gold, 50);
    }

    #[test]
    fn ready_resets_on_add_after_both_ready_once() {
        let cfg = test_config();
        let mut state = test_state();
        let alice = attach(&mut state, "alice", &cfg);
        let bob = attach(&mut state, "bob", &cfg);
        state.player_mut(&alice).unwrap().inventory.push(ItemInstance { item_id: "a".into() });
        state.player_mut(&alice).unwrap().inventory.push(ItemInstance { item_id: "b".into() });

        let mut em = Emissions::new();
        start(&mut state, &alice, &bob, &mut em).unwrap();
        accept(&mut state, &bob, &mut em).unwrap();
        add_item(&mut state, &alice, &"a".into(), &mut em).unwrap();

        // bob readies up first
        ready(&mut state, &bob, &cfg, &mut em).unwrap();
        // alice edits again, which must clear bob's ready flag too
        add_item(&mut state, &alice, &"b".into(), &mut em).unwrap();
        assert!(!state.player(&bob).unwrap().active_trade.as_ref().unwrap().my_ready);
    }
}
