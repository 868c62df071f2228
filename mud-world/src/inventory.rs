//! Inventory, equipment, and consumables.

use rand::Rng;

use mud_core::{time::now_ms, GameError, ItemId, MessageType, Username};
use mud_data::templates::{EquipSlot, ItemKind, UsableIn};
use mud_player::{EquipSlotKind, ItemInstance};

use crate::emission::Emissions;
use crate::quest;
use crate::runtime::{GroundItem, GroundItemKind};
use crate::stats;
use crate::state::WorldState;
use mud_config::Config;

fn to_slot_kind(slot: EquipSlot) -> EquipSlotKind {
    match slot {
        EquipSlot::Weapon => EquipSlotKind::Weapon,
        EquipSlot::Armor => EquipSlotKind::Armor,
        EquipSlot::Shield => EquipSlotKind::Shield,
        EquipSlot::Accessory => EquipSlotKind::Accessory,
    }
}

/// Composite inventory summary: base + equipment stats, gold, slot
/// usage, and the item list.
pub fn describe_inventory(state: &WorldState, cfg: &Config, username: &Username) -> Result<String, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let catalog = &state.catalog;

    let mut out = String::new();
    out.push_str(&format!(
        "Health: {}/{}  Mana: {}/{}  Damage: {}  Defense: {}\n",
        player.stats.current_health as i64,
        stats::effective_max_health(player, cfg, catalog) as i64,
        player.stats.current_mana as i64,
        stats::effective_max_mana(player, cfg, catalog) as i64,
        stats::effective_damage(player, cfg, catalog) as i64,
        stats::effective_defense(player, cfg, catalog) as i64,
    ));
    out.push_str(&format!("Gold: {}\n", player.gold));
    out.push_str(&format!("Slots: {}/{}\n", player.inventory.len(), cfg.gameplay.max_inventory_slots));

    if player.inventory.is_empty() {
        out.push_str("Carrying: nothing\n");
    } else {
        let names: Vec<&str> = player
            .inventory
            .iter()
            .filter_map(|i| catalog.item(&i.item_id))
            .map(|t| t.name.as_str())
            .collect();
        out.push_str(&format!("Carrying: {}\n", names.join(", ")));
    }

    for slot in EquipSlotKind::ALL {
        let equipped_name = player
            .equipped
            .get(&slot)
            .and_then(|s| s.as_ref())
            .and_then(|inst| catalog.item(&inst.item_id))
            .map(|t| t.name.as_str())
            .unwrap_or("(empty)");
        out.push_str(&format!("{slot:?}: {equipped_name}\n"));
    }

    Ok(out.trim_end().to_string())
}

/// Equipped-slot summary only, without the carrying list or gold line
/// `describe_inventory` includes.
pub fn describe_equipment(state: &WorldState, username: &Username) -> Result<String, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let catalog = &state.catalog;

    let mut out = String::new();
    for slot in EquipSlotKind::ALL {
        let equipped_name = player
            .equipped
            .get(&slot)
            .and_then(|s| s.as_ref())
            .and_then(|inst| catalog.item(&inst.item_id))
            .map(|t| t.name.as_str())
            .unwrap_or("(empty)");
        out.push_str(&format!("{slot:?}: {equipped_name}\n"));
    }
    Ok(out.trim_end().to_string())
}

/// Equips `item_id` out of inventory, swapping any item already in that
/// slot back into inventory (a swap never changes inventory length, so
/// it bypasses the normal space check). Clamps current health/mana down
/// to the recomputed maxima.
pub fn equip(state: &mut WorldState, cfg: &Config, username: &Username, item_id: &ItemId, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let idx = player.find_inventory_index(item_id).ok_or(GameError::InventoryItemNotFound)?;
    let template = state.catalog.item(item_id).ok_or(GameError::InventoryItemNotFound)?;
    if template.kind != ItemKind::Equipment {
        return Err(GameError::EquipmentNotEquippable);
    }
    let slot = to_slot_kind(template.slot.ok_or(GameError::EquipmentNotEquippable)?);
    let item_name = template.name.clone();

    let player = state.player_mut(username).expect("checked above");
    let incoming = player.inventory.remove(idx);
    let previous = player.equipped.insert(slot, Some(incoming));
    if let Some(Some(old)) = previous {
        player.inventory.push(old);
    }

    clamp_to_maxima(state, cfg, username);
    emissions.to_player(username, MessageType::Success, format!("You equip the {item_name}."));
    Ok(())
}

/// Unequips whichever item sits in `slot`, requiring a free inventory
/// slot to receive it back.
pub fn unequip(state: &mut WorldState, cfg: &Config, username: &Username, slot: EquipSlotKind, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let occupied = player.equipped.get(&slot).map(|s| s.is_some()).unwrap_or(false);
    if !occupied {
        return Err(GameError::EquipmentSlotEmpty);
    }
    if !player.inventory_has_space(cfg) {
        return Err(GameError::EquipmentSlotFull);
    }

    let player = state.player_mut(username).expect("checked above");
    let item = player.equipped.insert(slot, None).flatten().expect("checked above");
    let item_id = item.item_id.clone();
    player.inventory.push(item);

    clamp_to_maxima(state, cfg, username);
    let item_name = state.catalog.item(&item_id).map(|t| t.name.clone()).unwrap_or_else(|| item_id.as_str().to_string());
    emissions.to_player(username, MessageType::Success, format!("You unequip the {item_name}."));
    Ok(())
}

fn clamp_to_maxima(state: &mut WorldState, cfg: &Config, username: &Username) {
    let Some(player) = state.player(username) else { return };
    let max_health = stats::effective_max_health(player, cfg, &state.catalog);
    let max_mana = stats::effective_max_mana(player, cfg, &state.catalog);
    let Some(player) = state.player_mut(username) else { return };
    player.stats.current_health = player.stats.current_health.min(max_health);
    player.stats.current_mana = player.stats.current_mana.min(max_mana);
}

/// The enemy the player is presently engaged with in their own room, if
/// any -- the implicit target for combat-effect consumables.
fn engaged_enemy(state: &WorldState, username: &Username, location: &mud_core::LocationId) -> Option<mud_core::EnemyId> {
    let rt = state.location_runtime(location)?;
    rt.enemies
        .iter()
        .find(|e| e.is_alive() && e.fighters.contains(username))
        .map(|e| e.enemy_id.clone())
}

/// Uses a consumable out of inventory, enforcing `usableIn`, the global
/// item-use cooldown, and branching by effect kind.
pub fn use_item(state: &mut WorldState, cfg: &Config, rng: &mut impl Rng, username: &Username, item_id: &ItemId, emissions: &mut Emissions) -> Result<(), GameError> {
    let now = now_ms();
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let idx = player.find_inventory_index(item_id).ok_or(GameError::InventoryItemNotFound)?;
    let template = state.catalog.item(item_id).cloned().ok_or(GameError::InventoryItemNotFound)?;
    if template.kind != ItemKind::Consumable {
        return Err(GameError::InventoryWrongType);
    }

    let in_combat = state.is_in_combat(player);
    match template.consumable.usable_in {
        UsableIn::Combat if !in_combat => return Err(GameError::ItemUseWrongContext),
        UsableIn::Peaceful if in_combat => return Err(GameError::ItemUseWrongContext),
        _ => {}
    }

    if let Some(last) = player.last_item_use_at {
        let elapsed = now - last;
        if elapsed < cfg.item_use_cooldown_ms {
            return Err(GameError::ItemUseCooldownActive { remaining_ms: cfg.item_use_cooldown_ms - elapsed });
        }
    }

    let location = player.location.clone();
    let effect = &template.consumable;
    let mut consumed = false;

    if let Some(heal_amount) = effect.heal_amount {
        let max_health = stats::effective_max_health(player, cfg, &state.catalog);
        if player.stats.current_health >= max_health {
            return Err(GameError::InventoryWrongType);
        }
        let player = state.player_mut(username).expect("checked above");
        player.stats.current_health = (player.stats.current_health + heal_amount).min(max_health);
        consumed = true;
        emissions.to_player(username, MessageType::Success, format!("You use the {} and recover health.", template.name));
    } else if let Some(mana_amount) = effect.mana_amount {
        let max_mana = stats::effective_max_mana(player, cfg, &state.catalog);
        if player.stats.current_mana >= max_mana {
            return Err(GameError::InventoryWrongType);
        }
        let player = state.player_mut(username).expect("checked above");
        player.stats.current_mana = (player.stats.current_mana + mana_amount).min(max_mana);
        consumed = true;
        emissions.to_player(username, MessageType::Success, format!("You use the {} and recover mana.", template.name));
    } else if let Some(damage) = effect.damage {
        let mana_cost = effect.mana_cost.unwrap_or(0.0);
        if !in_combat {
            return Err(GameError::ItemUseWrongContext);
        }
        let Some(enemy_id) = engaged_enemy(state, username, &location) else {
            return Err(GameError::ItemUseNoTarget);
        };
        if player.stats.current_mana < mana_cost {
            return Err(GameError::ItemUseInsufficientMana);
        }
        let player = state.player_mut(username).expect("checked above");
        player.stats.current_mana -= mana_cost;
        consumed = true;
        emissions.to_player(username, MessageType::Combat, format!("You unleash the {} for {} damage!", template.name, damage as i64));
        crate::combat::apply_scroll_damage(state, cfg, rng, username, &location, &enemy_id, damage, emissions);
    } else if let Some(destination) = effect.teleport_to.clone() {
        let mana_cost = effect.mana_cost.unwrap_or(0.0);
        if in_combat {
            return Err(GameError::ItemUseWrongContext);
        }
        if player.stats.current_mana < mana_cost {
            return Err(GameError::ItemUseInsufficientMana);
        }
        let player = state.player_mut(username).expect("checked above");
        player.stats.current_mana -= mana_cost;
        consumed = true;
        crate::trade::cancel_if_active(state, username, emissions, "you vanished");
        crate::movement::relocate(
            state,
            cfg,
            username,
            &destination,
            emissions,
            format!("{} vanishes in a flash of light.", username.as_str()),
            format!("{} appears in a flash of light.", username.as_str()),
        );
    } else if let Some(recipe_id) = template.teaches_recipe.clone() {
        quest::learn_recipe(state, username, &recipe_id, emissions)?;
        consumed = true;
    } else {
        return Err(GameError::InventoryWrongType);
    }

    if consumed {
        if let Some(player) = state.player_mut(username) {
            player.last_item_use_at = Some(now);
            player.inventory.remove(idx);
        }
    }
    Ok(())
}

/// Picks up a visible ground item: requires inventory
/// room, records one-time/permanent-pickup bookkeeping, and refreshes
/// the location's respawn clock for preset items.
pub fn get(state: &mut WorldState, cfg: &Config, username: &Username, item_id: &ItemId, emissions: &mut Emissions) -> Result<(), GameError> {
    let now = now_ms();
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    if !player.inventory_has_space(cfg) {
        return Err(GameError::InventoryFull);
    }
    let location = player.location.clone();
    let idx = state.find_ground_item(player, &location, item_id).ok_or(GameError::LookupUnknownId)?;

    let rt = state.location_runtime(&location).expect("just found");
    let ground = rt.ground_items[idx].clone();
    let item_name = state.catalog.item(item_id).map(|t| t.name.clone()).unwrap_or_else(|| item_id.as_str().to_string());

    let mut remove = false;
    match &ground.kind {
        GroundItemKind::Dropped { .. } => remove = true,
        GroundItemKind::Preset { respawn_time_ms, gating, .. } => {
            let one_time = gating.one_time;
            let respawns = respawn_time_ms.is_some();
            if let Some(rt) = state.location_runtime_mut(&location) {
                if let GroundItemKind::Preset { last_picked_up_at, taken_by, .. } = &mut rt.ground_items[idx].kind {
                    if respawns {
                        *last_picked_up_at = Some(now);
                    } else {
                        taken_by.insert(username.clone());
                    }
                }
            }
            if one_time {
                if let Some(player) = state.player_mut(username) {
                    player.one_time_items_picked_up.insert(mud_player::Player::one_time_key(&location, item_id.as_str()));
                }
            }
        }
    }

    if let Some(player) = state.player_mut(username) {
        player.inventory.push(ItemInstance { item_id: item_id.clone() });
    }
    if remove {
        if let Some(rt) = state.location_runtime_mut(&location) {
            rt.ground_items.remove(idx);
        }
    }

    emissions.to_player(username, MessageType::Loot, format!("You pick up the {item_name}."));
    emissions.to_room(&location, MessageType::Info, format!("{} picks up {}.", username.as_str(), item_name), Some(username));
    Ok(())
}

/// Drops an inventory item on the ground: enforces the
/// per-location cap with FIFO eviction and schedules expiry.
pub fn drop(state: &mut WorldState, cfg: &Config, username: &Username, item_id: &ItemId, emissions: &mut Emissions) -> Result<(), GameError> {
    let now = now_ms();
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let idx = player.find_inventory_index(item_id).ok_or(GameError::InventoryItemNotFound)?;
    let location = player.location.clone();
    let item_name = state.catalog.item(item_id).map(|t| t.name.clone()).unwrap_or_else(|| item_id.as_str().to_string());

    if let Some(player) = state.player_mut(username) {
        player.inventory.remove(idx);
    }

    let mut evicted = None;
    if let Some(rt) = state.location_runtime_mut(&location) {
        rt.ground_items.push(GroundItem::new_dropped(item_id.clone(), now, cfg.dropped_item_lifetime_ms));
        if rt.ground_items.len() > cfg.max_dropped_items_per_location {
            let evicted_item = rt.ground_items.remove(0);
            evicted = Some(evicted_item.item_id);
        }
    }

    emissions.to_player(username, MessageType::Info, format!("You drop the {item_name}."));
    emissions.to_room(&location, MessageType::Info, format!("{} drops {}.", username.as_str(), item_name), Some(username));
    if let Some(evicted_id) = evicted {
        let evicted_name = state.catalog.item(&evicted_id).map(|t| t.name.clone()).unwrap_or_else(|| evicted_id.as_str().to_string());
        emissions.to_room(&location, MessageType::System, format!("{evicted_name} crumbles to dust."), None);
    }
    Ok(())
}

/// Transfers an item between two players sharing a room.
pub fn give_item(state: &mut WorldState, cfg: &Config, username: &Username, item_id: &ItemId, target_name: &Username, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let idx = player.find_inventory_index(item_id).ok_or(GameError::InventoryItemNotFound)?;
    let location = player.location.clone();
    let target = state.player(target_name).ok_or(GameError::LookupUnknownId)?;
    if target.location != location {
        return Err(GameError::LookupUnknownId);
    }
    if !target.inventory_has_space(cfg) {
        return Err(GameError::InventoryFull);
    }

    let item_name = state.catalog.item(item_id).map(|t| t.name.clone()).unwrap_or_else(|| item_id.as_str().to_string());
    let player = state.player_mut(username).expect("checked above");
    let item = player.inventory.remove(idx);
    if let Some(target) = state.player_mut(target_name) {
        target.inventory.push(item);
    }

    emissions.to_player(username, MessageType::Info, format!("You give {item_name} to {}.", target_name.as_str()));
    emissions.to_player(target_name, MessageType::Info, format!("{} gives you {item_name}.", username.as_str()));
    Ok(())
}

/// Transfers gold between two players sharing a room, atomic: either both balances move or neither does.
pub fn give_gold(state: &mut WorldState, username: &Username, amount: i64, target_name: &Username, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    if amount <= 0 || player.gold < amount {
        return Err(GameError::TradeInsufficientGold);
    }
    let location = player.location.clone();
    let target = state.player(target_name).ok_or(GameError::LookupUnknownId)?;
    if target.location != location {
        return Err(GameError::LookupUnknownId);
    }

    if let Some(player) = state.player_mut(username) {
        player.gold -= amount;
    }
    if let Some(target) = state.player_mut(target_name) {
        target.gold += amount;
    }

    emissions.to_player(username, MessageType::Info, format!("You give {amount} gold to {}.", target_name.as_str()));
    emissions.to_player(target_name, MessageType::Info, format!("{} gives you {amount} gold.", username.as_str()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_data::{Catalog, LoadedWorld};
    use mud_player::Player;

    fn test_config(max_inventory_slots: usize) -> Config {
        serde_json::from_value(serde_json::json!({
            "player_defaults": {"starting_gold": 50, "base_health": 20.0, "base_mana": 10.0, "base_damage": 2.0, "base_defense": 0.0},
            "gameplay": {"max_inventory_slots": max_inventory_slots, "flee_success_chance": 1.0, "enemy_respawn_time_ms": 500, "death_gold_loss_pct": 0.1, "death_respawn_location": "town_square", "damage_variance": 0.0, "pvp_gold_loot_percentage": 0.1},
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
        WorldState::new(loaded, mud_player::PlayerStore::new(std::env::temp_dir().join("mud-inventory-test")))
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
    fn give_item_moves_between_inventories_in_the_same_room() {
        let cfg = test_config(16);
        let mut state = test_state();
        let alice = attach(&mut state, "alice", &cfg);
        let bob = attach(&mut state, "bob", &cfg);
        state.player_mut(&alice).unwrap().inventory.push(ItemInstance { item_id: "potion".into() });

        let mut em = Emissions::new();
        give_item(&mut state, &cfg, &alice, &"potion".into(), &bob, &mut em).unwrap();

        assert!(state.player(&alice).unwrap().inventory.is_empty());
        assert_eq!(state.player(&bob).unwrap().inventory[0].item_id.as_str(), "potion");
    }

    #[test]
    fn give_item_rejects_when_target_inventory_is_full() {
        let cfg = test_config(1);
        let mut state = test_state();
        let alice = attach(&mut state, "alice", &cfg);
        let bob = attach(&mut state, "bob", &cfg);
        state.player_mut(&alice).unwrap().inventory.push(ItemInstance { item_id: "potion".into() });
        state.player_mut(&bob).unwrap().inventory.push(ItemInstance { item_id: "sword".into() });

        let mut em = Emissions::new();
        let err = give_item(&mut state, &cfg, &alice, &"potion".into(), &bob, &mut em).unwrap_err();

        assert_eq!(err, GameError::InventoryFull);
        assert_eq!(state.player(&alice).unwrap().inventory.len(), 1);
    }

    #[test]
    fn give_item_rejects_different_rooms() {
        let cfg = test_config(16);
        let mut state = test_state();
        let alice = attach(&mut state, "alice", &cfg);
        let bob = attach(&mut state, "bob", &cfg);
        state.player_mut(&bob).unwrap().location = "forest".into();
        state.player_mut(&alice).unwrap().inventory.push(ItemInstance { item_id: "potion".into() });

        let mut em = Emissions::new();
        let err = give_item(&mut state, &cfg, &alice, &"potion".into(), &bob, &mut em).unwrap_err();

        assert_eq!(err, GameError::LookupUnknownId);
    }

    #[test]
    fn give_gold_transfers_atomically() {
        let cfg = test_config(16);
        let mut state = test_state();
        let alice = attach(&mut state, "alice", &cfg);
        let bob = attach(&mut state, "bob", &cfg);

        let mut em = Emissions::new();
        give_gold(&mut state, &alice, 20, &bob, &mut em).unwrap();

        assert_eq!(state.player(&alice).unwrap().gold, 30);
        assert_eq!(state.player(&bob).unwrap().gold, 70);
    }

    #[test]
    fn give_gold_rejects_insufficient_balance() {
        let cfg = test_config(16);
        let mut state = test_state();
        let alice = attach(&mut state, "alice", &cfg);
        let bob = attach(&mut state, "bob", &cfg);

        let mut em = Emissions::new();
        let err = give_gold(&mut state, &alice, 1000, &bob, &mut em).unwrap_err();

        assert_eq!(err, GameError::TradeInsufficientGold);
        assert_eq!(state.player(&alice).unwrap().gold, 50);
    }
}
