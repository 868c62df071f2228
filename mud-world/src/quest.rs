//! Quest progression, shops, recipes, and harvesting. Grouped
//! together because all four hang off the same NPC/room-scoped content
//! and share the "verify room fits the reward before granting it" rule.

use rand::Rng;

use mud_config::Config;
use mud_core::{rng as dice, time::now_ms, GameError, ItemId, MaterialId, MessageType, NpcId, QuestId, RecipeId, Username};
use mud_data::templates::QuestKind;
use mud_player::ItemInstance;

use crate::emission::Emissions;
use crate::state::WorldState;

/// Bumps progress on every active kill-quest targeting `enemy_id`,
/// called from the kill reward loop the instant a fighter's kill is
/// credited, not later at `talk`.
pub fn note_enemy_killed(state: &mut WorldState, username: &Username, enemy_id: &mud_core::EnemyId) {
    let Some(player) = state.player(username) else { return };
    let matching: Vec<(QuestId, u32)> = player
        .active_quests
        .keys()
        .filter_map(|qid| {
            let q = state.catalog.quest(qid)?;
            (q.kind == QuestKind::Kill && q.target == enemy_id.as_str()).then(|| (qid.clone(), q.count))
        })
        .collect();
    let Some(player) = state.player_mut(username) else { return };
    for (qid, count) in matching {
        if let Some(progress) = player.active_quests.get_mut(&qid) {
            *progress = (*progress + 1).min(count as i64);
        }
    }
}

/// Mirrors [`note_enemy_killed`] for collect-quests: keeps the progress
/// counter in step with the player's live material total so a later
/// `talk` sees an up to date value even if materials are later spent.
pub fn note_material_gained(state: &mut WorldState, username: &Username, material_id: &MaterialId) {
    let Some(player) = state.player(username) else { return };
    let matching: Vec<(QuestId, u32)> = player
        .active_quests
        .keys()
        .filter_map(|qid| {
            let q = state.catalog.quest(qid)?;
            (q.kind == QuestKind::Collect && q.target == material_id.as_str()).then(|| (qid.clone(), q.count))
        })
        .collect();
    if matching.is_empty() {
        return;
    }
    let held = player.materials.get(material_id).copied().unwrap_or(0);
    let Some(player) = state.player_mut(username) else { return };
    for (qid, count) in matching {
        if let Some(progress) = player.active_quests.get_mut(&qid) {
            *progress = held.min(count as u64) as i64;
        }
    }
}

/// `talk(npcId)`: checks every active quest for completion
/// first, then offers the NPC's own quest if eligible, else falls back
/// to plain dialogue (with healer/portal NPC special-casing).
pub fn talk(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    npc_id: &NpcId,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let location = player.location.clone();
    state
        .find_npc_in_location(&location, npc_id)
        .ok_or(GameError::LookupUnknownId)?;

    let active_quest_ids: Vec<QuestId> = player.active_quests.keys().cloned().collect();
    for quest_id in active_quest_ids {
        let Some(quest) = state.catalog.quest(&quest_id) else { continue };
        if quest.npc.as_ref() != Some(npc_id) {
            continue;
        }
        let complete = is_quest_complete(state, username, &quest_id);
        if complete {
            complete_quest(state, cfg, username, &quest_id, emissions)?;
            return Ok(());
        }
    }

    let npc = state.catalog.npc(npc_id).cloned().ok_or(GameError::LookupUnknownId)?;
    if let Some(quest_id) = &npc.quest {
        let player = state.player(username).expect("checked above");
        if player.completed_quests.contains(quest_id) {
            // fall through to regular dialogue below
        } else if player.active_quests.contains_key(quest_id) {
            let Some(quest) = state.catalog.quest(quest_id) else {
                return Err(GameError::LookupUnknownId);
            };
            emissions.to_player(username, MessageType::Npc, quest.dialogue.clone());
            maybe_offer_healer_or_portal(state, cfg, username, &npc, emissions);
            return Ok(());
        } else if quest_eligible(state, username, quest_id) {
            let Some(quest) = state.catalog.quest(quest_id).cloned() else {
                return Err(GameError::LookupUnknownId);
            };
            let player = state.player_mut(username).expect("checked above");
            player.active_quests.insert(quest_id.clone(), 0);
            emissions.to_player(
                username,
                MessageType::Npc,
                npc.quest_dialogue.clone().unwrap_or(quest.dialogue.clone()),
            );
            maybe_offer_healer_or_portal(state, cfg, username, &npc, emissions);
            return Ok(());
        }
    }

    emissions.to_player(username, MessageType::Npc, npc.dialogue.clone());
    maybe_offer_healer_or_portal(state, cfg, username, &npc, emissions);
    Ok(())
}

fn quest_eligible(state: &WorldState, username: &Username, quest_id: &QuestId) -> bool {
    let Some(player) = state.player(username) else { return false };
    let Some(quest) = state.catalog.quest(quest_id) else { return false };
    if let Some(required_level) = quest.required_level {
        if player.stats.level < required_level {
            return false;
        }
    }
    if let Some(prereq) = &quest.prerequisite_quest {
        if !player.completed_quests.contains(prereq) {
            return false;
        }
    }
    true
}

fn is_quest_complete(state: &WorldState, username: &Username, quest_id: &QuestId) -> bool {
    let Some(player) = state.player(username) else { return false };
    let Some(quest) = state.catalog.quest(quest_id) else { return false };
    match quest.kind {
        QuestKind::Visit => true,
        QuestKind::Kill => player.active_quests.get(quest_id).copied().unwrap_or(0) >= quest.count as i64,
        QuestKind::Collect => {
            let material_id: MaterialId = quest.target.as_str().into();
            player.materials.get(&material_id).copied().unwrap_or(0) >= quest.count as u64
        }
    }
}

fn complete_quest(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    quest_id: &QuestId,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let quest = state.catalog.quest(quest_id).cloned().ok_or(GameError::LookupUnknownId)?;
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;

    if quest.reward.item.is_some() && !player.inventory_has_space(cfg) {
        return Err(GameError::QuestInventorySpaceInsufficient);
    }

    let player = state.player_mut(username).expect("checked above");
    if quest.kind == QuestKind::Collect {
        let material_id: MaterialId = quest.target.as_str().into();
        if let Some(held) = player.materials.get_mut(&material_id) {
            *held = held.saturating_sub(quest.count as u64);
        }
    }
    player.active_quests.shift_remove(quest_id);
    player.completed_quests.insert(quest_id.clone());
    player.gold += quest.reward.gold;
    let level_ups = player.grant_xp(quest.reward.xp, cfg);
    if let Some(item_id) = &quest.reward.item {
        player.inventory.push(ItemInstance { item_id: item_id.clone() });
    }

    emissions.to_player(username, MessageType::Npc, quest.completion_dialogue.clone());
    emissions.to_player(
        username,
        MessageType::Success,
        format!("Quest complete: {}! You gain {} gold and {} xp.", quest.name, quest.reward.gold, quest.reward.xp),
    );
    if level_ups > 0 {
        emissions.to_player(username, MessageType::Success, format!("You reach level {}!", state.player(username).map(|p| p.stats.level).unwrap_or(0)));
    }
    Ok(())
}

fn maybe_offer_healer_or_portal(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    npc: &mud_data::templates::NpcTemplate,
    emissions: &mut Emissions,
) {
    if npc.healer {
        heal_via_npc(state, cfg, username, emissions);
    }
}

fn heal_via_npc(state: &mut WorldState, cfg: &Config, username: &Username, emissions: &mut Emissions) {
    let Some(player) = state.player(username) else { return };
    let max_health = crate::stats::effective_max_health(player, cfg, &state.catalog);
    let max_mana = crate::stats::effective_max_mana(player, cfg, &state.catalog);
    let missing_health = (max_health - player.stats.current_health).max(0.0);
    let missing_mana = (max_mana - player.stats.current_mana).max(0.0);
    if missing_health <= 0.0 && missing_mana <= 0.0 {
        return;
    }
    let cost = (((missing_health + missing_mana) * cfg.economy.healer_cost_factor) / 100.0).ceil() as i64;
    if player.gold >= cost {
        let player = state.player_mut(username).expect("checked above");
        player.gold -= cost;
        player.stats.current_health = max_health;
        player.stats.current_mana = max_mana;
        emissions.to_player(username, MessageType::Success, format!("You are healed for {cost} gold."));
    } else {
        emissions.to_player(username, MessageType::Info, format!("Healing costs {cost} gold; you don't have enough."));
    }
}

/// `say <keyword>` portal lookup: any NPC in the room offering a
/// portal under that keyword teleports the speaker there for its cost.
pub fn portal_say(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    keyword: &str,
    emissions: &mut Emissions,
) -> Result<bool, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let location = player.location.clone();
    let Some(loc) = state.catalog.location(&location) else { return Ok(false) };
    let destination = loc.npcs.iter().find_map(|npc_id| {
        let npc = state.catalog.npc(npc_id)?;
        npc.portals.get(keyword).cloned()
    });
    let Some(portal) = destination else { return Ok(false) };

    let player = state.player(username).expect("checked above");
    if player.gold < portal.cost {
        emissions.to_player(username, MessageType::Error, "You don't have enough gold for that.");
        return Ok(true);
    }

    let player = state.player_mut(username).expect("checked above");
    player.gold -= portal.cost;

    crate::trade::cancel_if_active(state, username, emissions, "you used a portal");
    crate::movement::relocate(
        state,
        cfg,
        username,
        &portal.destination,
        emissions,
        format!("{} steps through a portal.", username.as_str()),
        format!("{} steps out of a portal.", username.as_str()),
    );
    Ok(true)
}

pub struct ShopListing {
    pub item_id: ItemId,
    pub name: String,
    pub buy_price: i64,
}

pub fn shop_list(state: &WorldState, cfg: &Config, username: &Username) -> Result<Vec<ShopListing>, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let loc = state.catalog.location(&player.location).ok_or(GameError::LookupUnknownId)?;
    let shop_id = loc.shop.as_ref().ok_or(GameError::ShopNotStocked)?;
    let shop = state.catalog.shop(shop_id).ok_or(GameError::ShopNotStocked)?;
    Ok(shop
        .items
        .iter()
        .filter_map(|item_id| {
            let item = state.catalog.item(item_id)?;
            Some(ShopListing {
                item_id: item_id.clone(),
                name: item.name.clone(),
                buy_price: state.catalog.shop_buy_price(shop, item, cfg.economy.shop_buy_multiplier),
            })
        })
        .collect())
}

pub fn shop_buy(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    item_id: &ItemId,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let loc = state.catalog.location(&player.location).ok_or(GameError::LookupUnknownId)?;
    let shop_id = loc.shop.clone().ok_or(GameError::ShopNotStocked)?;
    let shop = state.catalog.shop(&shop_id).ok_or(GameError::ShopNotStocked)?.clone();
    if !shop.items.iter().any(|i| i == item_id) {
        return Err(GameError::ShopNotStocked);
    }
    let item = state.catalog.item(item_id).ok_or(GameError::ShopNotStocked)?.clone();
    let price = state.catalog.shop_buy_price(&shop, &item, cfg.economy.shop_buy_multiplier);

    if !player.inventory_has_space(cfg) {
        return Err(GameError::InventoryFull);
    }
    if player.gold < price {
        return Err(GameError::ShopInsufficientGold);
    }

    let player = state.player_mut(username).expect("checked above");
    player.gold -= price;
    player.inventory.push(ItemInstance { item_id: item_id.clone() });

    emissions.to_player(username, MessageType::Success, format!("You buy {} for {} gold.", item.name, price));
    Ok(())
}

pub fn shop_sell(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    item_id: &ItemId,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let loc = state.catalog.location(&player.location).ok_or(GameError::LookupUnknownId)?;
    let shop_id = loc.shop.clone().ok_or(GameError::ShopNotStocked)?;
    let shop = state.catalog.shop(&shop_id).ok_or(GameError::ShopNotStocked)?.clone();
    let idx = player.find_inventory_index(item_id).ok_or(GameError::InventoryItemNotFound)?;
    let item = state.catalog.item(item_id).ok_or(GameError::InventoryWrongType)?.clone();
    let price = state.catalog.shop_sell_price(&shop, &item, cfg.economy.shop_sell_multiplier);

    let player = state.player_mut(username).expect("checked above");
    player.inventory.remove(idx);
    player.gold += price;

    emissions.to_player(username, MessageType::Success, format!("You sell {} for {} gold.", item.name, price));
    Ok(())
}

/// A consumable's `teachesRecipe`; the caller (inventory
/// engine) has already consumed the item by the time this runs.
pub fn learn_recipe(state: &mut WorldState, username: &Username, recipe_id: &RecipeId, emissions: &mut Emissions) -> Result<(), GameError> {
    let recipe = state.catalog.recipe(recipe_id).cloned().ok_or(GameError::LookupUnknownId)?;
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    if player.stats.level < recipe.required_level {
        return Err(GameError::CraftLevelTooLow);
    }
    let player = state.player_mut(username).expect("checked above");
    player.known_recipes.insert(recipe_id.clone());
    emissions.to_player(username, MessageType::Success, format!("You learn the recipe for {}.", recipe.name));
    Ok(())
}

pub fn examine_recipe(state: &WorldState, username: &Username, recipe_id: &RecipeId) -> Result<String, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let recipe = state.catalog.recipe(recipe_id).ok_or(GameError::LookupUnknownId)?;
    let mut out = format!("{} (requires level {})\n", recipe.name, recipe.required_level);
    for (material_id, needed) in &recipe.materials {
        let held = player.materials.get(material_id).copied().unwrap_or(0);
        let name = state.catalog.material(material_id).map(|m| m.name.as_str()).unwrap_or(material_id.as_str());
        out.push_str(&format!("  {name}: need {needed}, you have {held}\n"));
    }
    Ok(out.trim_end().to_string())
}

pub fn craft(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    recipe_id: &RecipeId,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    if !player.known_recipes.contains(recipe_id) {
        return Err(GameError::CraftUnknownRecipe);
    }
    let recipe = state.catalog.recipe(recipe_id).cloned().ok_or(GameError::CraftUnknownRecipe)?;
    if player.stats.level < recipe.required_level {
        return Err(GameError::CraftLevelTooLow);
    }
    for (material_id, needed) in &recipe.materials {
        if player.materials.get(material_id).copied().unwrap_or(0) < *needed as u64 {
            return Err(GameError::CraftMissingMaterials);
        }
    }
    if recipe.result_type == mud_data::templates::RecipeResultKind::Item && !player.inventory_has_space(cfg) {
        return Err(GameError::InventoryFull);
    }

    let player = state.player_mut(username).expect("checked above");
    for (material_id, needed) in &recipe.materials {
        if let Some(held) = player.materials.get_mut(material_id) {
            *held -= *needed as u64;
        }
    }
    match recipe.result_type {
        mud_data::templates::RecipeResultKind::Item => {
            player.inventory.push(ItemInstance { item_id: recipe.result_id.as_str().into() });
        }
        mud_data::templates::RecipeResultKind::Material => {
            let material_id: MaterialId = recipe.result_id.as_str().into();
            *player.materials.entry(material_id).or_insert(0) += 1;
        }
    }

    let consumed: Vec<String> = recipe.materials.iter().map(|(m, n)| format!("{n} {}", m.as_str())).collect();
    emissions.to_player(
        username,
        MessageType::Success,
        format!("You craft {}, consuming {}.", recipe.name, consumed.join(", ")),
    );
    Ok(())
}

/// `harvest(materialId)`. Cooldown is updated only on a
/// successful roll -- a failed harvest leaves the node's cooldown
/// clock untouched, matching the source material this was distilled
/// from (see DESIGN.md).
pub fn harvest(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    username: &Username,
    material_id: &MaterialId,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let location = player.location.clone();
    let loc = state.catalog.location(&location).ok_or(GameError::LookupUnknownId)?;
    let node = loc
        .resource_nodes
        .iter()
        .find(|n| &n.material_id == material_id)
        .ok_or(GameError::HarvestWrongMaterial)?
        .clone();

    let now = now_ms();
    if let Err(remaining_ms) = state.resource_ready(&location, material_id, player, now) {
        return Err(GameError::HarvestCooldownRemaining {
            remaining_minutes: (remaining_ms + 59_999) / 60_000,
        });
    }

    if !dice::roll_chance(node.chance, rng) {
        emissions.to_player(username, MessageType::Info, "You failed to harvest.");
        return Ok(());
    }

    let amount = dice::roll_amount_range(&node.amount, rng).unwrap_or(1);
    let key = mud_player::Player::harvest_key(&location, material_id);
    let material_name = state.catalog.material(material_id).map(|m| m.name.clone()).unwrap_or_else(|| material_id.as_str().to_string());

    let player = state.player_mut(username).expect("checked above");
    *player.materials.entry(material_id.clone()).or_insert(0) += amount as u64;
    player.last_harvest.insert(key, now);

    note_material_gained(state, username, material_id);

    emissions.to_player(username, MessageType::Success, format!("You harvest {amount} {material_name}."));
    emissions.to_room(&location, MessageType::System, format!("{} harvests some {}.", username.as_str(), material_name), Some(username));
    Ok(())
}
