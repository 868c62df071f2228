//! Read-only lookups that don't fit `inventory`/`quest`: `stats`,
//! `recipes`, `materials`, `quest(s)` listing, the generic `examine`
//! resolver, and the static `help` text.

use mud_core::{GameError, ItemId, Username};

use crate::state::WorldState;
use crate::stats;
use mud_config::Config;

/// `stats`: level, xp progress, and effective combat numbers.
pub fn describe_stats(state: &WorldState, cfg: &Config, username: &Username) -> Result<String, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let catalog = &state.catalog;
    let needed = mud_player::Player::xp_to_next_level(player.stats.level, cfg);

    Ok(format!(
        "Level {} ({} / {} xp)\nHealth: {}/{}  Mana: {}/{}\nDamage: {}  Defense: {}\nPvP record: {}W {}L",
        player.stats.level,
        player.stats.xp,
        needed,
        player.stats.current_health as i64,
        stats::effective_max_health(player, cfg, catalog) as i64,
        player.stats.current_mana as i64,
        stats::effective_max_mana(player, cfg, catalog) as i64,
        stats::effective_damage(player, cfg, catalog) as i64,
        stats::effective_defense(player, cfg, catalog) as i64,
        player.pvp_wins,
        player.pvp_losses,
    ))
}

/// `recipes`: every recipe the player knows, with their craftability.
pub fn list_recipes(state: &WorldState, username: &Username) -> Result<String, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    if player.known_recipes.is_empty() {
        return Ok("You don't know any recipes yet.".to_string());
    }
    let mut lines = Vec::new();
    for recipe_id in &player.known_recipes {
        let Some(recipe) = state.catalog.recipe(recipe_id) else { continue };
        lines.push(format!("{} (requires level {})", recipe.name, recipe.required_level));
    }
    Ok(lines.join("\n"))
}

/// `materials`: the player's harvested-material inventory.
pub fn list_materials(state: &WorldState, username: &Username) -> Result<String, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    if player.materials.is_empty() {
        return Ok("You aren't carrying any materials.".to_string());
    }
    let lines: Vec<String> = player
        .materials
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(material_id, count)| {
            let name = state.catalog.material(material_id).map(|m| m.name.as_str()).unwrap_or(material_id.as_str());
            format!("{name}: {count}")
        })
        .collect();
    Ok(lines.join("\n"))
}

/// `quest(s)`: active quests with progress, then completed quests by
/// name.
pub fn list_quests(state: &WorldState, username: &Username) -> Result<String, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let mut out = String::new();

    if player.active_quests.is_empty() {
        out.push_str("Active quests: none\n");
    } else {
        out.push_str("Active quests:\n");
        for (quest_id, progress) in &player.active_quests {
            let Some(quest) = state.catalog.quest(quest_id) else { continue };
            out.push_str(&format!("  {}: {}/{}\n", quest.name, progress, quest.count));
        }
    }

    if player.completed_quests.is_empty() {
        out.push_str("Completed quests: none");
    } else {
        let names: Vec<&str> = player
            .completed_quests
            .iter()
            .filter_map(|qid| state.catalog.quest(qid))
            .map(|q| q.name.as_str())
            .collect();
        out.push_str(&format!("Completed quests: {}", names.join(", ")));
    }
    Ok(out.trim_end().to_string())
}

/// `examine <target>`: resolves against, in order, an
/// inventory item, an equipped item, a visible ground item, a visible
/// enemy, an NPC in the room, then a known recipe. First match wins.
pub fn examine(state: &WorldState, username: &Username, target: &str) -> Result<String, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let location = player.location.clone();
    let item_id: ItemId = target.into();

    if player.find_inventory_index(&item_id).is_some() {
        if let Some(item) = state.catalog.item(&item_id) {
            return Ok(format!("{}: {}", item.name, item.description));
        }
    }

    if player.equipped.values().flatten().any(|inst| inst.item_id == item_id) {
        if let Some(item) = state.catalog.item(&item_id) {
            return Ok(format!("{}: {} (equipped)", item.name, item.description));
        }
    }

    for idx in state.visible_ground_item_indices(player, &location) {
        let rt = state.location_runtime(&location).expect("just indexed");
        let ground = &rt.ground_items[idx];
        if ground.item_id == item_id {
            if let Some(item) = state.catalog.item(&item_id) {
                return Ok(format!("{}: {}", item.name, item.description));
            }
        }
    }

    let enemy_id: mud_core::EnemyId = target.into();
    for idx in state.visible_enemy_indices(player, &location) {
        let rt = state.location_runtime(&location).expect("just indexed");
        let instance = &rt.enemies[idx];
        if instance.enemy_id == enemy_id {
            if let Some(enemy) = state.catalog.enemy(&enemy_id) {
                return Ok(format!("{}: {} ({})", enemy.name, enemy.description, instance.wound_descriptor()));
            }
        }
    }

    let npc_id: mud_core::NpcId = target.into();
    if state.find_npc_in_location(&location, &npc_id).is_some() {
        if let Some(npc) = state.catalog.npc(&npc_id) {
            return Ok(format!("{}: {}", npc.name, npc.dialogue));
        }
    }

    let recipe_id: mud_core::RecipeId = target.into();
    if player.known_recipes.contains(&recipe_id) {
        return crate::quest::examine_recipe(state, username, &recipe_id);
    }

    Err(GameError::LookupUnknownId)
}

/// Static `help` text listing every verb. Unlike every other
/// function in this module this takes no state: it's the same for
/// every player.
pub fn help_text() -> &'static str {
    "Commands:\n\
     move <direction> (n/s/e/up/down), look (l), map (m)\n\
     inventory (i, inv), equipment (eq), examine <target> (x, ex, consider, con)\n\
     get <item> (take), drop <item>, give <item> <player>, give <amount> gold <player>, use <item>\n\
     equip <item> (wear, wield), unequip <slot> (remove)\n\
     attack <target> (hit, strike), flee (run)\n\
     talk <npc> (speak), buy <item>, sell <item>, list (shop)\n\
     homestone bind|where|recall\n\
     trade start|accept|add|remove|ready|cancel|status <player>\n\
     craft <recipe>, recipes, harvest <material>, materials, quest(s)\n\
     say <text>, whisper <player> <text> (wis, tell, w), reply <text> (r)\n\
     friend list|add|remove <player> (friends, f), who\n\
     stats, help, quit (logout)\n\
     reset-account, delete-account"
}
