//! Combat Engine: shared PvE combat against room-scoped enemies,
//! PvP duels, and flee. Counter-attacks and auto-continues are scheduled
//! as entries in [`crate::combat_timers::CombatTimers`] and re-entered
//! by the tick scheduler, which re-validates every precondition before
//! acting.

use rand::Rng;

use mud_core::{rng as dice, time::now_ms, EnemyId, GameError, MessageType, Username};

use crate::combat_timers::{PendingAutoContinue, PendingCounterAttack, PendingPlayerRespawn};
use crate::emission::Emissions;
use crate::quest;
use crate::runtime::GroundItem;
use crate::stats;
use crate::state::WorldState;
use mud_config::Config;

/// Dispatches `attack(targetId)` to PvP or PvE depending on whether
/// `target` names another online player sharing the attacker's room
///.
pub fn attack(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    attacker: &Username,
    target: &str,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let location = state.player(attacker).ok_or(GameError::LookupUnknownId)?.location.clone();

    let target_player = state
        .players_in(&location)
        .into_iter()
        .find(|u| u.as_str().eq_ignore_ascii_case(target) && u.normalized() != attacker.normalized());
    if let Some(target_player) = target_player {
        return pvp_attack(state, cfg, rng, attacker, &target_player, emissions);
    }

    let enemy_id: EnemyId = target.into();
    pve_attack(state, cfg, rng, attacker, &enemy_id, emissions)
}

fn pve_attack(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    attacker: &Username,
    enemy_id: &EnemyId,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let attacker_player = state.player(attacker).ok_or(GameError::LookupUnknownId)?;
    let location = attacker_player.location.clone();

    let rt = state.location_runtime(&location).ok_or(GameError::CombatTargetNotFound)?;
    let existing = rt
        .enemies
        .iter()
        .find(|e| &e.enemy_id == enemy_id && state.enemy_visible_to(attacker_player, &location, e));
    match existing {
        None => return Err(GameError::CombatTargetNotFound),
        Some(e) if !e.is_alive() => return Err(GameError::CombatTargetDead),
        _ => {}
    }
    let idx = state
        .find_attackable_enemy(attacker_player, &location, enemy_id)
        .expect("validated above");

    let attacker_player = state.player(attacker).expect("checked above");
    let damage_base = stats::effective_damage(attacker_player, cfg, &state.catalog);
    let enemy_defense = state
        .catalog
        .enemy(enemy_id)
        .map(|t| t.defense)
        .unwrap_or(0.0);
    let raw = dice::variance_roll(damage_base, cfg.gameplay.damage_variance, rng);
    let dealt = (raw - enemy_defense.round() as i64).max(1);

    let now = now_ms();
    let enemy_name = state.catalog.enemy(enemy_id).map(|t| t.name.clone()).unwrap_or_else(|| enemy_id.as_str().to_string());

    let rt = state.location_runtime_mut(&location).expect("checked above");
    let enemy = &mut rt.enemies[idx];
    enemy.fighters.insert(attacker.clone());
    enemy.current_health = (enemy.current_health - dealt as f64).max(0.0);
    enemy.last_activity_at = now;
    let current = enemy.current_health;
    let max = enemy.max_health;
    let died = current <= 0.0;

    emissions.to_room(
        &location,
        MessageType::Combat,
        format!("{} hits {} for {} ({}/{}).", attacker.as_str(), enemy_name, dealt, current as i64, max as i64),
        None,
    );

    if died {
        handle_enemy_death(state, cfg, rng, &location, idx, enemy_id, emissions);
        return Ok(());
    }

    let counter_delay = cfg.enemy_counter_attack_delay_ms;
    state.combat_timers.counter_attacks.push(PendingCounterAttack {
        due_at: now + counter_delay,
        location_id: location.clone(),
        enemy_id: enemy_id.clone(),
    });
    state.combat_timers.auto_continues.push(PendingAutoContinue {
        due_at: now + cfg.combat_round_delay_ms,
        attacker: attacker.clone(),
        location_id: location,
        enemy_id: enemy_id.clone(),
    });
    Ok(())
}

/// Re-entered by the tick scheduler once `due_at` passes. Re-validates
/// the enemy is alive and still has a fighter present before acting.
pub fn process_counter_attack(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    location_id: &mud_core::LocationId,
    enemy_id: &EnemyId,
    emissions: &mut Emissions,
) {
    let Some(rt) = state.location_runtime(location_id) else { return };
    let Some((idx, _)) = rt.enemies.iter().enumerate().find(|(_, e)| &e.enemy_id == enemy_id) else { return };
    if !rt.enemies[idx].is_alive() {
        return;
    }
    let present: Vec<Username> = state.players_in(location_id);
    let candidates: Vec<Username> = rt.enemies[idx]
        .fighters
        .iter()
        .filter(|f| present.contains(f))
        .cloned()
        .collect();
    let Some(defender) = dice::pick_uniform(&candidates, rng).cloned() else { return };

    let enemy_damage_base = state.catalog.enemy(enemy_id).map(|t| t.damage).unwrap_or(0.0);
    let enemy_name = state.catalog.enemy(enemy_id).map(|t| t.name.clone()).unwrap_or_else(|| enemy_id.as_str().to_string());
    let raw = dice::variance_roll(enemy_damage_base, cfg.gameplay.damage_variance, rng);
    let defender_player = state.player(&defender).expect("present implies attached");
    let defense = stats::effective_defense(defender_player, cfg, &state.catalog);
    let max_health = stats::effective_max_health(defender_player, cfg, &state.catalog);
    let dealt = (raw - defense.round() as i64).max(1);

    let now = now_ms();
    let player = state.player_mut(&defender).expect("present implies attached");
    player.stats.current_health = (player.stats.current_health - dealt as f64).max(0.0);
    let current = player.stats.current_health;
    let died = current <= 0.0;

    if let Some(rt) = state.location_runtime_mut(location_id) {
        rt.enemies[idx].last_activity_at = now;
    }

    emissions.to_room(
        location_id,
        MessageType::Combat,
        format!("{} hits {} for {} ({}/{}).", enemy_name, defender.as_str(), dealt, current.max(0.0) as i64, max_health as i64),
        None,
    );

    if died {
        handle_player_death_pve(state, cfg, location_id, &defender, emissions);
    }
}

/// Re-entered by the tick scheduler; cancels implicitly (returns
/// without acting) if the attacker left, the enemy is gone, or the
/// attacker dropped out of the fighters set since scheduling.
pub fn process_auto_continue(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    attacker: &Username,
    location_id: &mud_core::LocationId,
    enemy_id: &EnemyId,
    emissions: &mut Emissions,
) {
    let Some(player) = state.player(attacker) else { return };
    if !player.is_alive() || &player.location != location_id {
        return;
    }
    let Some(idx) = state.find_attackable_enemy(player, location_id, enemy_id) else { return };
    let still_fighting = state
        .location_runtime(location_id)
        .map(|rt| rt.enemies[idx].fighters.contains(attacker))
        .unwrap_or(false);
    if !still_fighting {
        return;
    }
    let _ = pve_attack(state, cfg, rng, attacker, enemy_id, emissions);
}

fn handle_enemy_death(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    location: &mud_core::LocationId,
    idx: usize,
    enemy_id: &EnemyId,
    emissions: &mut Emissions,
) {
    let now = now_ms();
    let template = state.catalog.enemy(enemy_id).cloned().expect("enemy template must exist for a live instance");
    let rt = state.location_runtime(location).expect("checked by caller");
    let fighters: Vec<Username> = rt.enemies[idx].fighters.iter().cloned().collect();
    let one_time = rt.enemies[idx].gating.one_time;
    let n = fighters.len().max(1) as i64;

    let randomized_gold = dice::variance_roll(template.gold as f64, cfg.gameplay.damage_variance, rng);
    let gold_each = randomized_gold / n;
    let xp_each = template.xp / n;

    emissions.to_room(location, MessageType::Combat, format!("{} has been defeated!", template.name), None);

    for fighter in &fighters {
        let mut dropped_items = Vec::new();
        let mut gained_materials = Vec::new();
        let mut level_ups = 0;

        if let Some(player) = state.player_mut(fighter) {
            player.gold += gold_each;
            level_ups = player.grant_xp(xp_each, cfg);

            for (item_id, spec) in &template.item_drops {
                if dice::roll_chance(spec.chance, rng) {
                    if player.inventory_has_space(cfg) {
                        player.inventory.push(mud_player::ItemInstance { item_id: item_id.clone() });
                    } else {
                        dropped_items.push(item_id.clone());
                    }
                }
            }
            for (material_id, spec) in &template.material_drops {
                if dice::roll_chance(spec.chance, rng) {
                    if let Ok(amount) = dice::roll_amount_range(&spec.amount, rng) {
                        *player.materials.entry(material_id.clone()).or_insert(0) += amount as u64;
                        gained_materials.push(material_id.clone());
                    }
                }
            }
        }

        for item_id in dropped_items {
            if let Some(rt) = state.location_runtime_mut(location) {
                rt.ground_items.push(GroundItem::new_dropped(item_id, now, cfg.dropped_item_lifetime_ms));
            }
        }
        for material_id in &gained_materials {
            quest::note_material_gained(state, fighter, material_id);
        }
        quest::note_enemy_killed(state, fighter, enemy_id);

        emissions.to_player(
            fighter,
            MessageType::Loot,
            format!("You defeat {}! You gain {} gold and {} xp.", template.name, gold_each, xp_each),
        );
        if level_ups > 0 {
            emissions.to_player(fighter, MessageType::Success, format!("You reach level {}!", state.player(fighter).map(|p| p.stats.level).unwrap_or(0)));
        }
        if one_time {
            if let Some(player) = state.player_mut(fighter) {
                player.one_time_enemies_defeated.insert(mud_player::Player::one_time_key(location, enemy_id.as_str()));
            }
        }
    }

    if let Some(rt) = state.location_runtime_mut(location) {
        rt.enemies[idx].mark_defeated(now);
    }
}

fn handle_player_death_pve(
    state: &mut WorldState,
    cfg: &Config,
    location: &mud_core::LocationId,
    username: &Username,
    emissions: &mut Emissions,
) {
    if let Some(rt) = state.location_runtime_mut(location) {
        for enemy in &mut rt.enemies {
            enemy.fighters.shift_remove(username);
        }
    }

    emissions.to_room(location, MessageType::Combat, format!("{} has been defeated!", username.as_str()), None);

    let Some(player) = state.player_mut(username) else { return };
    let loss = (player.gold as f64 * cfg.gameplay.death_gold_loss_pct).floor() as i64;
    player.gold -= loss;
    player.stats.current_health = stats::effective_max_health(player, cfg, &state.catalog);
    player.stats.current_mana = stats::effective_max_mana(player, cfg, &state.catalog);

    let destination = player
        .homestone_location
        .clone()
        .unwrap_or_else(|| cfg.gameplay.death_respawn_location.clone().into());

    state.combat_timers.player_respawns.push(PendingPlayerRespawn {
        due_at: now_ms() + 1000,
        username: username.clone(),
        destination,
        heal_on_respawn: false,
    });
}

fn pvp_attack(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    attacker: &Username,
    defender: &Username,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let location = state.player(attacker).ok_or(GameError::LookupUnknownId)?.location.clone();
    if !state.catalog.location(&location).map(|l| l.is_pvp_allowed()).unwrap_or(false) {
        return Err(GameError::CombatPvpDisallowed);
    }
    if state.player(defender).map(|p| !p.is_alive()).unwrap_or(true) {
        return Err(GameError::CombatTargetDead);
    }

    if let Some(p) = state.player_mut(attacker) {
        p.in_pvp_combat = true;
    }
    if let Some(p) = state.player_mut(defender) {
        p.in_pvp_combat = true;
    }

    let attacker_player = state.player(attacker).expect("checked above");
    let damage_base = stats::effective_damage(attacker_player, cfg, &state.catalog);
    let defender_player = state.player(defender).expect("checked above");
    let defense = stats::effective_defense(defender_player, cfg, &state.catalog);
    let raw = dice::variance_roll(damage_base, cfg.gameplay.damage_variance, rng);
    let dealt = (raw - defense.round() as i64).max(1);

    let defender_player = state.player_mut(defender).expect("checked above");
    defender_player.stats.current_health = (defender_player.stats.current_health - dealt as f64).max(0.0);
    let current = defender_player.stats.current_health;
    let died = current <= 0.0;

    emissions.to_room(
        &location,
        MessageType::Combat,
        format!("{} hits {} for {} in a duel.", attacker.as_str(), defender.as_str(), dealt),
        None,
    );

    if died {
        handle_player_death_pvp(state, cfg, rng, attacker, defender, emissions);
    }
    Ok(())
}

/// Winner gains xp from a difficulty table keyed by `power(loser) -
/// power(winner)`; see DESIGN.md for the table's shape.
fn handle_player_death_pvp(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    winner: &Username,
    loser: &Username,
    emissions: &mut Emissions,
) {
    let winner_power = state.player(winner).map(|p| stats::power(p, cfg, &state.catalog)).unwrap_or(0.0);
    let loser_power = state.player(loser).map(|p| stats::power(p, cfg, &state.catalog)).unwrap_or(0.0);
    let xp_gain = pvp_difficulty_xp(loser_power - winner_power, cfg);

    let loser_gold = state.player(loser).map(|p| p.gold).unwrap_or(0);
    let looted = (loser_gold as f64 * cfg.gameplay.pvp_gold_loot_percentage) as i64;

    if let Some(player) = state.player_mut(loser) {
        player.gold -= looted;
        player.pvp_losses += 1;
        player.in_pvp_combat = false;
    }

    let mut winner_level_ups = 0;
    if let Some(player) = state.player_mut(winner) {
        player.gold += looted;
        player.pvp_wins += 1;
        player.in_pvp_combat = false;
        winner_level_ups = player.grant_xp(xp_gain, cfg);
    }

    emissions.to_room(
        &state.player(winner).map(|p| p.location.clone()).unwrap_or_else(|| cfg.starting_location.clone().into()),
        MessageType::Combat,
        format!("{} has defeated {} in combat!", winner.as_str(), loser.as_str()),
        None,
    );
    emissions.to_player(winner, MessageType::Loot, format!("You defeat {}! You loot {} gold and gain {} xp.", loser.as_str(), looted, xp_gain));
    if winner_level_ups > 0 {
        emissions.to_player(winner, MessageType::Success, format!("You reach level {}!", state.player(winner).map(|p| p.stats.level).unwrap_or(0)));
    }
    emissions.to_player(loser, MessageType::Error, format!("You were defeated by {}!", winner.as_str()));

    let destination = state
        .player(loser)
        .and_then(|p| p.homestone_location.clone())
        .unwrap_or_else(|| cfg.starting_location.clone().into());

    let _ = rng; // reserved for future variance in PvP loot rolls
    state.combat_timers.player_respawns.push(PendingPlayerRespawn {
        due_at: now_ms() + 1000,
        username: loser.clone(),
        destination,
        heal_on_respawn: true,
    });
}

/// Applies a damage-effect consumable's full `damage` value to the
/// attacker's engaged enemy, bypassing variance and defense. Caller has already validated
/// combat/target/mana; this only needs `rng` because a kill still
/// rolls loot the normal way.
pub fn apply_scroll_damage(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    attacker: &Username,
    location: &mud_core::LocationId,
    enemy_id: &EnemyId,
    damage: f64,
    emissions: &mut Emissions,
) {
    let Some(idx) = state.location_runtime(location).and_then(|rt| rt.enemies.iter().position(|e| &e.enemy_id == enemy_id && e.is_alive())) else {
        return;
    };
    let now = now_ms();
    let enemy_name = state.catalog.enemy(enemy_id).map(|t| t.name.clone()).unwrap_or_else(|| enemy_id.as_str().to_string());

    let rt = state.location_runtime_mut(location).expect("checked above");
    let enemy = &mut rt.enemies[idx];
    enemy.fighters.insert(attacker.clone());
    enemy.current_health = (enemy.current_health - damage).max(0.0);
    enemy.last_activity_at = now;
    let current = enemy.current_health;
    let max = enemy.max_health;
    let died = current <= 0.0;

    emissions.to_room(
        location,
        MessageType::Combat,
        format!("{enemy_name} reels from the blast ({}/{}).", current as i64, max as i64),
        None,
    );

    if died {
        handle_enemy_death(state, cfg, rng, location, idx, enemy_id, emissions);
    }
}

/// Difficulty table keyed by how much
/// stronger the loser was than the winner. A deficit of zero or less
/// (winner was equal or stronger) is "trivial"; each further step of
/// power difference scales the table up, capped at "impossible".
fn pvp_difficulty_xp(power_deficit: f64, cfg: &Config) -> i64 {
    let base = cfg.progression.base_xp_per_level;
    let tier = if power_deficit <= 0.0 {
        0.1
    } else if power_deficit < 10.0 {
        0.25
    } else if power_deficit < 25.0 {
        0.5
    } else if power_deficit < 50.0 {
        1.0
    } else {
        2.0
    };
    ((base as f64) * tier) as i64
}

/// `flee`: valid only in combat. On success, removes the player
/// from every fighters set in the room and relocates them through a
/// uniformly random exit. On failure, the engaged enemy gets a free
/// counter-attack.
pub fn flee(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    username: &Username,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    if !state.is_in_combat(player) {
        return Err(GameError::CombatNotInCombat);
    }
    let location = player.location.clone();

    if !dice::roll_chance(cfg.gameplay.flee_success_chance, rng) {
        emissions.to_player(username, MessageType::Combat, "You fail to flee!");
        let engaged_enemy = state
            .location_runtime(&location)
            .and_then(|rt| rt.enemies.iter().find(|e| e.is_alive() && e.fighters.contains(username)).map(|e| e.enemy_id.clone()));
        if let Some(enemy_id) = engaged_enemy {
            process_counter_attack(state, cfg, rng, &location, &enemy_id, emissions);
        }
        return Ok(());
    }

    if let Some(rt) = state.location_runtime_mut(&location) {
        for enemy in &mut rt.enemies {
            enemy.fighters.shift_remove(username);
        }
    }
    if let Some(player) = state.player_mut(username) {
        player.in_pvp_combat = false;
    }

    let exits: Vec<_> = state
        .catalog
        .location(&location)
        .map(|l| l.exits.values().cloned().collect())
        .unwrap_or_default();
    let Some(destination) = dice::pick_uniform(&exits, rng).cloned() else {
        emissions.to_player(username, MessageType::Combat, "There's nowhere to flee to!");
        return Ok(());
    };

    crate::trade::cancel_if_active(state, username, emissions, "you fled");
    crate::movement::relocate(
        state,
        cfg,
        username,
        &destination,
        emissions,
        format!("{} flees!", username.as_str()),
        format!("{} stumbles in, fleeing a fight.", username.as_str()),
    );
    Ok(())
}
