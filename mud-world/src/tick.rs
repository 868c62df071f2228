//! The Tick Scheduler: a single periodic driver invoked by the
//! `mud` binary on a fixed interval. Everything here is a plain
//! synchronous sweep over `WorldState`, run with the game-state lock
//! already held by the caller -- there is no scheduling logic in this
//! crate beyond "what happens on one tick".

use mud_config::Config;
use mud_core::{time::now_ms, MessageType};
use rand::Rng;

use crate::combat;
use crate::emission::Emissions;
use crate::movement;
use crate::runtime::{EnemyState, GroundItemKind};
use crate::state::WorldState;

/// Runs one tick: respawns, dropped-item expiry, combat timeouts, rate
/// limiter cleanup, and any due deferred combat actions. Returns the
/// emissions produced so the caller's Message Bus can deliver them.
pub fn run_tick(state: &mut WorldState, cfg: &Config, rng: &mut impl Rng) -> Emissions {
    let mut emissions = Emissions::default();
    let now = now_ms();

    sweep_respawns(state, cfg, now, &mut emissions);
    sweep_dropped_items(state, now, &mut emissions);
    sweep_combat_timeouts(state, cfg, now);
    state.rate_limiter.cleanup(now, cfg);
    fire_combat_timers(state, cfg, rng, now, &mut emissions);

    emissions
}

/// Revives defeated, non-one-time enemies once `respawnTimeMs` has
/// elapsed since death. `oneTime` enemies never respawn;
/// `WorldState` keeps them hidden from players who recorded the kill
/// instead.
fn sweep_respawns(state: &mut WorldState, _cfg: &Config, now: i64, emissions: &mut Emissions) {
    let location_ids: Vec<_> = state.locations.keys().cloned().collect();
    for location_id in location_ids {
        let Some(rt) = state.location_runtime(&location_id) else { continue };
        let mut to_revive = Vec::new();
        for (idx, enemy) in rt.enemies.iter().enumerate() {
            if enemy.gating.one_time {
                continue;
            }
            let EnemyState::Defeated { defeated_at } = enemy.state else { continue };
            let Some(template) = state.catalog.enemy(&enemy.enemy_id) else { continue };
            if now >= defeated_at + template.respawn_time_ms {
                to_revive.push((idx, template.name.clone()));
            }
        }
        if to_revive.is_empty() {
            continue;
        }
        if let Some(rt) = state.location_runtime_mut(&location_id) {
            for (idx, _) in &to_revive {
                rt.enemies[*idx].revive();
            }
        }
        for (_, name) in to_revive {
            emissions.to_room(&location_id, MessageType::System, format!("A {name} appears."), None);
        }
    }
}

/// Removes player-dropped ground items once their lifetime has expired
///. Preset declarations never expire this way.
fn sweep_dropped_items(state: &mut WorldState, now: i64, emissions: &mut Emissions) {
    let location_ids: Vec<_> = state.locations.keys().cloned().collect();
    for location_id in location_ids {
        let Some(rt) = state.location_runtime(&location_id) else { continue };
        let expired_names: Vec<String> = rt
            .ground_items
            .iter()
            .filter(|gi| matches!(gi.kind, GroundItemKind::Dropped { expires_at, .. } if now >= expires_at))
            .filter_map(|gi| state.catalog.item(&gi.item_id).map(|t| t.name.clone()))
            .collect();
        if expired_names.is_empty() {
            continue;
        }
        if let Some(rt) = state.location_runtime_mut(&location_id) {
            rt.ground_items
                .retain(|gi| !matches!(gi.kind, GroundItemKind::Dropped { expires_at, .. } if now >= expires_at));
        }
        for name in expired_names {
            emissions.to_room(&location_id, MessageType::System, format!("{name} crumbles to dust."), None);
        }
    }
}

/// Abandons stale engagements: an enemy whose `fighters` set hasn't
/// seen a hit in longer than `combatTimeoutMs` loses every fighter
///. No message is emitted -- this is silent
/// housekeeping, matching an auto-continue that quietly stops firing
/// once its attacker has walked away.
fn sweep_combat_timeouts(state: &mut WorldState, cfg: &Config, now: i64) {
    let location_ids: Vec<_> = state.locations.keys().cloned().collect();
    for location_id in location_ids {
        let Some(rt) = state.location_runtime_mut(&location_id) else { continue };
        for enemy in &mut rt.enemies {
            if enemy.fighters.is_empty() {
                continue;
            }
            if now - enemy.last_activity_at > cfg.combat_timeout_ms {
                enemy.fighters.clear();
            }
        }
    }
}

/// Fires every due entry in `CombatTimers`, re-validating preconditions
/// at the call site the way `combat.rs` already does for each kind
///.
fn fire_combat_timers(state: &mut WorldState, cfg: &Config, rng: &mut impl Rng, now: i64, emissions: &mut Emissions) {
    let counter_attacks = std::mem::take(&mut state.combat_timers.counter_attacks);
    let (due, pending): (Vec<_>, Vec<_>) = counter_attacks.into_iter().partition(|t| t.due_at <= now);
    state.combat_timers.counter_attacks = pending;
    for timer in due {
        combat::process_counter_attack(state, cfg, rng, &timer.location_id, &timer.enemy_id, emissions);
    }

    let auto_continues = std::mem::take(&mut state.combat_timers.auto_continues);
    let (due, pending): (Vec<_>, Vec<_>) = auto_continues.into_iter().partition(|t| t.due_at <= now);
    state.combat_timers.auto_continues = pending;
    for timer in due {
        combat::process_auto_continue(state, cfg, rng, &timer.attacker, &timer.location_id, &timer.enemy_id, emissions);
    }

    let player_respawns = std::mem::take(&mut state.combat_timers.player_respawns);
    let (due, pending): (Vec<_>, Vec<_>) = player_respawns.into_iter().partition(|t| t.due_at <= now);
    state.combat_timers.player_respawns = pending;
    for timer in due {
        if state.player(&timer.username).is_none() {
            continue;
        }
        if timer.heal_on_respawn {
            let (max_health, max_mana) = {
                let player = state.player(&timer.username).expect("checked above");
                (
                    crate::stats::effective_max_health(player, cfg, &state.catalog),
                    crate::stats::effective_max_mana(player, cfg, &state.catalog),
                )
            };
            if let Some(player) = state.player_mut(&timer.username) {
                player.stats.current_health = max_health;
                player.stats.current_mana = max_mana;
            }
        }
        movement::relocate(
            state,
            cfg,
            &timer.username,
            &timer.destination,
            emissions,
            String::new(),
            format!("{} respawns.", timer.username.as_str()),
        );
    }
}
