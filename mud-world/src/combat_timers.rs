//! Deferred combat actions, re-expressed as absolute deadlines the Tick
//! Scheduler checks instead of spawned
//! `sleep`-based tasks. Every entry re-validates its preconditions
//! (attacker still present, enemy still alive, still in the fighters
//! set) at the moment it fires rather than when it was scheduled.

use mud_core::{EnemyId, LocationId, Username};

/// Deferred player respawn: location move (and, for a PvP defeat, the
/// accompanying full heal) one second after death.
#[derive(Debug, Clone)]
pub struct PendingPlayerRespawn {
    pub due_at: i64,
    pub username: Username,
    pub destination: LocationId,
    pub heal_on_respawn: bool,
}

#[derive(Debug, Clone)]
pub struct PendingCounterAttack {
    pub due_at: i64,
    pub location_id: LocationId,
    pub enemy_id: EnemyId,
}

#[derive(Debug, Clone)]
pub struct PendingAutoContinue {
    pub due_at: i64,
    pub attacker: Username,
    pub location_id: LocationId,
    pub enemy_id: EnemyId,
}

#[derive(Debug, Default)]
pub struct CombatTimers {
    pub counter_attacks: Vec<PendingCounterAttack>,
    pub auto_continues: Vec<PendingAutoContinue>,
    pub player_respawns: Vec<PendingPlayerRespawn>,
}
