//! Mutable runtime counterparts of the immutable template catalog.
//! `EnemyInstance` and `GroundItem` live inside `WorldState`, one per
//! room-scoped declaration (plus, for ground items, any number of
//! runtime-dropped entries appended by `drop`).

use indexmap::IndexSet;
use mud_core::{EnemyId, ItemId, Username};
use mud_data::instance::{EnemyPrototype, GroundItemPrototype};
use mud_data::templates::Gating;

/// Alive <-> Defeated state machine. `oneTime` enemies never
/// transition back to `Alive`; `WorldState` simply stops offering them
/// to a player once that player has recorded the kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyState {
    Alive,
    Defeated { defeated_at: i64 },
}

#[derive(Debug, Clone)]
pub struct EnemyInstance {
    pub enemy_id: EnemyId,
    pub current_health: f64,
    pub max_health: f64,
    pub fighters: IndexSet<Username>,
    pub state: EnemyState,
    pub gating: Gating,
    /// Last time a fighter landed a hit; the tick scheduler's
    /// combat-timeout sweep clears `fighters` once this is stale by
    /// more than `combatTimeoutMs`.
    pub last_activity_at: i64,
}

impl EnemyInstance {
    pub fn from_prototype(proto: &EnemyPrototype, max_health: f64) -> Self {
        EnemyInstance {
            enemy_id: proto.enemy_id.clone(),
            current_health: max_health,
            max_health,
            fighters: IndexSet::new(),
            state: EnemyState::Alive,
            gating: proto.gating.clone(),
            last_activity_at: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.state, EnemyState::Alive) && self.current_health > 0.0
    }

    /// Coarse wound descriptor used by `look`.
    pub fn wound_descriptor(&self) -> &'static str {
        let pct = self.current_health / self.max_health.max(1.0);
        if pct < 0.25 {
            "badly wounded"
        } else if pct < 0.5 {
            "wounded"
        } else if pct < 0.75 {
            "lightly wounded"
        } else {
            "unharmed"
        }
    }

    /// Marks the enemy dead: transitions to `Defeated`, clears fighters
    ///.
    pub fn mark_defeated(&mut self, now_ms: i64) {
        self.state = EnemyState::Defeated { defeated_at: now_ms };
        self.current_health = 0.0;
        self.fighters.clear();
    }

    /// Revives to full health with an empty fighters set.
    pub fn revive(&mut self) {
        self.current_health = self.max_health;
        self.state = EnemyState::Alive;
        self.fighters.clear();
    }
}

/// One declared or dropped item lying on the ground in a room.
/// Preset declarations carry `proto_respawn_time_ms`/gating from the
/// location file; dropped items (`Kind::Dropped`) carry an expiry
/// instead and are never regated.
#[derive(Debug, Clone)]
pub enum GroundItemKind {
    /// A location-declared item. `respawn_time_ms` is `Some` when the
    /// item should reappear for a player some time after they take it;
    /// `None` means a single, permanent (per-player) pickup.
    Preset {
        respawn_time_ms: Option<i64>,
        gating: Gating,
        /// Global timestamp of the last pickup, used only when
        /// `respawn_time_ms` is `Some` (every player shares the same
        /// cooldown on a respawning preset item).
        last_picked_up_at: Option<i64>,
        /// Players who have already taken a permanent (non-respawning)
        /// preset item; they stop seeing it, everyone else still can.
        taken_by: IndexSet<Username>,
    },
    /// A player-dropped item, expiring at an absolute deadline.
    Dropped { dropped_at: i64, expires_at: i64 },
}

#[derive(Debug, Clone)]
pub struct GroundItem {
    pub item_id: ItemId,
    pub kind: GroundItemKind,
}

impl GroundItem {
    pub fn from_prototype(proto: &GroundItemPrototype) -> Self {
        GroundItem {
            item_id: proto.item_id.clone(),
            kind: GroundItemKind::Preset {
                respawn_time_ms: proto.respawn_time_ms,
                gating: proto.gating.clone(),
                last_picked_up_at: None,
                taken_by: IndexSet::new(),
            },
        }
    }

    pub fn new_dropped(item_id: ItemId, now_ms: i64, lifetime_ms: i64) -> Self {
        GroundItem {
            item_id,
            kind: GroundItemKind::Dropped {
                dropped_at: now_ms,
                expires_at: now_ms + lifetime_ms,
            },
        }
    }

    pub fn one_time(&self) -> bool {
        match &self.kind {
            GroundItemKind::Preset { gating, .. } => gating.one_time,
            GroundItemKind::Dropped { .. } => false,
        }
    }

    pub fn gating(&self) -> Option<&Gating> {
        match &self.kind {
            GroundItemKind::Preset { gating, .. } => Some(gating),
            GroundItemKind::Dropped { .. } => None,
        }
    }
}
