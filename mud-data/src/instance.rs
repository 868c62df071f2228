use mud_core::{EnemyId, ItemId, LocationId};

use crate::templates::Gating;

/// Per-location enemy instance prototype produced by the enrichment
/// pass: one per room-scoped declaration, full health, empty
/// fighters. `WorldState` clones these into live `EnemyInstance`s at
/// startup and whenever the tick scheduler revives a defeated one.
#[derive(Debug, Clone)]
pub struct EnemyPrototype {
    pub enemy_id: EnemyId,
    pub location_id: LocationId,
    pub gating: Gating,
}

/// Per-location preset ground item prototype. Dropped items (player
/// `drop`) are appended to the same per-location list at runtime but
/// are not prototypes -- they carry a `dropped_at` timestamp and are
/// not reseeded on restart.
#[derive(Debug, Clone)]
pub struct GroundItemPrototype {
    pub item_id: ItemId,
    pub location_id: LocationId,
    pub respawn_time_ms: Option<i64>,
    pub gating: Gating,
}
