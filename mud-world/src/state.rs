//! World State: the mutable runtime owned by the server. One
//! `WorldState` is constructed at startup and lives behind a single
//! `tokio::sync::Mutex` for the whole process; every command
//! handler takes the lock for the duration of its mutation and every
//! query in this module is a plain synchronous read/write against it.

use indexmap::IndexMap;
use mud_core::{EnemyId, ItemId, LocationId, MaterialId, NpcId, Username};
use mud_data::{Catalog, LoadedWorld};
use mud_player::{Player, PlayerStore};
use mud_protocol::ServerFrame;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

use crate::combat_timers::CombatTimers;
use crate::rate_limit::RateLimiter;
use crate::runtime::{EnemyInstance, GroundItem};

/// Per-location runtime lists. Templates stay in the immutable
/// `Catalog`; only the mutable instance state lives here.
#[derive(Debug, Default)]
pub struct LocationRuntime {
    pub enemies: Vec<EnemyInstance>,
    pub ground_items: Vec<GroundItem>,
}

/// The whole mutable world: attached players, per-location instance
/// state, presence/outbox registries, and the rate limiter. Everything
/// in here is touched only while the single game-state lock (owned by
/// the caller -- see `mud`'s `AppState`) is held.
pub struct WorldState {
    pub catalog: Catalog,
    pub locations: IndexMap<LocationId, LocationRuntime>,
    /// Attached players, keyed by normalized (lowercase) username.
    pub players: IndexMap<String, Player>,
    /// Username -> outbound frame sender, registered by the session
    /// layer on attach and removed on detach: a socket-identity-to-username
    /// map inverted for O(1) send.
    pub outboxes: IndexMap<String, UnboundedSender<ServerFrame>>,
    /// Username -> a one-shot the session layer holds its read loop
    /// hostage on. Firing it tells that connection to stop reading and
    /// run its own disconnect housekeeping, which is how login
    /// displacement tears down the previous socket.
    pub disconnect_signals: IndexMap<String, oneshot::Sender<()>>,
    pub store: PlayerStore,
    pub rate_limiter: RateLimiter,
    pub combat_timers: CombatTimers,
}

impl WorldState {
    pub fn new(loaded: LoadedWorld, store: PlayerStore) -> Self {
        let mut locations = IndexMap::new();
        for (loc_id, loc) in &loaded.catalog.locations {
            let _ = loc;
            let enemy_protos = loaded.enemy_prototypes.get(loc_id).cloned().unwrap_or_default();
            let ground_protos = loaded
                .ground_item_prototypes
                .get(loc_id)
                .cloned()
                .unwrap_or_default();

            let enemies = enemy_protos
                .iter()
                .filter_map(|proto| {
                    loaded
                        .catalog
                        .enemy(&proto.enemy_id)
                        .map(|tmpl| EnemyInstance::from_prototype(proto, tmpl.max_health))
                })
                .collect();
            let ground_items = ground_protos.iter().map(GroundItem::from_prototype).collect();

            locations.insert(loc_id.clone(), LocationRuntime { enemies, ground_items });
        }

        WorldState {
            catalog: loaded.catalog,
            locations,
            players: IndexMap::new(),
            outboxes: IndexMap::new(),
            disconnect_signals: IndexMap::new(),
            store,
            rate_limiter: RateLimiter::new(),
            combat_timers: CombatTimers::default(),
        }
    }

    // -- presence ---------------------------------------------------

    pub fn is_attached(&self, username: &Username) -> bool {
        self.players.contains_key(&username.normalized())
    }

    pub fn player(&self, username: &Username) -> Option<&Player> {
        self.players.get(&username.normalized())
    }

    pub fn player_mut(&mut self, username: &Username) -> Option<&mut Player> {
        self.players.get_mut(&username.normalized())
    }

    pub fn attach_player(
        &mut self,
        player: Player,
        sender: UnboundedSender<ServerFrame>,
        disconnect: oneshot::Sender<()>,
    ) {
        let key = player.username.normalized();
        self.outboxes.insert(key.clone(), sender);
        self.disconnect_signals.insert(key.clone(), disconnect);
        self.players.insert(key, player);
    }

    /// Detaches a player, returning the record for a final save. Does
    /// not itself persist or broadcast -- disconnect housekeeping
    /// composes this with trade-cancel, fighter cleanup, and a
    /// departure broadcast at the call site.
    pub fn detach_player(&mut self, username: &Username) -> Option<Player> {
        let key = username.normalized();
        self.outboxes.shift_remove(&key);
        self.disconnect_signals.shift_remove(&key);
        self.players.shift_remove(&key)
    }

    /// Takes the previous connection's disconnect signal without
    /// touching its outbox or player record, so a displacing login can
    /// still send it a final frame before firing the signal.
    pub fn take_disconnect_signal(&mut self, username: &Username) -> Option<oneshot::Sender<()>> {
        self.disconnect_signals.shift_remove(&username.normalized())
    }

    // -- message bus primitives ---------------------------------------
    //
    // The Message Bus is a thin typed wrapper the `mud` binary
    // builds on top of these three primitives; it owns the choice of
    // `MessageType` and timestamp, this crate owns the presence lookup
    // the bus needs. Delivery is best-effort: a disconnected or slow
    // client's channel may be full or closed, and that never blocks or
    // errors the caller.

    pub fn send_frame(&self, username: &Username, frame: ServerFrame) {
        if let Some(tx) = self.outboxes.get(&username.normalized()) {
            let _ = tx.send(frame);
        }
    }

    pub fn broadcast_frame(&self, location_id: &LocationId, frame: ServerFrame, exclude: Option<&Username>) {
        for player in self.players.values() {
            if &player.location != location_id {
                continue;
            }
            if exclude.map(|ex| ex == &player.username).unwrap_or(false) {
                continue;
            }
            if let Some(tx) = self.outboxes.get(&player.username.normalized()) {
                let _ = tx.send(frame.clone());
            }
        }
    }

    pub fn broadcast_all_frame(&self, frame: ServerFrame) {
        for tx in self.outboxes.values() {
            let _ = tx.send(frame.clone());
        }
    }

    // -- location lookups --------------------------------------------

    pub fn location_runtime(&self, id: &LocationId) -> Option<&LocationRuntime> {
        self.locations.get(id)
    }

    pub fn location_runtime_mut(&mut self, id: &LocationId) -> Option<&mut LocationRuntime> {
        self.locations.get_mut(id)
    }

    /// Usernames of every attached player currently in `location_id`,
    /// in attachment order.
    pub fn players_in(&self, location_id: &LocationId) -> Vec<Username> {
        self.players
            .values()
            .filter(|p| &p.location == location_id)
            .map(|p| p.username.clone())
            .collect()
    }

    pub fn is_in_combat(&self, player: &Player) -> bool {
        if player.in_pvp_combat {
            return true;
        }
        self.locations
            .get(&player.location)
            .map(|rt| rt.enemies.iter().any(|e| e.fighters.contains(&player.username)))
            .unwrap_or(false)
    }

    /// Visible enemy instance indices in `location_id` for `player`,
    /// filtered by gating and one-time-defeat.
    pub fn visible_enemy_indices(&self, player: &Player, location_id: &LocationId) -> Vec<usize> {
        let Some(rt) = self.locations.get(location_id) else {
            return Vec::new();
        };
        rt.enemies
            .iter()
            .enumerate()
            .filter(|(_, e)| self.enemy_visible_to(player, location_id, e))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn enemy_visible_to(&self, player: &Player, location_id: &LocationId, enemy: &EnemyInstance) -> bool {
        if enemy.gating.one_time {
            let key = Player::one_time_key(location_id, enemy.enemy_id.as_str());
            if player.one_time_enemies_defeated.contains(&key) {
                return false;
            }
        }
        gating_satisfied(player, &enemy.gating)
    }

    pub fn visible_ground_item_indices(&self, player: &Player, location_id: &LocationId) -> Vec<usize> {
        let Some(rt) = self.locations.get(location_id) else {
            return Vec::new();
        };
        rt.ground_items
            .iter()
            .enumerate()
            .filter(|(_, gi)| self.ground_item_visible_to(player, location_id, gi))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn ground_item_visible_to(
        &self,
        player: &Player,
        location_id: &LocationId,
        item: &GroundItem,
    ) -> bool {
        use crate::runtime::GroundItemKind;
        match &item.kind {
            GroundItemKind::Dropped { .. } => true,
            GroundItemKind::Preset {
                gating,
                taken_by,
                ..
            } => {
                if gating.one_time {
                    let key = Player::one_time_key(location_id, item.item_id.as_str());
                    if player.one_time_items_picked_up.contains(&key) {
                        return false;
                    }
                }
                if taken_by.contains(&player.username) {
                    return false;
                }
                gating_satisfied(player, gating)
            }
        }
    }

    // -- targeted lookups used by handlers -----------------------------

    pub fn find_npc_in_location(&self, location_id: &LocationId, npc_id: &NpcId) -> Option<NpcId> {
        self.catalog
            .location(location_id)
            .and_then(|loc| loc.npcs.iter().find(|n| *n == npc_id))
            .cloned()
    }

    pub fn online_usernames(&self) -> Vec<Username> {
        self.players.values().map(|p| p.username.clone()).collect()
    }

    /// Finds the first alive, visible enemy instance in `location_id`
    /// matching `enemy_id`. Rooms rarely declare the same enemy twice,
    /// but nothing forbids it, so "first match" is the resolution
    /// order, matching declaration order in the location file.
    pub fn find_attackable_enemy(
        &self,
        player: &Player,
        location_id: &LocationId,
        enemy_id: &EnemyId,
    ) -> Option<usize> {
        let rt = self.locations.get(location_id)?;
        rt.enemies.iter().enumerate().find_map(|(i, e)| {
            if &e.enemy_id == enemy_id && e.is_alive() && self.enemy_visible_to(player, location_id, e) {
                Some(i)
            } else {
                None
            }
        })
    }

    pub fn find_ground_item(
        &self,
        player: &Player,
        location_id: &LocationId,
        item_id: &ItemId,
    ) -> Option<usize> {
        let rt = self.locations.get(location_id)?;
        rt.ground_items.iter().enumerate().find_map(|(i, gi)| {
            if &gi.item_id == item_id && self.ground_item_visible_to(player, location_id, gi) {
                Some(i)
            } else {
                None
            }
        })
    }

    pub fn resource_ready(&self, location_id: &LocationId, material_id: &MaterialId, player: &Player, now_ms: i64) -> Result<(), i64> {
        let Some(loc) = self.catalog.location(location_id) else {
            return Err(0);
        };
        let Some(node) = loc.resource_nodes.iter().find(|n| &n.material_id == material_id) else {
            return Err(0);
        };
        let key = Player::harvest_key(location_id, material_id);
        if let Some(last) = player.last_harvest.get(&key) {
            let ready_at = last + node.cooldown_ms;
            if now_ms < ready_at {
                return Err(ready_at - now_ms);
            }
        }
        Ok(())
    }
}

/// Whether `player`'s active/completed quest sets satisfy a gated
/// entity's prerequisites.
pub fn gating_satisfied(player: &Player, gating: &mud_data::templates::Gating) -> bool {
    gating
        .prerequisite_active_quests
        .iter()
        .all(|q| player.active_quests.contains_key(q))
        && gating
            .prerequisite_completed_quests
            .iter()
            .all(|q| player.completed_quests.contains(q))
}
