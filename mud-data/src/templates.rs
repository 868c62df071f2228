//! Immutable template schema. These types are exactly what lands
//! on disk under `data/<kind>/<id>.json`; the loader never mutates them
//! after enrichment, so a `Catalog` is free to read from many tasks at
//! once with no locking.

use std::collections::HashMap;

use mud_core::{Direction, EnemyId, ItemId, LocationId, MaterialId, NpcId, QuestId, RecipeId, ShopId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationTag {
    Homestone,
    PvpAllowed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub material_id: MaterialId,
    pub amount: String,
    pub cooldown_ms: i64,
    pub chance: f64,
}

/// An enemy or ground-item declaration on a location may be a bare id
/// or an object carrying gating fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnemyDeclaration {
    Plain(EnemyId),
    Gated {
        enemy_id: EnemyId,
        #[serde(default)]
        prerequisite_active_quests: Vec<QuestId>,
        #[serde(default)]
        prerequisite_completed_quests: Vec<QuestId>,
        #[serde(default)]
        one_time: bool,
    },
}

impl EnemyDeclaration {
    pub fn enemy_id(&self) -> &EnemyId {
        match self {
            EnemyDeclaration::Plain(id) => id,
            EnemyDeclaration::Gated { enemy_id, .. } => enemy_id,
        }
    }

    pub fn gating(&self) -> Gating {
        match self {
            EnemyDeclaration::Plain(_) => Gating::default(),
            EnemyDeclaration::Gated {
                prerequisite_active_quests,
                prerequisite_completed_quests,
                one_time,
                ..
            } => Gating {
                prerequisite_active_quests: prerequisite_active_quests.clone(),
                prerequisite_completed_quests: prerequisite_completed_quests.clone(),
                one_time: *one_time,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroundItemDeclaration {
    Plain(ItemId),
    Gated {
        item_id: ItemId,
        #[serde(default)]
        respawn_time_ms: Option<i64>,
        #[serde(default)]
        one_time: bool,
        #[serde(default)]
        prerequisite_active_quests: Vec<QuestId>,
        #[serde(default)]
        prerequisite_completed_quests: Vec<QuestId>,
    },
}

impl GroundItemDeclaration {
    pub fn item_id(&self) -> &ItemId {
        match self {
            GroundItemDeclaration::Plain(id) => id,
            GroundItemDeclaration::Gated { item_id, .. } => item_id,
        }
    }

    pub fn respawn_time_ms(&self) -> Option<i64> {
        match self {
            GroundItemDeclaration::Plain(_) => None,
            GroundItemDeclaration::Gated { respawn_time_ms, .. } => *respawn_time_ms,
        }
    }

    pub fn gating(&self) -> Gating {
        match self {
            GroundItemDeclaration::Plain(_) => Gating::default(),
            GroundItemDeclaration::Gated {
                prerequisite_active_quests,
                prerequisite_completed_quests,
                one_time,
                ..
            } => Gating {
                prerequisite_active_quests: prerequisite_active_quests.clone(),
                prerequisite_completed_quests: prerequisite_completed_quests.clone(),
                one_time: *one_time,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Gating {
    pub prerequisite_active_quests: Vec<QuestId>,
    pub prerequisite_completed_quests: Vec<QuestId>,
    pub one_time: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationTemplate {
    pub id: LocationId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub exits: HashMap<Direction, LocationId>,
    #[serde(default)]
    pub npcs: Vec<NpcId>,
    #[serde(default)]
    pub enemies: Vec<EnemyDeclaration>,
    #[serde(default)]
    pub ground_items: Vec<GroundItemDeclaration>,
    #[serde(default)]
    pub shop: Option<ShopId>,
    #[serde(default)]
    pub resource_nodes: Vec<ResourceNode>,
    #[serde(default)]
    pub tags: Vec<LocationTag>,
}

impl LocationTemplate {
    pub fn is_homestone(&self) -> bool {
        self.tags.contains(&LocationTag::Homestone)
    }

    pub fn is_pvp_allowed(&self) -> bool {
        self.tags.contains(&LocationTag::PvpAllowed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Equipment,
    Consumable,
    Recipe,
    Quest,
    MaterialRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Weapon,
    Armor,
    Shield,
    Accessory,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 4] = [
        EquipSlot::Weapon,
        EquipSlot::Armor,
        EquipSlot::Shield,
        EquipSlot::Accessory,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsableIn {
    Any,
    Combat,
    Peaceful,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemStats {
    #[serde(default)]
    pub damage: Option<f64>,
    #[serde(default)]
    pub defense: Option<f64>,
    #[serde(default)]
    pub health: Option<f64>,
    #[serde(default)]
    pub mana: Option<f64>,
}

impl ItemStats {
    pub fn damage(&self) -> f64 {
        self.damage.unwrap_or(0.0)
    }
    pub fn defense(&self) -> f64 {
        self.defense.unwrap_or(0.0)
    }
    pub fn health(&self) -> f64 {
        self.health.unwrap_or(0.0)
    }
    pub fn mana(&self) -> f64 {
        self.mana.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsumableEffect {
    #[serde(default)]
    pub heal_amount: Option<f64>,
    #[serde(default)]
    pub mana_amount: Option<f64>,
    #[serde(default)]
    pub mana_cost: Option<f64>,
    #[serde(default)]
    pub damage: Option<f64>,
    #[serde(default)]
    pub teleport_to: Option<LocationId>,
    #[serde(default = "default_usable_in")]
    pub usable_in: UsableIn,
}

fn default_usable_in() -> UsableIn {
    UsableIn::Any
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemTemplate {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub value: i64,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub slot: Option<EquipSlot>,
    #[serde(default)]
    pub stats: ItemStats,
    #[serde(default)]
    pub consumable: ConsumableEffect,
    #[serde(default)]
    pub teaches_recipe: Option<RecipeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropSpec {
    pub chance: f64,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDropSpec {
    pub chance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub id: EnemyId,
    pub name: String,
    pub description: String,
    pub health: f64,
    pub max_health: f64,
    pub damage: f64,
    pub defense: f64,
    pub gold: i64,
    pub xp: i64,
    #[serde(default)]
    pub material_drops: HashMap<MaterialId, DropSpec>,
    #[serde(default)]
    pub item_drops: HashMap<ItemId, ItemDropSpec>,
    pub respawn_time_ms: i64,
    #[serde(default)]
    pub prerequisite_active_quests: Vec<QuestId>,
    #[serde(default)]
    pub prerequisite_completed_quests: Vec<QuestId>,
    #[serde(default)]
    pub one_time: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalDestination {
    pub destination: LocationId,
    #[serde(default)]
    pub cost: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcTemplate {
    pub id: NpcId,
    pub name: String,
    pub dialogue: String,
    #[serde(default)]
    pub quest_dialogue: Option<String>,
    #[serde(default)]
    pub quest: Option<QuestId>,
    #[serde(default)]
    pub healer: bool,
    #[serde(default)]
    pub portals: HashMap<String, PortalDestination>,
    #[serde(default)]
    pub shop: Option<ShopId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    Kill,
    Collect,
    Visit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestReward {
    pub gold: i64,
    pub xp: i64,
    #[serde(default)]
    pub item: Option<ItemId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestTemplate {
    pub id: QuestId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: QuestKind,
    /// For `kill`: an [`EnemyId`]. For `collect`: a [`MaterialId`]. For
    /// `visit`: an [`NpcId`] (or, equivalently, the location reached
    /// through that NPC). Kept untyped because the meaning is
    /// discriminated by `kind`, matching the plain-JSON source data.
    pub target: String,
    pub count: u32,
    /// Explicit material reference mirrored from `target` for `collect`
    /// quests; present for schema fidelity with the source material but
    /// not authoritative (`target` is what handlers check against).
    #[serde(default)]
    pub material_drop: Option<MaterialId>,
    pub dialogue: String,
    pub completion_dialogue: String,
    pub reward: QuestReward,
    #[serde(default)]
    pub required_level: Option<i32>,
    #[serde(default)]
    pub prerequisite_quest: Option<QuestId>,
    /// Populated by the loader's quest back-link pass; absent in
    /// the on-disk file.
    #[serde(default)]
    pub npc: Option<NpcId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopTemplate {
    pub id: ShopId,
    pub name: String,
    pub items: Vec<ItemId>,
    #[serde(default)]
    pub buy_multiplier: Option<f64>,
    #[serde(default)]
    pub sell_multiplier: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeResultKind {
    Item,
    Material,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeTemplate {
    pub id: RecipeId,
    pub name: String,
    pub result_id: String,
    pub result_type: RecipeResultKind,
    pub materials: HashMap<MaterialId, u32>,
    pub required_level: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialTemplate {
    pub id: MaterialId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub rarity: String,
}
