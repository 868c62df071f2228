use indexmap::IndexMap;
use mud_core::{EnemyId, ItemId, LocationId, MaterialId, NpcId, QuestId, RecipeId, ShopId};

use crate::templates::{
    EnemyTemplate, ItemTemplate, LocationTemplate, MaterialTemplate, NpcTemplate, QuestTemplate,
    RecipeTemplate, ShopTemplate,
};

/// The immutable template catalog. Built once at startup and
/// handed to `WorldState` by reference; every lookup here is a pure
/// read against data that never changes again, so it is safe to share
/// across every connection's task with no locking at all.
#[derive(Debug, Default)]
pub struct Catalog {
    pub locations: IndexMap<LocationId, LocationTemplate>,
    pub items: IndexMap<ItemId, ItemTemplate>,
    pub enemies: IndexMap<EnemyId, EnemyTemplate>,
    pub npcs: IndexMap<NpcId, NpcTemplate>,
    pub quests: IndexMap<QuestId, QuestTemplate>,
    pub shops: IndexMap<ShopId, ShopTemplate>,
    pub recipes: IndexMap<RecipeId, RecipeTemplate>,
    pub materials: IndexMap<MaterialId, MaterialTemplate>,
}

impl Catalog {
    pub fn location(&self, id: &LocationId) -> Option<&LocationTemplate> {
        self.locations.get(id)
    }
    pub fn item(&self, id: &ItemId) -> Option<&ItemTemplate> {
        self.items.get(id)
    }
    pub fn enemy(&self, id: &EnemyId) -> Option<&EnemyTemplate> {
        self.enemies.get(id)
    }
    pub fn npc(&self, id: &NpcId) -> Option<&NpcTemplate> {
        self.npcs.get(id)
    }
    pub fn quest(&self, id: &QuestId) -> Option<&QuestTemplate> {
        self.quests.get(id)
    }
    pub fn shop(&self, id: &ShopId) -> Option<&ShopTemplate> {
        self.shops.get(id)
    }
    pub fn recipe(&self, id: &RecipeId) -> Option<&RecipeTemplate> {
        self.recipes.get(id)
    }
    pub fn material(&self, id: &MaterialId) -> Option<&MaterialTemplate> {
        self.materials.get(id)
    }

    /// Shop buy price: `ceil(value * buyMultiplier)`.
    pub fn shop_buy_price(&self, shop: &ShopTemplate, item: &ItemTemplate, global_mult: f64) -> i64 {
        let mult = shop.buy_multiplier.unwrap_or(global_mult);
        (item.value as f64 * mult).ceil() as i64
    }

    /// Shop sell price: flat `item.value` with no margin applied (see
    /// DESIGN.md for why). `shop` and `global_mult` are accepted for
    /// call-site symmetry with [`Catalog::shop_buy_price`] and so a
    /// future per-shop override is a one-line change, not a signature
    /// change.
    pub fn shop_sell_price(&self, _shop: &ShopTemplate, item: &ItemTemplate, _global_mult: f64) -> i64 {
        item.value
    }
}
