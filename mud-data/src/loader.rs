use std::path::Path;

use indexmap::IndexMap;
use log::warn;
use mud_core::{LocationId, NpcId};

use crate::catalog::Catalog;
use crate::error::LoadError;
use crate::instance::{EnemyPrototype, GroundItemPrototype};
use crate::templates::{
    EnemyTemplate, ItemTemplate, LocationTemplate, MaterialTemplate, NpcTemplate, QuestTemplate,
    RecipeTemplate, ShopTemplate,
};

/// Output of a complete, validated load: the immutable catalog plus the
/// per-location runtime prototypes the enrichment pass produced. This
/// is what gets handed to `WorldState`'s constructor.
pub struct LoadedWorld {
    pub catalog: Catalog,
    pub enemy_prototypes: IndexMap<LocationId, Vec<EnemyPrototype>>,
    pub ground_item_prototypes: IndexMap<LocationId, Vec<GroundItemPrototype>>,
}

/// Scans `data_dir`'s per-entity subdirectories, parses every record,
/// runs the quest back-link pass, enriches locations into instance
/// prototypes, and fail-fast validates every cross-reference. Aborts
/// (returns `Err`) on the first problem found: a data-integrity
/// violation at load time is fatal, not recoverable.
pub fn load(data_dir: &Path) -> Result<LoadedWorld, LoadError> {
    let locations: IndexMap<_, _> = read_kind(data_dir, "locations")?;
    let items: IndexMap<_, _> = read_kind(data_dir, "items")?;
    let enemies: IndexMap<_, _> = read_kind(data_dir, "enemies")?;
    let mut npcs: IndexMap<_, _> = read_kind(data_dir, "npcs")?;
    let mut quests: IndexMap<_, _> = read_kind(data_dir, "quests")?;
    let shops: IndexMap<_, _> = read_kind(data_dir, "shops")?;
    let recipes: IndexMap<_, _> = read_kind(data_dir, "recipes")?;
    let materials: IndexMap<_, _> = read_kind(data_dir, "materials")?;

    back_link_quests(&mut quests, &npcs)?;

    validate_references(
        &locations, &items, &enemies, &npcs, &quests, &shops, &recipes, &materials,
    )?;

    let (enemy_prototypes, ground_item_prototypes) = enrich_locations(&locations);

    Ok(LoadedWorld {
        catalog: Catalog {
            locations,
            items,
            enemies,
            npcs,
            quests,
            shops,
            recipes,
            materials,
        },
        enemy_prototypes,
        ground_item_prototypes,
    })
}

fn read_kind<T>(data_dir: &Path, subdir: &str) -> Result<IndexMap<T::Id, T>, LoadError>
where
    T: HasId + serde::de::DeserializeOwned,
{
    let dir = data_dir.join(subdir);
    let mut out = IndexMap::new();
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(LoadError::DirectoryRead(dir.display().to_string(), e.to_string())),
    };
    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    paths.sort();

    for path in paths {
        let text = std::fs::read_to_string(&path)
            .map_err(|e| LoadError::FileRead(path.display().to_string(), e.to_string()))?;
        let record: T = serde_json::from_str(&text)
            .map_err(|e| LoadError::Parse(path.display().to_string(), e.to_string()))?;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let id_str = record.id_str();
        if stem != id_str {
            return Err(LoadError::StemIdMismatch {
                path: path.display().to_string(),
                stem,
                id: id_str,
            });
        }

        if let Some((existing_id, _)) = out.iter().find(|(k, _)| k == &&record.id()) {
            return Err(LoadError::DuplicateId {
                kind: subdir.to_string(),
                id: existing_id.to_string(),
                first: "(already loaded)".to_string(),
                second: path.display().to_string(),
            });
        }
        out.insert(record.id(), record);
    }
    Ok(out)
}

/// Small trait so `read_kind` can be generic over every template kind
/// without a `HashMap<String, serde_json::Value>` detour.
trait HasId {
    type Id: std::hash::Hash + Eq + Clone + ToString;
    fn id(&self) -> Self::Id;
    fn id_str(&self) -> String {
        self.id().to_string()
    }
}

impl HasId for LocationTemplate {
    type Id = LocationId;
    fn id(&self) -> LocationId {
        self.id.clone()
    }
}
impl HasId for ItemTemplate {
    type Id = mud_core::ItemId;
    fn id(&self) -> mud_core::ItemId {
        self.id.clone()
    }
}
impl HasId for EnemyTemplate {
    type Id = mud_core::EnemyId;
    fn id(&self) -> mud_core::EnemyId {
        self.id.clone()
    }
}
impl HasId for NpcTemplate {
    type Id = NpcId;
    fn id(&self) -> NpcId {
        self.id.clone()
    }
}
impl HasId for QuestTemplate {
    type Id = mud_core::QuestId;
    fn id(&self) -> mud_core::QuestId {
        self.id.clone()
    }
}
impl HasId for ShopTemplate {
    type Id = mud_core::ShopId;
    fn id(&self) -> mud_core::ShopId {
        self.id.clone()
    }
}
impl HasId for RecipeTemplate {
    type Id = mud_core::RecipeId;
    fn id(&self) -> mud_core::RecipeId {
        self.id.clone()
    }
}
impl HasId for MaterialTemplate {
    type Id = mud_core::MaterialId;
    fn id(&self) -> mud_core::MaterialId {
        self.id.clone()
    }
}

/// For each quest, scans NPCs for `npc.quest == quest.id` and attaches
/// `quest.npc`. Zero offering NPCs warns (a quest nobody can ever pick
/// up, which is a content bug but not a fatal one); more than one
/// aborts.
fn back_link_quests(
    quests: &mut IndexMap<mud_core::QuestId, QuestTemplate>,
    npcs: &IndexMap<NpcId, NpcTemplate>,
) -> Result<(), LoadError> {
    for (quest_id, quest) in quests.iter_mut() {
        let offering: Vec<&NpcId> = npcs
            .iter()
            .filter(|(_, npc)| npc.quest.as_ref() == Some(quest_id))
            .map(|(id, _)| id)
            .collect();

        match offering.len() {
            0 => {
                warn!("quest {quest_id} has no offering NPC; it can never be picked up");
            }
            1 => {
                quest.npc = Some(offering[0].clone());
            }
            _ => {
                return Err(LoadError::DuplicateQuestOffer {
                    quest: quest_id.to_string(),
                    count: offering.len(),
                    npcs: offering
                        .iter()
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn validate_references(
    locations: &IndexMap<LocationId, LocationTemplate>,
    items: &IndexMap<mud_core::ItemId, ItemTemplate>,
    enemies: &IndexMap<mud_core::EnemyId, EnemyTemplate>,
    npcs: &IndexMap<NpcId, NpcTemplate>,
    quests: &IndexMap<mud_core::QuestId, QuestTemplate>,
    shops: &IndexMap<mud_core::ShopId, ShopTemplate>,
    recipes: &IndexMap<mud_core::RecipeId, RecipeTemplate>,
    materials: &IndexMap<mud_core::MaterialId, MaterialTemplate>,
) -> Result<(), LoadError> {
    let unknown = |kind: &str, id: String, from: String| LoadError::UnknownReference {
        kind: kind.to_string(),
        id,
        referenced_from: from,
    };

    for (loc_id, loc) in locations {
        for (dir, dest) in &loc.exits {
            if !locations.contains_key(dest) {
                return Err(unknown(
                    "location",
                    dest.to_string(),
                    format!("location {loc_id} exit {}", dir.as_str()),
                ));
            }
        }
        for npc_id in &loc.npcs {
            if !npcs.contains_key(npc_id) {
                return Err(unknown("npc", npc_id.to_string(), format!("location {loc_id}")));
            }
        }
        for decl in &loc.enemies {
            if !enemies.contains_key(decl.enemy_id()) {
                return Err(unknown(
                    "enemy",
                    decl.enemy_id().to_string(),
                    format!("location {loc_id}"),
                ));
            }
        }
        for decl in &loc.ground_items {
            if !items.contains_key(decl.item_id()) {
                return Err(unknown(
                    "item",
                    decl.item_id().to_string(),
                    format!("location {loc_id}"),
                ));
            }
        }
        if let Some(shop_id) = &loc.shop {
            if !shops.contains_key(shop_id) {
                return Err(unknown("shop", shop_id.to_string(), format!("location {loc_id}")));
            }
        }
        for node in &loc.resource_nodes {
            if !materials.contains_key(&node.material_id) {
                return Err(unknown(
                    "material",
                    node.material_id.to_string(),
                    format!("location {loc_id} resource node"),
                ));
            }
        }
    }

    for (item_id, item) in items {
        if let Some(recipe_id) = &item.teaches_recipe {
            if !recipes.contains_key(recipe_id) {
                return Err(unknown(
                    "recipe",
                    recipe_id.to_string(),
                    format!("item {item_id} teaches_recipe"),
                ));
            }
        }
        if let Some(dest) = &item.consumable.teleport_to {
            if !locations.contains_key(dest) {
                return Err(unknown(
                    "location",
                    dest.to_string(),
                    format!("item {item_id} teleport_to"),
                ));
            }
        }
    }

    for (enemy_id, enemy) in enemies {
        for material_id in enemy.material_drops.keys() {
            if !materials.contains_key(material_id) {
                return Err(unknown(
                    "material",
                    material_id.to_string(),
                    format!("enemy {enemy_id} material_drops"),
                ));
            }
        }
        for item_id in enemy.item_drops.keys() {
            if !items.contains_key(item_id) {
                return Err(unknown(
                    "item",
                    item_id.to_string(),
                    format!("enemy {enemy_id} item_drops"),
                ));
            }
        }
        for q in enemy
            .prerequisite_active_quests
            .iter()
            .chain(enemy.prerequisite_completed_quests.iter())
        {
            if !quests.contains_key(q) {
                return Err(unknown("quest", q.to_string(), format!("enemy {enemy_id} gating")));
            }
        }
    }

    for (npc_id, npc) in npcs {
        if let Some(quest_id) = &npc.quest {
            if !quests.contains_key(quest_id) {
                return Err(unknown("quest", quest_id.to_string(), format!("npc {npc_id}")));
            }
        }
        if let Some(shop_id) = &npc.shop {
            if !shops.contains_key(shop_id) {
                return Err(unknown("shop", shop_id.to_string(), format!("npc {npc_id}")));
            }
        }
        for (keyword, portal) in &npc.portals {
            if !locations.contains_key(&portal.destination) {
                return Err(unknown(
                    "location",
                    portal.destination.to_string(),
                    format!("npc {npc_id} portal {keyword:?}"),
                ));
            }
        }
    }

    for (quest_id, quest) in quests {
        use crate::templates::QuestKind;
        match quest.kind {
            QuestKind::Kill => {
                if !enemies.contains_key(quest.target.as_str()) {
                    return Err(unknown(
                        "enemy",
                        quest.target.clone(),
                        format!("quest {quest_id} target"),
                    ));
                }
            }
            QuestKind::Collect => {
                if !materials.contains_key(quest.target.as_str()) {
                    return Err(unknown(
                        "material",
                        quest.target.clone(),
                        format!("quest {quest_id} target"),
                    ));
                }
            }
            QuestKind::Visit => {
                if !npcs.contains_key(quest.target.as_str()) {
                    return Err(unknown(
                        "npc",
                        quest.target.clone(),
                        format!("quest {quest_id} target"),
                    ));
                }
            }
        }
        if let Some(item_id) = &quest.reward.item {
            if !items.contains_key(item_id) {
                return Err(unknown(
                    "item",
                    item_id.to_string(),
                    format!("quest {quest_id} reward"),
                ));
            }
        }
        if let Some(prereq) = &quest.prerequisite_quest {
            if !quests.contains_key(prereq) {
                return Err(unknown(
                    "quest",
                    prereq.to_string(),
                    format!("quest {quest_id} prerequisite_quest"),
                ));
            }
        }
    }

    for (shop_id, shop) in shops {
        for item_id in &shop.items {
            if !items.contains_key(item_id) {
                return Err(unknown("item", item_id.to_string(), format!("shop {shop_id}")));
            }
        }
    }

    for (recipe_id, recipe) in recipes {
        match recipe.result_type {
            crate::templates::RecipeResultKind::Item => {
                if !items.contains_key(recipe.result_id.as_str()) {
                    return Err(unknown(
                        "item",
                        recipe.result_id.clone(),
                        format!("recipe {recipe_id} result_id"),
                    ));
                }
            }
            crate::templates::RecipeResultKind::Material => {
                if !materials.contains_key(recipe.result_id.as_str()) {
                    return Err(unknown(
                        "material",
                        recipe.result_id.clone(),
                        format!("recipe {recipe_id} result_id"),
                    ));
                }
            }
        }
        for material_id in recipe.materials.keys() {
            if !materials.contains_key(material_id) {
                return Err(unknown(
                    "material",
                    material_id.to_string(),
                    format!("recipe {recipe_id} materials"),
                ));
            }
        }
    }

    Ok(())
}

/// Builds the per-location enemy and ground-item instance prototypes
///.
fn enrich_locations(
    locations: &IndexMap<LocationId, LocationTemplate>,
) -> (
    IndexMap<LocationId, Vec<EnemyPrototype>>,
    IndexMap<LocationId, Vec<GroundItemPrototype>>,
) {
    let mut enemy_protos = IndexMap::new();
    let mut ground_protos = IndexMap::new();

    for (loc_id, loc) in locations {
        let enemies: Vec<EnemyPrototype> = loc
            .enemies
            .iter()
            .map(|decl| EnemyPrototype {
                enemy_id: decl.enemy_id().clone(),
                location_id: loc_id.clone(),
                gating: decl.gating(),
            })
            .collect();
        enemy_protos.insert(loc_id.clone(), enemies);

        let ground: Vec<GroundItemPrototype> = loc
            .ground_items
            .iter()
            .map(|decl| GroundItemPrototype {
                item_id: decl.item_id().clone(),
                location_id: loc_id.clone(),
                respawn_time_ms: decl.respawn_time_ms(),
                gating: decl.gating(),
            })
            .collect();
        ground_protos.insert(loc_id.clone(), ground);
    }

    (enemy_protos, ground_protos)
}
