//! Equipment stat aggregation: a player's effective combat
//! stats are their base stats plus the sum of every equipped item's
//! contribution across all four slots. Pulled out of both `combat.rs`
//! and `inventory.rs` since both need the same numbers.

use mud_data::Catalog;
use mud_player::Player;

fn equipped_items<'a>(player: &'a Player, catalog: &'a Catalog) -> impl Iterator<Item = &'a mud_data::templates::ItemTemplate> + 'a {
    player
        .equipped
        .values()
        .filter_map(|slot| slot.as_ref())
        .filter_map(move |inst| catalog.item(&inst.item_id))
}

pub fn equipment_damage(player: &Player, catalog: &Catalog) -> f64 {
    equipped_items(player, catalog).map(|i| i.stats.damage()).sum()
}

pub fn equipment_defense(player: &Player, catalog: &Catalog) -> f64 {
    equipped_items(player, catalog).map(|i| i.stats.defense()).sum()
}

pub fn equipment_health_bonus(player: &Player, catalog: &Catalog) -> f64 {
    equipped_items(player, catalog).map(|i| i.stats.health()).sum()
}

pub fn equipment_mana_bonus(player: &Player, catalog: &Catalog) -> f64 {
    equipped_items(player, catalog).map(|i| i.stats.mana()).sum()
}

/// Effective combat damage: base stat plus every equipped item's
/// damage contribution.
pub fn effective_damage(player: &Player, cfg: &mud_config::Config, catalog: &Catalog) -> f64 {
    player.damage(cfg) + equipment_damage(player, catalog)
}

pub fn effective_defense(player: &Player, cfg: &mud_config::Config, catalog: &Catalog) -> f64 {
    player.defense(cfg) + equipment_defense(player, catalog)
}

pub fn effective_max_health(player: &Player, cfg: &mud_config::Config, catalog: &Catalog) -> f64 {
    player.max_health(cfg) + equipment_health_bonus(player, catalog)
}

pub fn effective_max_mana(player: &Player, cfg: &mud_config::Config, catalog: &Catalog) -> f64 {
    player.max_mana(cfg) + equipment_mana_bonus(player, catalog)
}

/// Crude power metric used by PvP's difficulty-table xp lookup:
/// `maxHealth + damage + defense`, equipment included.
pub fn power(player: &Player, cfg: &mud_config::Config, catalog: &Catalog) -> f64 {
    effective_max_health(player, cfg, catalog) + effective_damage(player, cfg, catalog) + effective_defense(player, cfg, catalog)
}
