//! Movement, look, and the map renderer.

use std::collections::{HashMap, HashSet, VecDeque};

use mud_config::Config;
use mud_core::{Direction, GameError, LocationId, MessageType, Username};

use crate::emission::Emissions;
use crate::state::WorldState;
use crate::trade;

/// Moves `username` through `direction`, cancelling any pending trade
/// first, broadcasting departure/arrival, and appending a `look` of the
/// new room.
pub fn move_player(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    direction: Direction,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::MovementNoExit)?;
    let current = player.location.clone();
    let destination = state
        .catalog
        .location(&current)
        .and_then(|loc| loc.exits.get(&direction))
        .cloned()
        .ok_or(GameError::MovementNoExit)?;
    if state.catalog.location(&destination).is_none() {
        return Err(GameError::MovementDestinationMissing);
    }

    trade::cancel_if_active(state, username, emissions, "you walked away");

    relocate(
        state,
        cfg,
        username,
        &destination,
        emissions,
        format!("{} leaves {}.", username.as_str(), direction.as_str()),
        format!("{} arrives.", username.as_str()),
    );
    Ok(())
}

/// Shared relocation primitive used by `move`, `flee`, homestone
/// recall, teleport scrolls, and death respawns: updates `location`,
/// broadcasts the leave/arrive lines, and appends a `look` for the
/// mover.
pub fn relocate(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    destination: &LocationId,
    emissions: &mut Emissions,
    leave_text: String,
    arrive_text: String,
) {
    let Some(player) = state.player_mut(username) else { return };
    let old_location = player.location.clone();
    player.location = destination.clone();

    if !leave_text.is_empty() {
        emissions.to_room(&old_location, MessageType::System, leave_text, Some(username));
    }
    if !arrive_text.is_empty() {
        emissions.to_room(destination, MessageType::System, arrive_text, Some(username));
    }

    if let Ok(text) = look(state, cfg, username) {
        emissions.to_player(username, MessageType::Info, text);
    }
}

/// Renders the current room for `username`: header, description,
/// exits, people, enemies (with wound descriptor), ground items, and
/// resource nodes.
pub fn look(state: &WorldState, _cfg: &Config, username: &Username) -> Result<String, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let loc = state
        .catalog
        .location(&player.location)
        .ok_or(GameError::LookupUnknownId)?;

    let mut out = String::new();

    let mut tags = Vec::new();
    if loc.is_homestone() {
        tags.push("Home");
    }
    if loc.shop.is_some() {
        tags.push("Shop");
    }
    if loc.is_pvp_allowed() {
        tags.push("PvP");
    }
    if tags.is_empty() {
        out.push_str(&format!("== {} ==\n", loc.name));
    } else {
        out.push_str(&format!("== {} [{}] ==\n", loc.name, tags.join(", ")));
    }
    out.push_str(&loc.description);
    out.push('\n');

    if !loc.exits.is_empty() {
        out.push_str("Exits: ");
        let mut parts: Vec<String> = loc
            .exits
            .iter()
            .map(|(dir, dest_id)| {
                let dest_name = state
                    .catalog
                    .location(dest_id)
                    .map(|d| d.name.as_str())
                    .unwrap_or(dest_id.as_str());
                format!("{} ({dest_name})", dir.as_str())
            })
            .collect();
        parts.sort();
        out.push_str(&parts.join(", "));
        out.push('\n');
    }

    let mut people: Vec<String> = loc
        .npcs
        .iter()
        .filter_map(|id| state.catalog.npc(id))
        .map(|n| n.name.clone())
        .collect();
    let mut other_players: Vec<String> = state
        .players_in(&player.location)
        .into_iter()
        .filter(|u| u != username)
        .map(|u| u.as_str().to_string())
        .collect();
    other_players.sort();
    people.append(&mut other_players);
    if !people.is_empty() {
        out.push_str("People here: ");
        out.push_str(&people.join(", "));
        out.push('\n');
    }

    let enemy_lines: Vec<String> = state
        .visible_enemy_indices(player, &player.location)
        .into_iter()
        .filter_map(|i| {
            let rt = state.location_runtime(&player.location)?;
            let enemy = rt.enemies.get(i)?;
            if !enemy.is_alive() {
                return None;
            }
            let tmpl = state.catalog.enemy(&enemy.enemy_id)?;
            Some(format!("{} ({})", tmpl.name, enemy.wound_descriptor()))
        })
        .collect();
    if !enemy_lines.is_empty() {
        out.push_str("Enemies: ");
        out.push_str(&enemy_lines.join(", "));
        out.push('\n');
    }

    let item_lines: Vec<String> = state
        .visible_ground_item_indices(player, &player.location)
        .into_iter()
        .filter_map(|i| {
            let rt = state.location_runtime(&player.location)?;
            let gi = rt.ground_items.get(i)?;
            state.catalog.item(&gi.item_id).map(|t| t.name.clone())
        })
        .collect();
    if !item_lines.is_empty() {
        out.push_str("Ground items: ");
        out.push_str(&item_lines.join(", "));
        out.push('\n');
    }

    if !loc.resource_nodes.is_empty() {
        let now = mud_core::time::now_ms();
        let lines: Vec<String> = loc
            .resource_nodes
            .iter()
            .filter_map(|node| {
                let mat = state.catalog.material(&node.material_id)?;
                let status = match state.resource_ready(&player.location, &node.material_id, player, now) {
                    Ok(()) => "ready".to_string(),
                    Err(remaining_ms) => format!("available in {} minute(s)", (remaining_ms + 59_999) / 60_000),
                };
                Some(format!("{} ({status})", mat.name))
            })
            .collect();
        if !lines.is_empty() {
            out.push_str("Resources: ");
            out.push_str(&lines.join(", "));
            out.push('\n');
        }
    }

    Ok(out.trim_end().to_string())
}

const CELL_WIDTH: usize = 11;
const MAP_DEPTH: usize = 5;

fn pad_cell(text: &str) -> String {
    let truncated: String = text.chars().take(CELL_WIDTH).collect();
    format!("[{truncated:^width$}]", width = CELL_WIDTH)
}

/// BFS map render: a grid of bracketed, padded room names
/// connected by direction glyphs, capped at depth 5. `up`/`down` have
/// no planar component and are omitted from the grid.
pub fn render_map(state: &WorldState, username: &Username) -> Result<String, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let start = player.location.clone();

    let mut coords: HashMap<LocationId, (i32, i32)> = HashMap::new();
    coords.insert(start.clone(), (0, 0));
    let mut visited: HashSet<LocationId> = HashSet::new();
    visited.insert(start.clone());
    let mut queue = VecDeque::new();
    queue.push_back((start.clone(), 0usize));

    while let Some((loc_id, depth)) = queue.pop_front() {
        if depth >= MAP_DEPTH {
            continue;
        }
        let Some(loc) = state.catalog.location(&loc_id) else { continue };
        let (cx, cy) = coords[&loc_id];
        for (dir, dest) in &loc.exits {
            let Some((dx, dy)) = dir.unit_vector() else { continue };
            if visited.contains(dest) {
                continue;
            }
            visited.insert(dest.clone());
            coords.insert(dest.clone(), (cx + dx, cy + dy));
            queue.push_back((dest.clone(), depth + 1));
        }
    }

    let min_x = coords.values().map(|(x, _)| *x).min().unwrap_or(0);
    let max_x = coords.values().map(|(x, _)| *x).max().unwrap_or(0);
    let min_y = coords.values().map(|(_, y)| *y).min().unwrap_or(0);
    let max_y = coords.values().map(|(_, y)| *y).max().unwrap_or(0);

    let by_coord: HashMap<(i32, i32), &LocationId> =
        coords.iter().map(|(id, c)| (*c, id)).collect();

    let mut lines = Vec::new();
    for y in (min_y..=max_y).rev() {
        let mut room_row = String::new();
        let mut connector_row = String::new();
        for x in min_x..=max_x {
            let cell_text = match by_coord.get(&(x, y)) {
                Some(id) if *id == &start => "You".to_string(),
                Some(id) => state
                    .catalog
                    .location(id)
                    .map(|l| l.name.clone())
                    .unwrap_or_default(),
                None => String::new(),
            };
            room_row.push_str(&if cell_text.is_empty() {
                " ".repeat(CELL_WIDTH + 2)
            } else if cell_text == "You" {
                format!("[{:^width$}]", "You", width = CELL_WIDTH)
            } else {
                pad_cell(&cell_text)
            });

            let has_east = by_coord.contains_key(&(x, y)) && by_coord.contains_key(&(x + 1, y));
            room_row.push_str(if has_east { "-" } else { " " });

            let has_ne = by_coord.contains_key(&(x, y)) && by_coord.contains_key(&(x + 1, y + 1));
            let has_nw = by_coord.contains_key(&(x, y)) && by_coord.contains_key(&(x - 1, y + 1));
            let has_n = by_coord.contains_key(&(x, y)) && by_coord.contains_key(&(x, y + 1));
            connector_row.push_str(if has_nw { "\\" } else { " " });
            connector_row.push_str(if has_n { "|" } else { " " });
            connector_row.push_str(if has_ne { "/" } else { " " });
            connector_row.push_str(&" ".repeat(CELL_WIDTH.saturating_sub(2)));
        }
        lines.push(connector_row.trim_end().to_string());
        lines.push(room_row.trim_end().to_string());
    }
    lines.reverse();
    Ok(lines.join("\n"))
}
