//! `homestone {bind|where|recall}`. A homestone is a player-bound
//! respawn anchor set at a location tagged `homestone` in the catalog
//! (glossary); death and PvP defeat already fall back to it via
//! `combat.rs`, this module is the player-facing set/query/travel
//! surface.

use mud_config::Config;
use mud_core::{GameError, MessageType, Username};

use crate::emission::Emissions;
use crate::state::WorldState;
use crate::trade;

/// Binds the caller's homestone to their current location, which must
/// carry the `homestone` tag.
pub fn bind(state: &mut WorldState, username: &Username, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let location = player.location.clone();
    let loc = state.catalog.location(&location).ok_or(GameError::LookupUnknownId)?;
    if !loc.is_homestone() {
        return Err(GameError::MovementDestinationMissing);
    }
    let name = loc.name.clone();

    let player = state.player_mut(username).expect("checked above");
    player.homestone_location = Some(location);

    emissions.to_player(username, MessageType::Success, format!("Your homestone is now bound to {name}."));
    Ok(())
}

/// Reports where the caller's homestone is currently bound, if at all.
pub fn where_bound(state: &WorldState, username: &Username) -> Result<String, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    Ok(match &player.homestone_location {
        Some(loc_id) => {
            let name = state.catalog.location(loc_id).map(|l| l.name.as_str()).unwrap_or(loc_id.as_str());
            format!("Your homestone is bound to {name}.")
        }
        None => "You haven't bound a homestone yet.".to_string(),
    })
}

/// Travels to the bound homestone. Requires the player be out of
/// combat, same as a teleport scroll; there is no gold cost in
/// the source material for this path, unlike the NPC portal fee.
pub fn recall(state: &mut WorldState, cfg: &Config, username: &Username, emissions: &mut Emissions) -> Result<(), GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    if state.is_in_combat(player) {
        return Err(GameError::ItemUseWrongContext);
    }
    let destination = player.homestone_location.clone().ok_or(GameError::MovementDestinationMissing)?;
    if state.catalog.location(&destination).is_none() {
        return Err(GameError::MovementDestinationMissing);
    }

    trade::cancel_if_active(state, username, emissions, "you recalled home");
    crate::movement::relocate(
        state,
        cfg,
        username,
        &destination,
        emissions,
        format!("{} is pulled away by their homestone.", username.as_str()),
        format!("{} appears in a flash of light.", username.as_str()),
    );
    Ok(())
}
