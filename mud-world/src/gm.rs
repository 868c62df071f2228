//! Operator-only verbs, gated on `player.isGm`: `ban`, `kick`,
//! `teleport`. The caller checks `player.isGm` before entering any of
//! these (the permission error is uniform across all three), so
//! nothing in here re-derives it.

use mud_config::Config;
use mud_core::{time::now_ms, GameError, LocationId, MessageType, Username};

use crate::emission::Emissions;
use crate::presence;
use crate::state::WorldState;

fn require_gm(state: &WorldState, caller: &Username) -> Result<(), GameError> {
    let player = state.player(caller).ok_or(GameError::LookupUnknownId)?;
    if !player.is_gm {
        return Err(GameError::GmNotAuthorized);
    }
    Ok(())
}

/// `ban <name> <hours>`: sets `bannedUntil` on the target's record,
/// disconnects them if attached, and persists the ban even if they
/// weren't. Subsequent logins are refused by `auth::login` until the
/// deadline passes.
pub fn ban(
    state: &mut WorldState,
    caller: &Username,
    target: &Username,
    hours: i64,
    emissions: &mut Emissions,
) -> Result<Option<tokio::sync::oneshot::Sender<()>>, GameError> {
    require_gm(state, caller)?;
    if hours <= 0 {
        return Err(GameError::GmTargetOffline);
    }

    let until = now_ms() + hours * 3600 * 1000;

    if state.is_attached(target) {
        if let Some(player) = state.player_mut(target) {
            player.banned_until = Some(until);
        }
        emissions.to_player(target, MessageType::System, "You have been banned by a moderator.");
        emissions.to_player(caller, MessageType::System, format!("{} is banned for {hours} hour(s).", target.as_str()));
        let disconnect_signal = state.take_disconnect_signal(target);
        presence::disconnect_housekeeping(state, target, emissions);
        return Ok(disconnect_signal);
    }

    match state.store.load(target) {
        Ok(mut record) => {
            record.banned_until = Some(until);
            state.store.save(&record).map_err(|_| GameError::GmTargetOffline)?;
            emissions.to_player(caller, MessageType::System, format!("{} is banned for {hours} hour(s).", target.as_str()));
            Ok(None)
        }
        Err(_) => Err(GameError::GmTargetOffline),
    }
}

/// `kick <name>`: disconnects an attached player without banning
/// them.
pub fn kick(
    state: &mut WorldState,
    caller: &Username,
    target: &Username,
    emissions: &mut Emissions,
) -> Result<Option<tokio::sync::oneshot::Sender<()>>, GameError> {
    require_gm(state, caller)?;
    if !state.is_attached(target) {
        return Err(GameError::GmTargetOffline);
    }

    emissions.to_player(target, MessageType::System, "You have been kicked by a moderator.");
    emissions.to_player(caller, MessageType::System, format!("{} has been kicked.", target.as_str()));

    let disconnect_signal = state.take_disconnect_signal(target);
    presence::disconnect_housekeeping(state, target, emissions);
    Ok(disconnect_signal)
}

/// `teleport <name> <locationId>`: forcibly relocates another online
/// player, bypassing exits, combat state, and trade locks.
pub fn teleport(
    state: &mut WorldState,
    cfg: &Config,
    caller: &Username,
    target: &Username,
    destination: &LocationId,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    require_gm(state, caller)?;
    if !state.is_attached(target) {
        return Err(GameError::GmTargetOffline);
    }
    if state.catalog.location(destination).is_none() {
        return Err(GameError::GmUnknownLocation);
    }

    crate::trade::cancel_if_active(state, target, emissions, "you were teleported");
    crate::movement::relocate(
        state,
        cfg,
        target,
        destination,
        emissions,
        format!("{} vanishes in a burst of light.", target.as_str()),
        format!("{} appears in a burst of light.", target.as_str()),
    );
    emissions.to_player(caller, MessageType::System, format!("{} teleported to {}.", target.as_str(), destination.as_str()));
    Ok(())
}
