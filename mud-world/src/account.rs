//! `reset-account` and `delete-account`: player-initiated
//! account management, distinct from a GM's `ban`/`kick` (`gm.rs`).

use mud_config::Config;
use mud_core::{time::now_ms, GameError, MessageType, Username};
use mud_player::Player;
use mud_protocol::ServerFrame;

use crate::emission::Emissions;
use crate::presence;
use crate::state::WorldState;

/// Resets the caller's character to a freshly-created state, keeping
/// only identity fields (`id`, `username`, `password_hash`, `is_gm`).
/// Disconnects the caller afterward the same way `delete_account`
/// does, since nothing about the session's cached state is still
/// meaningful.
pub fn reset_account(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    emissions: &mut Emissions,
) -> Result<Option<tokio::sync::oneshot::Sender<()>>, GameError> {
    let player = state.player(username).ok_or(GameError::LookupUnknownId)?;
    let id = player.id.clone();
    let password_hash = player.password_hash.clone();
    let is_gm = player.is_gm;

    let mut fresh = Player::new(id, username.clone(), password_hash, cfg.starting_location.as_str().into(), cfg);
    fresh.is_gm = is_gm;

    if let Some(player) = state.player_mut(username) {
        *player = fresh;
    }

    emissions.to_player(username, MessageType::System, "Your character has been reset. You will now be disconnected.");

    let disconnect_signal = state.take_disconnect_signal(username);
    presence::disconnect_housekeeping(state, username, emissions);
    Ok(disconnect_signal)
}

/// Deletes the caller's account entirely: detaches the live record
/// (without re-saving it, since the whole point is for it to be
/// gone), removes the on-disk file, and disconnects. Returns the
/// disconnect signal for the session layer to fire once it has sent
/// any final frame, mirroring [`presence::displace`]'s handoff.
pub fn delete_account(
    state: &mut WorldState,
    username: &Username,
    emissions: &mut Emissions,
) -> Result<Option<tokio::sync::oneshot::Sender<()>>, GameError> {
    if !state.is_attached(username) {
        return Err(GameError::LookupUnknownId);
    }

    state.send_frame(username, ServerFrame::message(MessageType::System, "Your account has been deleted. Goodbye.", now_ms()));

    let disconnect_signal = state.take_disconnect_signal(username);
    presence::disconnect_housekeeping(state, username, emissions);
    if let Err(e) = state.store.delete(username) {
        log::error!("failed to delete account file for {}: {e}", username.as_str());
    }
    Ok(disconnect_signal)
}
