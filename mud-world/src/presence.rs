//! Disconnect housekeeping and login displacement. Both are
//! socket-agnostic: the Session Layer decides when to call these and
//! owns the actual TCP teardown, signalled back through the `oneshot`
//! handed to [`WorldState::attach_player`].

use mud_core::{MessageType, Username};
use mud_player::Player;
use tokio::sync::oneshot;

use crate::emission::Emissions;
use crate::state::WorldState;
use crate::trade;

/// Runs the full disconnect sequence for an attached `username`:
/// cancels any pending trade, drops them from every enemy's fighters
/// set in their current room, broadcasts a departure line, detaches
/// the presence record, and persists it. Returns the saved record so
/// a displacing login can reuse it directly instead of reloading from
/// disk.
pub fn disconnect_housekeeping(
    state: &mut WorldState,
    username: &Username,
    emissions: &mut Emissions,
) -> Option<Player> {
    trade::cancel_if_active(state, username, emissions, "you disconnected");

    let location = state.player(username)?.location.clone();
    if let Some(rt) = state.location_runtime_mut(&location) {
        for enemy in &mut rt.enemies {
            enemy.fighters.shift_remove(username);
        }
    }
    emissions.to_room(
        &location,
        MessageType::System,
        format!("{} has disconnected.", username.as_str()),
        Some(username),
    );

    let player = state.detach_player(username)?;
    if let Err(e) = state.store.save(&player) {
        log::error!("failed to persist {} on disconnect: {e}", username.as_str());
    }
    Some(player)
}

/// Displaces the connection already attached to `username`: the
/// caller has already validated the new login's credentials and
/// confirmed `state.is_attached(username)`. This sends the displaced
/// connection a `ForceLogout`, runs the usual disconnect housekeeping
/// against its still-live record (so the newest mutations are saved),
/// and hands back the one-shot the caller should fire once it's ready
/// to stop that connection's read loop -- firing it before this
/// function returns would race the save.
pub fn displace(
    state: &mut WorldState,
    username: &Username,
    emissions: &mut Emissions,
) -> (Option<Player>, Option<oneshot::Sender<()>>) {
    use mud_protocol::ServerFrame;

    let disconnect_signal = state.take_disconnect_signal(username);
    state.send_frame(username, ServerFrame::ForceLogout);
    let saved = disconnect_housekeeping(state, username, emissions);
    (saved, disconnect_signal)
}
