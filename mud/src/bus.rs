//! The Message Bus: turns the socket-agnostic `Emission`s a
//! handler returns into stamped `ServerFrame::Message` frames and fans
//! them out through `WorldState`'s outbox registry. This is the only
//! place in the binary that knows `Emission` exists; everything past
//! this point is plain `ServerFrame`s on a channel.

use mud_core::time::now_ms;
use mud_protocol::ServerFrame;
use mud_world::{Emission, Emissions, WorldState};

/// Delivers every emission in order. Delivery is
/// best-effort per connection -- a closed or full outbox channel is
/// silently dropped by `WorldState::send_frame`/`broadcast_frame`.
pub fn deliver(world: &WorldState, emissions: Emissions) {
    let timestamp = now_ms();
    for emission in emissions.0 {
        match emission {
            Emission::ToPlayer { username, kind, text } => {
                world.send_frame(&username, ServerFrame::message(kind, text, timestamp));
            }
            Emission::ToRoom { location, kind, text, exclude } => {
                world.broadcast_frame(&location, ServerFrame::message(kind, text, timestamp), exclude.as_ref());
            }
            Emission::ToAll { kind, text } => {
                world.broadcast_all_frame(ServerFrame::message(kind, text, timestamp));
            }
        }
    }
}
