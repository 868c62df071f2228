//! Handler-facing output: a handler never talks to a socket directly
//!. Instead every engine function
//! in this crate returns the `message` frames it produced as plain
//! data; the binary's bus turns each `Emission` into a stamped
//! `ServerFrame` and fans it out. This keeps `mud-world` free of any
//! notion of sockets, channels, or serialization.

use mud_core::{LocationId, MessageType, Username};

#[derive(Debug, Clone)]
pub enum Emission {
    ToPlayer {
        username: Username,
        kind: MessageType,
        text: String,
    },
    ToRoom {
        location: LocationId,
        kind: MessageType,
        text: String,
        exclude: Option<Username>,
    },
    ToAll {
        kind: MessageType,
        text: String,
    },
}

/// Accumulator handlers push into as they run; order is preserved so
/// that "messages emitted by a single handler arrive at each recipient
/// in the order emitted" holds trivially.
#[derive(Debug, Default)]
pub struct Emissions(pub Vec<Emission>);

impl Emissions {
    pub fn new() -> Self {
        Emissions(Vec::new())
    }

    pub fn to_player(&mut self, username: &Username, kind: MessageType, text: impl Into<String>) {
        self.0.push(Emission::ToPlayer {
            username: username.clone(),
            kind,
            text: text.into(),
        });
    }

    pub fn to_room(
        &mut self,
        location: &LocationId,
        kind: MessageType,
        text: impl Into<String>,
        exclude: Option<&Username>,
    ) {
        self.0.push(Emission::ToRoom {
            location: location.clone(),
            kind,
            text: text.into(),
            exclude: exclude.cloned(),
        });
    }

    pub fn to_all(&mut self, kind: MessageType, text: impl Into<String>) {
        self.0.push(Emission::ToAll {
            kind,
            text: text.into(),
        });
    }

    pub fn extend(&mut self, other: Emissions) {
        self.0.extend(other.0);
    }
}
