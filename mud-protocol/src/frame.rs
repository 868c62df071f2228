//! Wire frame shapes. Every frame is a self-describing JSON record
//! with a string `type` tag; `serde`'s internally tagged enum support
//! gives us exactly that for free, one variant per frame kind.

use mud_core::MessageType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames the client sends. `Command`'s inner string is the raw line;
/// tokenizing `verb [args...]` is the dispatcher's job, not the wire
/// layer's.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientFrame {
    Register { username: String, password: String },
    Login { username: String, password: String },
    Command { command: String },
}

/// Frames the server sends. `player`/`room` payloads are opaque
/// [`Value`]s rather than typed structs: the protocol crate doesn't
/// know about `Player` or `WorldState`, so the caller serializes
/// whatever snapshot it has to hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerFrame {
    Auth {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        player: Option<Value>,
    },
    Error {
        data: String,
    },
    Message {
        #[serde(rename = "type")]
        message_type: MessageType,
        text: String,
        timestamp: i64,
    },
    GameState {
        player: Value,
        room: Value,
    },
    Logout,
    ForceLogout,
    AreaMap {
        rooms: Value,
        exit_cells: Value,
        grid_size: Value,
        player_position: Value,
    },
    RoomExits {
        exits: Value,
    },
}

impl ServerFrame {
    pub fn error(text: impl Into<String>) -> Self {
        ServerFrame::Error { data: text.into() }
    }

    pub fn message(kind: MessageType, text: impl Into<String>, timestamp: i64) -> Self {
        ServerFrame::Message {
            message_type: kind,
            text: text.into(),
            timestamp,
        }
    }
}
