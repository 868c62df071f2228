use serde::{Deserialize, Serialize};

/// The closed set of message frame types. `Info` is the
/// default when a handler emits a message without choosing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Info,
    Success,
    Error,
    Combat,
    Say,
    Whisper,
    Npc,
    System,
    Loot,
}

impl Default for MessageType {
    fn default() -> Self {
        MessageType::Info
    }
}
