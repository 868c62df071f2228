use thiserror::Error;

/// Fatal load-time errors. Every variant names the offending entity and, where
/// possible, the place it was referenced from, e.g. "entity X
/// referenced from Y".
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read data directory {0}: {1}")]
    DirectoryRead(String, String),
    #[error("could not read {0}: {1}")]
    FileRead(String, String),
    #[error("could not parse {0}: {1}")]
    Parse(String, String),
    #[error("file stem {stem:?} does not match id {id:?} in {path}")]
    StemIdMismatch {
        path: String,
        stem: String,
        id: String,
    },
    #[error("duplicate id {id:?} ({kind}): first seen in {first}, again in {second}")]
    DuplicateId {
        kind: String,
        id: String,
        first: String,
        second: String,
    },
    #[error("unknown {kind} id {id:?} referenced from {referenced_from}")]
    UnknownReference {
        kind: String,
        id: String,
        referenced_from: String,
    },
    #[error("quest {quest} has {count} offering NPCs (at most one allowed): {npcs}")]
    DuplicateQuestOffer {
        quest: String,
        count: usize,
        npcs: String,
    },
}
