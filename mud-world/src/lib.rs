//! The game-state engine: everything that mutates `WorldState` in
//! response to a parsed command lives in this crate, free of any
//! notion of sockets or the wire protocol. Handlers return plain
//! `Emissions` for the `mud` binary's message bus to deliver, and
//! expect to be called with the single game-state lock already held.

pub mod account;
pub mod auth;
pub mod combat;
pub mod combat_timers;
pub mod emission;
pub mod gm;
pub mod homestone;
pub mod info;
pub mod inventory;
pub mod movement;
pub mod presence;
pub mod quest;
pub mod rate_limit;
pub mod runtime;
pub mod social;
pub mod state;
pub mod stats;
pub mod tick;
pub mod trade;

pub use combat_timers::CombatTimers;
pub use emission::{Emission, Emissions};
pub use rate_limit::RateLimiter;
pub use runtime::{EnemyInstance, EnemyState, GroundItem, GroundItemKind};
pub use state::{LocationRuntime, WorldState};
