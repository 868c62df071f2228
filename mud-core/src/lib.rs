//! Shared primitives used across the whole server: stable id newtypes,
//! the direction/message-type closed sets, the error taxonomy, and
//! small timing/rng helpers. Nothing in this crate touches game state;
//! it is the common vocabulary every other crate builds on.

pub mod direction;
pub mod error;
pub mod ids;
pub mod message;
pub mod rng;
pub mod time;

pub use direction::Direction;
pub use error::GameError;
pub use ids::{EnemyId, ItemId, LocationId, MaterialId, NpcId, QuestId, RecipeId, ShopId, Username};
pub use message::MessageType;
