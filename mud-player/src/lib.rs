pub mod password;
pub mod player;
pub mod store;
pub mod trade;

pub use player::{EquipSlotKind, ItemInstance, Player, Stats, PLAYER_SCHEMA_VERSION};
pub use store::{PlayerStore, StoreError};
pub use trade::TradeState;
