//! Trade escrow state. Not persisted: `Player`
//! marks the field `#[serde(skip)]` since a trade can't meaningfully
//! survive a server restart (the partner's in-memory state would be
//! gone too) and disconnect already cancels it.

use mud_core::Username;
use serde::{Deserialize, Serialize};

use crate::player::ItemInstance;

/// One side of a two-party escrow. Each trading player
/// carries their own `TradeState`; "their" items/gold/ready are never
/// duplicated here -- they're read live off the partner's own record,
/// which is what keeps trade symmetry true by
/// construction instead of by careful bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeState {
    pub with: Username,
    pub my_items: Vec<ItemInstance>,
    pub my_gold: i64,
    pub my_ready: bool,
    pub initiated_by: Username,
    pub pending: bool,
}

impl TradeState {
    pub fn new_pending(initiator: Username, with: Username) -> Self {
        TradeState {
            with,
            my_items: Vec::new(),
            my_gold: 0,
            my_ready: false,
            initiated_by: initiator,
            pending: true,
        }
    }

    pub fn reset_ready(&mut self) {
        self.my_ready = false;
    }
}
