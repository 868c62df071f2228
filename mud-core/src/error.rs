use thiserror::Error;

/// The full error taxonomy. Every variant carries a stable
/// `code()` for client-side localization; `Display` produces the
/// human-readable text that rides inside the `error` message frame. No
/// variant here ever causes a state mutation — handlers check for the
/// failure condition and return before touching `WorldState`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GameError {
    #[error("invalid credentials")]
    AuthInvalidCredentials,
    #[error("that username is already taken")]
    AuthUsernameTaken,
    #[error("password must be at least 3 characters")]
    AuthPasswordTooShort,
    #[error("usernames must be 3-12 letters")]
    AuthUsernameMalformed,
    #[error("you are banned until {0}")]
    AuthBanned(String),

    #[error("too many accounts created from this address, try again later")]
    RateLimitTooManyAccounts,
    #[error("please wait before creating another account")]
    RateLimitCreationCooldown,
    #[error("too many failed login attempts, try again in {remaining_secs}s")]
    RateLimitLoginBlocked { remaining_secs: i64 },

    #[error("there is no exit in that direction")]
    MovementNoExit,
    #[error("that destination no longer exists")]
    MovementDestinationMissing,

    #[error("you don't see that here")]
    LookupUnknownId,

    #[error("your inventory is full")]
    InventoryFull,
    #[error("you don't have that item")]
    InventoryItemNotFound,
    #[error("that item can't be used that way")]
    InventoryWrongType,

    #[error("that item can't be equipped")]
    EquipmentNotEquippable,
    #[error("that slot is empty")]
    EquipmentSlotEmpty,
    #[error("make room: your inventory is full")]
    EquipmentSlotFull,

    #[error("you aren't in combat")]
    CombatNotInCombat,
    #[error("that target is already dead")]
    CombatTargetDead,
    #[error("you don't see that target here")]
    CombatTargetNotFound,
    #[error("PvP isn't allowed here")]
    CombatPvpDisallowed,

    #[error("that's on cooldown for another {remaining_ms}ms")]
    ItemUseCooldownActive { remaining_ms: i64 },
    #[error("you can't use that right now")]
    ItemUseWrongContext,
    #[error("you don't have enough mana")]
    ItemUseInsufficientMana,
    #[error("there's no target for that")]
    ItemUseNoTarget,

    #[error("you aren't eligible for that yet")]
    QuestNotEligible,
    #[error("you haven't met the prerequisites for that")]
    QuestPrerequisitesUnmet,
    #[error("make room: your inventory can't hold the reward")]
    QuestInventorySpaceInsufficient,

    #[error("you're already trading")]
    TradeAlreadyTrading,
    #[error("you must be in the same room to trade")]
    TradeSameRoomRequired,
    #[error("that player isn't online")]
    TradePartnerOffline,
    #[error("not enough inventory space to complete the trade")]
    TradeInsufficientSpaceOnExecute,
    #[error("there's no trade to act on")]
    TradeNoActiveTrade,
    #[error("you can't trade with yourself")]
    TradeCannotTradeWithSelf,
    #[error("you don't have that many gold")]
    TradeInsufficientGold,

    #[error("that shop doesn't carry that")]
    ShopNotStocked,
    #[error("you don't have enough gold")]
    ShopInsufficientGold,

    #[error("you don't know that recipe")]
    CraftUnknownRecipe,
    #[error("you're missing materials for that")]
    CraftMissingMaterials,
    #[error("your level is too low for that")]
    CraftLevelTooLow,

    #[error("there's nothing to harvest here")]
    HarvestNothingToHarvest,
    #[error("that material isn't harvestable here")]
    HarvestWrongMaterial,
    #[error("that resource needs {remaining_minutes} more minute(s) to recover")]
    HarvestCooldownRemaining { remaining_minutes: i64 },

    #[error("you are dead")]
    DeathWhileDead,

    #[error("you don't have permission to do that")]
    GmNotAuthorized,
    #[error("that player isn't online")]
    GmTargetOffline,
    #[error("there's no such location")]
    GmUnknownLocation,

    #[error("that player isn't online")]
    SocialTargetOffline,
    #[error("you can't do that to yourself")]
    SocialCannotTargetSelf,
    #[error("no one has whispered to you")]
    SocialNoWhisperTarget,
    #[error("that player isn't on your friends list")]
    SocialNotFriends,

    #[error("unknown command")]
    DispatchUnknownVerb,
    #[error("missing or invalid arguments")]
    DispatchBadArguments,
}

impl GameError {
    /// Stable code used for client-side localization, independent of the
    /// human-readable `Display` text (which may be reworded freely).
    pub fn code(&self) -> &'static str {
        match self {
            GameError::AuthInvalidCredentials => "auth.invalid_credentials",
            GameError::AuthUsernameTaken => "auth.username_taken",
            GameError::AuthPasswordTooShort => "auth.password_too_short",
            GameError::AuthUsernameMalformed => "auth.username_malformed",
            GameError::AuthBanned(_) => "auth.banned",
            GameError::RateLimitTooManyAccounts => "rate_limit.too_many_accounts",
            GameError::RateLimitCreationCooldown => "rate_limit.creation_cooldown",
            GameError::RateLimitLoginBlocked { .. } => "rate_limit.login_blocked",
            GameError::MovementNoExit => "movement.no_exit",
            GameError::MovementDestinationMissing => "movement.destination_missing",
            GameError::LookupUnknownId => "lookup.unknown_id",
            GameError::InventoryFull => "inventory.full",
            GameError::InventoryItemNotFound => "inventory.item_not_found",
            GameError::InventoryWrongType => "inventory.wrong_type",
            GameError::EquipmentNotEquippable => "equipment.not_equippable",
            GameError::EquipmentSlotEmpty => "equipment.slot_empty",
            GameError::EquipmentSlotFull => "equipment.slot_full",
            GameError::CombatNotInCombat => "combat.not_in_combat",
            GameError::CombatTargetDead => "combat.target_dead",
            GameError::CombatTargetNotFound => "combat.target_not_found",
            GameError::CombatPvpDisallowed => "combat.pvp_disallowed",
            GameError::ItemUseCooldownActive { .. } => "item_use.cooldown_active",
            GameError::ItemUseWrongContext => "item_use.wrong_context",
            GameError::ItemUseInsufficientMana => "item_use.insufficient_mana",
            GameError::ItemUseNoTarget => "item_use.no_target",
            GameError::QuestNotEligible => "quest.not_eligible",
            GameError::QuestPrerequisitesUnmet => "quest.prerequisites_unmet",
            GameError::QuestInventorySpaceInsufficient => "quest.inventory_space_insufficient",
            GameError::TradeAlreadyTrading => "trade.already_trading",
            GameError::TradeSameRoomRequired => "trade.same_room_required",
            GameError::TradePartnerOffline => "trade.partner_offline",
            GameError::TradeInsufficientSpaceOnExecute => "trade.insufficient_space_on_execute",
            GameError::TradeNoActiveTrade => "trade.no_active_trade",
            GameError::TradeCannotTradeWithSelf => "trade.cannot_trade_with_self",
            GameError::TradeInsufficientGold => "trade.insufficient_gold",
            GameError::ShopNotStocked => "shop.not_stocked",
            GameError::ShopInsufficientGold => "shop.insufficient_gold",
            GameError::CraftUnknownRecipe => "craft.unknown_recipe",
            GameError::CraftMissingMaterials => "craft.missing_materials",
            GameError::CraftLevelTooLow => "craft.level_too_low",
            GameError::HarvestNothingToHarvest => "harvest.nothing_to_harvest",
            GameError::HarvestWrongMaterial => "harvest.wrong_material",
            GameError::HarvestCooldownRemaining { .. } => "harvest.cooldown_remaining",
            GameError::DeathWhileDead => "death.while_dead",
            GameError::GmNotAuthorized => "gm.not_authorized",
            GameError::GmTargetOffline => "gm.target_offline",
            GameError::GmUnknownLocation => "gm.unknown_location",
            GameError::SocialTargetOffline => "social.target_offline",
            GameError::SocialCannotTargetSelf => "social.cannot_target_self",
            GameError::SocialNoWhisperTarget => "social.no_whisper_target",
            GameError::SocialNotFriends => "social.not_friends",
            GameError::DispatchUnknownVerb => "dispatch.unknown_verb",
            GameError::DispatchBadArguments => "dispatch.bad_arguments",
        }
    }
}
