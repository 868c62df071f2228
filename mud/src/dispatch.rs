//! Command Dispatcher: turns one raw `command` line from a
//! `ClientFrame::Command` into a verb plus the rest of the line,
//! resolves aliases, converts string arguments into the right id
//! newtypes, and calls the single `mud-world` function that verb maps
//! to. The session layer holds the game lock for the call; this
//! module never touches a socket or the lock itself.
//!
//! Every branch returns `Result<Outcome, GameError>`. An `Err` here
//! means the handler either never ran or returned before mutating
//! anything; the caller turns it into an
//! `error` frame sent only to the acting player, with no other
//! emissions delivered.

use rand::Rng;
use tokio::sync::oneshot;

use mud_config::Config;
use mud_core::{Direction, GameError, ItemId, MaterialId, MessageType, NpcId, RecipeId, Username};
use mud_player::EquipSlotKind;
use mud_world::emission::Emissions;
use mud_world::state::WorldState;
use mud_world::{account, combat, gm, homestone, info, inventory, movement, presence, quest, social, trade};

/// What the session layer should do once a command's emissions have
/// been delivered. `quit`, `reset-account`, and `delete-account` have
/// already run disconnect housekeeping against the caller's own
/// connection by the time they return here, so the session layer just
/// needs to stop its read loop (`self_disconnect`) rather than wait on
/// a signal it would never see fire. `ban`/`kick` instead hand back a
/// *different* connection's disconnect signal -- that connection's own
/// read loop is the one waiting on it.
pub struct Outcome {
    pub self_disconnect: bool,
    pub fire_signal: Option<oneshot::Sender<()>>,
}

impl Outcome {
    fn none() -> Self {
        Outcome { self_disconnect: false, fire_signal: None }
    }

    fn disconnect() -> Self {
        Outcome { self_disconnect: true, fire_signal: None }
    }

    fn signal(sender: Option<oneshot::Sender<()>>) -> Self {
        Outcome { self_disconnect: false, fire_signal: sender }
    }
}

/// Splits `command` into a lowercased verb and the untouched
/// remainder. Argument text (chat, search keywords) is never
/// lowercased -- only the verb token is.
fn split_verb(command: &str) -> (String, &str) {
    let trimmed = command.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb.to_lowercase(), rest.trim_start()),
        None => (trimmed.to_lowercase(), ""),
    }
}

fn require_arg<'a>(rest: &'a str) -> Result<&'a str, GameError> {
    if rest.is_empty() {
        Err(GameError::DispatchBadArguments)
    } else {
        Ok(rest)
    }
}

fn split_two(rest: &str) -> Result<(&str, &str), GameError> {
    let rest = require_arg(rest)?;
    let (first, second) = rest.split_once(char::is_whitespace).ok_or(GameError::DispatchBadArguments)?;
    let second = second.trim_start();
    if first.is_empty() || second.is_empty() {
        return Err(GameError::DispatchBadArguments);
    }
    Ok((first, second))
}

enum GoldOrItem {
    Gold(i64),
    Item(ItemId),
}

/// `trade add`/`trade remove` take either `gold <amount>` or a bare
/// item id; gold is the one trade
/// asset that isn't an id, so it gets its own keyword instead of
/// guessing from whether the token parses as a number.
fn parse_gold_or_item(rest: &str) -> Result<GoldOrItem, GameError> {
    let rest = require_arg(rest)?;
    match rest.split_once(char::is_whitespace) {
        Some((first, amount_raw)) if first.eq_ignore_ascii_case("gold") => {
            let amount: i64 = amount_raw.trim().parse().map_err(|_| GameError::DispatchBadArguments)?;
            Ok(GoldOrItem::Gold(amount))
        }
        _ => Ok(GoldOrItem::Item(rest.into())),
    }
}

enum GiveArgs {
    Item(ItemId, Username),
    Gold(i64, Username),
}

/// `give <itemId> <name>` or `give <N> gold <name>`: gold is the one
/// give asset that isn't an id, so it's recognized by its leading
/// amount followed by the `gold` keyword rather than guessed from
/// whether the first token parses as a number.
fn parse_give(rest: &str) -> Result<GiveArgs, GameError> {
    let rest = require_arg(rest)?;
    let (first, remainder) = rest.split_once(char::is_whitespace).ok_or(GameError::DispatchBadArguments)?;
    let remainder = remainder.trim_start();

    if let Ok(amount) = first.parse::<i64>() {
        let (gold_kw, name) = remainder.split_once(char::is_whitespace).ok_or(GameError::DispatchBadArguments)?;
        if !gold_kw.eq_ignore_ascii_case("gold") {
            return Err(GameError::DispatchBadArguments);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::DispatchBadArguments);
        }
        return Ok(GiveArgs::Gold(amount, name.into()));
    }

    let name = remainder.trim();
    if name.is_empty() {
        return Err(GameError::DispatchBadArguments);
    }
    Ok(GiveArgs::Item(first.into(), name.into()))
}

fn dispatch_give(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    rest: &str,
    emissions: &mut Emissions,
) -> Result<(), GameError> {
    match parse_give(rest)? {
        GiveArgs::Item(item_id, target) => inventory::give_item(state, cfg, username, &item_id, &target, emissions),
        GiveArgs::Gold(amount, target) => inventory::give_gold(state, username, amount, &target, emissions),
    }
}

fn parse_slot(raw: &str) -> Result<EquipSlotKind, GameError> {
    match raw.to_lowercase().as_str() {
        "weapon" => Ok(EquipSlotKind::Weapon),
        "armor" => Ok(EquipSlotKind::Armor),
        "shield" => Ok(EquipSlotKind::Shield),
        "accessory" => Ok(EquipSlotKind::Accessory),
        _ => Err(GameError::DispatchBadArguments),
    }
}

fn format_shop_listings(listings: Vec<quest::ShopListing>) -> String {
    if listings.is_empty() {
        return "This shop has nothing for sale.".to_string();
    }
    listings
        .into_iter()
        .map(|l| format!("{} ({}) - {} gold", l.name, l.item_id.as_str(), l.buy_price))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_trade_status(view: trade::TradeStatusView) -> String {
    let my_items: Vec<&str> = view.my_items.iter().map(ItemId::as_str).collect();
    let their_items: Vec<&str> = view.their_items.iter().map(ItemId::as_str).collect();
    format!(
        "Trading with {}{}\nYou offer: {} + {} gold [{}]\nThey offer: {} + {} gold [{}]",
        view.partner.as_str(),
        if view.pending { " (awaiting accept)" } else { "" },
        if my_items.is_empty() { "nothing".to_string() } else { my_items.join(", ") },
        view.my_gold,
        if view.my_ready { "ready" } else { "not ready" },
        if their_items.is_empty() { "nothing".to_string() } else { their_items.join(", ") },
        view.their_gold,
        if view.their_ready { "ready" } else { "not ready" },
    )
}

/// Runs one command for `username` against the held `state`. Returns
/// the emissions it produced (empty on error, aside from the single
/// error message pushed for the acting player) and the session-layer
/// `Outcome`.
pub fn dispatch(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    username: &Username,
    command: &str,
) -> (Emissions, Outcome) {
    let mut emissions = Emissions::new();
    let outcome = match run(state, cfg, rng, username, command, &mut emissions) {
        Ok(outcome) => outcome,
        Err(err) => {
            emissions.to_player(username, MessageType::Error, err.to_string());
            Outcome::none()
        }
    };
    (emissions, outcome)
}

fn run(
    state: &mut WorldState,
    cfg: &Config,
    rng: &mut impl Rng,
    username: &Username,
    command: &str,
    emissions: &mut Emissions,
) -> Result<Outcome, GameError> {
    let (verb, rest) = split_verb(command);

    if let Some(direction) = Direction::from_verb(&verb) {
        movement::move_player(state, cfg, username, direction, emissions)?;
        return Ok(Outcome::none());
    }

    match verb.as_str() {
        "move" | "go" => {
            let direction = Direction::from_verb(&require_arg(rest)?.to_lowercase()).ok_or(GameError::DispatchBadArguments)?;
            movement::move_player(state, cfg, username, direction, emissions)?;
        }
        "look" | "l" => {
            let text = movement::look(state, cfg, username)?;
            emissions.to_player(username, MessageType::Info, text);
        }
        "map" | "m" => {
            let text = movement::render_map(state, username)?;
            emissions.to_player(username, MessageType::Info, text);
        }
        "inventory" | "i" | "inv" => {
            let text = inventory::describe_inventory(state, cfg, username)?;
            emissions.to_player(username, MessageType::Info, text);
        }
        "equipment" | "eq" => {
            let text = inventory::describe_equipment(state, username)?;
            emissions.to_player(username, MessageType::Info, text);
        }
        "examine" | "x" | "ex" | "consider" | "con" => {
            let text = info::examine(state, username, require_arg(rest)?)?;
            emissions.to_player(username, MessageType::Info, text);
        }
        "get" | "take" => {
            let item_id: ItemId = require_arg(rest)?.into();
            inventory::get(state, cfg, username, &item_id, emissions)?;
        }
        "drop" => {
            let item_id: ItemId = require_arg(rest)?.into();
            inventory::drop(state, cfg, username, &item_id, emissions)?;
        }
        "give" => dispatch_give(state, cfg, username, rest, emissions)?,
        "use" => {
            let item_id: ItemId = require_arg(rest)?.into();
            inventory::use_item(state, cfg, rng, username, &item_id, emissions)?;
        }
        "equip" | "wear" | "wield" => {
            let item_id: ItemId = require_arg(rest)?.into();
            inventory::equip(state, cfg, username, &item_id, emissions)?;
        }
        "unequip" | "remove" => {
            let slot = parse_slot(require_arg(rest)?)?;
            inventory::unequip(state, cfg, username, slot, emissions)?;
        }
        "attack" | "hit" | "strike" => {
            combat::attack(state, cfg, rng, username, require_arg(rest)?, emissions)?;
        }
        "flee" | "run" => {
            combat::flee(state, cfg, rng, username, emissions)?;
        }
        "talk" | "speak" => {
            let npc_id: NpcId = require_arg(rest)?.into();
            quest::talk(state, cfg, username, &npc_id, emissions)?;
        }
        "buy" => {
            let item_id: ItemId = require_arg(rest)?.into();
            quest::shop_buy(state, cfg, username, &item_id, emissions)?;
        }
        "sell" => {
            let item_id: ItemId = require_arg(rest)?.into();
            quest::shop_sell(state, cfg, username, &item_id, emissions)?;
        }
        "list" | "shop" => {
            let listings = quest::shop_list(state, cfg, username)?;
            emissions.to_player(username, MessageType::Info, format_shop_listings(listings));
        }
        "homestone" => return dispatch_homestone(state, cfg, username, rest, emissions),
        "trade" => return dispatch_trade(state, cfg, username, rest, emissions),
        "craft" => {
            let recipe_id: RecipeId = require_arg(rest)?.into();
            quest::craft(state, cfg, username, &recipe_id, emissions)?;
        }
        "recipes" => {
            let text = info::list_recipes(state, username)?;
            emissions.to_player(username, MessageType::Info, text);
        }
        "harvest" => {
            let material_id: MaterialId = require_arg(rest)?.into();
            quest::harvest(state, cfg, rng, username, &material_id, emissions)?;
        }
        "materials" => {
            let text = info::list_materials(state, username)?;
            emissions.to_player(username, MessageType::Info, text);
        }
        "quest" | "quests" => {
            let text = info::list_quests(state, username)?;
            emissions.to_player(username, MessageType::Info, text);
        }
        "say" => {
            let text = require_arg(rest)?;
            if !quest::portal_say(state, cfg, username, text, emissions)? {
                social::say(state, username, text, emissions)?;
            }
        }
        "whisper" | "wis" | "tell" | "w" => {
            let (target, text) = split_two(rest)?;
            social::whisper(state, username, &target.into(), text, emissions)?;
        }
        "reply" | "r" => {
            social::reply(state, username, require_arg(rest)?, emissions)?;
        }
        "friend" | "friends" | "f" => return dispatch_friend(state, username, rest, emissions),
        "who" => {
            emissions.to_player(username, MessageType::Info, social::who(state, username));
        }
        "help" => {
            emissions.to_player(username, MessageType::Info, info::help_text());
        }
        "stats" => {
            let text = info::describe_stats(state, cfg, username)?;
            emissions.to_player(username, MessageType::Info, text);
        }
        "quit" | "logout" => {
            presence::disconnect_housekeeping(state, username, emissions);
            return Ok(Outcome::disconnect());
        }
        "reset-account" => {
            account::reset_account(state, cfg, username, emissions)?;
            return Ok(Outcome::disconnect());
        }
        "delete-account" => {
            account::delete_account(state, username, emissions)?;
            return Ok(Outcome::disconnect());
        }
        "ban" => {
            let (name, hours_raw) = split_two(rest)?;
            let hours: i64 = hours_raw.trim().parse().map_err(|_| GameError::DispatchBadArguments)?;
            let signal = gm::ban(state, username, &name.into(), hours, emissions)?;
            return Ok(Outcome::signal(signal));
        }
        "kick" => {
            let name = require_arg(rest)?;
            let signal = gm::kick(state, username, &name.into(), emissions)?;
            return Ok(Outcome::signal(signal));
        }
        "teleport" => {
            let (name, location_raw) = split_two(rest)?;
            gm::teleport(state, cfg, username, &name.into(), &location_raw.into(), emissions)?;
        }
        _ => return Err(GameError::DispatchUnknownVerb),
    }
    Ok(Outcome::none())
}

fn dispatch_homestone(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    rest: &str,
    emissions: &mut Emissions,
) -> Result<Outcome, GameError> {
    let (sub, _) = split_verb(rest);
    match sub.as_str() {
        "bind" => homestone::bind(state, username, emissions)?,
        "where" => {
            let text = homestone::where_bound(state, username)?;
            emissions.to_player(username, MessageType::Info, text);
        }
        "recall" => homestone::recall(state, cfg, username, emissions)?,
        _ => return Err(GameError::DispatchBadArguments),
    }
    Ok(Outcome::none())
}

fn dispatch_trade(
    state: &mut WorldState,
    cfg: &Config,
    username: &Username,
    rest: &str,
    emissions: &mut Emissions,
) -> Result<Outcome, GameError> {
    let (sub, sub_rest) = split_verb(rest);
    match sub.as_str() {
        "start" => trade::start(state, username, &require_arg(sub_rest)?.into(), emissions)?,
        "accept" => trade::accept(state, username, emissions)?,
        "add" => match parse_gold_or_item(sub_rest)? {
            GoldOrItem::Gold(amount) => trade::add_gold(state, username, amount, emissions)?,
            GoldOrItem::Item(item_id) => trade::add_item(state, username, &item_id, emissions)?,
        },
        "remove" => match parse_gold_or_item(sub_rest)? {
            GoldOrItem::Gold(amount) => trade::remove_gold(state, username, amount, emissions)?,
            GoldOrItem::Item(item_id) => trade::remove_item(state, username, &item_id, emissions)?,
        },
        "ready" => trade::ready(state, username, cfg, emissions)?,
        "cancel" => trade::cancel(state, username, emissions, "you cancelled the trade")?,
        "status" => {
            let view = trade::status(state, username)?;
            emissions.to_player(username, MessageType::Info, format_trade_status(view));
        }
        _ => return Err(GameError::DispatchBadArguments),
    }
    Ok(Outcome::none())
}

fn dispatch_friend(
    state: &mut WorldState,
    username: &Username,
    rest: &str,
    emissions: &mut Emissions,
) -> Result<Outcome, GameError> {
    let (sub, sub_rest) = split_verb(rest);
    match sub.as_str() {
        "list" | "" => {
            let friends = social::friend_list(state, username)?;
            if friends.is_empty() {
                emissions.to_player(username, MessageType::Info, "You have no friends added yet.");
            } else {
                let names: Vec<&str> = friends.iter().map(Username::as_str).collect();
                emissions.to_player(username, MessageType::Info, format!("Friends: {}", names.join(", ")));
            }
        }
        "add" => social::friend_add(state, username, &require_arg(sub_rest)?.into(), emissions)?,
        "remove" => social::friend_remove(state, username, &require_arg(sub_rest)?.into(), emissions)?,
        _ => return Err(GameError::DispatchBadArguments),
    }
    Ok(Outcome::none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_verb_lowercases_only_the_verb() {
        let (verb, rest) = split_verb("SAY Hello There");
        assert_eq!(verb, "say");
        assert_eq!(rest, "Hello There");
    }

    #[test]
    fn split_verb_handles_bare_verb() {
        let (verb, rest) = split_verb("look");
        assert_eq!(verb, "look");
        assert_eq!(rest, "");
    }

    #[test]
    fn split_two_requires_both_parts() {
        assert!(split_two("bob").is_err());
        let (a, b) = split_two("bob hello there").unwrap();
        assert_eq!(a, "bob");
        assert_eq!(b, "hello there");
    }

    #[test]
    fn unknown_slot_is_bad_arguments() {
        assert_eq!(parse_slot("helmet").unwrap_err(), GameError::DispatchBadArguments);
        assert_eq!(parse_slot("WEAPON").unwrap(), EquipSlotKind::Weapon);
    }

    #[test]
    fn parse_give_reads_an_item_form() {
        match parse_give("sword bob").unwrap() {
            GiveArgs::Item(item_id, target) => {
                assert_eq!(item_id.as_str(), "sword");
                assert_eq!(target.as_str(), "bob");
            }
            GiveArgs::Gold(..) => panic!("expected item form"),
        }
    }

    #[test]
    fn parse_give_reads_a_gold_form() {
        match parse_give("50 gold bob").unwrap() {
            GiveArgs::Gold(amount, target) => {
                assert_eq!(amount, 50);
                assert_eq!(target.as_str(), "bob");
            }
            GiveArgs::Item(..) => panic!("expected gold form"),
        }
    }

    #[test]
    fn parse_give_rejects_missing_target() {
        assert!(parse_give("sword").is_err());
        assert!(parse_give("50 gold").is_err());
    }

    #[test]
    fn w_is_not_a_movement_alias() {
        assert!(mud_core::Direction::from_verb("w").is_none());
        assert_eq!(mud_core::Direction::from_verb("west"), Some(mud_core::Direction::West));
    }
}
