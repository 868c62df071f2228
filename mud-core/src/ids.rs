//! Stable string identifiers for every template and runtime entity.
//!
//! Per the Design Notes, the object graph (player <-> room <-> enemy <->
//! fighters-by-username) is modeled by id, not by pointer: handlers look
//! entities up in the top-level maps owned by `WorldState` each time
//! rather than chasing references through mutable state. That makes
//! dangling references structurally impossible (an enemy respawn or a
//! player disconnect can never leave a stale pointer behind, only a
//! lookup that comes back empty).
//!
//! Distinct newtypes per entity kind catch id mix-ups (e.g. passing an
//! `ItemId` where a `MaterialId` is expected) at compile time.

macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
            derive_more::Display,
            derive_more::From,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(LocationId);
define_id!(ItemId);
define_id!(EnemyId);
define_id!(NpcId);
define_id!(QuestId);
define_id!(ShopId);
define_id!(RecipeId);
define_id!(MaterialId);
define_id!(Username);

impl Username {
    /// Usernames are case-insensitive-unique; this is the key used for
    /// lookups in the presence and player-store maps.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }
}
