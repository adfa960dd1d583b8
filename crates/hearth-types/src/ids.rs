//! Type-safe handles and authored keys.
//!
//! Runtime entities (agents, societies, anchors, intents) are addressed by
//! opaque integer handles that index into arena tables owned by the
//! simulation state. Cross references between requesters, providers,
//! queues and anchors are always stored as handles, never as owning
//! pointers, so the graph of relationships can be cyclic without any
//! shared ownership.
//!
//! Needs and resources are authored data and are keyed by name
//! ([`NeedId`], [`ResourceId`]). An empty key means "not specified".

use serde::{Deserialize, Serialize};

/// Generates a newtype handle around a `u32` arena index with standard derives.
macro_rules! define_handle {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Create a handle from a raw arena index.
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Return the raw handle value.
            pub const fn into_inner(self) -> u32 {
                self.0
            }

            /// Return the handle as an arena index.
            pub fn index(self) -> usize {
                usize::try_from(self.0).unwrap_or(usize::MAX)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Generates a newtype around an authored string key.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a key from any string-like value.
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// The empty key ("not specified").
            pub const fn empty() -> Self {
                Self(String::new())
            }

            /// Whether the key is unspecified.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Borrow the key text.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_owned())
            }
        }
    };
}

define_handle! {
    /// Handle of an agent (individual NPC) in the agent arena.
    AgentId
}

define_handle! {
    /// Handle of a society: a group of agents sharing a clock, a resource
    /// pool and a trade cadence.
    SocietyId
}

define_handle! {
    /// Handle of a fixed world location associated with an activity or provider.
    AnchorId
}

define_handle! {
    /// Handle of an intent, unique within the owning agent's queue.
    IntentId
}

define_key! {
    /// Authored identifier of a need (e.g. `"thirst"`).
    NeedId
}

define_key! {
    /// Authored identifier of a resource (e.g. `"water"`).
    ResourceId
}
