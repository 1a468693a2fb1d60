//! Newtype identifiers used by the dispatcher.
//!
//! Each keyed concept gets its own newtype so that, for example, a bus
//! [`Ticket`] can never be passed where a [`CallId`] is expected even though
//! both are plain integers or UUIDs underneath.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{form_encode, Params, Verb};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes.
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

string_id! {
    /// Canonical key identifying a logically unique request.
    ///
    /// Two requests with the same endpoint, verb and parameter set always
    /// produce equal fingerprints. The parameter set is a sorted map, so the
    /// order in which parameters were inserted never matters.
    ///
    /// Format: `"<VERB> <url>"` followed by `?<form-encoded params>` when the
    /// parameter set is non-empty. Descriptors scope it further with
    /// [`Fingerprint::scoped`], so requests made through different descriptor
    /// types never share a call.
    Fingerprint
}

impl Fingerprint {
    /// Computes the fingerprint for `verb` against `url` with `params`.
    pub fn compute(verb: Verb, url: &str, params: &Params) -> Self {
        let mut key = format!("{verb} {url}");
        if !params.is_empty() {
            key.push('?');
            key.push_str(&form_encode(params));
        }
        Self(key)
    }

    /// Appends the identity of the descriptor issuing the request:
    /// `"<VERB> <url>[?<params>] <descriptor>"`.
    pub fn scoped(self, descriptor: &str) -> Self {
        Self(format!("{} {descriptor}", self.0))
    }
}

// ---------------------------------------------------------------------------
// Bus generation ticket
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies which admitted call owns a bus entry.
    ///
    /// Handed out by [`crate::CallbackBus::register`] on admission. An entry
    /// that was pruned and re-created by a later registration carries a new
    /// ticket, so a stale call can never claim the newer call's listeners.
    Ticket
}

// ---------------------------------------------------------------------------
// Call identifier
// ---------------------------------------------------------------------------

/// Identifies one admitted Transport call.
///
/// Generated when a fingerprint is admitted; recorded on the call's tracing
/// span and on the resulting envelope so fan-out deliveries can be correlated
/// with the network activity that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(Uuid);

impl CallId {
    /// Generates a new random call identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`CallId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
