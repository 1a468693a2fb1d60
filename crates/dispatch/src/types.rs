//! Shared value types for requests and responses.
//!
//! Parameter and header sets are sorted maps: iteration order is the key
//! order, which keeps fingerprints and encoded query strings canonical no
//! matter how callers assembled them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameter and header sets
// ---------------------------------------------------------------------------

/// Request parameters, keyed and ordered by name.
pub type Params = BTreeMap<String, String>;

/// Request headers, keyed and ordered by name.
pub type Headers = BTreeMap<String, String>;

/// Builds a parameter set from a flat `[key, value, key, value, …]` list.
///
/// A trailing key with no value maps to the empty string.
pub fn params_from_pairs(pairs: &[&str]) -> Params {
    pairs
        .chunks(2)
        .map(|chunk| {
            let key = chunk[0].to_string();
            let value = chunk.get(1).map(|v| v.to_string()).unwrap_or_default();
            (key, value)
        })
        .collect()
}

/// Form-urlencodes `params` as `k1=v1&k2=v2`, in key order.
pub fn form_encode(params: &Params) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

// ---------------------------------------------------------------------------
// Verbs
// ---------------------------------------------------------------------------

/// HTTP verb of a dispatched request.
///
/// `Get` and `Delete` carry their parameters in the query string; `Put` and
/// `Post` carry them in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Put,
    Post,
    Delete,
}

impl Verb {
    /// Returns the method token as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Post => "POST",
            Verb::Delete => "DELETE",
        }
    }

    /// Returns `true` if parameters travel in the request body.
    pub fn carries_body(self) -> bool {
        matches!(self, Verb::Put | Verb::Post)
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "PUT" => Ok(Verb::Put),
            "POST" => Ok(Verb::Post),
            "DELETE" => Ok(Verb::Delete),
            other => Err(format!("unsupported verb '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// Status reported when no HTTP response was received at all.
pub const NO_RESPONSE: u16 = 0;

/// Returns `true` for 2xx status codes.
pub fn is_2xx(status: u16) -> bool {
    (200..300).contains(&status)
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_from_pairs_trailing_key() {
        let params = params_from_pairs(&["a", "1", "dangling"]);
        assert_eq!(params.get("a").map(String::as_str), Some("1"));
        assert_eq!(params.get("dangling").map(String::as_str), Some(""));
    }

    #[test]
    fn test_form_encode_escapes_values() {
        let params = params_from_pairs(&["q", "rust & go", "page", "2"]);
        assert_eq!(form_encode(&params), "page=2&q=rust+%26+go");
    }

    #[test]
    fn test_verb_parsing_and_body_rules() {
        assert_eq!("delete".parse::<Verb>(), Ok(Verb::Delete));
        assert!("PATCH".parse::<Verb>().is_err());
        assert!(Verb::Post.carries_body());
        assert!(!Verb::Get.carries_body());
    }

    #[test]
    fn test_is_2xx() {
        assert!(is_2xx(200));
        assert!(is_2xx(204));
        assert!(!is_2xx(304));
        assert!(!is_2xx(NO_RESPONSE));
    }
}
