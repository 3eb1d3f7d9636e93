//! Three-state attribute values.
//!
//! A managed attribute is either unset by the caller, not yet known because
//! the remote side will compute it, or a concrete value. Collapsing these into
//! `Option<T>` loses the distinction between "the caller left this empty" and
//! "the API will fill this in", which the planner needs to avoid reporting
//! drift on every refresh.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Placeholder the host uses for values that are only known after apply.
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// Returns true if the JSON value is the unknown placeholder.
pub fn is_unknown_marker(value: &Value) -> bool {
    value.as_str() == Some(UNKNOWN_VALUE)
}

/// An attribute value that may be unset, unknown, or known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttrValue<T> {
    /// Not set by the caller.
    #[default]
    Null,
    /// Will be computed by the remote side.
    Unknown,
    /// A concrete value.
    Known(T),
}

impl<T> AttrValue<T> {
    /// Returns true if the value is unset.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true if the value is pending computation.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns true if the value is concrete.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Borrow the concrete value, if any.
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Consume into the concrete value, if any.
    pub fn into_known(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            _ => None,
        }
    }

    /// `Some` becomes `Known`, `None` becomes `Null`.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Known(v),
            None => Self::Null,
        }
    }
}

impl<T: Clone> AttrValue<T> {
    /// Resolve an unknown value from prior state.
    ///
    /// Known and null values are returned unchanged; an unknown value takes
    /// whatever the prior state recorded.
    pub fn or_prior(&self, prior: &AttrValue<T>) -> AttrValue<T> {
        match self {
            Self::Unknown => prior.clone(),
            other => other.clone(),
        }
    }
}

impl<T> From<T> for AttrValue<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl<T: fmt::Display> fmt::Display for AttrValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Unknown => write!(f, "(known after apply)"),
            Self::Known(v) => write!(f, "{}", v),
        }
    }
}

impl<T: Serialize> Serialize for AttrValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Unknown => serializer.serialize_str(UNKNOWN_VALUE),
            Self::Known(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for AttrValue<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Self::Null);
        }
        if is_unknown_marker(&raw) {
            return Ok(Self::Unknown);
        }
        serde_json::from_value(raw)
            .map(Self::Known)
            .map_err(serde::de::Error::custom)
    }
}
