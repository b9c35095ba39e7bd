use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use ordered_float::OrderedFloat;
use serde::{Serialize, Serializer};

/// A loosely-typed scalar read from a sheet cell or an API attribute.
///
/// Variant order is the sort order across types; within a type the natural
/// ordering applies (lexicographic text, chronological dates).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Value {
    /// Explicit absent value (empty cell, null attribute, missing path).
    #[default]
    Empty,
    Bool(bool),
    Number(OrderedFloat<f64>),
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

impl Value {
    pub fn number(n: f64) -> Self {
        Self::Number(OrderedFloat(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Empty, or text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON attribute into a scalar. Composite values are kept as
    /// their compact JSON text so they still compare deterministically.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Empty,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(Self::number).unwrap_or(Self::Empty),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    /// Field-wise equality used by reconciliation.
    ///
    /// Two blanks are equal regardless of representation, and numbers
    /// compare within `tolerance` (absolute).
    pub fn matches(&self, other: &Value, tolerance: f64) -> bool {
        if self.is_blank() && other.is_blank() {
            return true;
        }
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => (a.0 - b.0).abs() <= tolerance,
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "<empty>"),
            Self::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::Number(n) => {
                if n.0.fract() == 0.0 && n.0.abs() < 1e15 {
                    write!(f, "{}", n.0 as i64)
                } else {
                    write!(f, "{}", n.0)
                }
            }
            Self::Text(s) => write!(f, "\"{s}\""),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serializer.serialize_f64(n.0),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            Self::DateTime(dt) => serializer.serialize_str(&dt.to_rfc3339()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Empty)
    }
}
