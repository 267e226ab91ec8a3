//! SQL values carried as query parameters and row cells.
//!
//! Every literal that appears in a predicate ends up as a [`Value`] in the
//! parameter list of a compiled statement; rows returned by an executor are
//! vectors of the same type.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Declared type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Bool,
    Int,
    BigInt,
    Float,
    Text,
    Bytes,
    Date,
    DateTime,
    Uuid,
}

impl SqlType {
    /// True for types whose keys are compared as strings.
    pub fn is_textual(&self) -> bool {
        matches!(self, SqlType::Text)
    }
}

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value counts as "no key assigned yet".
    ///
    /// Auto-generated keys start out as `NULL` or `0`.
    pub fn is_unassigned_key(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Int(0) => true,
            Value::Text(s) => s.is_empty(),
            Value::Uuid(u) => u.is_nil(),
            _ => false,
        }
    }

    /// Normalised form used to match foreign keys against primary keys in memory.
    ///
    /// Returns `None` for `NULL`, which never matches anything. Integers and
    /// integral floats normalise to the same key so a driver returning `3.0`
    /// for an `INTEGER` column still matches `3`.
    pub fn match_key(&self, case_insensitive: bool) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(format!("i:{}", i64::from(*b))),
            Value::Int(i) => Some(format!("i:{i}")),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(format!("i:{}", *f as i64)),
            Value::Float(f) => Some(format!("f:{f}")),
            Value::Text(s) if case_insensitive => Some(format!("s:{}", s.to_lowercase())),
            Value::Text(s) => Some(format!("s:{s}")),
            Value::Bytes(b) => Some(format!("b:{}", hex::encode(b))),
            Value::Date(d) => Some(format!("d:{d}")),
            Value::DateTime(dt) => Some(format!("t:{dt}")),
            Value::Uuid(u) => Some(format!("u:{u}")),
        }
    }

    /// Lower-cases text values, leaves everything else untouched.
    pub fn to_lowercase(&self) -> Value {
        match self {
            Value::Text(s) => Value::Text(s.to_lowercase()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Uuid(u) => write!(f, "{u}"),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            // Arrays and objects travel as their JSON text
            other => Value::Text(other.to_string()),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::String(hex::encode(b)),
            Value::Date(d) => serde_json::Value::String(d.to_string()),
            Value::DateTime(dt) => serde_json::Value::String(dt.to_string()),
            Value::Uuid(u) => serde_json::Value::String(u.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_key_case_insensitive() {
        let a = Value::from("WEST");
        let b = Value::from("West");
        assert_ne!(a.match_key(false), b.match_key(false));
        assert_eq!(a.match_key(true), b.match_key(true));
    }

    #[test]
    fn test_null_never_matches() {
        assert_eq!(Value::Null.match_key(true), None);
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_integral_float_matches_int() {
        assert_eq!(Value::Float(3.0).match_key(false), Value::Int(3).match_key(false));
    }

    #[test]
    fn test_unassigned_keys() {
        assert!(Value::Int(0).is_unassigned_key());
        assert!(Value::Null.is_unassigned_key());
        assert!(!Value::Int(7).is_unassigned_key());
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({"a": 1});
        assert_eq!(Value::from(&serde_json::json!(42)), Value::Int(42));
        assert_eq!(Value::from(&serde_json::json!("x")), Value::Text("x".into()));
        assert_eq!(Value::from(&json), Value::Text("{\"a\":1}".into()));
    }
}
