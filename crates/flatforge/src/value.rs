// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic values consumed and produced by the runtime serializer.

use std::collections::BTreeMap;
use std::fmt;

/// Named members of a struct or table value.
pub type Fields = BTreeMap<String, Value>;

/// A host value shaped like the schema it is serialized with.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent reference member, empty nullable, or union "none".
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    /// Contiguous byte block (`u8` vectors and memory).
    Bytes(Vec<u8>),
    Struct(Fields),
    Table(Fields),
    Vector(Vec<Value>),
    /// Indexed vectors and dictionaries, ordered by key.
    Map(BTreeMap<MapKey, Value>),
    /// Discriminator (1-based) and the selected alternative.
    Union(u8, Box<Value>),
}

/// Keys of map-shaped values. Ordering matches the wire sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    UInt(u64),
    String(String),
}

impl Value {
    pub fn table<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Table(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn structure<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn union(discriminator: u8, value: Value) -> Self {
        Value::Union(discriminator, Box::new(value))
    }

    pub fn vector<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Vector(items.into_iter().map(Into::into).collect())
    }

    /// Short variant name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Struct(_) => "struct",
            Value::Table(_) => "table",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
            Value::Union(..) => "union",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_fields(&self) -> Option<&Fields> {
        match self {
            Value::Struct(fields) | Value::Table(fields) => Some(fields),
            _ => None,
        }
    }

    /// Member lookup on struct and table values.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_fields().and_then(|fields| fields.get(name))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view as i128, covering the full i64 and u64 ranges.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(i128::from(*v)),
            Value::UInt(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Equality that compares integers numerically across `Int`/`UInt`.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self.as_i128(), other.as_i128()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Key form of a scalar or string value.
    pub fn to_map_key(&self) -> Option<MapKey> {
        match self {
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            Value::Int(v) => Some(MapKey::Int(*v)),
            Value::UInt(v) => Some(MapKey::UInt(*v)),
            Value::String(s) => Some(MapKey::String(s.clone())),
            _ => None,
        }
    }
}

impl MapKey {
    /// Integer view as i128 so signed and unsigned keys compare numerically.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            MapKey::Int(v) => Some(i128::from(*v)),
            MapKey::UInt(v) => Some(i128::from(*v)),
            MapKey::Bool(_) | MapKey::String(_) => None,
        }
    }
}

impl From<MapKey> for Value {
    fn from(value: MapKey) -> Self {
        match value {
            MapKey::Bool(b) => Value::Bool(b),
            MapKey::Int(v) => Value::Int(v),
            MapKey::UInt(v) => Value::UInt(v),
            MapKey::String(s) => Value::String(s),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Bool(b) => write!(f, "{}", b),
            MapKey::Int(v) => write!(f, "{}", v),
            MapKey::UInt(v) => write!(f, "{}", v),
            MapKey::String(s) => write!(f, "{:?}", s),
        }
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $wide:ty, $($type:ty),*) => {
        $(
            impl From<$type> for Value {
                fn from(value: $type) -> Self {
                    Value::$variant(<$wide>::from(value))
                }
            }
        )*
    };
}

impl_from_int!(Int, i64, i8, i16, i32, i64);
impl_from_int!(UInt, u64, u8, u16, u32, u64);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        MapKey::String(value.to_owned())
    }
}

impl From<String> for MapKey {
    fn from(value: String) -> Self {
        MapKey::String(value)
    }
}

impl From<bool> for MapKey {
    fn from(value: bool) -> Self {
        MapKey::Bool(value)
    }
}

impl From<i64> for MapKey {
    fn from(value: i64) -> Self {
        MapKey::Int(value)
    }
}

impl From<u64> for MapKey {
    fn from(value: u64) -> Self {
        MapKey::UInt(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_impls_pick_signedness() {
        assert_eq!(Value::from(-3i8), Value::Int(-3));
        assert_eq!(Value::from(7u16), Value::UInt(7));
        assert_eq!(Value::from(None::<u32>), Value::Null);
        assert_eq!(Value::from("x"), Value::String("x".into()));
    }

    #[test]
    fn test_loose_equality_crosses_signedness() {
        assert!(Value::Int(5).loosely_equals(&Value::UInt(5)));
        assert!(!Value::Int(-1).loosely_equals(&Value::UInt(u64::MAX)));
        assert!(Value::Float(1.5).loosely_equals(&Value::Float(1.5)));
        assert!(!Value::Float(1.0).loosely_equals(&Value::Int(1)));
    }

    #[test]
    fn test_member_lookup() {
        let value = Value::table([("hp", Value::from(100i16)), ("name", Value::from("orc"))]);
        assert_eq!(value.get("hp").and_then(Value::as_i128), Some(100));
        assert_eq!(value.get("name").and_then(Value::as_str), Some("orc"));
        assert!(value.get("mana").is_none());
        assert!(Value::Int(1).get("hp").is_none());
    }

    #[test]
    fn test_map_keys_order_like_wire() {
        let mut keys = vec![
            MapKey::String("b".into()),
            MapKey::String(String::new()),
            MapKey::String("a".into()),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                MapKey::String(String::new()),
                MapKey::String("a".into()),
                MapKey::String("b".into())
            ]
        );
    }
}
