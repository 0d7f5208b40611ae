//! The heterogeneous value tree carried by batchexecute payloads.
//!
//! Storefront responses are deeply nested, loosely typed arrays: a single
//! list can mix strings, numbers, `null` and further lists. [`Value`] is an
//! explicit tagged union over those shapes so that every extractor failure
//! mode is an exhaustive `match`, never a runtime type assertion.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::errors::SchemaError;

/// Largest integer an `f64` represents exactly (2^53).
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// One node of a decoded payload tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// JSON `null`, and the padding used when growing arrays.
    #[default]
    Null,
    /// JSON `true` / `false`.
    Bool(bool),
    /// Any JSON number. Integral values serialise back as integers.
    Number(f64),
    /// A JSON string.
    String(String),
    /// An ordered list; the only kind the extractor descends into.
    Array(Vec<Value>),
    /// A JSON object. Rare in these payloads; carried for losslessness.
    Object(BTreeMap<String, Value>),
}

/// Discriminant of a [`Value`], used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "a bool",
            Self::Number => "a number",
            Self::String => "a string",
            Self::Array => "an array",
            Self::Object => "an object",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Kind of this node.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(_) => ValueKind::Number,
            Self::String(_) => ValueKind::String,
            Self::Array(_) => ValueKind::Array,
            Self::Object(_) => ValueKind::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The number as an `i64`, if it is integral and in range.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Truthiness with the payload's conventions: `null`, `false`, `0`, `""`
    /// and empty containers are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Array(items) => !items.is_empty(),
            Self::Object(map) => !map.is_empty(),
        }
    }

    /// Writes `value` at `path`, growing arrays with [`Value::Null`] padding
    /// and turning `null` intermediates into arrays.
    ///
    /// This is the inverse of [`crate::extract::nested_lookup`]: after a
    /// successful `place`, looking up the same path yields `value`.
    ///
    /// An empty path replaces `self` outright.
    pub fn place(&mut self, path: &[usize], value: Value) -> Result<(), SchemaError> {
        let mut current = self;
        for (depth, &index) in path.iter().enumerate() {
            if current.is_null() {
                *current = Value::Array(Vec::new());
            }
            let items = match current {
                Value::Array(items) => items,
                other => {
                    return Err(SchemaError::PlacementConflict {
                        path: path.to_vec(),
                        depth,
                        found: other.kind(),
                    })
                }
            };
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            current = &mut items[index];
        }
        *current = value;
        Ok(())
    }

    /// Serialises the tree as compact JSON.
    pub fn to_json_string(&self) -> String {
        // Serialising this type cannot fail: every variant maps onto JSON.
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => match self.as_i64() {
                Some(i) => serializer.serialize_i64(i),
                None if n.is_finite() => serializer.serialize_f64(*n),
                None => serializer.serialize_unit(),
            },
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_mixed_json_arrays() {
        let v = Value::from(json!([null, 1, "a", [true, 2.5]]));
        assert_eq!(
            v,
            Value::Array(vec![
                Value::Null,
                Value::Number(1.0),
                Value::String("a".into()),
                Value::Array(vec![Value::Bool(true), Value::Number(2.5)]),
            ])
        );
    }

    #[test]
    fn integral_numbers_serialise_as_integers() {
        let v = Value::Array(vec![Value::Number(1_700_000_000.0), Value::Number(2.99)]);
        assert_eq!(v.to_json_string(), "[1700000000,2.99]");
    }

    #[test]
    fn place_pads_with_nulls() {
        let mut v = Value::Null;
        v.place(&[2, 1], Value::from("x")).unwrap();
        assert_eq!(v.to_json_string(), r#"[null,null,[null,"x"]]"#);
    }

    #[test]
    fn place_keeps_existing_siblings() {
        let mut v = Value::Null;
        v.place(&[1, 0], Value::from("name")).unwrap();
        v.place(&[1, 1, 3, 2], Value::from("img")).unwrap();
        assert_eq!(
            v.to_json_string(),
            r#"[null,["name",[null,null,null,[null,null,"img"]]]]"#
        );
    }

    #[test]
    fn place_refuses_to_overwrite_scalars() {
        let mut v = Value::Null;
        v.place(&[0], Value::from("leaf")).unwrap();
        let err = v.place(&[0, 1], Value::from("deeper")).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::PlacementConflict { depth: 1, found: ValueKind::String, .. }
        ));
    }

    #[test]
    fn truthiness_follows_payload_conventions() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(3.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::Array(vec![Value::Null]).is_truthy());
    }
}
