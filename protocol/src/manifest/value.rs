//! The heterogeneous value tree a manifest is made of.
//!
//! Manifests arrive as JSON but are processed as this five-variant sum
//! type: resolver passes walk the tree and produce new trees, and
//! substitution can splice in things JSON cannot express (raw bytes from
//! a pubset, for instance). Byte arrays are *leaves* — no pass ever
//! recurses into one, which is what keeps large key material cheap to
//! carry through five passes.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value as JsonValue;

/// A node in the manifest tree.
///
/// `Object` keys are stored in a `BTreeMap`: iteration order is part of
/// the resolver's determinism contract, so a hash map's whims are not
/// welcome here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Raw bytes. Always a leaf.
    Bytes(Vec<u8>),
    /// An integer. 128 bits covers every sequence, gas, and varint value
    /// the wire format admits.
    Integer(i128),
    /// A string — possibly a directive like `$const(...)`, possibly just text.
    Text(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

/// A JSON document contained something the manifest model cannot hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported manifest value: {0}")]
pub struct UnsupportedValue(pub String);

impl Value {
    /// Converts parsed JSON into a manifest tree.
    ///
    /// Numbers must be integers; manifests express values beyond the
    /// float-exact range (or beyond 64 bits entirely) as decimal strings,
    /// which stay `Text` here and are parsed where they are consumed.
    /// `null` and booleans have no meaning in a manifest and are rejected
    /// outright rather than guessed at.
    pub fn from_json(json: &JsonValue) -> Result<Self, UnsupportedValue> {
        match json {
            JsonValue::Null => Err(UnsupportedValue("null".into())),
            JsonValue::Bool(b) => Err(UnsupportedValue(format!("boolean {b}"))),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Integer(i as i128))
                } else if let Some(u) = n.as_u64() {
                    Ok(Value::Integer(u as i128))
                } else {
                    Err(UnsupportedValue(format!("non-integer number {n}")))
                }
            }
            JsonValue::String(s) => Ok(Value::Text(s.clone())),
            JsonValue::Array(items) => Ok(Value::Array(
                items.iter().map(Self::from_json).collect::<Result<_, _>>()?,
            )),
            JsonValue::Object(fields) => Ok(Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), Self::from_json(v)?)))
                    .collect::<Result<_, _>>()?,
            )),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Reads a non-negative integer, accepting either an `Integer` node
    /// or a decimal `Text` node (how JSON carries values past 2⁵³).
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Value::Integer(i) => u128::try_from(*i).ok(),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Reads a signed integer, accepting `Integer` or decimal `Text`.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// One-word description for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "bytes",
            Value::Integer(_) => "integer",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Array(items) => write!(f, "[{} items]", items.len()),
            Value::Object(map) => write!(f, "{{{} fields}}", map.len()),
        }
    }
}
