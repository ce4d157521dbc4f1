//! # Execution-Result Decoding
//!
//! After a transaction executes, programs report their outputs as a TVF
//! stream of key/value groups:
//!
//! ```text
//! { vector(program_id) ‖ uvarint(entry_count)
//!   ‖ { uvarint(key) ‖ typed_value }^entry_count }*
//! ```
//!
//! Numeric keys mean nothing to a human, so the manifest may carry a
//! `resultSchema` mapping each program's keys to named, typed fields:
//!
//! ```json
//! "resultSchema": {
//!   "$const(registry)": { "recordCount": "uleb(0)", "owner": "vector(1)" }
//! }
//! ```
//!
//! Program references go through the same alias/constant resolution the
//! address passes use, so a schema keyed by `$const(registry)` lands on
//! the same canonical 32-byte address the transaction targeted.
//!
//! Schema friction is deliberately non-fatal: a type mismatch warns and
//! exposes the value the stream actually carried, and unknown keys come
//! back as `key_<N>`. Results are observations, not consensus data.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::codec::{CodecError, TvfDecoder, TvfKind};
use crate::manifest::resolver::{ResolveError, ResolvedManifest};
use crate::manifest::value::Value;
use crate::manifest::Manifest;

/// Errors raised while loading a result schema or decoding a result
/// stream.
#[derive(Debug, Error)]
pub enum ResultError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("invalid result schema entry {entry:?}: {reason}")]
    Schema { entry: String, reason: String },
}

/// The three primitive result types a schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Uleb,
    Sleb,
    Vector,
}

impl ResultKind {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "uleb" => Some(Self::Uleb),
            "sleb" => Some(Self::Sleb),
            "vector" => Some(Self::Vector),
            _ => None,
        }
    }

    fn matches(self, kind: TvfKind) -> bool {
        matches!(
            (self, kind),
            (Self::Uleb, TvfKind::UnsignedVarint)
                | (Self::Sleb, TvfKind::SignedVarint)
                | (Self::Vector, TvfKind::Vector)
        )
    }
}

/// One decoded result value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultValue {
    Uleb(u128),
    Sleb(i128),
    Vector(#[serde(serialize_with = "as_hex")] Vec<u8>),
}

fn as_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// A parsed `resultSchema`: program address (hex) → numeric key →
/// `(field name, declared type)`.
#[derive(Debug, Clone, Default)]
pub struct ResultSchema {
    programs: BTreeMap<String, BTreeMap<u128, (String, ResultKind)>>,
}

impl ResultSchema {
    /// An empty schema: every key decodes as `key_<N>`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Extracts and resolves the `resultSchema` section of a manifest.
    /// Program references resolve through the resolved manifest's alias
    /// map; field specs have the form `"type(key)"`.
    pub fn from_manifest(
        manifest: &Manifest,
        resolved: &ResolvedManifest,
    ) -> Result<Self, ResultError> {
        let Some(section) = manifest.root().get("resultSchema") else {
            return Ok(Self::empty());
        };
        let Some(section) = section.as_object() else {
            return Err(ResultError::Schema {
                entry: "resultSchema".into(),
                reason: format!("expected an object, got {}", section.kind_name()),
            });
        };

        let mut programs = BTreeMap::new();
        for (program_ref, fields) in section {
            let address = resolved.resolve_program_ref(program_ref)?;
            let Some(fields) = fields.as_object() else {
                return Err(ResultError::Schema {
                    entry: program_ref.clone(),
                    reason: format!("expected a field map, got {}", fields.kind_name()),
                });
            };
            let mut by_key = BTreeMap::new();
            for (field_name, spec) in fields {
                let (kind, key) = parse_field_spec(field_name, spec)?;
                by_key.insert(key, (field_name.clone(), kind));
            }
            programs.insert(address.to_hex(), by_key);
        }
        Ok(Self { programs })
    }

    fn lookup(&self, program_hex: &str, key: u128) -> Option<&(String, ResultKind)> {
        self.programs.get(program_hex)?.get(&key)
    }
}

/// Parses a `"type(key)"` field spec, e.g. `"uleb(3)"`.
fn parse_field_spec(field_name: &str, spec: &Value) -> Result<(ResultKind, u128), ResultError> {
    let schema_err = |reason: String| ResultError::Schema {
        entry: field_name.to_string(),
        reason,
    };
    let text = spec
        .as_text()
        .ok_or_else(|| schema_err(format!("expected \"type(key)\", got {spec}")))?;
    let (type_name, rest) = text
        .split_once('(')
        .ok_or_else(|| schema_err(format!("expected \"type(key)\", got {text:?}")))?;
    let key_text = rest
        .strip_suffix(')')
        .ok_or_else(|| schema_err(format!("missing closing parenthesis in {text:?}")))?;
    let kind = ResultKind::parse(type_name)
        .ok_or_else(|| schema_err(format!("unknown type {type_name:?}")))?;
    let key = key_text
        .parse()
        .map_err(|_| schema_err(format!("key {key_text:?} is not a number")))?;
    Ok((kind, key))
}

/// Decodes a result stream and projects it through the schema.
///
/// Returns program-address-hex → field name → value. Groups repeating a
/// program address merge into one field map.
pub fn decode_results(
    bytes: &[u8],
    schema: &ResultSchema,
) -> Result<BTreeMap<String, BTreeMap<String, ResultValue>>, ResultError> {
    let mut dec = TvfDecoder::new(bytes);
    let mut programs: BTreeMap<String, BTreeMap<String, ResultValue>> = BTreeMap::new();

    while dec.has_next() {
        let program_hex = hex::encode(dec.read_vector()?);
        let entry_count = dec.read_uleb()?;
        let fields = programs.entry(program_hex.clone()).or_default();

        for _ in 0..entry_count {
            let key = dec.read_uleb()?;
            let wire_kind = dec.peek_kind()?;
            let value = match wire_kind {
                TvfKind::UnsignedVarint => ResultValue::Uleb(dec.read_uleb()?),
                TvfKind::SignedVarint => ResultValue::Sleb(dec.read_sleb()?),
                TvfKind::Vector => ResultValue::Vector(dec.read_vector()?),
            };
            let field_name = match schema.lookup(&program_hex, key) {
                Some((name, declared)) => {
                    if !declared.matches(wire_kind) {
                        tracing::warn!(
                            program = program_hex.as_str(),
                            field = name.as_str(),
                            declared = ?declared,
                            actual = %wire_kind,
                            "result type mismatch; exposing the value as decoded"
                        );
                    }
                    name.clone()
                }
                None => format!("key_{key}"),
            };
            fields.insert(field_name, value);
        }
    }
    Ok(programs)
}
