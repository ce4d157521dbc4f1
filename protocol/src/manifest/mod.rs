//! # Manifests
//!
//! The authoring form of a Lea transaction: a JSON document naming a
//! sequence, gas terms, signer aliases, constants, and a list of
//! invocations. The [`resolver`] lowers it — five deterministic passes —
//! into the canonical [`resolver::ResolvedManifest`] the transaction
//! encoder consumes.
//!
//! The ordering decisions made here are consensus-critical: which signer
//! lands in which address-table slot fixes the signing order, which fixes
//! the byte layout, which fixes the hash. A bug in any pass invalidates
//! every signature, which is why each pass is small, pure, and tested to
//! within an inch of its life.

pub mod directives;
pub mod resolver;
pub mod value;

pub use directives::{parse_directive, Directive};
pub use resolver::{resolve, ResolvedInvocation, ResolvedManifest, ResolveError};
pub use value::Value;

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors loading a manifest document, before any resolution happens.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {0}")]
    Json(String),

    #[error(transparent)]
    Unsupported(#[from] value::UnsupportedValue),

    #[error("manifest root must be an object, got {0}")]
    NotAnObject(&'static str),
}

/// Errors classifying a single instruction object.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstructionError {
    /// The instruction's operational key is not one of
    /// `uleb`/`sleb`/`vector`/`INLINE`.
    #[error("unsupported instruction key {key:?}")]
    Unsupported { key: String },

    /// More than one operational key (ignoring `comment`).
    #[error("ambiguous instruction: multiple operational keys {keys:?}")]
    Ambiguous { keys: Vec<String> },

    /// An `INLINE` value that is not raw bytes — nothing else can be
    /// injected verbatim into a TVF stream.
    #[error("INLINE value must be raw bytes, got {found}")]
    InlineTypeMismatch { found: &'static str },

    /// An instruction must be a single-key object.
    #[error("instruction must be an object with one operational key, got {found}")]
    Malformed { found: &'static str },
}

/// The four primitive instruction kinds of the canonical wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    Uleb,
    Sleb,
    Vector,
    /// Pseudo-kind: the value is injected as raw TVF bytes, no framing.
    Inline,
}

/// Classifies an instruction object, returning its kind and the operand.
///
/// `comment` keys are authoring-time documentation and ignored. The
/// historical fixed-width aliases (`uint8`..`uint64`) are accepted as
/// unsigned varints with a warning; the canonical wire format only ever
/// admitted the varint encoding anyway.
pub fn instruction_kind<'a>(
    instruction: &'a Value,
) -> Result<(InstructionKind, &'a Value), InstructionError> {
    let Some(map) = instruction.as_object() else {
        return Err(InstructionError::Malformed { found: instruction.kind_name() });
    };
    let operational: Vec<(&String, &Value)> =
        map.iter().filter(|(key, _)| key.as_str() != "comment").collect();
    match operational.as_slice() {
        [] => Err(InstructionError::Unsupported { key: "<missing>".into() }),
        [(key, operand)] => {
            let kind = match key.as_str() {
                "uleb" => InstructionKind::Uleb,
                "sleb" => InstructionKind::Sleb,
                "vector" => InstructionKind::Vector,
                "INLINE" => InstructionKind::Inline,
                legacy @ ("uint8" | "uint16" | "uint32" | "uint64") => {
                    tracing::warn!(key = legacy, "deprecated fixed-width instruction key, encoding as unsigned varint");
                    InstructionKind::Uleb
                }
                other => {
                    return Err(InstructionError::Unsupported { key: other.to_string() });
                }
            };
            Ok((kind, operand))
        }
        many => Err(InstructionError::Ambiguous {
            keys: many.iter().map(|(k, _)| (*k).clone()).collect(),
        }),
    }
}

/// A loaded (unresolved) manifest document.
#[derive(Debug, Clone)]
pub struct Manifest {
    root: BTreeMap<String, Value>,
}

impl Manifest {
    /// Parses a manifest from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ManifestError> {
        let parsed: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ManifestError::Json(e.to_string()))?;
        Self::from_json(&parsed)
    }

    /// Converts parsed JSON into a manifest.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ManifestError> {
        Self::from_value(Value::from_json(json)?)
    }

    /// Wraps an already-built value tree.
    pub fn from_value(root: Value) -> Result<Self, ManifestError> {
        match root {
            Value::Object(map) => Ok(Self { root: map }),
            other => Err(ManifestError::NotAnObject(other.kind_name())),
        }
    }

    /// The top-level fields of the document.
    pub fn root(&self) -> &BTreeMap<String, Value> {
        &self.root
    }

    /// The fee payer alias, when declared.
    pub fn fee_payer(&self) -> Option<&str> {
        self.root.get("feePayer").and_then(Value::as_text)
    }

    /// Signer aliases listed in the document (`feePayer` plus `signers`),
    /// deduplicated, in declaration order. This is what the CLI matches
    /// keyfiles against.
    pub fn signer_aliases(&self) -> Vec<String> {
        let mut aliases = Vec::new();
        if let Some(fee) = self.fee_payer() {
            aliases.push(fee.to_string());
        }
        if let Some(listed) = self.root.get("signers").and_then(Value::as_array) {
            for entry in listed {
                if let Some(alias) = entry.as_text() {
                    if !aliases.iter().any(|a| a == alias) {
                        aliases.push(alias.to_string());
                    }
                }
            }
        }
        aliases
    }

    /// Per-invocation instruction kinds, used by the transaction decoder
    /// to label decoded instructions (INLINE content is indistinguishable
    /// from plain items without the authoring manifest).
    pub fn instruction_kinds(&self) -> Result<Vec<Vec<InstructionKind>>, InstructionError> {
        let Some(invocations) = self.root.get("invocations").and_then(Value::as_array) else {
            return Ok(Vec::new());
        };
        invocations
            .iter()
            .map(|invocation| {
                let instructions = invocation
                    .as_object()
                    .and_then(|map| map.get("instructions"))
                    .and_then(Value::as_array)
                    .unwrap_or(&[]);
                instructions
                    .iter()
                    .map(|instr| instruction_kind(instr).map(|(kind, _)| kind))
                    .collect()
            })
            .collect()
    }
}
