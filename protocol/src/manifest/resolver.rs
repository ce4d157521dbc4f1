//! # Manifest Resolution
//!
//! Five deterministic passes lower an authoring manifest into its
//! canonical machine-ready form:
//!
//! 1. **Constants** — substitute every `$const(name)`, recursively, with
//!    cycle detection. The `signers` subtree is never traversed.
//! 2. **Pubsets** — replace `$pubset(alias)` with the signer's serialized
//!    public-key-set bytes.
//! 3. **Alias map** — alias → literal address string, unifying signer
//!    aliases (their derived Bech32m addresses) and string-valued
//!    constants.
//! 4. **Collection** — gather every literal address referenced anywhere
//!    into a set.
//! 5. **Ordering & indexing** — build the canonical address table (fee
//!    payer first, remaining signers in lexicographic byte order, then
//!    non-signers likewise) and replace every address reference with its
//!    final table index.
//!
//! Given the same manifest and the same keys, the output is
//! byte-identical across runs. The only sort key anywhere is the
//! lexicographic order of raw address bytes, and duplicates are
//! forbidden, so there is nothing for a sort to be unstable about.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::address::{Address, BadAddress};
use crate::config::{ADDRESS_LENGTH, DEFAULT_POD_BYTE, WIRE_VERSION};
use crate::crypto::{KeyError, Signer};
use crate::manifest::directives::{parse_directive, Directive};
use crate::manifest::value::Value;
use crate::manifest::Manifest;

/// Errors surfaced during manifest resolution. Every variant names the
/// reference or field that failed, because "resolution failed" at 2 a.m.
/// helps nobody.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unknown constant $const({name})")]
    UnknownConstant { name: String },

    #[error("constant $const({name}) participates in a substitution cycle")]
    ConstantCycle { name: String },

    #[error("unknown signer $pubset({name})")]
    UnknownSigner { name: String },

    /// An address reference resolved to a literal that is not in the
    /// final table. The collection pass visits the same strings the
    /// indexing pass does, so this is a resolver bug, not a user error.
    #[error("unresolved address reference {literal:?} (not in the final table; this is a bug)")]
    UnresolvedAddress { literal: String },

    #[error("manifest declares signers but no feePayer")]
    MissingFeePayer,

    #[error("feePayer {alias:?} is not among the loaded signers")]
    UnknownFeePayer { alias: String },

    #[error("duplicate address {address} in the table")]
    DuplicateAddress { address: String },

    #[error(transparent)]
    BadAddress(#[from] BadAddress),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("invalid manifest field {field:?}: {reason}")]
    InvalidManifest { field: String, reason: String },
}

impl ResolveError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidManifest { field: field.into(), reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// Resolved output
// ---------------------------------------------------------------------------

/// One invocation after resolution: a table index and the (still
/// tree-shaped) instruction list the encoder will serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInvocation {
    pub target: usize,
    pub instructions: Vec<Value>,
}

/// The canonical, machine-ready form of a manifest.
///
/// For signed manifests the table layout is fixed: index 0 is the fee
/// payer, indices `1..S` the remaining signers sorted by raw address
/// bytes, the rest the non-signer addresses in the same order. `signers`
/// holds the loaded key handlers in exactly table order — the encoder
/// walks it to gather signatures, so its order *is* the signature order.
#[derive(Clone)]
pub struct ResolvedManifest {
    pub pod: [u8; ADDRESS_LENGTH],
    pub version: u128,
    pub sequence: u128,
    pub gas_limit: u128,
    pub gas_price: u128,
    pub addresses: Vec<Address>,
    pub invocations: Vec<ResolvedInvocation>,
    /// `(alias, handler)` pairs in address-table order; empty when unsigned.
    pub signers: Vec<(String, Signer)>,
    /// `Some(0)` iff the manifest is signed.
    pub fee_payer: Option<usize>,
    /// Literal address → final table index.
    pub index_of: BTreeMap<Address, usize>,
    /// Alias → literal address string (pass 3 output), kept for the
    /// execution-result schema resolver.
    pub alias_literals: BTreeMap<String, String>,
}

impl ResolvedManifest {
    pub fn is_signed(&self) -> bool {
        !self.signers.is_empty()
    }

    /// Resolves a program reference from a result schema — a `$const`
    /// directive, a bare alias, or a literal address — to the canonical
    /// 32-byte address, through the same alias map the address passes used.
    pub fn resolve_program_ref(&self, reference: &str) -> Result<Address, ResolveError> {
        let name = match parse_directive(reference) {
            Some(Directive::Const(name)) | Some(Directive::Addr(name)) => name,
            _ => reference,
        };
        let literal = self.alias_literals.get(name).map(String::as_str).unwrap_or(name);
        Ok(Address::parse(literal)?)
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Runs all five passes over `manifest` with the given signer keysets.
///
/// `signers` is keyed by alias. An empty map resolves the manifest as an
/// unsigned intermediate: the table then holds only non-signer addresses
/// in lexicographic order, and no fee payer is assigned.
pub fn resolve(
    manifest: &Manifest,
    signers: &BTreeMap<String, Signer>,
) -> Result<ResolvedManifest, ResolveError> {
    let constants = extract_constants(manifest.root())?;

    // Pass 1: constants.
    let tree = walk_root(manifest.root(), &mut |value| {
        substitute_constants(value, &constants, &mut Vec::new())
    })?;

    // Pass 2: pubsets.
    let tree = walk_root(&tree, &mut |value| substitute_pubsets(value, signers))?;

    // Pass 3: alias map.
    let alias_literals = build_alias_map(&constants, signers)?;

    // Pass 4: literal address collection.
    let literals = collect_address_literals(&tree, &alias_literals);

    // Pass 5a: canonical ordering.
    let fee_alias = tree.get("feePayer").and_then(Value::as_text);
    let (addresses, ordered_signers, fee_payer) =
        order_addresses(&literals, signers, fee_alias)?;
    let index_of: BTreeMap<Address, usize> =
        addresses.iter().enumerate().map(|(i, addr)| (*addr, i)).collect();

    // Pass 5b: index substitution.
    let mut tree = walk_root(&tree, &mut |value| {
        substitute_indices(value, &alias_literals, &index_of)
    })?;
    substitute_bare_targets(&mut tree, &alias_literals, &index_of)?;

    extract(tree, addresses, ordered_signers, fee_payer, index_of, alias_literals)
}

// ---------------------------------------------------------------------------
// Tree walking
// ---------------------------------------------------------------------------

/// Applies `pass` to every root field except the `signers` subtree, which
/// is carried through untouched (it may hold user-supplied key material
/// that no pass should ever traverse).
fn walk_root(
    root: &BTreeMap<String, Value>,
    pass: &mut dyn FnMut(&Value) -> Result<Value, ResolveError>,
) -> Result<BTreeMap<String, Value>, ResolveError> {
    root.iter()
        .map(|(key, value)| {
            let resolved = if key == "signers" { value.clone() } else { pass(value)? };
            Ok((key.clone(), resolved))
        })
        .collect()
}

fn extract_constants(
    root: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Value>, ResolveError> {
    match root.get("constants") {
        None => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(ResolveError::invalid(
            "constants",
            format!("expected an object, got {}", other.kind_name()),
        )),
    }
}

// ---------------------------------------------------------------------------
// Pass 1: constants
// ---------------------------------------------------------------------------

fn substitute_constants(
    value: &Value,
    constants: &BTreeMap<String, Value>,
    visiting: &mut Vec<String>,
) -> Result<Value, ResolveError> {
    match value {
        Value::Text(text) => {
            if let Some(Directive::Const(name)) = parse_directive(text) {
                if visiting.iter().any(|seen| seen == name) {
                    return Err(ResolveError::ConstantCycle { name: name.to_string() });
                }
                let target = constants
                    .get(name)
                    .ok_or_else(|| ResolveError::UnknownConstant { name: name.to_string() })?;
                visiting.push(name.to_string());
                let resolved = substitute_constants(target, constants, visiting)?;
                visiting.pop();
                Ok(resolved)
            } else {
                Ok(value.clone())
            }
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| substitute_constants(item, constants, visiting))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(map) => Ok(Value::Object(
            map.iter()
                .map(|(k, v)| Ok::<_, ResolveError>((k.clone(), substitute_constants(v, constants, visiting)?)))
                .collect::<Result<_, _>>()?,
        )),
        // Bytes and integers are leaves.
        leaf => Ok(leaf.clone()),
    }
}

// ---------------------------------------------------------------------------
// Pass 2: pubsets
// ---------------------------------------------------------------------------

fn substitute_pubsets(
    value: &Value,
    signers: &BTreeMap<String, Signer>,
) -> Result<Value, ResolveError> {
    match value {
        Value::Text(text) => {
            if let Some(Directive::Pubset(name)) = parse_directive(text) {
                let signer = signers
                    .get(name)
                    .ok_or_else(|| ResolveError::UnknownSigner { name: name.to_string() })?;
                Ok(Value::Bytes(signer.pubset()))
            } else {
                Ok(value.clone())
            }
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| substitute_pubsets(item, signers))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(map) => Ok(Value::Object(
            map.iter()
                .map(|(k, v)| Ok::<_, ResolveError>((k.clone(), substitute_pubsets(v, signers)?)))
                .collect::<Result<_, _>>()?,
        )),
        leaf => Ok(leaf.clone()),
    }
}

// ---------------------------------------------------------------------------
// Pass 3: alias map
// ---------------------------------------------------------------------------

/// Builds alias → literal-address-string. String-valued constants go in
/// first, signer aliases second — a signer alias always wins a name
/// collision, since it is backed by actual key material.
fn build_alias_map(
    constants: &BTreeMap<String, Value>,
    signers: &BTreeMap<String, Signer>,
) -> Result<BTreeMap<String, String>, ResolveError> {
    let mut aliases = BTreeMap::new();
    for name in constants.keys() {
        let resolved = substitute_constants(
            &Value::Text(format!("$const({name})")),
            constants,
            &mut Vec::new(),
        )?;
        if let Value::Text(literal) = resolved {
            // A downstream $addr may still reject this if it isn't a
            // valid address; at this stage any string qualifies.
            aliases.insert(name.clone(), literal);
        }
    }
    for (alias, signer) in signers {
        aliases.insert(alias.clone(), signer.address().to_bech32());
    }
    Ok(aliases)
}

// ---------------------------------------------------------------------------
// Pass 4: literal address collection
// ---------------------------------------------------------------------------

fn collect_address_literals(
    tree: &BTreeMap<String, Value>,
    aliases: &BTreeMap<String, String>,
) -> BTreeSet<String> {
    let mut literals = BTreeSet::new();
    for (key, value) in tree {
        if key != "signers" {
            collect_from_value(value, aliases, &mut literals);
        }
    }
    // Invocation targets may also be written as bare literals or aliases,
    // without the $addr(...) wrapper; they end up in the table all the same.
    if let Some(invocations) = tree.get("invocations").and_then(Value::as_array) {
        for invocation in invocations {
            if let Some(target) = invocation
                .as_object()
                .and_then(|map| map.get("targetAddress"))
                .and_then(Value::as_text)
            {
                if parse_directive(target).is_none() {
                    literals.insert(resolve_alias(target, aliases));
                }
            }
        }
    }
    literals
}

fn collect_from_value(
    value: &Value,
    aliases: &BTreeMap<String, String>,
    literals: &mut BTreeSet<String>,
) {
    match value {
        Value::Text(text) => {
            if let Some(Directive::Addr(reference)) = parse_directive(text) {
                literals.insert(resolve_alias(reference, aliases));
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_from_value(item, aliases, literals);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_from_value(item, aliases, literals);
            }
        }
        _ => {}
    }
}

/// Resolves through the alias map, or keeps the reference as a literal
/// when it names no alias.
fn resolve_alias(reference: &str, aliases: &BTreeMap<String, String>) -> String {
    aliases.get(reference).cloned().unwrap_or_else(|| reference.to_string())
}

// ---------------------------------------------------------------------------
// Pass 5a: canonical ordering
// ---------------------------------------------------------------------------

fn order_addresses(
    literals: &BTreeSet<String>,
    signers: &BTreeMap<String, Signer>,
    fee_alias: Option<&str>,
) -> Result<(Vec<Address>, Vec<(String, Signer)>, Option<usize>), ResolveError> {
    // BTreeSet gives the lexicographic byte order for free; Address's Ord
    // is exactly the raw-byte comparison.
    let mut collected = BTreeSet::new();
    for literal in literals {
        collected.insert(Address::parse(literal)?);
    }

    if signers.is_empty() {
        return Ok((collected.into_iter().collect(), Vec::new(), None));
    }

    let fee_alias = fee_alias.ok_or(ResolveError::MissingFeePayer)?;
    let fee_signer = signers
        .get(fee_alias)
        .ok_or_else(|| ResolveError::UnknownFeePayer { alias: fee_alias.to_string() })?;

    let signer_addresses: BTreeSet<Address> =
        signers.values().map(|signer| signer.address()).collect();
    if signer_addresses.len() != signers.len() {
        let dup = first_duplicate_address(signers);
        return Err(ResolveError::DuplicateAddress { address: dup });
    }

    let mut others: Vec<(String, Signer)> = signers
        .iter()
        .filter(|(alias, _)| alias.as_str() != fee_alias)
        .map(|(alias, signer)| (alias.clone(), signer.clone()))
        .collect();
    others.sort_by_key(|(_, signer)| signer.address());

    let mut ordered_signers = Vec::with_capacity(signers.len());
    ordered_signers.push((fee_alias.to_string(), fee_signer.clone()));
    ordered_signers.extend(others);

    let mut addresses: Vec<Address> =
        ordered_signers.iter().map(|(_, signer)| signer.address()).collect();
    addresses.extend(collected.into_iter().filter(|addr| !signer_addresses.contains(addr)));

    Ok((addresses, ordered_signers, Some(0)))
}

fn first_duplicate_address(signers: &BTreeMap<String, Signer>) -> String {
    let mut seen = BTreeSet::new();
    for signer in signers.values() {
        if !seen.insert(signer.address()) {
            return signer.address().to_hex();
        }
    }
    unreachable!("called only when a duplicate exists")
}

// ---------------------------------------------------------------------------
// Pass 5b: index substitution
// ---------------------------------------------------------------------------

fn substitute_indices(
    value: &Value,
    aliases: &BTreeMap<String, String>,
    index_of: &BTreeMap<Address, usize>,
) -> Result<Value, ResolveError> {
    match value {
        Value::Text(text) => {
            if let Some(Directive::Addr(reference)) = parse_directive(text) {
                let literal = resolve_alias(reference, aliases);
                let address = Address::parse(&literal)?;
                let index = index_of.get(&address).ok_or(ResolveError::UnresolvedAddress {
                    literal: literal.clone(),
                })?;
                Ok(Value::Integer(*index as i128))
            } else {
                Ok(value.clone())
            }
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| substitute_indices(item, aliases, index_of))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(map) => Ok(Value::Object(
            map.iter()
                .map(|(k, v)| Ok::<_, ResolveError>((k.clone(), substitute_indices(v, aliases, index_of)?)))
                .collect::<Result<_, _>>()?,
        )),
        leaf => Ok(leaf.clone()),
    }
}

/// Invocation targets written as bare literals or aliases (without the
/// `$addr(...)` wrapper) get the same index treatment; the collection
/// pass already placed them in the table.
fn substitute_bare_targets(
    tree: &mut BTreeMap<String, Value>,
    aliases: &BTreeMap<String, String>,
    index_of: &BTreeMap<Address, usize>,
) -> Result<(), ResolveError> {
    let Some(Value::Array(invocations)) = tree.get_mut("invocations") else {
        return Ok(());
    };
    for invocation in invocations {
        let Value::Object(map) = invocation else {
            continue;
        };
        let literal = match map.get("targetAddress") {
            Some(Value::Text(text)) if parse_directive(text).is_none() => {
                resolve_alias(text, aliases)
            }
            _ => continue,
        };
        let address = Address::parse(&literal)?;
        let index = *index_of
            .get(&address)
            .ok_or(ResolveError::UnresolvedAddress { literal })?;
        map.insert("targetAddress".to_string(), Value::Integer(index as i128));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

fn extract(
    tree: BTreeMap<String, Value>,
    addresses: Vec<Address>,
    signers: Vec<(String, Signer)>,
    fee_payer: Option<usize>,
    index_of: BTreeMap<Address, usize>,
    alias_literals: BTreeMap<String, String>,
) -> Result<ResolvedManifest, ResolveError> {
    let pod = match tree.get("pod") {
        None => [DEFAULT_POD_BYTE; ADDRESS_LENGTH],
        Some(value) => {
            let text = value
                .as_text()
                .ok_or_else(|| ResolveError::invalid("pod", "expected a hex string"))?;
            let bytes = hex::decode(text.strip_prefix("0x").unwrap_or(text))
                .map_err(|e| ResolveError::invalid("pod", format!("invalid hex: {e}")))?;
            bytes.as_slice().try_into().map_err(|_| {
                ResolveError::invalid("pod", format!("expected 32 bytes, got {}", bytes.len()))
            })?
        }
    };

    let sequence = required_u128(&tree, "sequence")?;
    let gas_limit = required_u128(&tree, "gasLimit")?;
    let gas_price = required_u128(&tree, "gasPrice")?;

    let invocations = match tree.get("invocations") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, invocation)| extract_invocation(i, invocation, addresses.len()))
            .collect::<Result<_, _>>()?,
        Some(other) => {
            return Err(ResolveError::invalid(
                "invocations",
                format!("expected an array, got {}", other.kind_name()),
            ));
        }
    };

    Ok(ResolvedManifest {
        pod,
        version: WIRE_VERSION,
        sequence,
        gas_limit,
        gas_price,
        addresses,
        invocations,
        signers,
        fee_payer,
        index_of,
        alias_literals,
    })
}

fn required_u128(tree: &BTreeMap<String, Value>, field: &str) -> Result<u128, ResolveError> {
    let value = tree
        .get(field)
        .ok_or_else(|| ResolveError::invalid(field, "missing"))?;
    value.as_u128().ok_or_else(|| {
        ResolveError::invalid(field, format!("expected a non-negative integer, got {value}"))
    })
}

fn extract_invocation(
    position: usize,
    invocation: &Value,
    address_count: usize,
) -> Result<ResolvedInvocation, ResolveError> {
    let field = format!("invocations[{position}]");
    let map = invocation
        .as_object()
        .ok_or_else(|| ResolveError::invalid(field.as_str(), "expected an object"))?;
    let target = map
        .get("targetAddress")
        .ok_or_else(|| ResolveError::invalid(field.as_str(), "missing targetAddress"))?;
    let Value::Integer(index) = target else {
        return Err(ResolveError::invalid(
            &field,
            format!("targetAddress did not resolve to an index, got {target}"),
        ));
    };
    let index = usize::try_from(*index).ok().filter(|i| *i < address_count).ok_or_else(|| {
        ResolveError::invalid(
            &field,
            format!("target index {index} out of range (table has {address_count} entries)"),
        )
    })?;
    let instructions = match map.get("instructions") {
        None => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            return Err(ResolveError::invalid(
                &field,
                format!("instructions must be an array, got {}", other.kind_name()),
            ));
        }
    };
    Ok(ResolvedInvocation { target: index, instructions })
}
