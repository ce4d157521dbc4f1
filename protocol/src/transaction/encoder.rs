//! # Transaction Encoding & Signing
//!
//! Turns a [`ResolvedManifest`] into final signed bytes:
//!
//! 1. Emit the pre-signature payload — version, sequence, address table,
//!    gas terms, invocations — as one TVF stream.
//! 2. `base_hash = BLAKE3(pod ‖ pre_signature_bytes)`.
//! 3. Pick the message to sign: the base hash, or the domain-separated
//!    link hash when a previous transaction hash is supplied.
//! 4. Gather one dual signature per signer, *in address-table order*, and
//!    append each as `vector(ed_sig) ‖ vector(falcon_sig)`.
//! 5. Prepend the 32-byte pod.
//!
//! Everything here is deterministic: same resolved manifest, same keys,
//! same bytes. The signatures themselves are deterministic for Ed25519
//! and randomized for Falcon, which is fine — the *signed message* is
//! what consensus cares about.

use serde::Serialize;
use thiserror::Error;

use crate::codec::{CodecError, TvfEncoder};
use crate::config::MAX_TX_SIZE_BYTES;
use crate::crypto::hash::blake3_hash_multi;
use crate::crypto::KeyError;
use crate::manifest::resolver::ResolvedManifest;
use crate::manifest::value::Value;
use crate::manifest::{instruction_kind, InstructionError, InstructionKind};
use crate::transaction::chain::tx_link_hash;

/// Errors raised while encoding and signing a transaction.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Instruction(#[from] InstructionError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Key(#[from] KeyError),

    /// An instruction operand that cannot be encoded as its declared
    /// kind — a negative `uleb`, a `vector` that is not bytes/hex, etc.
    #[error("invalid {kind} operand: {reason}")]
    InvalidOperand { kind: &'static str, reason: String },

    /// A final transaction with zero signature pairs is ill-formed at the
    /// wire level. Unsigned resolved manifests are an internal
    /// intermediate; they do not serialize to a finished transaction.
    #[error("cannot emit a final transaction without signers")]
    Unsigned,

    #[error("encoded transaction is {size} bytes, over the {limit}-byte budget")]
    SizeBudgetExceeded { size: usize, limit: usize },
}

/// A fully encoded, signed transaction plus its identifying hashes.
#[derive(Debug, Clone, Serialize)]
pub struct EncodedTransaction {
    /// `pod ‖ pre-signature payload ‖ signature section`.
    #[serde(skip)]
    pub bytes: Vec<u8>,

    /// `BLAKE3(pod ‖ pre_signature_bytes)` — the transaction's identity.
    #[serde(skip)]
    pub base_hash: [u8; 32],

    /// The link hash, when chained signing was used.
    #[serde(skip)]
    pub link_hash: Option<[u8; 32]>,

    /// Hex of the base hash.
    pub tx_id: String,

    /// Hex of the link hash, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
}

/// Emits the pre-signature TVF payload for a resolved manifest (without
/// the pod prefix). This is the byte string the base hash covers.
pub fn encode_pre_signature(resolved: &ResolvedManifest) -> Result<Vec<u8>, EncodeError> {
    let mut enc = TvfEncoder::new();
    enc.add_uleb(resolved.version);
    enc.add_uleb(resolved.sequence);

    let mut table = Vec::with_capacity(resolved.addresses.len() * 32);
    for address in &resolved.addresses {
        table.extend_from_slice(address.as_bytes());
    }
    enc.add_vector(&table)?;

    enc.add_uleb(resolved.gas_limit);
    enc.add_uleb(resolved.gas_price);

    for invocation in &resolved.invocations {
        enc.add_uleb(invocation.target as u128);
        enc.add_vector(&encode_instructions(&invocation.instructions)?)?;
    }
    Ok(enc.build())
}

/// Serializes an instruction list into its nested TVF byte string.
pub fn encode_instructions(instructions: &[Value]) -> Result<Vec<u8>, EncodeError> {
    let mut enc = TvfEncoder::new();
    for instruction in instructions {
        let (kind, operand) = instruction_kind(instruction)?;
        match kind {
            InstructionKind::Uleb => {
                let value = operand.as_u128().ok_or_else(|| EncodeError::InvalidOperand {
                    kind: "uleb",
                    reason: format!("expected a non-negative integer, got {operand}"),
                })?;
                enc.add_uleb(value);
            }
            InstructionKind::Sleb => {
                let value = operand.as_i128().ok_or_else(|| EncodeError::InvalidOperand {
                    kind: "sleb",
                    reason: format!("expected an integer, got {operand}"),
                })?;
                enc.add_sleb(value);
            }
            InstructionKind::Vector => {
                enc.add_vector(&vector_operand(operand)?)?;
            }
            InstructionKind::Inline => {
                // Raw injection, no framing. Only pre-serialized TVF
                // (pubset bytes, after pass 2) ever lands here.
                let bytes = operand.as_bytes().ok_or(InstructionError::InlineTypeMismatch {
                    found: operand.kind_name(),
                })?;
                enc.add_raw(bytes);
            }
        }
    }
    Ok(enc.build())
}

/// Accepts raw bytes, a hex string, or an array of byte values.
fn vector_operand(operand: &Value) -> Result<Vec<u8>, EncodeError> {
    match operand {
        Value::Bytes(bytes) => Ok(bytes.clone()),
        Value::Text(text) => {
            let stripped = text.strip_prefix("0x").unwrap_or(text);
            hex::decode(stripped).map_err(|e| EncodeError::InvalidOperand {
                kind: "vector",
                reason: format!("invalid hex {text:?}: {e}"),
            })
        }
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u128()
                    .and_then(|v| u8::try_from(v).ok())
                    .ok_or_else(|| EncodeError::InvalidOperand {
                        kind: "vector",
                        reason: format!("array elements must be bytes, got {item}"),
                    })
            })
            .collect(),
        other => Err(EncodeError::InvalidOperand {
            kind: "vector",
            reason: format!("expected bytes, hex, or a byte array, got {}", other.kind_name()),
        }),
    }
}

/// Encodes, hashes, and signs a resolved manifest.
///
/// With `prev_tx_hash` supplied, signers commit to the link hash instead
/// of the base hash (an all-zero previous hash degrades to unchained
/// signing with a warning — see [`tx_link_hash`]). Signatures are
/// gathered in address-table order 0..S and appended in that order.
pub fn encode_transaction(
    resolved: &ResolvedManifest,
    prev_tx_hash: Option<&[u8; 32]>,
) -> Result<EncodedTransaction, EncodeError> {
    if resolved.signers.is_empty() {
        return Err(EncodeError::Unsigned);
    }

    let pre_signature = encode_pre_signature(resolved)?;
    let base_hash = blake3_hash_multi(&[&resolved.pod, &pre_signature]);

    let (message, link_hash) = match prev_tx_hash {
        None => (base_hash, None),
        Some(prev) => {
            let linked = tx_link_hash(prev, &base_hash);
            if linked == base_hash {
                // Zero previous hash: degraded to unchained signing.
                (base_hash, None)
            } else {
                (linked, Some(linked))
            }
        }
    };

    let mut signature_section = TvfEncoder::new();
    for (alias, signer) in &resolved.signers {
        let signature = signer.sign_message(&message)?;
        tracing::debug!(signer = alias.as_str(), "signed transaction");
        signature_section.add_vector(&signature.ed25519)?;
        signature_section.add_vector(&signature.falcon512)?;
    }

    let mut bytes = Vec::with_capacity(32 + pre_signature.len() + signature_section.len());
    bytes.extend_from_slice(&resolved.pod);
    bytes.extend_from_slice(&pre_signature);
    bytes.extend_from_slice(&signature_section.build());

    if bytes.len() > MAX_TX_SIZE_BYTES {
        return Err(EncodeError::SizeBudgetExceeded {
            size: bytes.len(),
            limit: MAX_TX_SIZE_BYTES,
        });
    }

    Ok(EncodedTransaction {
        bytes,
        base_hash,
        link_hash,
        tx_id: hex::encode(base_hash),
        link_id: link_hash.map(hex::encode),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::address::Address;
    use crate::codec::{TvfDecoder, TvfKind};
    use crate::crypto::testutil::test_signer;
    use crate::manifest::{resolve, Manifest};

    fn value(json: serde_json::Value) -> Value {
        Value::from_json(&json).unwrap()
    }

    fn signed_resolved() -> ResolvedManifest {
        let signers: BTreeMap<_, _> =
            [("sender".to_string(), test_signer(21))].into_iter().collect();
        let manifest = Manifest::from_json(&serde_json::json!({
            "sequence": 1, "gasLimit": 100000, "gasPrice": 10,
            "feePayer": "sender",
            "invocations": [{
                "targetAddress": format!("$addr({})", Address::new([0x42; 32]).to_bech32()),
                "instructions": [{"uleb": 1}, {"uleb": "500"}]
            }]
        }))
        .unwrap();
        resolve(&manifest, &signers).unwrap()
    }

    #[test]
    fn instructions_encode_each_kind() {
        let instructions = vec![
            value(serde_json::json!({"uleb": 300})),
            value(serde_json::json!({"sleb": -2})),
            value(serde_json::json!({"vector": "deadbeef"})),
        ];
        let bytes = encode_instructions(&instructions).unwrap();
        let mut dec = TvfDecoder::new(&bytes);
        assert_eq!(dec.read_uleb().unwrap(), 300);
        assert_eq!(dec.read_sleb().unwrap(), -2);
        assert_eq!(dec.read_vector().unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(!dec.has_next());
    }

    #[test]
    fn vector_accepts_byte_array_operand() {
        let bytes =
            encode_instructions(&[value(serde_json::json!({"vector": [1, 2, 255]}))]).unwrap();
        let mut dec = TvfDecoder::new(&bytes);
        assert_eq!(dec.read_vector().unwrap(), vec![1, 2, 255]);
    }

    #[test]
    fn vector_rejects_out_of_range_array_elements() {
        let err =
            encode_instructions(&[value(serde_json::json!({"vector": [1, 256]}))]).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidOperand { kind: "vector", .. }));
    }

    #[test]
    fn uleb_rejects_negative_operand() {
        let err = encode_instructions(&[value(serde_json::json!({"uleb": -1}))]).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidOperand { kind: "uleb", .. }));
    }

    #[test]
    fn inline_requires_bytes() {
        // An INLINE that survived resolution as text means $pubset never
        // ran — reject rather than inject a string into the wire.
        let err = encode_instructions(&[value(serde_json::json!({"INLINE": "$pubset(a)"}))])
            .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::Instruction(InstructionError::InlineTypeMismatch { .. })
        ));
    }

    #[test]
    fn inline_bytes_are_injected_unframed() {
        let mut pubset_like = TvfEncoder::new();
        pubset_like.add_uleb(0);
        pubset_like.add_vector(&[0xaa]).unwrap();
        let raw = pubset_like.build();

        let mut instruction = BTreeMap::new();
        instruction.insert("INLINE".to_string(), Value::Bytes(raw.clone()));
        let bytes = encode_instructions(&[Value::Object(instruction)]).unwrap();
        assert_eq!(bytes, raw);
    }

    #[test]
    fn unknown_key_propagates_unsupported() {
        let err = encode_instructions(&[value(serde_json::json!({"frob": 1}))]).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::Instruction(InstructionError::Unsupported { .. })
        ));
    }

    #[test]
    fn unsigned_manifest_cannot_finalize() {
        let manifest = Manifest::from_json(&serde_json::json!({
            "sequence": 1, "gasLimit": 1, "gasPrice": 1, "invocations": []
        }))
        .unwrap();
        let resolved = resolve(&manifest, &BTreeMap::new()).unwrap();
        assert!(matches!(
            encode_transaction(&resolved, None),
            Err(EncodeError::Unsigned)
        ));
        // But the pre-signature payload of the intermediate is still
        // well-defined.
        assert!(!encode_pre_signature(&resolved).unwrap().is_empty());
    }

    #[test]
    fn layout_matches_specification() {
        let resolved = signed_resolved();
        let tx = encode_transaction(&resolved, None).unwrap();

        // 32-byte pod first.
        assert_eq!(&tx.bytes[..32], &[0x11; 32]);

        let mut dec = TvfDecoder::new(&tx.bytes[32..]);
        assert_eq!(dec.read_uleb().unwrap(), 1); // version
        assert_eq!(dec.read_uleb().unwrap(), 1); // sequence
        let table = dec.read_vector().unwrap();
        assert_eq!(table.len(), 64); // fee payer + one literal target
        assert_eq!(dec.read_uleb().unwrap(), 100_000);
        assert_eq!(dec.read_uleb().unwrap(), 10);
        assert_eq!(dec.read_uleb().unwrap(), 1); // target index (fee payer is 0)
        let instructions = dec.read_vector().unwrap();
        let mut instr = TvfDecoder::new(&instructions);
        assert_eq!(instr.read_uleb().unwrap(), 1);
        assert_eq!(instr.read_uleb().unwrap(), 500);
        // Then exactly one dual-signature pair.
        assert_eq!(dec.peek_kind().unwrap(), TvfKind::Vector);
        let ed_sig = dec.read_vector().unwrap();
        assert_eq!(ed_sig.len(), 64);
        let falcon_sig = dec.read_vector().unwrap();
        assert!(!falcon_sig.is_empty());
        assert!(!dec.has_next());
    }

    #[test]
    fn base_hash_covers_pod_and_payload() {
        let resolved = signed_resolved();
        let tx = encode_transaction(&resolved, None).unwrap();
        let pre = encode_pre_signature(&resolved).unwrap();
        assert_eq!(tx.base_hash, blake3_hash_multi(&[&resolved.pod, &pre]));
        assert_eq!(tx.tx_id, hex::encode(tx.base_hash));
        assert!(tx.link_id.is_none());
    }

    #[test]
    fn chained_signing_signs_link_hash() {
        let resolved = signed_resolved();
        let prev = [0x77u8; 32];
        let tx = encode_transaction(&resolved, Some(&prev)).unwrap();
        let expected_link = tx_link_hash(&prev, &tx.base_hash);
        assert_eq!(tx.link_hash, Some(expected_link));
        assert_eq!(tx.link_id.as_deref(), Some(hex::encode(expected_link).as_str()));

        // The signature must verify against the link hash, not the base.
        let signer = &resolved.signers[0].1;
        let mut dec = TvfDecoder::new(&tx.bytes[32..]);
        dec.read_uleb().unwrap();
        dec.read_uleb().unwrap();
        dec.read_vector().unwrap();
        dec.read_uleb().unwrap();
        dec.read_uleb().unwrap();
        dec.read_uleb().unwrap();
        dec.read_vector().unwrap();
        let ed_sig = dec.read_vector().unwrap();
        let falcon_sig = dec.read_vector().unwrap();
        let sig = crate::crypto::DualSignature { ed25519: ed_sig, falcon512: falcon_sig };
        assert!(signer.verify(&expected_link, &sig).ok);
        assert!(!signer.verify(&tx.base_hash, &sig).ok);
    }

    #[test]
    fn zero_prev_hash_degrades_to_unchained() {
        let resolved = signed_resolved();
        let tx = encode_transaction(&resolved, Some(&[0u8; 32])).unwrap();
        assert!(tx.link_hash.is_none());
        assert!(tx.link_id.is_none());
        let unchained = encode_transaction(&resolved, None).unwrap();
        assert_eq!(tx.base_hash, unchained.base_hash);
    }

    #[test]
    fn encoding_is_deterministic_modulo_falcon() {
        // The pre-signature payload and base hash are byte-identical
        // across runs; Falcon signatures are randomized, so the full byte
        // string may differ but the covered content cannot.
        let resolved = signed_resolved();
        let a = encode_transaction(&resolved, None).unwrap();
        let b = encode_transaction(&resolved, None).unwrap();
        assert_eq!(a.base_hash, b.base_hash);
        assert_eq!(
            encode_pre_signature(&resolved).unwrap(),
            encode_pre_signature(&resolved).unwrap()
        );
    }
}
