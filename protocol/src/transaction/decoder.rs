//! # Transaction Decoding
//!
//! The symmetric inverse of the encoder: raw bytes in, structured
//! transaction out, with every consensus rule enforced on the way —
//! version, table alignment, target bounds, signature pairing, size cap,
//! no trailing bytes.
//!
//! Decoding can optionally consult the authoring manifest. Without it,
//! an INLINE-injected pubset is indistinguishable from the plain items
//! it expands to (that is what "no framing" means); with it, the decoder
//! knows which instruction slots were INLINE, regroups their items, and
//! re-inflates the embedded public keyset — with zero-length secret-key
//! stubs, never the real thing.

use serde::Serialize;
use thiserror::Error;

use crate::address::Address;
use crate::codec::{CodecError, TvfDecoder, TvfEncoder, TvfKind};
use crate::config::{
    ADDRESS_LENGTH, MAX_TX_SIZE_BYTES, VM_HEADER_LEN, VM_MAGIC, VM_VERSION, WIRE_VERSION,
};
use crate::crypto::hash::blake3_hash_multi;
use crate::crypto::{DualSignature, PublicKeyset};
use crate::manifest::{InstructionError, InstructionKind, Manifest};

/// Errors raised while decoding a transaction.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid VM header: {reason}")]
    VmHeaderInvalid { reason: String },

    #[error("unsupported wire version {version} (expected {WIRE_VERSION})")]
    UnsupportedVersion { version: u128 },

    #[error("address table is {len} bytes, not a multiple of {ADDRESS_LENGTH}")]
    AddressTableMisaligned { len: usize },

    #[error("invocation target index {index} out of range (table has {count} entries)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("odd number of signature vectors ({vectors}); ed25519/falcon512 come in pairs")]
    UnpairedSignature { vectors: usize },

    /// A finished transaction carries at least one signature pair;
    /// zero-pair bytes are an unsigned intermediate that should never
    /// have been serialized.
    #[error("transaction carries no signature pairs")]
    MissingSignatures,

    #[error("transaction is {size} bytes, over the {limit}-byte budget")]
    SizeBudgetExceeded { size: usize, limit: usize },

    /// The manifest supplied for labeling does not parse cleanly.
    #[error(transparent)]
    Instruction(#[from] InstructionError),
}

/// Metadata recovered from a stripped VM envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VmHeader {
    pub version: u8,
    pub declared_len: u64,
}

/// One decoded instruction. `Inline` appears only when the authoring
/// manifest was available to label the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DecodedInstruction {
    Uleb(u128),
    Sleb(i128),
    Vector(#[serde(serialize_with = "as_hex")] Vec<u8>),
    Inline {
        #[serde(serialize_with = "as_hex")]
        raw: Vec<u8>,
        /// The embedded public keyset, when the raw bytes parse as a
        /// pubset. Secret keys are not part of the wire format and come
        /// back as empty stubs in any keyfile rendering.
        #[serde(skip_serializing_if = "Option::is_none")]
        keyset: Option<PublicKeyset>,
    },
}

fn as_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedInvocation {
    pub target: usize,
    pub instructions: Vec<DecodedInstruction>,
}

/// Decoding options. `Default` decodes bare transaction bytes with no
/// manifest labeling.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions<'a> {
    /// The authoring manifest, for labeling INLINE instructions.
    pub manifest: Option<&'a Manifest>,
    /// Expect and strip the `"LEAB"` VM envelope before decoding.
    pub strip_vm_header: bool,
}

/// A structurally validated, decoded transaction.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedTransaction {
    #[serde(serialize_with = "as_hex_arr")]
    pub pod: [u8; ADDRESS_LENGTH],
    pub version: u128,
    pub sequence: u128,
    pub gas_limit: u128,
    pub gas_price: u128,
    pub addresses: Vec<Address>,
    pub invocations: Vec<DecodedInvocation>,
    pub signatures: Vec<DualSignature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_header: Option<VmHeader>,
    #[serde(skip)]
    pre_signature: Vec<u8>,
    #[serde(skip)]
    signature_section: Vec<u8>,
}

fn as_hex_arr<S: serde::Serializer>(
    bytes: &[u8; ADDRESS_LENGTH],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

impl DecodedTransaction {
    /// The TVF payload the base hash covers (everything between the pod
    /// and the first signature).
    pub fn pre_signature(&self) -> &[u8] {
        &self.pre_signature
    }

    /// The raw signature section, for external re-verification.
    pub fn signature_section(&self) -> &[u8] {
        &self.signature_section
    }

    /// Recomputes `BLAKE3(pod ‖ pre_signature_bytes)`.
    pub fn base_hash(&self) -> [u8; 32] {
        blake3_hash_multi(&[&self.pod, &self.pre_signature])
    }

    /// Hex of the recomputed base hash.
    pub fn tx_id(&self) -> String {
        hex::encode(self.base_hash())
    }

    /// Every public keyset found in INLINE instructions, in stream order.
    pub fn embedded_keysets(&self) -> Vec<&PublicKeyset> {
        self.invocations
            .iter()
            .flat_map(|invocation| &invocation.instructions)
            .filter_map(|instruction| match instruction {
                DecodedInstruction::Inline { keyset, .. } => keyset.as_ref(),
                _ => None,
            })
            .collect()
    }

    /// Re-encodes the decoded structure back to wire bytes. For any
    /// transaction this crate decoded, the result is byte-identical to
    /// the input (minus the VM envelope, which is not part of the
    /// transaction proper).
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut enc = TvfEncoder::new();
        enc.add_uleb(self.version);
        enc.add_uleb(self.sequence);
        let mut table = Vec::with_capacity(self.addresses.len() * ADDRESS_LENGTH);
        for address in &self.addresses {
            table.extend_from_slice(address.as_bytes());
        }
        enc.add_vector(&table)?;
        enc.add_uleb(self.gas_limit);
        enc.add_uleb(self.gas_price);
        for invocation in &self.invocations {
            enc.add_uleb(invocation.target as u128);
            let mut instructions = TvfEncoder::new();
            for instruction in &invocation.instructions {
                match instruction {
                    DecodedInstruction::Uleb(v) => instructions.add_uleb(*v),
                    DecodedInstruction::Sleb(v) => instructions.add_sleb(*v),
                    DecodedInstruction::Vector(bytes) => instructions.add_vector(bytes)?,
                    DecodedInstruction::Inline { raw, .. } => instructions.add_raw(raw),
                }
            }
            enc.add_vector(&instructions.build())?;
        }
        for signature in &self.signatures {
            enc.add_vector(&signature.ed25519)?;
            enc.add_vector(&signature.falcon512)?;
        }
        let mut bytes = Vec::with_capacity(ADDRESS_LENGTH + enc.len());
        bytes.extend_from_slice(&self.pod);
        bytes.extend_from_slice(&enc.build());
        Ok(bytes)
    }
}

/// Decodes transaction bytes, optionally stripping the VM envelope and
/// labeling instructions against the authoring manifest.
pub fn decode_transaction(
    bytes: &[u8],
    options: &DecodeOptions<'_>,
) -> Result<DecodedTransaction, DecodeError> {
    let (body, vm_header) = if options.strip_vm_header {
        let (header, rest) = strip_vm_header(bytes)?;
        (rest, Some(header))
    } else {
        (bytes, None)
    };

    if body.len() > MAX_TX_SIZE_BYTES {
        return Err(DecodeError::SizeBudgetExceeded {
            size: body.len(),
            limit: MAX_TX_SIZE_BYTES,
        });
    }
    if body.len() < ADDRESS_LENGTH {
        return Err(CodecError::Truncated {
            needed: ADDRESS_LENGTH - body.len(),
            remaining: body.len(),
        }
        .into());
    }
    let pod: [u8; ADDRESS_LENGTH] = body[..ADDRESS_LENGTH].try_into().expect("length checked");
    let payload = &body[ADDRESS_LENGTH..];

    let mut dec = TvfDecoder::new(payload);
    let version = dec.read_uleb()?;
    if version != WIRE_VERSION {
        return Err(DecodeError::UnsupportedVersion { version });
    }
    let sequence = dec.read_uleb()?;

    let table = dec.read_vector()?;
    if table.len() % ADDRESS_LENGTH != 0 {
        return Err(DecodeError::AddressTableMisaligned { len: table.len() });
    }
    let addresses: Vec<Address> = table
        .chunks_exact(ADDRESS_LENGTH)
        .map(|chunk| Address::new(chunk.try_into().expect("chunk size fixed")))
        .collect();

    let gas_limit = dec.read_uleb()?;
    let gas_price = dec.read_uleb()?;

    // Invocations: (uvarint target, vector instructions) pairs, as long
    // as the next item is an unsigned varint.
    let instruction_kinds = options
        .manifest
        .map(Manifest::instruction_kinds)
        .transpose()?
        .unwrap_or_default();
    let mut invocations = Vec::new();
    while dec.has_next() && dec.peek_kind()? == TvfKind::UnsignedVarint {
        let target = dec.read_uleb()? as usize;
        if target >= addresses.len() {
            return Err(DecodeError::IndexOutOfRange { index: target, count: addresses.len() });
        }
        let instruction_bytes = dec.read_vector()?;
        let kinds = instruction_kinds.get(invocations.len()).map(Vec::as_slice);
        let instructions = decode_instructions(&instruction_bytes, kinds)?;
        invocations.push(DecodedInvocation { target, instructions });
    }

    let pre_signature = payload[..dec.position()].to_vec();
    let signature_section = payload[dec.position()..].to_vec();

    // Everything left must be vectors, in (ed25519, falcon512) pairs.
    let mut signatures = Vec::new();
    let mut vectors = 0usize;
    while dec.has_next() {
        let ed25519 = dec.read_vector()?;
        vectors += 1;
        if !dec.has_next() {
            return Err(DecodeError::UnpairedSignature { vectors });
        }
        let falcon512 = dec.read_vector()?;
        vectors += 1;
        signatures.push(DualSignature { ed25519, falcon512 });
    }
    if signatures.is_empty() {
        return Err(DecodeError::MissingSignatures);
    }

    Ok(DecodedTransaction {
        pod,
        version,
        sequence,
        gas_limit,
        gas_price,
        addresses,
        invocations,
        signatures,
        vm_header,
        pre_signature,
        signature_section,
    })
}

/// Validates and removes the `"LEAB" ‖ version ‖ u64-LE length` envelope.
fn strip_vm_header(bytes: &[u8]) -> Result<(VmHeader, &[u8]), DecodeError> {
    if bytes.len() < VM_HEADER_LEN {
        return Err(DecodeError::VmHeaderInvalid {
            reason: format!("{} bytes is too short for the envelope", bytes.len()),
        });
    }
    if bytes[..4] != VM_MAGIC {
        return Err(DecodeError::VmHeaderInvalid {
            reason: format!("magic is {:02x?}, expected \"LEAB\"", &bytes[..4]),
        });
    }
    let version = bytes[4];
    if version != VM_VERSION {
        return Err(DecodeError::VmHeaderInvalid {
            reason: format!("envelope version {version}, expected {VM_VERSION}"),
        });
    }
    let declared_len = u64::from_le_bytes(bytes[5..13].try_into().expect("length checked"));
    let body = &bytes[VM_HEADER_LEN..];
    if declared_len != body.len() as u64 {
        return Err(DecodeError::VmHeaderInvalid {
            reason: format!("declared length {declared_len} but {} bytes follow", body.len()),
        });
    }
    Ok((VmHeader { version, declared_len }, body))
}

/// Decodes a nested instruction stream.
///
/// Without manifest kinds every TVF item is one instruction. With them,
/// slots labeled INLINE consume the four items of an embedded pubset and
/// regroup them; extra wire items past the labeled ones decode plainly
/// (the wire is the source of truth, the manifest only annotates it).
fn decode_instructions(
    bytes: &[u8],
    kinds: Option<&[InstructionKind]>,
) -> Result<Vec<DecodedInstruction>, DecodeError> {
    let mut dec = TvfDecoder::new(bytes);
    let mut instructions = Vec::new();
    if let Some(kinds) = kinds {
        for kind in kinds {
            if !dec.has_next() {
                break;
            }
            match kind {
                InstructionKind::Inline => {
                    let start = dec.position();
                    // An inlined pubset is four items: two markers, two keys.
                    dec.read_uleb()?;
                    dec.read_vector()?;
                    dec.read_uleb()?;
                    dec.read_vector()?;
                    let raw = bytes[start..dec.position()].to_vec();
                    let keyset = match PublicKeyset::from_pubset(&raw) {
                        Ok(keyset) => Some(keyset),
                        Err(err) => {
                            tracing::warn!(%err, "INLINE content is not a pubset; keeping raw bytes");
                            None
                        }
                    };
                    instructions.push(DecodedInstruction::Inline { raw, keyset });
                }
                _ => instructions.push(decode_plain_instruction(&mut dec)?),
            }
        }
    }
    while dec.has_next() {
        instructions.push(decode_plain_instruction(&mut dec)?);
    }
    Ok(instructions)
}

fn decode_plain_instruction(
    dec: &mut TvfDecoder<'_>,
) -> Result<DecodedInstruction, DecodeError> {
    Ok(match dec.peek_kind()? {
        TvfKind::UnsignedVarint => DecodedInstruction::Uleb(dec.read_uleb()?),
        TvfKind::SignedVarint => DecodedInstruction::Sleb(dec.read_sleb()?),
        TvfKind::Vector => DecodedInstruction::Vector(dec.read_vector()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::crypto::testutil::test_signer;
    use crate::crypto::Signer;
    use crate::manifest::resolve;
    use crate::transaction::encoder::encode_transaction;

    fn signer_map(entries: &[(&str, u8)]) -> BTreeMap<String, Signer> {
        entries.iter().map(|(alias, seed)| (alias.to_string(), test_signer(*seed))).collect()
    }

    fn manifest_json(target: &str) -> serde_json::Value {
        serde_json::json!({
            "sequence": 5, "gasLimit": 50000, "gasPrice": 2,
            "feePayer": "sender",
            "invocations": [{
                "targetAddress": format!("$addr({target})"),
                "instructions": [{"uleb": 9}, {"vector": "cafe"}, {"sleb": -3}]
            }]
        })
    }

    fn encode_sample() -> (Manifest, BTreeMap<String, Signer>, Vec<u8>) {
        let signers = signer_map(&[("sender", 31)]);
        let target = Address::new([0x99; 32]).to_bech32();
        let manifest = Manifest::from_json(&manifest_json(&target)).unwrap();
        let resolved = resolve(&manifest, &signers).unwrap();
        let tx = encode_transaction(&resolved, None).unwrap();
        (manifest, signers, tx.bytes)
    }

    #[test]
    fn decodes_what_the_encoder_emits() {
        let (_, signers, bytes) = encode_sample();
        let decoded = decode_transaction(&bytes, &DecodeOptions::default()).unwrap();

        assert_eq!(decoded.version, 1);
        assert_eq!(decoded.sequence, 5);
        assert_eq!(decoded.gas_limit, 50_000);
        assert_eq!(decoded.gas_price, 2);
        assert_eq!(decoded.addresses.len(), 2);
        assert_eq!(decoded.addresses[0], signers["sender"].address());
        assert_eq!(decoded.invocations.len(), 1);
        assert_eq!(decoded.invocations[0].target, 1);
        assert_eq!(
            decoded.invocations[0].instructions,
            vec![
                DecodedInstruction::Uleb(9),
                DecodedInstruction::Vector(vec![0xca, 0xfe]),
                DecodedInstruction::Sleb(-3),
            ]
        );
        assert_eq!(decoded.signatures.len(), 1);
        assert!(decoded.vm_header.is_none());
    }

    #[test]
    fn base_hash_matches_encoder() {
        let signers = signer_map(&[("sender", 32)]);
        let target = Address::new([0x98; 32]).to_bech32();
        let manifest = Manifest::from_json(&manifest_json(&target)).unwrap();
        let resolved = resolve(&manifest, &signers).unwrap();
        let tx = encode_transaction(&resolved, None).unwrap();
        let decoded = decode_transaction(&tx.bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.base_hash(), tx.base_hash);
        assert_eq!(decoded.tx_id(), tx.tx_id);
        // And the exposed sections reassemble the original bytes.
        let mut reassembled = decoded.pod.to_vec();
        reassembled.extend_from_slice(decoded.pre_signature());
        reassembled.extend_from_slice(decoded.signature_section());
        assert_eq!(reassembled, tx.bytes);
    }

    #[test]
    fn reencode_is_byte_identical() {
        let (manifest, _, bytes) = encode_sample();
        let plain = decode_transaction(&bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(plain.to_bytes().unwrap(), bytes);

        let labeled = decode_transaction(
            &bytes,
            &DecodeOptions { manifest: Some(&manifest), strip_vm_header: false },
        )
        .unwrap();
        assert_eq!(labeled.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn rejects_wrong_version() {
        let (_, _, bytes) = encode_sample();
        let mut tampered = bytes.clone();
        // Version varint payload sits right after pod + 1 header byte.
        tampered[33] = 2;
        assert!(matches!(
            decode_transaction(&tampered, &DecodeOptions::default()),
            Err(DecodeError::UnsupportedVersion { version: 2 })
        ));
    }

    #[test]
    fn rejects_out_of_range_target() {
        let signers = signer_map(&[("sender", 33)]);
        let manifest = Manifest::from_json(&serde_json::json!({
            "sequence": 1, "gasLimit": 1, "gasPrice": 1,
            "feePayer": "sender",
            "invocations": [{"targetAddress": "$addr(sender)", "instructions": []}]
        }))
        .unwrap();
        let resolved = resolve(&manifest, &signers).unwrap();
        let tx = encode_transaction(&resolved, None).unwrap();

        // Surgically bump the target index varint (table has one entry).
        let decoded = decode_transaction(&tx.bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.invocations[0].target, 0);
        let mut rebuilt = decoded.clone();
        rebuilt.invocations[0].target = 7;
        let tampered = rebuilt.to_bytes().unwrap();
        assert!(matches!(
            decode_transaction(&tampered, &DecodeOptions::default()),
            Err(DecodeError::IndexOutOfRange { index: 7, count: 1 })
        ));
    }

    #[test]
    fn rejects_unpaired_signature_vector() {
        let (_, _, bytes) = encode_sample();
        let decoded = decode_transaction(&bytes, &DecodeOptions::default()).unwrap();
        // Rebuild with a dangling extra vector after the signatures.
        let mut tampered = decoded.to_bytes().unwrap();
        let mut extra = TvfEncoder::new();
        extra.add_vector(&[0xab; 64]).unwrap();
        tampered.extend_from_slice(&extra.build());
        assert!(matches!(
            decode_transaction(&tampered, &DecodeOptions::default()),
            Err(DecodeError::UnpairedSignature { vectors: 3 })
        ));
    }

    #[test]
    fn rejects_zero_signature_pairs() {
        let signers = signer_map(&[("sender", 34)]);
        let manifest = Manifest::from_json(&serde_json::json!({
            "sequence": 1, "gasLimit": 1, "gasPrice": 1,
            "feePayer": "sender", "invocations": []
        }))
        .unwrap();
        let resolved = resolve(&manifest, &signers).unwrap();
        let tx = encode_transaction(&resolved, None).unwrap();
        let decoded = decode_transaction(&tx.bytes, &DecodeOptions::default()).unwrap();
        let mut unsigned = decoded;
        unsigned.signatures.clear();
        let bytes = unsigned.to_bytes().unwrap();
        assert!(matches!(
            decode_transaction(&bytes, &DecodeOptions::default()),
            Err(DecodeError::MissingSignatures)
        ));
    }

    #[test]
    fn rejects_misaligned_address_table() {
        // Hand-build a payload whose address vector is 31 bytes.
        let mut enc = TvfEncoder::new();
        enc.add_uleb(1);
        enc.add_uleb(1);
        enc.add_vector(&[0u8; 31]).unwrap();
        enc.add_uleb(1);
        enc.add_uleb(1);
        let mut bytes = vec![0x11; 32];
        bytes.extend_from_slice(&enc.build());
        assert!(matches!(
            decode_transaction(&bytes, &DecodeOptions::default()),
            Err(DecodeError::AddressTableMisaligned { len: 31 })
        ));
    }

    #[test]
    fn rejects_oversized_input() {
        let bytes = vec![0u8; MAX_TX_SIZE_BYTES + 1];
        assert!(matches!(
            decode_transaction(&bytes, &DecodeOptions::default()),
            Err(DecodeError::SizeBudgetExceeded { .. })
        ));
    }

    #[test]
    fn rejects_truncated_pod() {
        assert!(matches!(
            decode_transaction(&[0x11; 20], &DecodeOptions::default()),
            Err(DecodeError::Codec(CodecError::Truncated { .. }))
        ));
    }

    #[test]
    fn vm_wrapper_roundtrip() {
        let (_, _, bytes) = encode_sample();
        let mut wrapped = VM_MAGIC.to_vec();
        wrapped.push(VM_VERSION);
        wrapped.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        wrapped.extend_from_slice(&bytes);

        let decoded = decode_transaction(
            &wrapped,
            &DecodeOptions { manifest: None, strip_vm_header: true },
        )
        .unwrap();
        assert_eq!(
            decoded.vm_header,
            Some(VmHeader { version: 1, declared_len: bytes.len() as u64 })
        );
        assert_eq!(decoded.to_bytes().unwrap(), bytes);

        // Without stripping, the envelope corrupts the pod and the TVF
        // stream behind it; decoding must fail.
        assert!(decode_transaction(&wrapped, &DecodeOptions::default()).is_err());
    }

    #[test]
    fn vm_wrapper_validation() {
        let (_, _, bytes) = encode_sample();
        let opts = DecodeOptions { manifest: None, strip_vm_header: true };

        let mut bad_magic = b"XEAB".to_vec();
        bad_magic.push(VM_VERSION);
        bad_magic.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        bad_magic.extend_from_slice(&bytes);
        assert!(matches!(
            decode_transaction(&bad_magic, &opts),
            Err(DecodeError::VmHeaderInvalid { .. })
        ));

        let mut bad_version = VM_MAGIC.to_vec();
        bad_version.push(0x02);
        bad_version.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        bad_version.extend_from_slice(&bytes);
        assert!(matches!(
            decode_transaction(&bad_version, &opts),
            Err(DecodeError::VmHeaderInvalid { .. })
        ));

        let mut bad_len = VM_MAGIC.to_vec();
        bad_len.push(VM_VERSION);
        bad_len.extend_from_slice(&(bytes.len() as u64 + 1).to_le_bytes());
        bad_len.extend_from_slice(&bytes);
        assert!(matches!(
            decode_transaction(&bad_len, &opts),
            Err(DecodeError::VmHeaderInvalid { .. })
        ));
    }

    #[test]
    fn inline_pubset_labeled_with_manifest() {
        let signers = signer_map(&[("identityOwner", 35)]);
        let manifest = Manifest::from_json(&serde_json::json!({
            "sequence": 1, "gasLimit": 10, "gasPrice": 1,
            "feePayer": "identityOwner",
            "invocations": [{
                "targetAddress": "$addr(identityOwner)",
                "instructions": [{"INLINE": "$pubset(identityOwner)"}, {"uleb": 4}]
            }]
        }))
        .unwrap();
        let resolved = resolve(&manifest, &signers).unwrap();
        let tx = encode_transaction(&resolved, None).unwrap();

        // Without the manifest: the pubset shows as four plain items.
        let plain = decode_transaction(&tx.bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(plain.invocations[0].instructions.len(), 5);

        // With it: one Inline instruction with the keyset restored.
        let labeled = decode_transaction(
            &tx.bytes,
            &DecodeOptions { manifest: Some(&manifest), strip_vm_header: false },
        )
        .unwrap();
        let instructions = &labeled.invocations[0].instructions;
        assert_eq!(instructions.len(), 2);
        match &instructions[0] {
            DecodedInstruction::Inline { raw, keyset } => {
                assert_eq!(raw, &signers["identityOwner"].pubset());
                let keyset = keyset.as_ref().expect("pubset should parse");
                assert_eq!(keyset, signers["identityOwner"].public_keyset());
                // Stub keyfile rendering never carries secrets.
                let stub = keyset.to_stub_keyfile();
                assert!(stub.keyset.iter().all(|(secret, _)| secret.is_empty()));
            }
            other => panic!("expected Inline, got {other:?}"),
        }
        assert_eq!(instructions[1], DecodedInstruction::Uleb(4));
        assert_eq!(labeled.embedded_keysets().len(), 1);
    }
}
