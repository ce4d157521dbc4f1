//! # Key Handling
//!
//! A Lea identity is a *pair* of keypairs — one Ed25519, one Falcon-512 —
//! loaded together as a keyset. The identity's address is derived from
//! the two public keys:
//!
//! ```text
//! address = BLAKE3(ed25519_pk ‖ falcon512_pk)
//! ```
//!
//! so the address commits to both algorithms at once. A keyfile may also
//! *declare* its address; when it does, the declaration must match the
//! derivation, because a keyfile that lies about its own identity is a
//! keyfile you do not want to sign with.
//!
//! Secret key material lives in [`Zeroizing`] buffers and is wiped on
//! drop. Anything this module hands outward — pubsets, decoded keysets,
//! debug output — carries public keys only.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::address::{Address, BadAddress};
use crate::codec::{CodecError, TvfDecoder, TvfEncoder};
use crate::config::{PUBSET_MARKER_ED25519, PUBSET_MARKER_FALCON512};
use crate::crypto::hash::blake3_hash_multi;
use crate::crypto::scheme::{CryptoFailure, Ed25519, Falcon512, SignatureScheme};

/// Errors raised while loading or using a keyset.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The keyset does not have the `[[ed_sk, ed_pk], [fal_sk, fal_pk]]`
    /// shape, or a component has the wrong length.
    #[error("invalid keyset: {reason}")]
    InvalidKeyset { reason: String },

    /// The keyfile's declared address disagrees with the address derived
    /// from its public keys.
    #[error("key address mismatch: declared {declared}, derived {derived}")]
    KeyAddressMismatch { declared: String, derived: String },

    /// A signing primitive failed.
    #[error(transparent)]
    Crypto(#[from] CryptoFailure),

    /// The declared address string itself failed to parse.
    #[error(transparent)]
    BadAddress(#[from] BadAddress),

    /// A serialized pubset failed to parse.
    #[error("invalid pubset: {0}")]
    InvalidPubset(#[from] CodecError),
}

impl KeyError {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidKeyset { reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// Keyfile
// ---------------------------------------------------------------------------

/// On-disk keyfile shape:
/// `{"keyset": [[ed_sk, ed_pk], [fal_sk, fal_pk]], "address"?, "addressHex"?}`
/// with each key a JSON array of byte values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyfile {
    pub keyset: Vec<(Vec<u8>, Vec<u8>)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, rename = "addressHex", skip_serializing_if = "Option::is_none")]
    pub address_hex: Option<String>,
}

// ---------------------------------------------------------------------------
// DualSignature
// ---------------------------------------------------------------------------

/// One signature from each algorithm, over the same message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualSignature {
    pub ed25519: Vec<u8>,
    pub falcon512: Vec<u8>,
}

/// Outcome of checking a [`DualSignature`]. `ok` is the conjunction —
/// a transaction with one good signature out of two is a forged
/// transaction, not a half-valid one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DualVerification {
    pub ok: bool,
    pub ed25519: bool,
    pub falcon512: bool,
}

// ---------------------------------------------------------------------------
// PublicKeyset
// ---------------------------------------------------------------------------

/// The public half of a keyset: what a pubset serializes, what a decoder
/// reconstructs, and everything needed to verify signatures. Secret-key
/// slots in any serialized form are empty placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyset {
    pub ed25519: Vec<u8>,
    pub falcon512: Vec<u8>,
}

impl PublicKeyset {
    /// Parses the four-item pubset blob:
    /// `uvarint(0) ‖ vector(ed_pk) ‖ uvarint(1) ‖ vector(fal_pk)`.
    pub fn from_pubset(bytes: &[u8]) -> Result<Self, KeyError> {
        let mut dec = TvfDecoder::new(bytes);
        let ed_marker = dec.read_uleb()?;
        if ed_marker != PUBSET_MARKER_ED25519 {
            return Err(KeyError::invalid(format!(
                "pubset slot 0 marker must be {PUBSET_MARKER_ED25519}, got {ed_marker}"
            )));
        }
        let ed25519 = dec.read_vector()?;
        let fal_marker = dec.read_uleb()?;
        if fal_marker != PUBSET_MARKER_FALCON512 {
            return Err(KeyError::invalid(format!(
                "pubset slot 1 marker must be {PUBSET_MARKER_FALCON512}, got {fal_marker}"
            )));
        }
        let falcon512 = dec.read_vector()?;
        if dec.has_next() {
            return Err(KeyError::invalid("trailing bytes after pubset"));
        }
        let keyset = Self { ed25519, falcon512 };
        keyset.check_lengths()?;
        Ok(keyset)
    }

    /// Serializes this keyset as a pubset blob.
    pub fn to_pubset(&self) -> Vec<u8> {
        let mut enc = TvfEncoder::new();
        enc.add_uleb(PUBSET_MARKER_ED25519);
        enc.add_vector(&self.ed25519).expect("public key below vector cap");
        enc.add_uleb(PUBSET_MARKER_FALCON512);
        enc.add_vector(&self.falcon512).expect("public key below vector cap");
        enc.build()
    }

    /// The address these public keys derive: `BLAKE3(ed_pk ‖ fal_pk)`.
    pub fn derive_address(&self) -> Address {
        Address::new(blake3_hash_multi(&[&self.ed25519, &self.falcon512]))
    }

    /// Verifies a dual signature over `message` against both public keys.
    pub fn verify(&self, message: &[u8], signature: &DualSignature) -> DualVerification {
        let ed25519 = Ed25519.verify(&self.ed25519, &signature.ed25519, message);
        let falcon512 = Falcon512.verify(&self.falcon512, &signature.falcon512, message);
        DualVerification { ok: ed25519 && falcon512, ed25519, falcon512 }
    }

    /// Renders this keyset in keyfile shape, with zero-length secret
    /// stubs where the secret keys would sit.
    pub fn to_stub_keyfile(&self) -> Keyfile {
        Keyfile {
            keyset: vec![
                (Vec::new(), self.ed25519.clone()),
                (Vec::new(), self.falcon512.clone()),
            ],
            address: Some(self.derive_address().to_bech32()),
            address_hex: Some(self.derive_address().to_hex()),
        }
    }

    fn check_lengths(&self) -> Result<(), KeyError> {
        if self.ed25519.len() != Ed25519.public_key_len() {
            return Err(KeyError::invalid(format!(
                "ed25519 public key must be {} bytes, got {}",
                Ed25519.public_key_len(),
                self.ed25519.len()
            )));
        }
        if self.falcon512.len() != Falcon512.public_key_len() {
            return Err(KeyError::invalid(format!(
                "falcon512 public key must be {} bytes, got {}",
                Falcon512.public_key_len(),
                self.falcon512.len()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// A loaded dual-algorithm keyset, ready to sign.
///
/// Construction validates everything up front — shape, key lengths,
/// Ed25519 seed/public consistency, declared-vs-derived address — so a
/// `Signer` that exists is a `Signer` that can sign.
#[derive(Clone)]
pub struct Signer {
    ed_secret: Zeroizing<Vec<u8>>,
    falcon_secret: Zeroizing<Vec<u8>>,
    public: PublicKeyset,
    address: Address,
}

impl Signer {
    /// Loads and validates a keyset from its parsed keyfile form.
    pub fn load(keyfile: &Keyfile) -> Result<Self, KeyError> {
        if keyfile.keyset.len() != 2 {
            return Err(KeyError::invalid(format!(
                "keyset must contain exactly 2 keypairs, got {}",
                keyfile.keyset.len()
            )));
        }
        let (ed_sk, ed_pk) = &keyfile.keyset[0];
        let (fal_sk, fal_pk) = &keyfile.keyset[1];
        let signer = Self::from_parts(ed_sk, ed_pk, fal_sk, fal_pk)?;

        if let Some(declared) = &keyfile.address {
            signer.check_declared(&Address::from_bech32(declared)?, declared)?;
        }
        if let Some(declared) = &keyfile.address_hex {
            signer.check_declared(&Address::from_hex(declared)?, declared)?;
        }
        Ok(signer)
    }

    /// Parses a keyfile from JSON and loads it.
    pub fn from_keyfile_json(json: &str) -> Result<Self, KeyError> {
        let keyfile: Keyfile = serde_json::from_str(json)
            .map_err(|e| KeyError::invalid(format!("keyfile JSON: {e}")))?;
        Self::load(&keyfile)
    }

    /// Builds a signer from raw key components.
    pub fn from_parts(
        ed_secret: &[u8],
        ed_public: &[u8],
        falcon_secret: &[u8],
        falcon_public: &[u8],
    ) -> Result<Self, KeyError> {
        if ed_secret.len() != 32 && ed_secret.len() != 64 {
            return Err(KeyError::invalid(format!(
                "ed25519 secret key must be 32 or 64 bytes, got {}",
                ed_secret.len()
            )));
        }
        if falcon_secret.len() != Falcon512.secret_key_len() {
            return Err(KeyError::invalid(format!(
                "falcon512 secret key must be {} bytes, got {}",
                Falcon512.secret_key_len(),
                falcon_secret.len()
            )));
        }
        let public = PublicKeyset {
            ed25519: ed_public.to_vec(),
            falcon512: falcon_public.to_vec(),
        };
        public.check_lengths()?;

        // The Ed25519 public key is fully determined by the seed; a
        // keyfile carrying a different one is corrupt or tampered with.
        let derived_ed_pk = ed25519_dalek::SigningKey::from_bytes(
            ed_secret[..32].try_into().expect("length checked"),
        )
        .verifying_key()
        .to_bytes();
        if derived_ed_pk != public.ed25519.as_slice() {
            return Err(KeyError::invalid(
                "ed25519 public key does not match its secret key",
            ));
        }

        let address = public.derive_address();
        Ok(Self {
            ed_secret: Zeroizing::new(ed_secret.to_vec()),
            falcon_secret: Zeroizing::new(falcon_secret.to_vec()),
            public,
            address,
        })
    }

    /// The derived address of this identity.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The public half of this keyset.
    pub fn public_keyset(&self) -> &PublicKeyset {
        &self.public
    }

    /// Signs `message` with both algorithms. No hashing happens here —
    /// the caller passes the digest it wants signed.
    pub fn sign_message(&self, message: &[u8]) -> Result<DualSignature, KeyError> {
        let ed25519 = Ed25519.sign(&self.ed_secret, message)?;
        let falcon512 = Falcon512.sign(&self.falcon_secret, message)?;
        Ok(DualSignature { ed25519, falcon512 })
    }

    /// Verifies a dual signature against this signer's public keys.
    pub fn verify(&self, message: &[u8], signature: &DualSignature) -> DualVerification {
        self.public.verify(message, signature)
    }

    /// Serializes the public-key-set blob:
    /// `uvarint(0) ‖ vector(ed_pk) ‖ uvarint(1) ‖ vector(fal_pk)`.
    pub fn pubset(&self) -> Vec<u8> {
        self.public.to_pubset()
    }

    fn check_declared(&self, declared: &Address, raw: &str) -> Result<(), KeyError> {
        if *declared != self.address {
            return Err(KeyError::KeyAddressMismatch {
                declared: raw.to_string(),
                derived: self.address.to_hex(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Secret material stays out of debug output. All of it.
        write!(f, "Signer(address={})", self.address.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::scheme::falcon512_generate;
    use crate::crypto::testutil::test_signer;

    fn test_keyfile(ed_seed: u8) -> Keyfile {
        let seed = [ed_seed; 32];
        let ed_pk = ed25519_dalek::SigningKey::from_bytes(&seed)
            .verifying_key()
            .to_bytes();
        let (fal_pk, fal_sk) = falcon512_generate();
        Keyfile {
            keyset: vec![(seed.to_vec(), ed_pk.to_vec()), (fal_sk, fal_pk)],
            address: None,
            address_hex: None,
        }
    }

    #[test]
    fn load_derives_address_from_public_keys() {
        let keyfile = test_keyfile(1);
        let signer = Signer::load(&keyfile).unwrap();
        let expected = blake3_hash_multi(&[&keyfile.keyset[0].1, &keyfile.keyset[1].1]);
        assert_eq!(signer.address().as_bytes(), &expected);
    }

    #[test]
    fn load_accepts_matching_declared_address() {
        let mut keyfile = test_keyfile(2);
        let derived = Signer::load(&keyfile).unwrap().address();
        keyfile.address = Some(derived.to_bech32());
        keyfile.address_hex = Some(derived.to_hex());
        assert!(Signer::load(&keyfile).is_ok());
    }

    #[test]
    fn load_rejects_mismatched_declared_address() {
        let mut keyfile = test_keyfile(3);
        keyfile.address_hex = Some("00".repeat(32));
        let err = Signer::load(&keyfile).unwrap_err();
        assert!(matches!(err, KeyError::KeyAddressMismatch { .. }));
    }

    #[test]
    fn load_rejects_wrong_pair_count() {
        let mut keyfile = test_keyfile(4);
        keyfile.keyset.pop();
        let err = Signer::load(&keyfile).unwrap_err();
        assert!(matches!(err, KeyError::InvalidKeyset { .. }));
    }

    #[test]
    fn load_rejects_inconsistent_ed25519_pair() {
        let mut keyfile = test_keyfile(5);
        // Public key from a different seed.
        keyfile.keyset[0].1 = ed25519_dalek::SigningKey::from_bytes(&[99u8; 32])
            .verifying_key()
            .to_bytes()
            .to_vec();
        let err = Signer::load(&keyfile).unwrap_err();
        assert!(matches!(err, KeyError::InvalidKeyset { .. }));
    }

    #[test]
    fn load_rejects_bad_key_lengths() {
        let mut keyfile = test_keyfile(6);
        keyfile.keyset[1].1.pop();
        assert!(matches!(
            Signer::load(&keyfile).unwrap_err(),
            KeyError::InvalidKeyset { .. }
        ));
    }

    #[test]
    fn sign_message_verifies_with_both_algorithms() {
        let signer = test_signer(7);
        let sig = signer.sign_message(b"digest-to-sign").unwrap();
        let report = signer.verify(b"digest-to-sign", &sig);
        assert!(report.ok && report.ed25519 && report.falcon512);

        let wrong = signer.verify(b"different digest", &sig);
        assert!(!wrong.ok);
    }

    #[test]
    fn tampered_single_signature_fails_conjunction() {
        let signer = test_signer(8);
        let mut sig = signer.sign_message(b"m").unwrap();
        sig.ed25519[0] ^= 0xff;
        let report = signer.verify(b"m", &sig);
        assert!(!report.ed25519);
        assert!(report.falcon512);
        assert!(!report.ok);
    }

    #[test]
    fn pubset_roundtrip() {
        let signer = test_signer(9);
        let blob = signer.pubset();
        let keyset = PublicKeyset::from_pubset(&blob).unwrap();
        assert_eq!(&keyset, signer.public_keyset());
        assert_eq!(keyset.derive_address(), signer.address());
        assert_eq!(keyset.to_pubset(), blob);
    }

    #[test]
    fn pubset_rejects_wrong_markers() {
        let signer = test_signer(10);
        let mut enc = TvfEncoder::new();
        enc.add_uleb(2); // reserved markers are 0 and 1
        enc.add_vector(&signer.public_keyset().ed25519).unwrap();
        enc.add_uleb(1);
        enc.add_vector(&signer.public_keyset().falcon512).unwrap();
        assert!(PublicKeyset::from_pubset(&enc.build()).is_err());
    }

    #[test]
    fn pubset_rejects_trailing_bytes() {
        let signer = test_signer(11);
        let mut blob = signer.pubset();
        blob.push(0x00);
        assert!(PublicKeyset::from_pubset(&blob).is_err());
    }

    #[test]
    fn stub_keyfile_has_empty_secrets() {
        let signer = test_signer(12);
        let stub = signer.public_keyset().to_stub_keyfile();
        assert!(stub.keyset[0].0.is_empty());
        assert!(stub.keyset[1].0.is_empty());
        assert_eq!(stub.keyset[0].1, signer.public_keyset().ed25519);
        // And the stub still round-trips through the loader's address check
        // path: its declared address matches its derivation.
        assert_eq!(stub.address_hex.unwrap(), signer.address().to_hex());
    }

    #[test]
    fn keyfile_json_roundtrip() {
        let keyfile = test_keyfile(13);
        let json = serde_json::to_string(&keyfile).unwrap();
        let signer = Signer::from_keyfile_json(&json).unwrap();
        assert_eq!(signer.public_keyset().ed25519, keyfile.keyset[0].1);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let signer = test_signer(14);
        let debug = format!("{signer:?}");
        assert!(debug.starts_with("Signer(address="));
        assert!(!debug.contains("secret"));
    }
}
