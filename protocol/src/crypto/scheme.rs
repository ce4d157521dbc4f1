//! # Signature Schemes
//!
//! The two algorithms behind every Lea signature, wrapped in one trait so
//! the rest of the toolkit never touches an algorithm-specific type:
//!
//! - **Ed25519** — fast, deterministic, 64-byte signatures. The classical
//!   half of the pair.
//! - **Falcon-512** — lattice-based, NIST-selected, the post-quantum
//!   half. Signatures are variable-length (≤ 666 bytes), which is why the
//!   wire format length-prefixes every signature.
//!
//! A transaction is valid only when *both* signatures verify. An attacker
//! has to break both a curve and a lattice — on the same day.
//!
//! Backends are pluggable: these implementations delegate to
//! `ed25519-dalek` and the PQClean-derived `pqcrypto-falcon`, but
//! anything satisfying [`SignatureScheme`] (hardware, SIMD, test doubles)
//! slots in without the callers noticing.

use ed25519_dalek::{Signature as EdSignature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use pqcrypto_falcon::falcon512;
use pqcrypto_traits::sign::{
    DetachedSignature as _, PublicKey as _, SecretKey as _,
};
use thiserror::Error;

/// A signing primitive failed. Signing is the only fallible direction —
/// a failed *verification* is a normal boolean outcome, not an error.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{scheme} failure: {reason}")]
pub struct CryptoFailure {
    pub scheme: &'static str,
    pub reason: String,
}

impl CryptoFailure {
    fn new(scheme: &'static str, reason: impl Into<String>) -> Self {
        Self { scheme, reason: reason.into() }
    }
}

/// The pluggable signature-primitive interface.
///
/// Implementations receive raw key and message bytes and return raw
/// signature bytes. No hashing happens here — callers pass the
/// already-computed digest they want signed.
pub trait SignatureScheme {
    /// Human-readable algorithm name, used in error context and logs.
    fn name(&self) -> &'static str;

    /// Signs `message` with `secret_key`, returning the raw signature.
    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoFailure>;

    /// Verifies `signature` over `message` against `public_key`.
    /// Malformed keys or signatures simply fail verification.
    fn verify(&self, public_key: &[u8], signature: &[u8], message: &[u8]) -> bool;

    /// Exact public-key length in bytes.
    fn public_key_len(&self) -> usize;

    /// Exact secret-key length in bytes.
    fn secret_key_len(&self) -> usize;

    /// Upper bound on signature length in bytes.
    fn signature_max_len(&self) -> usize;
}

// ---------------------------------------------------------------------------
// Ed25519
// ---------------------------------------------------------------------------

/// Ed25519 via `ed25519-dalek`.
///
/// Secret keys are accepted in two layouts: the 32-byte seed, or the
/// 64-byte `seed ‖ public_key` form some key generators emit. Either way
/// the public key is re-derived from the seed, so a mismatched suffix
/// cannot smuggle in a different identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519;

impl Ed25519 {
    fn signing_key(secret_key: &[u8]) -> Result<SigningKey, CryptoFailure> {
        let seed: [u8; 32] = match secret_key.len() {
            32 => secret_key.try_into().expect("length checked"),
            64 => secret_key[..32].try_into().expect("length checked"),
            other => {
                return Err(CryptoFailure::new(
                    "ed25519",
                    format!("secret key must be 32 or 64 bytes, got {other}"),
                ));
            }
        };
        Ok(SigningKey::from_bytes(&seed))
    }
}

impl SignatureScheme for Ed25519 {
    fn name(&self) -> &'static str {
        "ed25519"
    }

    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoFailure> {
        let key = Self::signing_key(secret_key)?;
        Ok(key.sign(message).to_bytes().to_vec())
    }

    fn verify(&self, public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
        let Ok(pk_bytes) = <&[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(pk_bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <&[u8; 64]>::try_from(signature) else {
            return false;
        };
        let signature = EdSignature::from_bytes(sig_bytes);
        verifying_key.verify(message, &signature).is_ok()
    }

    fn public_key_len(&self) -> usize {
        32
    }

    fn secret_key_len(&self) -> usize {
        32
    }

    fn signature_max_len(&self) -> usize {
        64
    }
}

// ---------------------------------------------------------------------------
// Falcon-512
// ---------------------------------------------------------------------------

/// Falcon-512 via `pqcrypto-falcon` (PQClean reference implementation).
#[derive(Debug, Clone, Copy, Default)]
pub struct Falcon512;

impl SignatureScheme for Falcon512 {
    fn name(&self) -> &'static str {
        "falcon512"
    }

    fn sign(&self, secret_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoFailure> {
        let sk = falcon512::SecretKey::from_bytes(secret_key)
            .map_err(|e| CryptoFailure::new("falcon512", format!("bad secret key: {e}")))?;
        let sig = falcon512::detached_sign(message, &sk);
        Ok(sig.as_bytes().to_vec())
    }

    fn verify(&self, public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
        let Ok(pk) = falcon512::PublicKey::from_bytes(public_key) else {
            return false;
        };
        let Ok(sig) = falcon512::DetachedSignature::from_bytes(signature) else {
            return false;
        };
        falcon512::verify_detached_signature(&sig, message, &pk).is_ok()
    }

    fn public_key_len(&self) -> usize {
        falcon512::public_key_bytes()
    }

    fn secret_key_len(&self) -> usize {
        falcon512::secret_key_bytes()
    }

    fn signature_max_len(&self) -> usize {
        falcon512::signature_bytes()
    }
}

/// Generates a fresh Falcon-512 keypair as `(public, secret)` raw bytes.
/// Test fixtures and key tooling need this; transaction processing never
/// does.
pub fn falcon512_generate() -> (Vec<u8>, Vec<u8>) {
    let (pk, sk) = falcon512::keypair();
    (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
}
