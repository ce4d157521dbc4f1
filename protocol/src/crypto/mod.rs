//! # Cryptographic Primitives for Lea
//!
//! Everything security-related flows through here: BLAKE3 hashing,
//! Ed25519 + Falcon-512 dual signatures, and keyset handling.
//!
//! We deliberately chose boring, audited implementations — `blake3`,
//! `ed25519-dalek`, PQClean's Falcon via `pqcrypto-falcon` — behind one
//! thin trait. If you're tempted to optimize these wrappers, please
//! reconsider. Then reconsider again. Then go read about timing attacks
//! and come back when you've lost the urge.

pub mod hash;
pub mod scheme;
pub mod signer;

// Re-export the things people actually need so they don't have to
// memorize our module hierarchy.
pub use hash::{blake3_hash, blake3_hash_multi};
pub use scheme::{CryptoFailure, Ed25519, Falcon512, SignatureScheme};
pub use signer::{DualSignature, DualVerification, KeyError, Keyfile, PublicKeyset, Signer};

/// Test-only keyset construction shared across the crate's unit tests.
#[cfg(test)]
pub(crate) mod testutil {
    use super::scheme::falcon512_generate;
    use super::signer::Signer;

    /// Builds a signer with a fixed Ed25519 seed and a fresh Falcon
    /// keypair. Distinct seeds give distinct addresses, which is all the
    /// resolver and encoder tests need.
    pub(crate) fn test_signer(ed_seed: u8) -> Signer {
        let seed = [ed_seed; 32];
        let ed_pk = ed25519_dalek::SigningKey::from_bytes(&seed)
            .verifying_key()
            .to_bytes();
        let (fal_pk, fal_sk) = falcon512_generate();
        Signer::from_parts(&seed, &ed_pk, &fal_sk, &fal_pk).unwrap()
    }
}
