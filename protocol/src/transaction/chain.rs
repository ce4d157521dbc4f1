//! Chain linkage: domain-separated binding of a transaction to its
//! predecessor.
//!
//! When a wallet signs transaction *n+1*, it can commit to transaction
//! *n*'s hash so the two cannot be reordered or replayed independently.
//! The signed message then becomes
//!
//! ```text
//! link_hash = BLAKE3(DOMAIN_TX_LINK_V1 ‖ prev_tx_hash ‖ base_hash)
//! ```
//!
//! The 32-byte domain tag keeps link hashes out of every other BLAKE3
//! use in the protocol: a link hash can never collide with a base hash,
//! an address, or anything else, by construction.

use crate::config::DOMAIN_TX_LINK_V1;
use crate::crypto::hash::blake3_hash_multi;

/// Computes the link hash binding `base_hash` to `prev_tx_hash`.
///
/// An all-zero `prev_tx_hash` means "no predecessor known" and degrades
/// to plain base-hash signing: callers get `base_hash` back unchanged,
/// with a warning, rather than a link to a hash that never existed.
pub fn tx_link_hash(prev_tx_hash: &[u8; 32], base_hash: &[u8; 32]) -> [u8; 32] {
    if prev_tx_hash.iter().all(|&b| b == 0) {
        tracing::warn!("previous transaction hash is all zeros; signing unchained base hash");
        return *base_hash;
    }
    blake3_hash_multi(&[&DOMAIN_TX_LINK_V1, prev_tx_hash, base_hash])
}
