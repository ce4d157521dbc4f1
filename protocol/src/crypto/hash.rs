//! # Hashing
//!
//! BLAKE3, and only BLAKE3. Transaction IDs, address derivation, and
//! chain linkage all use the same 32-byte digest, so there is exactly one
//! hash function to audit and exactly zero "which hash was this again"
//! conversations.
//!
//! The multi-part helper exists because half the call sites hash
//! `pod ‖ payload` or `ed_pk ‖ falcon_pk` — feeding the parts into the
//! hasher sequentially gives the same digest as concatenating them,
//! without the temporary buffer.

/// BLAKE3 of a single input. 32 bytes out.
///
/// # Example
///
/// ```
/// use lea_protocol::crypto::hash::blake3_hash;
///
/// let digest = blake3_hash(b"lea");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// BLAKE3 over multiple byte slices, hashed as if concatenated.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}
