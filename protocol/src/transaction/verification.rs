//! Signature verification for decoded transactions.
//!
//! The checks go from cheap to expensive: structure first, then the base
//! hash, then two signature verifications. A transaction that was signed
//! with chain linkage verifies against its *link* hash, which a verifier
//! without the previous transaction hash cannot reconstruct — this helper
//! checks the unchained case, which is the common one for freshly
//! packaged transactions.

use thiserror::Error;

use crate::crypto::{DualVerification, PublicKeyset};
use crate::transaction::decoder::DecodedTransaction;

/// Errors from the verification helper (verification *failures* are not
/// errors — they come back as `ok: false`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    /// This helper handles the single-signer case only.
    #[error("expected exactly one signature pair, found {found}")]
    SignerCount { found: usize },
}

/// Verifies a single-signer transaction against a public-only keyset.
///
/// Recomputes `BLAKE3(pod ‖ pre_signature_bytes)` and checks both the
/// Ed25519 and Falcon-512 signatures over it. `ok` is true only when
/// both verify.
pub fn verify_single_signer(
    transaction: &DecodedTransaction,
    keys: &PublicKeyset,
) -> Result<DualVerification, VerifyError> {
    if transaction.signatures.len() != 1 {
        return Err(VerifyError::SignerCount { found: transaction.signatures.len() });
    }
    let base_hash = transaction.base_hash();
    Ok(keys.verify(&base_hash, &transaction.signatures[0]))
}
