//! # Transactions
//!
//! Encoding, signing, decoding, chain linkage, and verification of Lea
//! transactions. The wire layout is fixed:
//!
//! ```text
//! pod (32 bytes)
//! ‖ TVF( uvarint(version=1), uvarint(sequence), vector(address_table),
//!        uvarint(gasLimit), uvarint(gasPrice),
//!        { uvarint(targetIndex), vector(instructions) }*,
//!        { vector(ed25519_sig), vector(falcon512_sig) }* )
//! ```
//!
//! with no trailing bytes and a 1 MiB total cap. The base hash covers
//! everything before the first signature, pod included.

pub mod chain;
pub mod decoder;
pub mod encoder;
pub mod verification;

pub use chain::tx_link_hash;
pub use decoder::{
    decode_transaction, DecodeError, DecodeOptions, DecodedInstruction, DecodedInvocation,
    DecodedTransaction, VmHeader,
};
pub use encoder::{
    encode_pre_signature, encode_transaction, EncodeError, EncodedTransaction,
};
pub use verification::{verify_single_signer, VerifyError};
