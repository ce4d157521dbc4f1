//! # TVF — Tagged-Value Framing
//!
//! The primitive layer of the Lea wire format. Everything a transaction
//! carries — versions, sequence numbers, address tables, instructions,
//! signatures — is one of exactly three primitive kinds, identified by a
//! 2-bit type tag in the low bits of a header byte:
//!
//! | Tag    | Kind                    | Encoding                                   |
//! |--------|-------------------------|--------------------------------------------|
//! | `0b00` | signed varint           | header `0x00`, then SLEB128                |
//! | `0b01` | unsigned varint         | header `0x01`, then ULEB128                |
//! | `0b10` | small vector (len ≤ 63) | header `(len << 2) \| 0b10`, then payload  |
//! | `0b11` | large vector            | header `0x03`, then ULEB128 length, payload|
//!
//! Three kinds is not a limitation, it's the point: a format this small
//! has no dark corners for a consensus bug to hide in.
//!
//! Varints are canonical — overlong encodings are rejected on decode, so
//! every value has exactly one byte representation and every byte
//! sequence has at most one meaning. Signed bytes depend on it.

pub mod varint;

mod decoder;
mod encoder;

pub use decoder::{TvfDecoder, TvfKind};
pub use encoder::TvfEncoder;

use thiserror::Error;

/// Errors produced while encoding or decoding TVF primitives.
///
/// Each variant carries the numbers needed to debug a malformed buffer
/// without hexdumping it by hand.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended in the middle of an item.
    #[error("truncated input: needed {needed} more byte(s), {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// The item under the cursor is not the kind the caller asked for.
    #[error("header mismatch: expected {expected}, found {found}")]
    HeaderMismatch { expected: TvfKind, found: TvfKind },

    /// The header byte is not one of the defined encodings (e.g. a varint
    /// header with garbage in the upper six bits).
    #[error("invalid header byte 0x{byte:02x}")]
    InvalidHeader { byte: u8 },

    /// A varint was not in canonical (shortest) form.
    #[error("overlong varint: {len} byte(s) where {canonical} suffice")]
    Overlong { len: usize, canonical: usize },

    /// A varint does not fit in 128 bits.
    #[error("varint exceeds 128-bit range")]
    Overflow,

    /// A declared length exceeds the permitted maximum. Raised before any
    /// allocation happens.
    #[error("declared size {declared} exceeds limit {limit}")]
    SizeExceeded { declared: usize, limit: usize },
}
