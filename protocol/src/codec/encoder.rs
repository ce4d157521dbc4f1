//! Streaming TVF encoder.
//!
//! Append-only: each `add_*` call pushes one framed chunk, `build()`
//! concatenates them. Chunks are kept separate until the end so callers
//! can measure section boundaries (the transaction encoder needs the
//! exact byte offset where signatures begin).

use super::varint::{encode_uleb, encode_sleb};
use super::CodecError;
use crate::config::{MAX_SMALL_VECTOR_LEN, MAX_VECTOR_LEN};

/// Append-only encoder for TVF streams.
///
/// # Example
///
/// ```
/// use lea_protocol::codec::TvfEncoder;
///
/// let mut enc = TvfEncoder::new();
/// enc.add_uleb(1);
/// enc.add_vector(&[0xaa, 0xbb]).unwrap();
/// let bytes = enc.build();
/// assert_eq!(bytes, vec![0x01, 0x01, 0b0000_1010, 0xaa, 0xbb]);
/// ```
#[derive(Debug, Default)]
pub struct TvfEncoder {
    chunks: Vec<Vec<u8>>,
    len: usize,
}

impl TvfEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an unsigned varint item.
    pub fn add_uleb(&mut self, value: u128) {
        let mut chunk = vec![0x01];
        encode_uleb(value, &mut chunk);
        self.push(chunk);
    }

    /// Appends a signed varint item.
    pub fn add_sleb(&mut self, value: i128) {
        let mut chunk = vec![0x00];
        encode_sleb(value, &mut chunk);
        self.push(chunk);
    }

    /// Appends a length-prefixed byte vector.
    ///
    /// Payloads up to 63 bytes use the compact single-byte header; longer
    /// ones get the `0x03` header with a ULEB128 length. Lengths beyond
    /// the protocol cap fail `SizeExceeded` — a vector we could not
    /// decode back is a vector we refuse to emit.
    pub fn add_vector(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        if payload.len() > MAX_VECTOR_LEN {
            return Err(CodecError::SizeExceeded {
                declared: payload.len(),
                limit: MAX_VECTOR_LEN,
            });
        }
        let mut chunk = Vec::with_capacity(payload.len() + 4);
        if payload.len() <= MAX_SMALL_VECTOR_LEN {
            chunk.push(((payload.len() as u8) << 2) | 0b10);
        } else {
            chunk.push(0x03);
            encode_uleb(payload.len() as u128, &mut chunk);
        }
        chunk.extend_from_slice(payload);
        self.push(chunk);
        Ok(())
    }

    /// Injects bytes verbatim, with no framing header.
    ///
    /// The caller is responsible for the bytes being valid TVF themselves;
    /// this is how INLINE pseudo-instructions splice a pre-serialized
    /// pubset into an instruction stream.
    pub fn add_raw(&mut self, bytes: &[u8]) {
        self.push(bytes.to_vec());
    }

    /// Total number of bytes `build()` will produce.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Concatenates all chunks into the final byte stream.
    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in self.chunks {
            out.extend_from_slice(&chunk);
        }
        out
    }

    fn push(&mut self, chunk: Vec<u8>) {
        self.len += chunk.len();
        self.chunks.push(chunk);
    }
}
