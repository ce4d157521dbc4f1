//! Cursor-based TVF decoder.
//!
//! Borrows the input buffer, never copies more than the payloads it
//! hands out. Every read validates the header byte against the requested
//! kind, so a caller that expects a vector and finds a varint gets a
//! precise `HeaderMismatch` instead of garbage.

use std::fmt;

use super::varint::{decode_sleb, decode_uleb};
use super::CodecError;
use crate::config::MAX_VECTOR_LEN;

/// The three primitive kinds of the wire format. The two vector header
/// forms (small and large) are an encoding detail; both decode as
/// [`TvfKind::Vector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TvfKind {
    SignedVarint,
    UnsignedVarint,
    Vector,
}

impl fmt::Display for TvfKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignedVarint => write!(f, "signed varint"),
            Self::UnsignedVarint => write!(f, "unsigned varint"),
            Self::Vector => write!(f, "vector"),
        }
    }
}

/// A cursor over a TVF byte stream.
///
/// # Example
///
/// ```
/// use lea_protocol::codec::{TvfDecoder, TvfEncoder, TvfKind};
///
/// let mut enc = TvfEncoder::new();
/// enc.add_uleb(42);
/// enc.add_vector(b"hi").unwrap();
/// let bytes = enc.build();
///
/// let mut dec = TvfDecoder::new(&bytes);
/// assert_eq!(dec.peek_kind().unwrap(), TvfKind::UnsignedVarint);
/// assert_eq!(dec.read_uleb().unwrap(), 42);
/// assert_eq!(dec.read_vector().unwrap(), b"hi");
/// assert!(!dec.has_next());
/// ```
#[derive(Debug)]
pub struct TvfDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> TvfDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// True while at least one more byte remains under the cursor.
    pub fn has_next(&self) -> bool {
        self.pos < self.buf.len()
    }

    /// Current byte offset into the underlying buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Inspects the kind of the next item without consuming anything.
    pub fn peek_kind(&self) -> Result<TvfKind, CodecError> {
        let byte = self.peek_byte()?;
        match byte & 0b11 {
            0b00 => Ok(TvfKind::SignedVarint),
            0b01 => Ok(TvfKind::UnsignedVarint),
            _ => Ok(TvfKind::Vector),
        }
    }

    /// Reads an unsigned varint item.
    pub fn read_uleb(&mut self) -> Result<u128, CodecError> {
        self.expect_header(TvfKind::UnsignedVarint, 0x01)?;
        let (value, consumed) = decode_uleb(&self.buf[self.pos + 1..])?;
        self.pos += 1 + consumed;
        Ok(value)
    }

    /// Reads a signed varint item.
    pub fn read_sleb(&mut self) -> Result<i128, CodecError> {
        self.expect_header(TvfKind::SignedVarint, 0x00)?;
        let (value, consumed) = decode_sleb(&self.buf[self.pos + 1..])?;
        self.pos += 1 + consumed;
        Ok(value)
    }

    /// Reads a vector item (either header form) and copies its payload
    /// out, so the returned bytes outlive the input buffer.
    pub fn read_vector(&mut self) -> Result<Vec<u8>, CodecError> {
        let header = self.peek_byte()?;
        let (len, header_len) = match header & 0b11 {
            0b10 => ((header >> 2) as usize, 1),
            0b11 => {
                if header != 0x03 {
                    return Err(CodecError::InvalidHeader { byte: header });
                }
                let (declared, consumed) = decode_uleb(&self.buf[self.pos + 1..])?;
                if declared > MAX_VECTOR_LEN as u128 {
                    return Err(CodecError::SizeExceeded {
                        declared: declared.min(usize::MAX as u128) as usize,
                        limit: MAX_VECTOR_LEN,
                    });
                }
                (declared as usize, 1 + consumed)
            }
            _ => {
                return Err(CodecError::HeaderMismatch {
                    expected: TvfKind::Vector,
                    found: self.peek_kind()?,
                });
            }
        };
        let start = self.pos + header_len;
        let end = start + len;
        if end > self.buf.len() {
            return Err(CodecError::Truncated {
                needed: end - self.buf.len(),
                remaining: self.buf.len() - start.min(self.buf.len()),
            });
        }
        self.pos = end;
        Ok(self.buf[start..end].to_vec())
    }

    fn peek_byte(&self) -> Result<u8, CodecError> {
        self.buf.get(self.pos).copied().ok_or(CodecError::Truncated {
            needed: 1,
            remaining: 0,
        })
    }

    fn expect_header(&self, expected: TvfKind, header: u8) -> Result<(), CodecError> {
        let byte = self.peek_byte()?;
        if byte & 0b11 != header & 0b11 {
            return Err(CodecError::HeaderMismatch {
                expected,
                found: match byte & 0b11 {
                    0b00 => TvfKind::SignedVarint,
                    0b01 => TvfKind::UnsignedVarint,
                    _ => TvfKind::Vector,
                },
            });
        }
        // Varint headers are exactly one tag byte; set upper bits mean a
        // corrupt stream, not a different kind.
        if byte != header {
            return Err(CodecError::InvalidHeader { byte });
        }
        Ok(())
    }
}
