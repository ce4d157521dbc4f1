//! # Lea Addresses
//!
//! An address is 32 raw bytes — nothing more. Everything else is
//! presentation: lowercase hex for machines and logs, Bech32m under the
//! `lea` prefix for humans (typo-detecting checksum, no ambiguous
//! characters, hard to mistake for a different chain's address).
//!
//! The Bech32m form regroups the 32 bytes directly from 8-bit to 5-bit
//! words. There is no witness-version byte — this is an address encoding,
//! not a Bitcoin output script.

use std::fmt;

use bech32::{FromBase32, ToBase32, Variant};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::{ADDRESS_HRP, ADDRESS_LENGTH};

/// Address parsing failed. The offending input is carried verbatim so the
/// caller can point at the exact manifest field that produced it.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("bad address {input:?}: {reason}")]
pub struct BadAddress {
    pub input: String,
    pub reason: String,
}

impl BadAddress {
    fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { input: input.into(), reason: reason.into() }
    }
}

/// A 32-byte Lea address. Equality and ordering are plain byte
/// comparisons — the canonical address-table sort depends on exactly
/// that, so no locale, no case folding, no cleverness.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Builds an address from a byte slice, rejecting any length but 32.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, BadAddress> {
        let arr: [u8; ADDRESS_LENGTH] = bytes.try_into().map_err(|_| {
            BadAddress::new(hex::encode(bytes), format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Lowercase hex, no prefix. 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses hex: case-insensitive, optional `0x` prefix, exactly
    /// 64 hex digits.
    pub fn from_hex(s: &str) -> Result<Self, BadAddress> {
        let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| BadAddress::new(s, format!("invalid hex: {e}")))?;
        Self::from_slice(&bytes).map_err(|e| BadAddress::new(s, e.reason))
    }

    /// Bech32m string under the `lea` HRP.
    pub fn to_bech32(&self) -> String {
        // Encoding 32 fixed bytes under a fixed HRP cannot fail; the only
        // bech32 error conditions are HRP-related.
        bech32::encode(ADDRESS_HRP, self.0.as_slice().to_base32(), Variant::Bech32m)
            .expect("fixed HRP is valid")
    }

    /// Parses a Bech32m address, validating HRP, variant, checksum, and
    /// decoded length.
    pub fn from_bech32(s: &str) -> Result<Self, BadAddress> {
        let (hrp, data, variant) =
            bech32::decode(s).map_err(|e| BadAddress::new(s, format!("invalid bech32: {e}")))?;
        if hrp != ADDRESS_HRP {
            return Err(BadAddress::new(s, format!("expected HRP {ADDRESS_HRP:?}, got {hrp:?}")));
        }
        if variant != Variant::Bech32m {
            return Err(BadAddress::new(s, "expected bech32m checksum, got bech32"));
        }
        let bytes = Vec::<u8>::from_base32(&data)
            .map_err(|e| BadAddress::new(s, format!("invalid base32 payload: {e}")))?;
        Self::from_slice(&bytes).map_err(|e| BadAddress::new(s, e.reason))
    }

    /// Parses either external form: Bech32m when the string starts with
    /// the `lea1` prefix, hex otherwise. This is the lenient entry point
    /// the manifest resolver uses for literal address references.
    pub fn parse(s: &str) -> Result<Self, BadAddress> {
        if s.to_ascii_lowercase().starts_with(&format!("{ADDRESS_HRP}1")) {
            Self::from_bech32(s)
        } else {
            Self::from_hex(s)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bech32())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

// Serde uses the hex form: decoded-transaction JSON wants something
// greppable, and hex sorts the same way the raw bytes do.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Address {
        let mut bytes = [0u8; 32];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        Address::new(bytes)
    }

    #[test]
    fn hex_roundtrip() {
        let addr = sample();
        let hex_str = addr.to_hex();
        assert_eq!(hex_str.len(), 64);
        assert_eq!(Address::from_hex(&hex_str).unwrap(), addr);
    }

    #[test]
    fn hex_accepts_prefix_and_mixed_case() {
        let addr = sample();
        let upper = addr.to_hex().to_uppercase();
        assert_eq!(Address::from_hex(&upper).unwrap(), addr);
        assert_eq!(Address::from_hex(&format!("0x{}", addr.to_hex())).unwrap(), addr);
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert!(Address::from_hex("abc").is_err()); // odd length
        assert!(Address::from_hex("zz".repeat(32).as_str()).is_err()); // not hex
        assert!(Address::from_hex(&"ab".repeat(31)).is_err()); // 31 bytes
        assert!(Address::from_hex(&"ab".repeat(33)).is_err()); // 33 bytes
    }

    #[test]
    fn bech32m_roundtrip() {
        let addr = sample();
        let s = addr.to_bech32();
        assert!(s.starts_with("lea1"));
        assert_eq!(Address::from_bech32(&s).unwrap(), addr);
    }

    #[test]
    fn bech32m_roundtrip_edge_patterns() {
        for byte in [0x00u8, 0xff, 0x55, 0xaa] {
            let addr = Address::new([byte; 32]);
            assert_eq!(Address::from_bech32(&addr.to_bech32()).unwrap(), addr);
        }
    }

    #[test]
    fn bech32m_rejects_wrong_hrp() {
        let other = bech32::encode("btc", [0u8; 32].as_slice().to_base32(), Variant::Bech32m).unwrap();
        let err = Address::from_bech32(&other).unwrap_err();
        assert!(err.reason.contains("HRP"));
    }

    #[test]
    fn bech32m_rejects_bech32_variant() {
        let legacy = bech32::encode("lea", [0u8; 32].as_slice().to_base32(), Variant::Bech32).unwrap();
        let err = Address::from_bech32(&legacy).unwrap_err();
        assert!(err.reason.contains("bech32m"));
    }

    #[test]
    fn bech32m_rejects_corrupted_checksum() {
        let mut s = sample().to_bech32();
        // Flip the final checksum character to a different valid charset char.
        let last = s.pop().unwrap();
        s.push(if last == 'q' { 'p' } else { 'q' });
        assert!(Address::from_bech32(&s).is_err());
    }

    #[test]
    fn parse_dispatches_on_prefix() {
        let addr = sample();
        assert_eq!(Address::parse(&addr.to_bech32()).unwrap(), addr);
        assert_eq!(Address::parse(&addr.to_hex()).unwrap(), addr);
    }

    #[test]
    fn ordering_is_lexicographic_bytes() {
        let lo = Address::new([0u8; 32]);
        let mut hi_bytes = [0u8; 32];
        hi_bytes[0] = 1;
        let hi = Address::new(hi_bytes);
        assert!(lo < hi);
    }

    #[test]
    fn serde_uses_hex() {
        let addr = sample();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn serde_accepts_bech32_input() {
        let addr = sample();
        let json = format!("\"{}\"", addr.to_bech32());
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
