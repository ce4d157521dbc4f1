// Copyright (c) 2026 Lea Toolkit Contributors. MIT License.
// See LICENSE for details.

//! # Lea Protocol — Client Toolkit
//!
//! The client side of the Lea blockchain: this crate turns a declarative
//! transaction **manifest** into canonical, byte-exact, dual-signed
//! binary, and turns such binary back into structure. Wallets, CLIs, and
//! build pipelines use it to produce transactions the network will
//! actually accept — which, under strict consensus rules, means
//! producing *exactly* the right bytes.
//!
//! ## Pipeline
//!
//! ```text
//! manifest + keys → resolve → pre-signature bytes → base hash
//!                 (→ link hash) → dual signatures → final bytes
//! ```
//!
//! The stages are tightly coupled on purpose: the resolver's canonical
//! address ordering decides which signer occupies which table slot,
//! which fixes the signing order, which fixes the byte layout, which
//! fixes the hash. Each module owns one stage:
//!
//! - **codec** — the TVF primitive layer: varints and length-prefixed
//!   vectors, canonical encodings only.
//! - **address** — 32-byte addresses, hex and Bech32m (`lea1...`) forms.
//! - **crypto** — BLAKE3, the Ed25519 + Falcon-512 dual-signature
//!   schemes, and keyset handling.
//! - **manifest** — the authoring model and the five-pass resolver.
//! - **transaction** — encoding, signing, chain linkage, decoding, and
//!   verification.
//! - **results** — schema-driven decoding of execution results.
//! - **config** — every consensus-critical constant, in one place.
//!
//! ## Design Philosophy
//!
//! 1. Determinism above all: same inputs, same bytes, every time.
//! 2. Strict decode: overlong varints, trailing bytes, oversized
//!    declarations — all rejected, because signed bytes have exactly one
//!    meaning or none.
//! 3. Secrets never leave: decoded and serialized outputs carry public
//!    keys only.

pub mod address;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod manifest;
pub mod results;
pub mod transaction;

pub use address::{Address, BadAddress};
pub use crypto::{DualSignature, DualVerification, Keyfile, PublicKeyset, Signer};
pub use manifest::{resolve, Manifest, ResolvedManifest};
pub use transaction::{
    decode_transaction, encode_transaction, tx_link_hash, DecodeOptions, DecodedTransaction,
    EncodedTransaction,
};
