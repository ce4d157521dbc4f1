//! # CLI Interface
//!
//! Defines the command-line argument structure for the `lea` binary using
//! `clap` derive. Four subcommands cover the toolkit's observable
//! surface: `package`, `verify`, `decode`, and `decode-result`.
//!
//! Conventions worth knowing:
//!
//! - Signer keyfiles attach as `--signer alias=path`, repeatable.
//! - The default output path for `package` and `decode` derives from the
//!   manifest: `.json` becomes `.tx.bin`.
//! - Exit code 0 means success; any failure (parse, resolution, signing,
//!   verification) is non-zero.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Lea transaction toolkit.
///
/// Packages declarative manifests into signed binary transactions,
/// decodes them back, and projects execution results through a schema.
#[derive(Parser, Debug)]
#[command(name = "lea", about = "Lea transaction toolkit", version, propagate_version = true)]
pub struct LeaCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log verbosity when RUST_LOG is not set: trace, debug, info, warn, error.
    #[arg(long, global = true, env = "LEA_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

/// Top-level subcommands for the `lea` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a manifest, sign it, and write the binary transaction.
    Package(PackageArgs),
    /// Decode a transaction and verify its signature.
    Verify(VerifyArgs),
    /// Decode a transaction into structured JSON.
    Decode(DecodeArgs),
    /// Decode an execution-result buffer through a manifest's result schema.
    DecodeResult(DecodeResultArgs),
}

/// Arguments for the `package` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct PackageArgs {
    /// Path to the manifest JSON document.
    pub manifest: PathBuf,

    /// Signer keyfile as `alias=path`, repeatable. Every alias the
    /// manifest names (feePayer and signers) needs a keyfile, from this
    /// flag or from a `$keyset(...)` bundle inside the manifest.
    #[arg(long = "signer", value_name = "ALIAS=PATH")]
    pub signers: Vec<String>,

    /// Bind a constant to the raw bytes of a file, as `name=path`.
    /// Repeatable. The constant becomes available to `$const(name)`.
    #[arg(long = "file", value_name = "NAME=PATH")]
    pub files: Vec<String>,

    /// Output path for the binary transaction.
    /// Defaults to the manifest path with `.json` replaced by `.tx.bin`.
    #[arg(long)]
    pub outfile: Option<PathBuf>,

    /// Hex hash of the previous transaction, for chained signing.
    #[arg(long, value_name = "HEX32")]
    pub prev_hash: Option<String>,

    /// Sign the plain base hash even when --prev-hash is supplied.
    #[arg(long)]
    pub no_chain: bool,
}

/// Arguments for the `verify` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct VerifyArgs {
    /// Path to the binary transaction.
    pub transaction: PathBuf,

    /// Optional manifest, for labeling INLINE instructions (required to
    /// recover an embedded pubset for signature verification).
    pub manifest: Option<PathBuf>,

    /// The transaction is wrapped in the "LEAB" VM envelope.
    #[arg(long)]
    pub strip_vm_header: bool,
}

/// Arguments for the `decode` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct DecodeArgs {
    /// Path to the binary transaction.
    pub transaction: PathBuf,

    /// Optional manifest, for labeling INLINE instructions.
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Write the decoded JSON here instead of stdout.
    #[arg(long)]
    pub outfile: Option<PathBuf>,

    /// Strip the "LEAB" VM envelope before decoding.
    #[arg(long)]
    pub strip_vm_header: bool,
}

/// Arguments for the `decode-result` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct DecodeResultArgs {
    /// Path to the execution-result buffer.
    pub result: PathBuf,

    /// Manifest carrying the `resultSchema` section.
    pub manifest: PathBuf,
}

/// Splits a repeatable `key=value` flag argument.
pub fn parse_binding(raw: &str) -> Option<(&str, &Path)> {
    let (key, path) = raw.split_once('=')?;
    if key.is_empty() || path.is_empty() {
        return None;
    }
    Some((key, Path::new(path)))
}

/// Default outfile convention: `.json` → `.tx.bin`, anything else gets
/// `.tx.bin` appended.
pub fn default_outfile(manifest: &Path) -> PathBuf {
    let name = manifest.file_name().and_then(|n| n.to_str()).unwrap_or("out.json");
    let stem = name.strip_suffix(".json").unwrap_or(name);
    manifest.with_file_name(format!("{stem}.tx.bin"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
