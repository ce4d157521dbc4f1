// Copyright (c) 2026 Lea Toolkit Contributors. MIT License.
// See LICENSE for details.

//! # Lea CLI
//!
//! Entry point for the `lea` binary. Parses arguments, initializes
//! logging, and dispatches to the subcommand implementations:
//!
//! - `package`       — resolve a manifest, sign it, write the binary
//! - `verify`        — decode a transaction and verify its signature
//! - `decode`        — decode a transaction into structured JSON
//! - `decode-result` — project an execution result through a schema
//!
//! Exit code 0 on success, non-zero on any failure — build pipelines
//! depend on that contract more than on anything we print.

mod cli;
mod commands;
mod keyfiles;
mod logging;

use anyhow::Result;
use clap::Parser;

use cli::{Commands, LeaCli};

fn main() -> Result<()> {
    let args = LeaCli::parse();
    logging::init_logging(&format!(
        "lea_cli={level},lea_protocol={level}",
        level = args.log_level
    ));

    match args.command {
        Commands::Package(args) => commands::package(&args),
        Commands::Verify(args) => commands::verify(&args),
        Commands::Decode(args) => commands::decode(&args),
        Commands::DecodeResult(args) => commands::decode_result(&args),
    }
}
