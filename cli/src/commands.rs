//! Subcommand implementations.
//!
//! Each function takes its parsed arguments, does file I/O at the edges,
//! and delegates everything consensus-relevant to `lea-protocol`. Errors
//! bubble up as `anyhow` with enough path context to know *which* file
//! was the problem; `main` turns them into a non-zero exit.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use lea_protocol::manifest::{resolve, Manifest, Value};
use lea_protocol::results::{decode_results, ResultSchema};
use lea_protocol::transaction::{
    decode_transaction, encode_transaction, verify_single_signer, DecodeOptions,
};
use lea_protocol::Signer;

use crate::cli::{
    default_outfile, parse_binding, DecodeArgs, DecodeResultArgs, PackageArgs, VerifyArgs,
};
use crate::keyfiles;

/// `lea package` — resolve, sign, and write the binary transaction.
pub fn package(args: &PackageArgs) -> Result<()> {
    let (manifest, mut signers) = load_manifest(&args.manifest, &args.files)?;

    for binding in &args.signers {
        let (alias, path) = parse_binding(binding)
            .with_context(|| format!("--signer {binding:?} is not alias=path"))?;
        signers.insert(alias.to_string(), keyfiles::load_signer(path)?);
    }

    // Every alias the manifest names must be backed by a keyfile.
    for alias in manifest.signer_aliases() {
        if !signers.contains_key(&alias) {
            bail!("no keyfile for signer {alias:?}; pass --signer {alias}=<path>");
        }
    }

    let prev_hash = match (&args.prev_hash, args.no_chain) {
        (Some(_), true) | (None, _) => None,
        (Some(hex_str), false) => Some(parse_prev_hash(hex_str)?),
    };

    let resolved = resolve(&manifest, &signers).context("manifest resolution failed")?;
    let tx = encode_transaction(&resolved, prev_hash.as_ref())
        .context("transaction encoding failed")?;

    let outfile = args.outfile.clone().unwrap_or_else(|| default_outfile(&args.manifest));
    fs::write(&outfile, &tx.bytes)
        .with_context(|| format!("failed to write {}", outfile.display()))?;

    tracing::info!(
        outfile = %outfile.display(),
        size = tx.bytes.len(),
        signers = resolved.signers.len(),
        "transaction packaged"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "txId": tx.tx_id,
            "linkId": tx.link_id,
            "outfile": outfile,
            "bytes": tx.bytes.len(),
        }))?
    );
    Ok(())
}

/// `lea verify` — decode and check the signature of a single-signer
/// transaction against its embedded pubset.
pub fn verify(args: &VerifyArgs) -> Result<()> {
    let bytes = fs::read(&args.transaction)
        .with_context(|| format!("failed to read {}", args.transaction.display()))?;
    let manifest = args
        .manifest
        .as_deref()
        .map(|path| load_manifest(path, &[]).map(|(manifest, _)| manifest))
        .transpose()?;

    let decoded = decode_transaction(
        &bytes,
        &DecodeOptions { manifest: manifest.as_ref(), strip_vm_header: args.strip_vm_header },
    )
    .context("transaction does not decode")?;

    let keysets = decoded.embedded_keysets();
    let Some(keys) = keysets.first().copied() else {
        // Structure checks all passed; without a pubset there is nothing
        // to verify signatures against.
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "txId": decoded.tx_id(),
                "structure": "ok",
                "signatures": "no embedded pubset; pass a manifest with an INLINE $pubset"
            }))?
        );
        return Ok(());
    };

    let report = verify_single_signer(&decoded, keys)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "txId": decoded.tx_id(),
            "ok": report.ok,
            "ed25519": report.ed25519,
            "falcon512": report.falcon512,
        }))?
    );
    if !report.ok {
        bail!("signature verification failed");
    }
    Ok(())
}

/// `lea decode` — structured JSON view of a binary transaction.
pub fn decode(args: &DecodeArgs) -> Result<()> {
    let bytes = fs::read(&args.transaction)
        .with_context(|| format!("failed to read {}", args.transaction.display()))?;
    let manifest = args
        .manifest
        .as_deref()
        .map(|path| load_manifest(path, &[]).map(|(manifest, _)| manifest))
        .transpose()?;

    let decoded = decode_transaction(
        &bytes,
        &DecodeOptions { manifest: manifest.as_ref(), strip_vm_header: args.strip_vm_header },
    )
    .context("transaction does not decode")?;

    // Serialized directly (not via serde_json::Value) so wide integers
    // survive: gas and sequence may exceed the u64 range.
    #[derive(serde::Serialize)]
    #[serde(rename_all = "camelCase")]
    struct DecodeOutput<'a> {
        tx_id: String,
        transaction: &'a lea_protocol::DecodedTransaction,
    }
    let rendered = serde_json::to_string_pretty(&DecodeOutput {
        tx_id: decoded.tx_id(),
        transaction: &decoded,
    })?;

    match &args.outfile {
        Some(path) => {
            fs::write(path, rendered.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(outfile = %path.display(), "decoded transaction written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// `lea decode-result` — project an execution-result buffer through the
/// manifest's result schema.
pub fn decode_result(args: &DecodeResultArgs) -> Result<()> {
    let bytes = fs::read(&args.result)
        .with_context(|| format!("failed to read {}", args.result.display()))?;
    let (manifest, _) = load_manifest(&args.manifest, &[])?;

    // The schema only needs the constants and resultSchema sections, and
    // it must work without signer keys; resolve a reduced manifest so
    // signer-backed address references elsewhere cannot get in the way.
    let mut reduced: BTreeMap<String, Value> = BTreeMap::new();
    reduced.insert("sequence".to_string(), Value::Integer(0));
    reduced.insert("gasLimit".to_string(), Value::Integer(0));
    reduced.insert("gasPrice".to_string(), Value::Integer(0));
    for section in ["constants", "resultSchema"] {
        if let Some(value) = manifest.root().get(section) {
            reduced.insert(section.to_string(), value.clone());
        }
    }
    let reduced = Manifest::from_value(Value::Object(reduced))?;
    let resolved = resolve(&reduced, &BTreeMap::new())?;
    let schema = ResultSchema::from_manifest(&reduced, &resolved)?;

    let results = decode_results(&bytes, &schema).context("result buffer does not decode")?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Reads a manifest, strips `$keyset` directives (loading their
/// bundles), and applies `--file` constant bindings.
fn load_manifest(
    path: &Path,
    file_bindings: &[String],
) -> Result<(Manifest, BTreeMap<String, Signer>)> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let parsed: serde_json::Value = serde_json::from_str(&json)
        .with_context(|| format!("manifest {} is not valid JSON", path.display()))?;
    let tree = Value::from_json(&parsed)
        .with_context(|| format!("manifest {} has unsupported values", path.display()))?;
    let Value::Object(mut root) = tree else {
        bail!("manifest {} must be a JSON object", path.display());
    };

    let base_dir = path.parent().unwrap_or(Path::new("."));
    let signers = keyfiles::strip_keyset_directives(&mut root, base_dir)?;

    for binding in file_bindings {
        let (name, file_path) = parse_binding(binding)
            .with_context(|| format!("--file {binding:?} is not name=path"))?;
        keyfiles::bind_file_constant(&mut root, name, file_path)?;
    }

    Ok((Manifest::from_value(Value::Object(root))?, signers))
}

fn parse_prev_hash(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str.strip_prefix("0x").unwrap_or(hex_str))
        .context("--prev-hash is not valid hex")?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("--prev-hash must be 32 bytes, got {}", bytes.len()))?;
    Ok(arr)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lea_protocol::crypto::scheme::falcon512_generate;

    fn write_keyfile(dir: &Path, name: &str, seed: u8) -> std::path::PathBuf {
        let ed_seed = [seed; 32];
        let ed_pk = ed25519_dalek::SigningKey::from_bytes(&ed_seed)
            .verifying_key()
            .to_bytes();
        let (fal_pk, fal_sk) = falcon512_generate();
        let path = dir.join(name);
        fs::write(
            &path,
            serde_json::to_string(&serde_json::json!({
                "keyset": [[ed_seed.to_vec(), ed_pk.to_vec()], [fal_sk, fal_pk]]
            }))
            .unwrap(),
        )
        .unwrap();
        path
    }

    fn write_manifest(dir: &Path, name: &str, body: &serde_json::Value) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(body).unwrap()).unwrap();
        path
    }

    #[test]
    fn package_then_verify_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let keyfile = write_keyfile(dir.path(), "owner.json", 51);
        let manifest_path = write_manifest(
            dir.path(),
            "tx.json",
            &serde_json::json!({
                "sequence": 1, "gasLimit": 1000, "gasPrice": 1,
                "feePayer": "owner",
                "invocations": [{
                    "targetAddress": "$addr(owner)",
                    "instructions": [{"INLINE": "$pubset(owner)"}]
                }]
            }),
        );

        let args = PackageArgs {
            manifest: manifest_path.clone(),
            signers: vec![format!("owner={}", keyfile.display())],
            files: vec![],
            outfile: None,
            prev_hash: None,
            no_chain: false,
        };
        package(&args).unwrap();

        let outfile = dir.path().join("tx.tx.bin");
        assert!(outfile.exists(), "default outfile convention");

        verify(&VerifyArgs {
            transaction: outfile.clone(),
            manifest: Some(manifest_path.clone()),
            strip_vm_header: false,
        })
        .unwrap();

        decode(&DecodeArgs {
            transaction: outfile.clone(),
            manifest: Some(manifest_path),
            outfile: Some(dir.path().join("decoded.json")),
            strip_vm_header: false,
        })
        .unwrap();
        let decoded_json = fs::read_to_string(dir.path().join("decoded.json")).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(&decoded_json).unwrap();
        assert_eq!(decoded["transaction"]["sequence"], 1);
        assert!(decoded["txId"].is_string());
    }

    #[test]
    fn package_fails_without_keyfile_for_alias() {
        let dir = tempfile::tempdir().unwrap();
        let manifest_path = write_manifest(
            dir.path(),
            "tx.json",
            &serde_json::json!({
                "sequence": 1, "gasLimit": 1, "gasPrice": 1,
                "feePayer": "owner", "invocations": []
            }),
        );
        let err = package(&PackageArgs {
            manifest: manifest_path,
            signers: vec![],
            files: vec![],
            outfile: None,
            prev_hash: None,
            no_chain: false,
        })
        .unwrap_err();
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn file_binding_feeds_vector_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let keyfile = write_keyfile(dir.path(), "owner.json", 52);
        let blob = dir.path().join("payload.bin");
        fs::write(&blob, [0xde, 0xad]).unwrap();
        let manifest_path = write_manifest(
            dir.path(),
            "tx.json",
            &serde_json::json!({
                "sequence": 1, "gasLimit": 1, "gasPrice": 1,
                "feePayer": "owner",
                "invocations": [{
                    "targetAddress": "$addr(owner)",
                    "instructions": [{"vector": "$const(payload)"}]
                }]
            }),
        );
        package(&PackageArgs {
            manifest: manifest_path,
            signers: vec![format!("owner={}", keyfile.display())],
            files: vec![format!("payload={}", blob.display())],
            outfile: Some(dir.path().join("out.bin")),
            prev_hash: None,
            no_chain: false,
        })
        .unwrap();
        assert!(dir.path().join("out.bin").exists());
    }

    #[test]
    fn prev_hash_validation() {
        assert!(parse_prev_hash(&"ab".repeat(32)).is_ok());
        assert!(parse_prev_hash("abcd").is_err());
        assert!(parse_prev_hash("not-hex").is_err());
    }
}
