//! Keyfile loading and manifest pre-processing.
//!
//! Two conveniences live here, both outside the manifest language proper:
//!
//! - `$keyset(path)` — a manifest's `signers` field may reference a
//!   bundle file (`{"alias": <keyfile>, ...}`) instead of listing
//!   aliases. The directive is stripped before resolution and the loaded
//!   keysets merge with any `--signer` flags.
//! - `--file name=path` — binds a constant to the raw bytes of a file,
//!   so `$const(name)` can splice file content into an instruction.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use lea_protocol::manifest::Value;
use lea_protocol::{Keyfile, Signer};

/// Loads and validates a single signer keyfile.
pub fn load_signer(path: &Path) -> Result<Signer> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read keyfile {}", path.display()))?;
    let keyfile: Keyfile = serde_json::from_str(&json)
        .with_context(|| format!("keyfile {} is not valid JSON", path.display()))?;
    Signer::load(&keyfile).with_context(|| format!("invalid keyset in {}", path.display()))
}

/// Strips `$keyset(path)` directives from the manifest's `signers` field
/// and loads the referenced bundles. The field is rewritten to a plain
/// alias array; returns the signers loaded from bundles.
///
/// Relative bundle paths resolve against `base_dir` (the manifest's
/// directory), not the current working directory — a manifest should
/// mean the same thing wherever you invoke the CLI from.
pub fn strip_keyset_directives(
    root: &mut BTreeMap<String, Value>,
    base_dir: &Path,
) -> Result<BTreeMap<String, Signer>> {
    let Some(signers_field) = root.get("signers").cloned() else {
        return Ok(BTreeMap::new());
    };

    let mut loaded = BTreeMap::new();
    let mut aliases: Vec<Value> = Vec::new();

    let mut handle_entry = |entry: &Value,
                            loaded: &mut BTreeMap<String, Signer>,
                            aliases: &mut Vec<Value>|
     -> Result<()> {
        match entry {
            Value::Text(text) => {
                if let Some(path) = parse_keyset_directive(text) {
                    for (alias, signer) in load_bundle(&resolve_path(base_dir, &path))? {
                        aliases.push(Value::Text(alias.clone()));
                        loaded.insert(alias, signer);
                    }
                } else {
                    aliases.push(entry.clone());
                }
                Ok(())
            }
            other => bail!("signers entries must be strings, got {}", other.kind_name()),
        }
    };

    match &signers_field {
        Value::Text(_) => handle_entry(&signers_field, &mut loaded, &mut aliases)?,
        Value::Array(entries) => {
            for entry in entries {
                handle_entry(entry, &mut loaded, &mut aliases)?;
            }
        }
        other => bail!("signers must be a string or an array, got {}", other.kind_name()),
    }

    root.insert("signers".to_string(), Value::Array(aliases));
    Ok(loaded)
}

/// Matches `$keyset(path)` over the whole string.
fn parse_keyset_directive(text: &str) -> Option<String> {
    let inner = text.strip_prefix("$keyset(")?.strip_suffix(')')?;
    if inner.is_empty() {
        return None;
    }
    Some(inner.to_string())
}

fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Loads a `{"alias": <keyfile>, ...}` bundle.
fn load_bundle(path: &Path) -> Result<BTreeMap<String, Signer>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read keyset bundle {}", path.display()))?;
    let bundle: BTreeMap<String, Keyfile> = serde_json::from_str(&json)
        .with_context(|| format!("keyset bundle {} is not valid JSON", path.display()))?;
    bundle
        .into_iter()
        .map(|(alias, keyfile)| {
            let signer = Signer::load(&keyfile)
                .with_context(|| format!("invalid keyset {alias:?} in {}", path.display()))?;
            Ok((alias, signer))
        })
        .collect()
}

/// Binds `--file name=path` contents as a `Bytes` constant in the
/// manifest tree.
pub fn bind_file_constant(
    root: &mut BTreeMap<String, Value>,
    name: &str,
    path: &Path,
) -> Result<()> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read --file {} ({})", name, path.display()))?;
    let constants = root
        .entry("constants".to_string())
        .or_insert_with(|| Value::Object(BTreeMap::new()));
    let Value::Object(constants) = constants else {
        bail!("manifest constants must be an object, got {}", constants.kind_name());
    };
    constants.insert(name.to_string(), Value::Bytes(bytes));
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lea_protocol::crypto::scheme::falcon512_generate;

    fn keyfile_json() -> String {
        let seed = [77u8; 32];
        let ed_pk = ed25519_dalek::SigningKey::from_bytes(&seed)
            .verifying_key()
            .to_bytes();
        let (fal_pk, fal_sk) = falcon512_generate();
        serde_json::to_string(&serde_json::json!({
            "keyset": [[seed.to_vec(), ed_pk.to_vec()], [fal_sk, fal_pk]]
        }))
        .unwrap()
    }

    #[test]
    fn loads_single_keyfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sender.json");
        fs::write(&path, keyfile_json()).unwrap();
        let signer = load_signer(&path).unwrap();
        assert_eq!(signer.public_keyset().ed25519.len(), 32);
    }

    #[test]
    fn strips_keyset_directive_and_loads_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle_path = dir.path().join("keys.json");
        let keyfile: serde_json::Value = serde_json::from_str(&keyfile_json()).unwrap();
        fs::write(
            &bundle_path,
            serde_json::to_string(&serde_json::json!({"sender": keyfile})).unwrap(),
        )
        .unwrap();

        let mut root = BTreeMap::new();
        root.insert(
            "signers".to_string(),
            Value::Text("$keyset(keys.json)".to_string()),
        );
        let loaded = strip_keyset_directives(&mut root, dir.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("sender"));
        // The directive is gone; only the alias remains.
        assert_eq!(
            root["signers"],
            Value::Array(vec![Value::Text("sender".to_string())])
        );
    }

    #[test]
    fn keeps_plain_aliases() {
        let mut root = BTreeMap::new();
        root.insert(
            "signers".to_string(),
            Value::Array(vec![Value::Text("alice".to_string())]),
        );
        let loaded = strip_keyset_directives(&mut root, Path::new(".")).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(
            root["signers"],
            Value::Array(vec![Value::Text("alice".to_string())])
        );
    }

    #[test]
    fn missing_signers_field_is_fine() {
        let mut root = BTreeMap::new();
        assert!(strip_keyset_directives(&mut root, Path::new(".")).unwrap().is_empty());
        assert!(!root.contains_key("signers"));
    }

    #[test]
    fn binds_file_bytes_as_constant() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("payload.bin");
        fs::write(&blob, [1u8, 2, 3]).unwrap();

        let mut root = BTreeMap::new();
        bind_file_constant(&mut root, "payload", &blob).unwrap();
        let Value::Object(constants) = &root["constants"] else {
            panic!("constants must be an object");
        };
        assert_eq!(constants["payload"], Value::Bytes(vec![1, 2, 3]));
    }
}
