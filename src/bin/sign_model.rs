//! Signs a CIC classifier model directory.
//!
//! Writes `manifest.json` (SHA-256 of every bound file plus an anti-rollback
//! serial) and `model.sig` (Ed25519 signature over the manifest bytes).
//!
//! ```bash
//! CARDIOGUARD_MODEL_SIGNING_KEY_B64_FILE=keys/seed.b64 \
//!     cargo run --bin sign_model -- models --serial 42
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use clap::Parser;
use ed25519_dalek::{Signature, Signer, SigningKey};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use cardioguard::adapters::cnn::signature::{SignedModelManifest, MANIFEST_FILE, SIGNATURE_FILE};
use cardioguard::adapters::cnn::MODEL_FILE;

const KEY_FILE_ENV: &str = "CARDIOGUARD_MODEL_SIGNING_KEY_B64_FILE";
const DOCKER_SECRET_PATH: &str = "/run/secrets/cardioguard_model_signing_key_b64";
const DEV_KEY_ENV: &str = "CARDIOGUARD_MODEL_SIGNING_KEY_B64";

#[derive(Debug, Parser)]
#[command(name = "sign_model", about = "Sign a CIC classifier model directory")]
struct Args {
    /// Model directory, or the model file inside it
    model_dir: PathBuf,

    /// Anti-rollback serial (defaults to the current unix time)
    #[arg(long)]
    serial: Option<u64>,

    /// Extra files in the directory to bind into the manifest
    #[arg(long = "bind")]
    extra: Vec<String>,
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn non_empty(raw: &str) -> Result<Zeroizing<String>> {
    let secret = raw.trim_end_matches(['\n', '\r']).to_string();
    if secret.is_empty() {
        bail!("Empty signing key");
    }
    Ok(Zeroizing::new(secret))
}

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    if let Ok(path) = env::var(KEY_FILE_ENV) {
        let content = Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?,
        );
        return non_empty(&content);
    }

    if Path::new(DOCKER_SECRET_PATH).exists() {
        let content = Zeroizing::new(
            fs::read_to_string(DOCKER_SECRET_PATH).context("Failed reading docker secret")?,
        );
        return non_empty(&content);
    }

    // Dev-only fallback.
    if cfg!(debug_assertions) {
        if let Ok(v) = env::var(DEV_KEY_ENV) {
            return non_empty(&v);
        }
    }

    bail!(
        "Missing signing key. Provide {KEY_FILE_ENV} or {DOCKER_SECRET_PATH} \
         ({DEV_KEY_ENV} is accepted only in debug builds)."
    )
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .context("Invalid base64 in signing key")?,
    );
    if raw.len() != 32 {
        bail!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        );
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&raw);
    Ok(Seed(seed))
}

/// Public key in the form `CARDIOGUARD_MODEL_SIGNING_PUBKEY_B64_FILE` expects.
fn public_key_b64(signing_key: &SigningKey) -> String {
    general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let model_dir = if args.model_dir.is_file() {
        args.model_dir
            .parent()
            .context("Model path has no parent directory")?
            .to_path_buf()
    } else {
        args.model_dir
    };

    if !model_dir.join(MODEL_FILE).exists() {
        bail!("No {MODEL_FILE} found in {model_dir:?}");
    }

    let mut files: Vec<&str> = vec![MODEL_FILE];
    for extra in &args.extra {
        if extra == MANIFEST_FILE || extra == SIGNATURE_FILE {
            bail!("Refusing to bind {extra} into its own manifest");
        }
        if !files.contains(&extra.as_str()) {
            files.push(extra.as_str());
        }
    }

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let mut manifest = SignedModelManifest::for_files(&model_dir, &files, 0)?;
    manifest.serial = args
        .serial
        .unwrap_or_else(|| u64::try_from(manifest.created_at).unwrap_or(1).max(1));

    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;
    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let sig: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, sig.to_bytes())
        .with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?} (serial {})", manifest.serial);
    println!("Wrote signature: {sig_path:?}");
    println!("Public key (base64)={}", public_key_b64(&signing_key));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardioguard::adapters::cnn::signature::verifying_key_from_b64;

    #[test]
    fn test_printed_public_key_is_accepted_by_loader() {
        let signing_key = SigningKey::from_bytes(&[9u8; 32]);
        let printed = public_key_b64(&signing_key);
        let parsed = verifying_key_from_b64(&printed).expect("Should parse");
        assert_eq!(parsed, signing_key.verifying_key());
    }
}
