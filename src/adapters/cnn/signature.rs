//! Model integrity: signed manifest verification.
//!
//! A model directory carries `manifest.json`, which lists the SHA-256 of every
//! bound file, and `model.sig`, an Ed25519 signature over the exact manifest
//! bytes. The loader only reads files the verified manifest binds.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

/// Allowed clock skew for `created_at` in the future, in seconds.
const MAX_CLOCK_SKEW_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Model signature not found in {0}")]
    Missing(String),

    #[error("Invalid model signature")]
    BadSignature,

    #[error("Invalid verifying key: {0}")]
    BadKey(String),

    #[error("Invalid manifest: {0}")]
    BadManifest(String),

    #[error("Manifest references missing/unreadable file {path}: {reason}")]
    MissingFile { path: String, reason: String },

    #[error("File hash mismatch for {0}")]
    HashMismatch(String),
}

/// Signed list of model files and their digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedModelManifest {
    pub version: u32,
    /// Monotonic serial number, typically a build number.
    pub serial: u64,
    /// Unix timestamp (seconds) when the manifest was created.
    pub created_at: i64,
    /// Relative path → lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

impl SignedModelManifest {
    /// Build a manifest binding `files` (relative to `dir`).
    ///
    /// # Errors
    /// Returns `SignatureError::MissingFile` if a file cannot be read.
    pub fn for_files(dir: &Path, files: &[&str], serial: u64) -> Result<Self, SignatureError> {
        let mut map = BTreeMap::new();
        for rel in files {
            let path = dir.join(rel);
            let bytes = fs::read(&path).map_err(|e| SignatureError::MissingFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            map.insert((*rel).to_string(), sha256_hex(&bytes));
        }
        Ok(Self {
            version: 1,
            serial,
            created_at: unix_now(),
            files: map,
        })
    }

    #[must_use]
    pub fn binds(&self, rel: &str) -> bool {
        self.files.contains_key(rel)
    }
}

/// Lowercase hex SHA-256 digest.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Parse a base64-encoded 32-byte Ed25519 public key.
///
/// # Errors
/// Returns `SignatureError::BadKey` on bad base64, length or curve point.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, SignatureError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| SignatureError::BadKey("invalid base64".into()))?;
    let key: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::BadKey(format!("expected 32 bytes, got {}", bytes.len())))?;
    VerifyingKey::from_bytes(&key).map_err(|e| SignatureError::BadKey(e.to_string()))
}

/// Whether a signature and manifest are present in `dir`.
#[must_use]
pub fn is_signed(dir: &Path) -> bool {
    dir.join(SIGNATURE_FILE).exists() && dir.join(MANIFEST_FILE).exists()
}

/// Verify the signature over `manifest.json` and every file hash it lists.
///
/// # Errors
/// Returns `SignatureError` if anything is missing, malformed, unsigned by
/// `key`, or if any bound file's hash differs.
pub fn verify_model_dir(dir: &Path, key: &VerifyingKey) -> Result<SignedModelManifest, SignatureError> {
    if !is_signed(dir) {
        return Err(SignatureError::Missing(dir.display().to_string()));
    }

    let sig_bytes = fs::read(dir.join(SIGNATURE_FILE))
        .map_err(|e| SignatureError::BadManifest(format!("failed to read signature: {e}")))?;
    let sig: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| SignatureError::BadManifest("signature must be 64 bytes".into()))?;
    let signature = Signature::from_bytes(&sig);

    let manifest_bytes = fs::read(dir.join(MANIFEST_FILE))
        .map_err(|e| SignatureError::BadManifest(format!("failed to read manifest: {e}")))?;
    key.verify(&manifest_bytes, &signature)
        .map_err(|_| SignatureError::BadSignature)?;

    let manifest: SignedModelManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| SignatureError::BadManifest(e.to_string()))?;
    if manifest.version != 1 {
        return Err(SignatureError::BadManifest(format!(
            "unsupported version {}",
            manifest.version
        )));
    }
    if manifest.created_at > unix_now() + MAX_CLOCK_SKEW_SECS {
        return Err(SignatureError::BadManifest("created_at is in the future".into()));
    }
    if manifest.files.is_empty() {
        return Err(SignatureError::BadManifest("no files listed".into()));
    }

    for (rel, expected_hex) in &manifest.files {
        if Path::new(rel).is_absolute() || rel.contains("..") {
            return Err(SignatureError::BadManifest(format!(
                "file path escapes model directory: {rel}"
            )));
        }
        let path = dir.join(rel);
        let bytes = fs::read(&path).map_err(|e| SignatureError::MissingFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if !constant_time_eq_str(&sha256_hex(&bytes), expected_hex) {
            return Err(SignatureError::HashMismatch(rel.clone()));
        }
    }

    tracing::info!(
        "Model signature and hashes verified (serial={}, files={})",
        manifest.serial,
        manifest.files.len()
    );
    Ok(manifest)
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
