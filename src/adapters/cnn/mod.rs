//! CNN adapter: Implementation of `Classifier` using a native forward pass.
//!
//! Loads the exported CIC network (`cic_cnn.json`) once at startup and keeps
//! it read-only for the lifetime of the process.
//!
//! # Security
//!
//! - Model files are verified via a signed manifest (Ed25519 + SHA-256)
//! - Only files bound by the verified manifest are read
//! - Unsigned models load only in debug builds, and only when explicitly
//!   allowed (`CARDIOGUARD_ALLOW_UNSIGNED_MODELS=true`)

mod network;
pub mod signature;

use std::path::Path;

use ed25519_dalek::VerifyingKey;

use crate::domain::{clamp_probability, Batching, ImageTensor, CHANNELS};
use crate::ports::{Classifier, ClassifierError};

pub use network::{Activation, LayerError, LayerSpec, ModelSpec, Network, FORMAT_VERSION};
pub use signature::{SignatureError, SignedModelManifest};

/// File name of the exported network inside the model directory.
pub const MODEL_FILE: &str = "cic_cnn.json";

/// How model integrity is checked at load time.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Key the manifest must be signed with.
    pub verifying_key: Option<VerifyingKey>,
    /// Accept a directory without signature files. Ignored in release builds.
    pub allow_unsigned: bool,
}

impl LoadOptions {
    #[must_use]
    pub fn signed(key: VerifyingKey) -> Self {
        Self {
            verifying_key: Some(key),
            allow_unsigned: false,
        }
    }

    #[must_use]
    pub fn unsigned() -> Self {
        Self {
            verifying_key: None,
            allow_unsigned: true,
        }
    }

    fn unsigned_permitted(&self) -> bool {
        cfg!(debug_assertions) && self.allow_unsigned
    }
}

/// Binary CIC classifier backed by a validated [`Network`].
#[derive(Debug, Clone)]
pub struct CnnClassifier {
    network: Network,
    serial: Option<u64>,
}

impl CnnClassifier {
    /// Load and verify the model from `model_dir`.
    ///
    /// # Errors
    /// Returns `ClassifierError::ModelUnavailable` if the signature check
    /// fails, the file cannot be read or parsed, or the layer shapes do not
    /// line up.
    pub fn load(model_dir: &Path, options: &LoadOptions) -> Result<Self, ClassifierError> {
        let unavailable = |reason: String| ClassifierError::ModelUnavailable(reason);

        let serial = if signature::is_signed(model_dir) {
            let key = options.verifying_key.as_ref().ok_or_else(|| {
                unavailable("model is signed but no verifying key is configured".into())
            })?;
            let manifest = signature::verify_model_dir(model_dir, key)
                .map_err(|e| unavailable(e.to_string()))?;
            if !manifest.binds(MODEL_FILE) {
                return Err(unavailable(format!("manifest does not bind {MODEL_FILE}")));
            }
            Some(manifest.serial)
        } else if options.unsigned_permitted() {
            tracing::warn!(
                "Loading UNSIGNED model from {:?}. This is only allowed in debug builds.",
                model_dir
            );
            None
        } else {
            return Err(unavailable(
                SignatureError::Missing(model_dir.display().to_string()).to_string(),
            ));
        };

        let model_path = model_dir.join(MODEL_FILE);
        let content = std::fs::read(&model_path)
            .map_err(|e| unavailable(format!("failed to read {}: {e}", model_path.display())))?;
        let spec: ModelSpec = serde_json::from_slice(&content)
            .map_err(|e| unavailable(format!("invalid model file: {e}")))?;

        let mut classifier = Self::from_spec(spec)?;
        classifier.serial = serial;

        tracing::info!(
            "Loaded model '{}' from {:?} (layers={}, parameters={}, signed={})",
            classifier.network.name(),
            model_path,
            classifier.network.layer_count(),
            classifier.network.parameter_count(),
            serial.is_some()
        );
        Ok(classifier)
    }

    /// Build from an in-memory model description.
    ///
    /// # Errors
    /// Returns `ClassifierError::ModelUnavailable` if the layers are
    /// inconsistent or the input is not square RGB.
    pub fn from_spec(spec: ModelSpec) -> Result<Self, ClassifierError> {
        let network = Network::from_spec(spec)
            .map_err(|e| ClassifierError::ModelUnavailable(format!("invalid network: {e}")))?;

        let (h, w, c) = network.input_shape();
        if h != w || c != CHANNELS {
            return Err(ClassifierError::ModelUnavailable(format!(
                "model input must be square with {CHANNELS} channels, got ({h}, {w}, {c})"
            )));
        }

        Ok(Self {
            network,
            serial: None,
        })
    }

    #[must_use]
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Manifest serial when the model was loaded signed.
    #[must_use]
    pub fn serial(&self) -> Option<u64> {
        self.serial
    }
}

impl Classifier for CnnClassifier {
    fn input_size(&self) -> u32 {
        self.network.input_shape().0 as u32
    }

    fn predict(&self, tensor: &ImageTensor) -> Result<f64, ClassifierError> {
        if tensor.batching() != Batching::Batched || tensor.size() != self.input_size() {
            return Err(ClassifierError::Inference(format!(
                "expected tensor of shape [1, {size}, {size}, {CHANNELS}], got {:?}",
                tensor.shape(),
                size = self.input_size()
            )));
        }

        let output = self.network.forward(tensor.as_slice()).ok_or_else(|| {
            ClassifierError::Inference("forward pass rejected the input".into())
        })?;

        tracing::debug!("Classifier raw output: {:.4}", output);
        Ok(clamp_probability(f64::from(output)))
    }
}
