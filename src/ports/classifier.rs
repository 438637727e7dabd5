//! Classifier port: Trait for binary CIC image classification.
//!
//! This trait abstracts the model runtime from the application logic so the
//! analysis pipeline can run against the native CNN adapter or a test fake.

use crate::domain::{ImageTensor, CLASSIFIER_INPUT_SIZE};

/// Errors that can occur while classifying an image.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    /// The model could not be loaded; no analysis is possible.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// The tensor did not match what the model expects.
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Trait for a loaded, read-only binary image classifier.
///
/// Implementations must be safe to share across threads; `predict` takes
/// `&self` and must not mutate model state.
pub trait Classifier: Send + Sync {
    /// Side length of the square input the model expects.
    fn input_size(&self) -> u32 {
        CLASSIFIER_INPUT_SIZE
    }

    /// Probability of the positive (CIC) class for a batched tensor of shape
    /// `(1, input_size, input_size, 3)`.
    ///
    /// # Errors
    /// Returns `ClassifierError::Inference` if the tensor shape is wrong.
    fn predict(&self, tensor: &ImageTensor) -> Result<f64, ClassifierError>;
}
