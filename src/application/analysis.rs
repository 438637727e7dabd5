//! Analysis service: Orchestrates one CIC analysis.
//!
//! This service coordinates:
//! - Image decoding and normalization (classifier and echo resolutions)
//! - Classification with the injected model
//! - Rule-based patient risk assessment
//! - Simulated echo metrics

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;

use crate::adapters::imaging;
use crate::domain::{
    assess_risk, clamp_probability, risk_factor_count, AnalysisResult, Batching, ImageTensor,
    PatientRecord, ECHO_INPUT_SIZE,
};
use crate::ports::Classifier;
use crate::CardioGuardError;

use super::echo::EchoSimulator;

/// Service for running the analysis pipeline.
///
/// The classifier is loaded once by the caller and shared read-only; the
/// echo simulator owns its random source, so `analyze` takes `&mut self`.
pub struct AnalysisService<C, R = StdRng>
where
    C: Classifier,
    R: Rng,
{
    classifier: Arc<C>,
    echo: EchoSimulator<R>,
}

impl<C, R> AnalysisService<C, R>
where
    C: Classifier,
    R: Rng,
{
    /// Create a new analysis service.
    pub fn new(classifier: Arc<C>, echo: EchoSimulator<R>) -> Self {
        Self { classifier, echo }
    }

    #[must_use]
    pub fn classifier(&self) -> &Arc<C> {
        &self.classifier
    }

    /// Probability of CIC for an already normalized, batched tensor,
    /// clamped into `[0, 1]` whatever the classifier returns.
    ///
    /// # Errors
    /// Returns `CardioGuardError::Inference` if the tensor shape is wrong.
    pub fn classify(&self, tensor: &ImageTensor) -> Result<f64, CardioGuardError> {
        Ok(clamp_probability(self.classifier.predict(tensor)?))
    }

    /// Run the full pipeline on raw image bytes and a validated record.
    ///
    /// The image is decoded and normalized at both resolutions before the
    /// classifier or the metric generator run, so an unreadable image fails
    /// without side effects.
    ///
    /// # Errors
    /// Returns `InvalidImage` for undecodable or empty images and
    /// `Inference` if the classifier rejects the tensor.
    pub fn analyze(
        &mut self,
        image_bytes: &[u8],
        record: &PatientRecord,
    ) -> Result<AnalysisResult, CardioGuardError> {
        tracing::info!("Starting analysis ({} image bytes)", image_bytes.len());

        // Step 1: Decode and normalize
        tracing::debug!("Step 1: Normalizing image...");
        let image = imaging::decode(image_bytes)?;
        let classifier_input =
            imaging::normalize(&image, self.classifier.input_size(), Batching::Batched)?;
        let echo_input = imaging::normalize(&image, ECHO_INPUT_SIZE, Batching::Unbatched)?;
        drop(image);

        // Step 2: Classify
        tracing::debug!("Step 2: Running classifier...");
        let probability = self.classify(&classifier_input)?;

        // Step 3: Rule-based risk
        tracing::debug!("Step 3: Assessing patient risk...");
        let risk_category = assess_risk(record);
        let factors = risk_factor_count(record);

        // Step 4: Simulated echo metrics
        tracing::debug!("Step 4: Simulating echo metrics...");
        let metrics = self.echo.simulate(&echo_input);

        let result = AnalysisResult::new(probability, risk_category, factors, metrics);

        tracing::info!(
            "Analysis complete: probability={:.2}, risk={}, factors={}",
            result.classifier_probability,
            result.risk_category,
            result.risk_factor_count
        );

        Ok(result)
    }
}
