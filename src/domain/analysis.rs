//! Analysis result types.
//!
//! Represents the combined output of one CIC analysis run.

use serde::{Deserialize, Serialize};

use super::risk::RiskCategory;

/// Range of the simulated left ventricular ejection fraction, in percent.
pub const LVEF_RANGE: std::ops::Range<u32> = 40..60;

/// Range of the simulated heart size, in millimetres.
pub const HEART_SIZE_RANGE: std::ops::Range<u32> = 50..70;

/// Simulated echocardiographic measurements.
///
/// These are placeholders drawn at random, not measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoMetrics {
    /// Left ventricular ejection fraction (%)
    pub lvef: u32,
    /// Heart size (mm)
    pub heart_size: u32,
}

/// Result of one analysis invocation. Not mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Unique identifier
    pub id: String,

    /// Classifier probability of CIC (0.0 to 1.0)
    pub classifier_probability: f64,

    /// Rule-based risk category
    pub risk_category: RiskCategory,

    /// Number of rule-engine risk factors present (0 to 4)
    pub risk_factor_count: u8,

    /// Simulated LVEF (%)
    pub simulated_lvef: u32,

    /// Simulated heart size (mm)
    pub simulated_heart_size: u32,

    /// Timestamp of the analysis
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AnalysisResult {
    /// Assemble a result. The probability is clamped into `[0, 1]`.
    #[must_use]
    pub fn new(
        classifier_probability: f64,
        risk_category: RiskCategory,
        risk_factor_count: u8,
        metrics: EchoMetrics,
    ) -> Self {
        Self {
            id: uuid_v4(),
            classifier_probability: clamp_probability(classifier_probability),
            risk_category,
            risk_factor_count,
            simulated_lvef: metrics.lvef,
            simulated_heart_size: metrics.heart_size,
            created_at: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn metrics(&self) -> EchoMetrics {
        EchoMetrics {
            lvef: self.simulated_lvef,
            heart_size: self.simulated_heart_size,
        }
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
#[must_use]
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Generate a UUID v4 string using ChaCha20Rng seeded from OS entropy.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_is_clamped() {
        let metrics = EchoMetrics {
            lvef: 45,
            heart_size: 60,
        };
        let r = AnalysisResult::new(1.7, RiskCategory::LowRisk, 0, metrics);
        assert!((r.classifier_probability - 1.0).abs() < f64::EPSILON);

        let r = AnalysisResult::new(f64::NAN, RiskCategory::LowRisk, 0, metrics);
        assert_eq!(r.classifier_probability, 0.0);

        assert_eq!(r.metrics(), metrics);
    }

    #[test]
    fn test_uuid_generation() {
        let id1 = uuid_v4();
        let id2 = uuid_v4();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
        assert_eq!(&id1[14..15], "4");
    }
}
