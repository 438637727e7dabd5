//! Simulated echocardiographic metrics.
//!
//! Placeholder for a real measurement model: the tensor is accepted (so the
//! call site already supplies what a measurement model would need) but its
//! content is not inspected.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{EchoMetrics, ImageTensor, HEART_SIZE_RANGE, LVEF_RANGE};

/// Draws LVEF and heart size uniformly from their fixed ranges.
#[derive(Debug, Clone)]
pub struct EchoSimulator<R: Rng = StdRng> {
    rng: R,
}

impl EchoSimulator<StdRng> {
    /// Generator seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible generator.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> EchoSimulator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Draw one `(lvef, heart_size)` pair. The image is not inspected.
    pub fn simulate(&mut self, _tensor: &ImageTensor) -> EchoMetrics {
        EchoMetrics {
            lvef: self.rng.gen_range(LVEF_RANGE),
            heart_size: self.rng.gen_range(HEART_SIZE_RANGE),
        }
    }
}
