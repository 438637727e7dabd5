//! Normalized image tensor handed to the classifier and metric generator.

use serde::Serialize;

/// Color channels per pixel (BGR order).
pub const CHANNELS: usize = 3;

/// Input resolution of the CIC classifier.
pub const CLASSIFIER_INPUT_SIZE: u32 = 128;

/// Resolution used by the echo metric generator.
pub const ECHO_INPUT_SIZE: u32 = 200;

/// Whether the tensor carries a leading batch dimension of 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Batching {
    /// `(1, size, size, 3)`
    Batched,
    /// `(size, size, 3)`
    Unbatched,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tensor data has {actual} values, expected {expected} for {size}x{size}x3")]
pub struct TensorShapeError {
    pub size: u32,
    pub expected: usize,
    pub actual: usize,
}

/// Square, 3-channel, `[0, 1]`-valued image tensor in row-major HWC layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    size: u32,
    batching: Batching,
    data: Vec<f32>,
}

impl ImageTensor {
    /// Wrap raw HWC data.
    ///
    /// # Errors
    /// Returns `TensorShapeError` if `data.len() != size * size * 3`.
    pub fn new(size: u32, batching: Batching, data: Vec<f32>) -> Result<Self, TensorShapeError> {
        let expected = (size as usize) * (size as usize) * CHANNELS;
        if data.len() != expected {
            return Err(TensorShapeError {
                size,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            size,
            batching,
            data,
        })
    }

    /// Side length in pixels.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn batching(&self) -> Batching {
        self.batching
    }

    /// Shape including the batch dimension when present.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        let side = self.size as usize;
        match self.batching {
            Batching::Batched => vec![1, side, side, CHANNELS],
            Batching::Unbatched => vec![side, side, CHANNELS],
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at row `y`, column `x`, channel `c`.
    #[must_use]
    pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f32> {
        let side = self.size as usize;
        if y >= side || x >= side || c >= CHANNELS {
            return None;
        }
        self.data.get((y * side + x) * CHANNELS + c).copied()
    }
}
