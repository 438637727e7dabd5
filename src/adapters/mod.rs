//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `cnn`: native CNN forward pass with signed model loading
//! - `imaging`: image decoding and normalization (`image`)
//! - `sanitize`: PII filtering for logs

pub mod cnn;
pub mod imaging;
pub mod sanitize;

pub use cnn::{CnnClassifier, LoadOptions};
pub use imaging::ImageError;
