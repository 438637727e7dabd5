//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and the model runtime.

mod classifier;

pub use classifier::{Classifier, ClassifierError};
