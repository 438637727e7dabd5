//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the analysis use case.

mod analysis;
mod echo;

pub use analysis::AnalysisService;
pub use echo::EchoSimulator;
