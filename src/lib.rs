//! # CardioGuard
//!
//! Decision support for Chemotherapy-Induced Cardiomyopathy (CIC) screening.
//!
//! This crate provides:
//! - Echocardiogram image normalization and CNN classification
//! - A rule-based patient risk score
//! - Simulated echo metrics (LVEF, heart size)
//! - A command-line front end with text and JSON reports
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (PatientRecord, RiskCategory, AnalysisResult) and the risk rules
//! - `ports`: Trait definitions for external operations (Classifier)
//! - `adapters`: Concrete implementations (CNN runtime, image decoding, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports
//! - `cli`: Command-line presentation layer and report rendering

pub mod adapters;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{AnalysisResult, PatientRecord, RiskCategory};

/// Result type for CardioGuard operations
pub type Result<T> = std::result::Result<T, CardioGuardError>;

/// Main error type for CardioGuard
#[derive(Debug, thiserror::Error)]
pub enum CardioGuardError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] adapters::imaging::ImageError),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid patient record: {}", .0.join("; "))]
    InvalidPatientRecord(Vec<String>),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ports::ClassifierError> for CardioGuardError {
    fn from(e: ports::ClassifierError) -> Self {
        match e {
            ports::ClassifierError::ModelUnavailable(msg) => Self::ModelUnavailable(msg),
            ports::ClassifierError::Inference(msg) => Self::Inference(msg),
        }
    }
}
