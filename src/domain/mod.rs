//! Domain layer: Core business types and logic.
//!
//! Pure types with no I/O. The risk rule engine lives here because it is a
//! total function of the patient record.

mod analysis;
mod patient;
mod risk;
mod tensor;

pub use analysis::{clamp_probability, AnalysisResult, EchoMetrics, HEART_SIZE_RANGE, LVEF_RANGE};
pub use patient::{
    CancerStage, ChemoDrug, PatientRecord, PatientRecordBuilder, PatientRecordInput, Symptoms,
    UnknownOption, YesNo, AGE_RANGE, DEFAULT_AGE, DEFAULT_TOTAL_DOSE, MIN_TOTAL_DOSE,
};
pub use risk::{assess_risk, risk_factor_count, RiskCategory, RiskFactors, HIGH_RISK_THRESHOLD};
pub use tensor::{
    Batching, ImageTensor, TensorShapeError, CHANNELS, CLASSIFIER_INPUT_SIZE, ECHO_INPUT_SIZE,
};
