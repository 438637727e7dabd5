//! Report rendering for a finished analysis.

use std::fmt::Write as _;

use serde::Serialize;

use crate::domain::{AnalysisResult, PatientRecord};

pub const REPORT_TITLE: &str = "CardioGuardAI Report";

/// Result plus the record it was computed from, as written to JSON reports.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub title: &'static str,
    pub patient: &'a PatientRecord,
    pub analysis: &'a AnalysisResult,
}

impl<'a> Report<'a> {
    #[must_use]
    pub fn new(patient: &'a PatientRecord, analysis: &'a AnalysisResult) -> Self {
        Self {
            title: REPORT_TITLE,
            patient,
            analysis,
        }
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text report with the same sections as the printed document.
    #[must_use]
    pub fn to_text(&self) -> String {
        let a = self.analysis;
        let p = self.patient;
        let mut out = String::new();

        heading(&mut out, '=', self.title);
        let _ = writeln!(
            out,
            "Image Analysis: {:.2} (Probability of CIC)",
            a.classifier_probability
        );
        let _ = writeln!(out, "Patient Risk: {}", a.risk_category);
        let _ = writeln!(out, "Generated: {}", a.created_at.format("%Y-%m-%d %H:%M UTC"));
        out.push('\n');

        heading(&mut out, '-', "Patient Details");
        let _ = writeln!(out, "Age: {}", p.age());
        let _ = writeln!(out, "Chemo Drug: {}", p.chemo_drug());
        let _ = writeln!(out, "Total Dose: {}", p.total_dose());
        let _ = writeln!(out, "Hypertension: {}", p.hypertension());
        let _ = writeln!(out, "Diabetes: {}", p.diabetes());
        let _ = writeln!(out, "Symptoms: {}", p.symptoms());
        let _ = writeln!(out, "Cancer Stage: {}", p.cancer_stage());
        let _ = writeln!(out, "Cancer Free: {}", p.cancer_free());
        out.push('\n');

        heading(&mut out, '-', "Echocardiogram Analysis");
        let _ = writeln!(
            out,
            "Left Ventricular Ejection Fraction (Simulated): {}%",
            a.simulated_lvef
        );
        let _ = writeln!(out, "Heart Size (Simulated): {} mm", a.simulated_heart_size);
        out
    }
}

fn heading(out: &mut String, underline: char, text: &str) {
    out.push_str(text);
    out.push('\n');
    out.extend(std::iter::repeat(underline).take(text.chars().count()));
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CancerStage, EchoMetrics, RiskCategory, Symptoms, YesNo};

    fn fixture() -> (PatientRecord, AnalysisResult) {
        let record = PatientRecord::builder()
            .age(64)
            .total_dose(360)
            .hypertension(YesNo::Yes)
            .symptoms(Symptoms::SwellingInLegs)
            .cancer_stage(CancerStage::II)
            .build()
            .expect("Should build");
        let result = AnalysisResult::new(
            0.126,
            RiskCategory::HighRisk,
            2,
            EchoMetrics {
                lvef: 47,
                heart_size: 62,
            },
        );
        (record, result)
    }

    #[test]
    fn test_text_report_sections() {
        let (record, result) = fixture();
        let text = Report::new(&record, &result).to_text();

        assert!(text.starts_with("CardioGuardAI Report\n====================\n"));
        assert!(text.contains("Image Analysis: 0.13 (Probability of CIC)"));
        assert!(text.contains("Patient Risk: High Risk"));
        assert!(text.contains("Age: 64"));
        assert!(text.contains("Chemo Drug: Doxorubicin"));
        assert!(text.contains("Symptoms: Swelling in legs"));
        assert!(text.contains("Cancer Stage: Stage II"));
        assert!(text.contains("Left Ventricular Ejection Fraction (Simulated): 47%"));
        assert!(text.ends_with("Heart Size (Simulated): 62 mm\n"));
    }

    #[test]
    fn test_json_report_fields() {
        let (record, result) = fixture();
        let json = Report::new(&record, &result).to_json().expect("Should serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("Should parse");

        assert_eq!(value["title"], REPORT_TITLE);
        assert_eq!(value["patient"]["age"], 64);
        assert_eq!(value["patient"]["symptoms"], "SwellingInLegs");
        assert_eq!(value["analysis"]["risk_category"], "HighRisk");
        assert_eq!(value["analysis"]["simulated_lvef"], 47);
    }
}
