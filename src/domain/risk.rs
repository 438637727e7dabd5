//! Rule-based patient risk classification.
//!
//! Four binary risk factors, one point each; two or more points is high risk.

use serde::{Deserialize, Serialize};

use super::patient::{CancerStage, PatientRecord, Symptoms};

/// Number of risk factors at or above which a patient is high risk.
pub const HIGH_RISK_THRESHOLD: u8 = 2;

/// Coarse risk category derived from the patient record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    /// Two or more risk factors present
    HighRisk,
    /// Fewer than two risk factors present
    LowRisk,
}

impl RiskCategory {
    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::HighRisk => "High risk - Cardio-oncology follow-up advised",
            Self::LowRisk => "Low risk - Routine monitoring",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighRisk => write!(f, "High Risk"),
            Self::LowRisk => write!(f, "Low Risk"),
        }
    }
}

/// Which of the four risk factors a record presents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskFactors {
    pub hypertension: bool,
    pub diabetes: bool,
    pub cardiac_symptoms: bool,
    pub advanced_stage: bool,
}

impl RiskFactors {
    #[must_use]
    pub fn of(record: &PatientRecord) -> Self {
        Self {
            hypertension: record.hypertension().is_yes(),
            diabetes: record.diabetes().is_yes(),
            cardiac_symptoms: matches!(
                record.symptoms(),
                Symptoms::ShortnessOfBreath | Symptoms::SwellingInLegs
            ),
            advanced_stage: matches!(record.cancer_stage(), CancerStage::III | CancerStage::IV),
        }
    }

    /// Score in `0..=4`.
    #[must_use]
    pub fn count(&self) -> u8 {
        [
            self.hypertension,
            self.diabetes,
            self.cardiac_symptoms,
            self.advanced_stage,
        ]
        .into_iter()
        .map(u8::from)
        .sum()
    }

    #[must_use]
    pub fn category(&self) -> RiskCategory {
        if self.count() >= HIGH_RISK_THRESHOLD {
            RiskCategory::HighRisk
        } else {
            RiskCategory::LowRisk
        }
    }
}

/// Number of risk factors present in the record.
#[must_use]
pub fn risk_factor_count(record: &PatientRecord) -> u8 {
    RiskFactors::of(record).count()
}

/// Classify a patient record. Pure and total.
#[must_use]
pub fn assess_risk(record: &PatientRecord) -> RiskCategory {
    RiskFactors::of(record).category()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patient::{ChemoDrug, YesNo};

    fn record(
        hypertension: YesNo,
        diabetes: YesNo,
        symptoms: Symptoms,
        stage: CancerStage,
    ) -> PatientRecord {
        PatientRecord::builder()
            .hypertension(hypertension)
            .diabetes(diabetes)
            .symptoms(symptoms)
            .cancer_stage(stage)
            .build()
            .expect("Should build")
    }

    #[test]
    fn test_two_comorbidities_is_high_risk() {
        let r = record(YesNo::Yes, YesNo::Yes, Symptoms::None, CancerStage::I);
        assert_eq!(risk_factor_count(&r), 2);
        assert_eq!(assess_risk(&r), RiskCategory::HighRisk);
    }

    #[test]
    fn test_other_symptoms_and_stage_two_score_nothing() {
        let r = record(YesNo::No, YesNo::No, Symptoms::Other, CancerStage::II);
        assert_eq!(risk_factor_count(&r), 0);
        assert_eq!(assess_risk(&r), RiskCategory::LowRisk);
    }

    #[test]
    fn test_diabetes_with_dyspnea_is_high_risk() {
        let r = record(
            YesNo::No,
            YesNo::Yes,
            Symptoms::ShortnessOfBreath,
            CancerStage::I,
        );
        assert_eq!(risk_factor_count(&r), 2);
        assert_eq!(assess_risk(&r), RiskCategory::HighRisk);
    }

    #[test]
    fn test_single_factor_is_low_risk() {
        let r = record(YesNo::No, YesNo::No, Symptoms::None, CancerStage::IV);
        assert_eq!(risk_factor_count(&r), 1);
        assert_eq!(assess_risk(&r), RiskCategory::LowRisk);
    }

    #[test]
    fn test_threshold_holds_over_every_combination() {
        for &hypertension in YesNo::ALL {
            for &diabetes in YesNo::ALL {
                for &symptoms in Symptoms::ALL {
                    for &stage in CancerStage::ALL {
                        let r = record(hypertension, diabetes, symptoms, stage);
                        let expected = u8::from(hypertension.is_yes())
                            + u8::from(diabetes.is_yes())
                            + u8::from(matches!(
                                symptoms,
                                Symptoms::ShortnessOfBreath | Symptoms::SwellingInLegs
                            ))
                            + u8::from(matches!(stage, CancerStage::III | CancerStage::IV));
                        assert_eq!(risk_factor_count(&r), expected);
                        let category = assess_risk(&r);
                        assert_eq!(category == RiskCategory::HighRisk, expected >= 2);
                        assert_eq!(assess_risk(&r), category);
                    }
                }
            }
        }
    }

    #[test]
    fn test_non_scoring_fields_are_ignored() {
        let base = record(YesNo::Yes, YesNo::No, Symptoms::None, CancerStage::CancerFree);
        for &drug in ChemoDrug::ALL {
            let r = PatientRecord::builder()
                .hypertension(YesNo::Yes)
                .cancer_stage(CancerStage::CancerFree)
                .chemo_drug(drug)
                .age(90)
                .total_dose(1200)
                .cancer_free(YesNo::Yes)
                .build()
                .expect("Should build");
            assert_eq!(assess_risk(&r), assess_risk(&base));
        }
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(RiskCategory::HighRisk.to_string(), "High Risk");
        assert_eq!(RiskCategory::LowRisk.to_string(), "Low Risk");
    }
}
