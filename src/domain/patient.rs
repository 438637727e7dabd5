//! Patient record types for CIC risk assessment.
//!
//! `PatientRecordInput` is what the presentation layer collects (free-form
//! strings and integers). `PatientRecord` can only be obtained through
//! [`PatientRecordInput::validate`], so the rest of the crate never sees an
//! out-of-range age or an unknown option label.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Accepted age range in years (inclusive).
pub const AGE_RANGE: std::ops::RangeInclusive<u32> = 18..=120;

/// Minimum cumulative chemotherapy dose.
pub const MIN_TOTAL_DOSE: u32 = 100;

/// Form defaults used when a field is omitted.
pub const DEFAULT_AGE: u32 = 60;
pub const DEFAULT_TOTAL_DOSE: u32 = 300;

/// Error returned when an option label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {field} option '{value}' (expected one of: {})", .expected.join(", "))]
pub struct UnknownOption {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

/// Implements `Display`, `FromStr` and `ALL` for a closed option set.
///
/// Parsing is case-insensitive and accepts the display label as well as the
/// listed aliases.
macro_rules! option_set {
    (
        $name:ident, $field:literal {
            $( $variant:ident => $label:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        impl $name {
            /// Every option, in form order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Label as shown on the form and in reports.
            #[must_use]
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownOption;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                $(
                    if needle.eq_ignore_ascii_case($label)
                        $(|| needle.eq_ignore_ascii_case($alias))*
                    {
                        return Ok($name::$variant);
                    }
                )+
                Err(UnknownOption {
                    field: $field,
                    value: s.to_string(),
                    expected: &[$($label),+],
                })
            }
        }
    };
}

/// Chemotherapy agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChemoDrug {
    Doxorubicin,
    Trastuzumab,
    Other,
}

option_set!(ChemoDrug, "chemo drug" {
    Doxorubicin => "Doxorubicin",
    Trastuzumab => "Trastuzumab",
    Other => "Other",
});

/// Yes/No answer on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YesNo {
    Yes,
    No,
}

option_set!(YesNo, "yes/no" {
    Yes => "Yes" | "y" | "true",
    No => "No" | "n" | "false",
});

impl YesNo {
    #[must_use]
    pub fn is_yes(self) -> bool {
        self == Self::Yes
    }
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        if value {
            Self::Yes
        } else {
            Self::No
        }
    }
}

/// Presenting cardiac symptoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symptoms {
    None,
    ShortnessOfBreath,
    SwellingInLegs,
    Other,
}

option_set!(Symptoms, "symptoms" {
    None => "None",
    ShortnessOfBreath => "Shortness of breath" | "shortness-of-breath" | "dyspnea",
    SwellingInLegs => "Swelling in legs" | "swelling-in-legs" | "edema",
    Other => "Other",
});

/// Cancer stage at the time of assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancerStage {
    I,
    II,
    III,
    IV,
    CancerFree,
}

option_set!(CancerStage, "cancer stage" {
    I => "Stage I" | "I" | "1",
    II => "Stage II" | "II" | "2",
    III => "Stage III" | "III" | "3",
    IV => "Stage IV" | "IV" | "4",
    CancerFree => "Cancer Free" | "cancer-free" | "free",
});

/// Raw patient fields as collected by the presentation layer.
///
/// Option fields are kept as strings until [`validate`](Self::validate) is
/// called, mirroring what a form submits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecordInput {
    pub age: i64,
    pub chemo_drug: String,
    pub total_dose: i64,
    pub hypertension: String,
    pub diabetes: String,
    pub symptoms: String,
    pub cancer_stage: String,
    pub cancer_free: String,
}

impl Default for PatientRecordInput {
    fn default() -> Self {
        Self {
            age: i64::from(DEFAULT_AGE),
            chemo_drug: ChemoDrug::Doxorubicin.label().to_string(),
            total_dose: i64::from(DEFAULT_TOTAL_DOSE),
            hypertension: YesNo::Yes.label().to_string(),
            diabetes: YesNo::Yes.label().to_string(),
            symptoms: Symptoms::None.label().to_string(),
            cancer_stage: CancerStage::I.label().to_string(),
            cancer_free: YesNo::Yes.label().to_string(),
        }
    }
}

impl PatientRecordInput {
    /// Validate every field and build an immutable [`PatientRecord`].
    ///
    /// All violations are collected rather than stopping at the first one,
    /// so a form can highlight every bad field at once.
    ///
    /// # Errors
    /// Returns the list of human-readable violations.
    pub fn validate(&self) -> Result<PatientRecord, Vec<String>> {
        let mut errors = Vec::new();

        let age = match u32::try_from(self.age) {
            Ok(age) if AGE_RANGE.contains(&age) => Some(age),
            _ => {
                errors.push(format!(
                    "Age {} out of range [{}, {}]",
                    self.age,
                    AGE_RANGE.start(),
                    AGE_RANGE.end()
                ));
                None
            }
        };

        let total_dose = match u32::try_from(self.total_dose) {
            Ok(dose) if dose >= MIN_TOTAL_DOSE => Some(dose),
            _ => {
                errors.push(format!(
                    "Total dose {} below minimum {MIN_TOTAL_DOSE}",
                    self.total_dose
                ));
                None
            }
        };

        fn parse<T: FromStr<Err = UnknownOption>>(raw: &str, errors: &mut Vec<String>) -> Option<T> {
            raw.parse::<T>()
                .map_err(|e| errors.push(e.to_string()))
                .ok()
        }

        let chemo_drug = parse::<ChemoDrug>(&self.chemo_drug, &mut errors);
        let hypertension = parse::<YesNo>(&self.hypertension, &mut errors);
        let diabetes = parse::<YesNo>(&self.diabetes, &mut errors);
        let symptoms = parse::<Symptoms>(&self.symptoms, &mut errors);
        let cancer_stage = parse::<CancerStage>(&self.cancer_stage, &mut errors);
        let cancer_free = parse::<YesNo>(&self.cancer_free, &mut errors);

        match (
            age,
            chemo_drug,
            total_dose,
            hypertension,
            diabetes,
            symptoms,
            cancer_stage,
            cancer_free,
        ) {
            (
                Some(age),
                Some(chemo_drug),
                Some(total_dose),
                Some(hypertension),
                Some(diabetes),
                Some(symptoms),
                Some(cancer_stage),
                Some(cancer_free),
            ) if errors.is_empty() => Ok(PatientRecord {
                age,
                chemo_drug,
                total_dose,
                hypertension,
                diabetes,
                symptoms,
                cancer_stage,
                cancer_free,
            }),
            _ => Err(errors),
        }
    }
}

/// Validated patient attributes for one analysis.
///
/// Fields are private; read them through the accessors. The only way to
/// build one is [`PatientRecordInput::validate`] or [`PatientRecord::builder`],
/// which validates as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatientRecord {
    age: u32,
    chemo_drug: ChemoDrug,
    total_dose: u32,
    hypertension: YesNo,
    diabetes: YesNo,
    symptoms: Symptoms,
    cancer_stage: CancerStage,
    cancer_free: YesNo,
}

impl PatientRecord {
    /// Start from neutral defaults (age and dose as on the form, no
    /// comorbidities, no symptoms, stage I) and override fields with typed
    /// values. Unlike [`PatientRecordInput::default`], the result carries no
    /// risk factors.
    #[must_use]
    pub fn builder() -> PatientRecordBuilder {
        PatientRecordBuilder::default()
    }

    #[must_use]
    pub fn age(&self) -> u32 {
        self.age
    }

    #[must_use]
    pub fn chemo_drug(&self) -> ChemoDrug {
        self.chemo_drug
    }

    #[must_use]
    pub fn total_dose(&self) -> u32 {
        self.total_dose
    }

    #[must_use]
    pub fn hypertension(&self) -> YesNo {
        self.hypertension
    }

    #[must_use]
    pub fn diabetes(&self) -> YesNo {
        self.diabetes
    }

    #[must_use]
    pub fn symptoms(&self) -> Symptoms {
        self.symptoms
    }

    #[must_use]
    pub fn cancer_stage(&self) -> CancerStage {
        self.cancer_stage
    }

    #[must_use]
    pub fn cancer_free(&self) -> YesNo {
        self.cancer_free
    }
}

/// Typed builder for [`PatientRecord`]. Defaults score zero risk factors.
#[derive(Debug, Clone)]
pub struct PatientRecordBuilder {
    age: u32,
    chemo_drug: ChemoDrug,
    total_dose: u32,
    hypertension: YesNo,
    diabetes: YesNo,
    symptoms: Symptoms,
    cancer_stage: CancerStage,
    cancer_free: YesNo,
}

impl Default for PatientRecordBuilder {
    fn default() -> Self {
        Self {
            age: DEFAULT_AGE,
            chemo_drug: ChemoDrug::Doxorubicin,
            total_dose: DEFAULT_TOTAL_DOSE,
            hypertension: YesNo::No,
            diabetes: YesNo::No,
            symptoms: Symptoms::None,
            cancer_stage: CancerStage::I,
            cancer_free: YesNo::No,
        }
    }
}

impl PatientRecordBuilder {
    #[must_use]
    pub fn age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    #[must_use]
    pub fn chemo_drug(mut self, drug: ChemoDrug) -> Self {
        self.chemo_drug = drug;
        self
    }

    #[must_use]
    pub fn total_dose(mut self, dose: u32) -> Self {
        self.total_dose = dose;
        self
    }

    #[must_use]
    pub fn hypertension(mut self, value: YesNo) -> Self {
        self.hypertension = value;
        self
    }

    #[must_use]
    pub fn diabetes(mut self, value: YesNo) -> Self {
        self.diabetes = value;
        self
    }

    #[must_use]
    pub fn symptoms(mut self, value: Symptoms) -> Self {
        self.symptoms = value;
        self
    }

    #[must_use]
    pub fn cancer_stage(mut self, value: CancerStage) -> Self {
        self.cancer_stage = value;
        self
    }

    #[must_use]
    pub fn cancer_free(mut self, value: YesNo) -> Self {
        self.cancer_free = value;
        self
    }

    /// Check the numeric ranges and produce the record.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn build(self) -> Result<PatientRecord, Vec<String>> {
        let mut errors = Vec::new();
        if !AGE_RANGE.contains(&self.age) {
            errors.push(format!(
                "Age {} out of range [{}, {}]",
                self.age,
                AGE_RANGE.start(),
                AGE_RANGE.end()
            ));
        }
        if self.total_dose < MIN_TOTAL_DOSE {
            errors.push(format!(
                "Total dose {} below minimum {MIN_TOTAL_DOSE}",
                self.total_dose
            ));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(PatientRecord {
            age: self.age,
            chemo_drug: self.chemo_drug,
            total_dose: self.total_dose,
            hypertension: self.hypertension,
            diabetes: self.diabetes,
            symptoms: self.symptoms,
            cancer_stage: self.cancer_stage,
            cancer_free: self.cancer_free,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> PatientRecordInput {
        PatientRecordInput {
            age: 55,
            chemo_drug: "Trastuzumab".into(),
            total_dose: 450,
            hypertension: "Yes".into(),
            diabetes: "No".into(),
            symptoms: "Shortness of breath".into(),
            cancer_stage: "Stage III".into(),
            cancer_free: "No".into(),
        }
    }

    #[test]
    fn test_validate_accepts_form_labels() {
        let record = input().validate().expect("Should validate");
        assert_eq!(record.age(), 55);
        assert_eq!(record.chemo_drug(), ChemoDrug::Trastuzumab);
        assert_eq!(record.total_dose(), 450);
        assert_eq!(record.symptoms(), Symptoms::ShortnessOfBreath);
        assert_eq!(record.cancer_stage(), CancerStage::III);
        assert_eq!(record.cancer_free(), YesNo::No);
    }

    #[test]
    fn test_validate_collects_every_violation() {
        let bad = PatientRecordInput {
            age: 17,
            total_dose: 99,
            symptoms: "Chest pain".into(),
            cancer_stage: "Stage V".into(),
            ..input()
        };
        let errors = bad.validate().expect_err("Should reject");
        assert_eq!(errors.len(), 4);
        assert!(errors[0].contains("Age 17"));
        assert!(errors.iter().any(|e| e.contains("Chest pain")));
    }

    #[test]
    fn test_age_bounds_are_inclusive() {
        for age in [18, 120] {
            let ok = PatientRecordInput { age, ..input() };
            assert!(ok.validate().is_ok(), "age {age} should be accepted");
        }
        for age in [-1, 0, 121] {
            let bad = PatientRecordInput { age, ..input() };
            assert!(bad.validate().is_err(), "age {age} should be rejected");
        }
    }

    #[test]
    fn test_option_parsing_is_case_insensitive_with_aliases() {
        assert_eq!("yes".parse::<YesNo>().unwrap(), YesNo::Yes);
        assert_eq!(" NO ".parse::<YesNo>().unwrap(), YesNo::No);
        assert_eq!("stage iv".parse::<CancerStage>().unwrap(), CancerStage::IV);
        assert_eq!("3".parse::<CancerStage>().unwrap(), CancerStage::III);
        assert_eq!(
            "swelling-in-legs".parse::<Symptoms>().unwrap(),
            Symptoms::SwellingInLegs
        );
        assert!("maybe".parse::<YesNo>().is_err());
    }

    #[test]
    fn test_labels_roundtrip_for_every_option() {
        for stage in CancerStage::ALL {
            assert_eq!(stage.label().parse::<CancerStage>().unwrap(), *stage);
        }
        for symptoms in Symptoms::ALL {
            assert_eq!(symptoms.to_string().parse::<Symptoms>().unwrap(), *symptoms);
        }
    }

    #[test]
    fn test_builder_checks_ranges() {
        assert!(PatientRecord::builder().build().is_ok());
        assert!(PatientRecord::builder().age(121).build().is_err());
        assert!(PatientRecord::builder().total_dose(50).build().is_err());
    }

    #[test]
    fn test_builder_defaults_are_neutral() {
        let record = PatientRecord::builder().build().expect("Should build");
        assert_eq!(record.age(), DEFAULT_AGE);
        assert_eq!(record.total_dose(), DEFAULT_TOTAL_DOSE);
        assert_eq!(record.hypertension(), YesNo::No);
        assert_eq!(record.diabetes(), YesNo::No);
        assert_eq!(record.cancer_free(), YesNo::No);
        assert_eq!(crate::domain::risk_factor_count(&record), 0);

        let form = PatientRecordInput::default().validate().expect("Should validate");
        assert_eq!(form.hypertension(), YesNo::Yes);
        assert_eq!(crate::domain::risk_factor_count(&form), 2);
    }

    #[test]
    fn test_default_input_matches_form_defaults() {
        let record = PatientRecordInput::default().validate().expect("Should validate");
        assert_eq!(record.age(), DEFAULT_AGE);
        assert_eq!(record.total_dose(), DEFAULT_TOTAL_DOSE);
    }
}
