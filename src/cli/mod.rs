//! Command-line presentation layer.
//!
//! Collects patient fields and the image path, validates them at the edge,
//! runs the analysis and renders the report. Output goes to any writer so
//! commands can be exercised in tests.

mod report;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::adapters::CnnClassifier;
use crate::application::{AnalysisService, EchoSimulator};
use crate::config::Settings;
use crate::domain::{
    assess_risk, PatientRecord, PatientRecordInput, RiskFactors, DEFAULT_AGE, DEFAULT_TOTAL_DOSE,
};
use crate::CardioGuardError;

pub use report::{Report, REPORT_TITLE};

#[derive(Debug, Parser)]
#[command(
    name = "cardioguard",
    version,
    about = "CardioGuardAI: CIC diagnostic assistant"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify an echocardiogram and assess patient risk
    Analyze(AnalyzeArgs),
    /// Run only the rule-based patient risk assessment
    Risk(PatientArgs),
    /// Load and verify the classifier model
    VerifyModel(ModelArgs),
}

/// Patient intake fields. Defaults match the intake form.
#[derive(Debug, Clone, Args)]
pub struct PatientArgs {
    #[arg(long, default_value_t = i64::from(DEFAULT_AGE), allow_negative_numbers = true)]
    pub age: i64,

    #[arg(long, default_value = "Doxorubicin", help = "Doxorubicin | Trastuzumab | Other")]
    pub chemo_drug: String,

    #[arg(long, default_value_t = i64::from(DEFAULT_TOTAL_DOSE), allow_negative_numbers = true)]
    pub total_dose: i64,

    #[arg(long, default_value = "Yes", help = "Yes | No")]
    pub hypertension: String,

    #[arg(long, default_value = "Yes", help = "Yes | No")]
    pub diabetes: String,

    #[arg(
        long,
        default_value = "None",
        help = "None | \"Shortness of breath\" | \"Swelling in legs\" | Other"
    )]
    pub symptoms: String,

    #[arg(
        long,
        default_value = "Stage I",
        help = "\"Stage I\" | \"Stage II\" | \"Stage III\" | \"Stage IV\" | \"Cancer Free\""
    )]
    pub cancer_stage: String,

    #[arg(long, default_value = "Yes", help = "Yes | No")]
    pub cancer_free: String,
}

impl PatientArgs {
    #[must_use]
    pub fn to_input(&self) -> PatientRecordInput {
        PatientRecordInput {
            age: self.age,
            chemo_drug: self.chemo_drug.clone(),
            total_dose: self.total_dose,
            hypertension: self.hypertension.clone(),
            diabetes: self.diabetes.clone(),
            symptoms: self.symptoms.clone(),
            cancer_stage: self.cancer_stage.clone(),
            cancer_free: self.cancer_free.clone(),
        }
    }

    /// Validate into a record.
    ///
    /// # Errors
    /// Returns `CardioGuardError::InvalidPatientRecord` listing every bad field.
    pub fn to_record(&self) -> Result<PatientRecord, CardioGuardError> {
        self.to_input()
            .validate()
            .map_err(CardioGuardError::InvalidPatientRecord)
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct ModelArgs {
    /// Model directory (overrides CARDIOGUARD_MODEL_DIR)
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Base64 Ed25519 public key file (overrides CARDIOGUARD_MODEL_SIGNING_PUBKEY_B64_FILE)
    #[arg(long)]
    pub pubkey_file: Option<PathBuf>,

    /// Accept an unsigned model (debug builds only)
    #[arg(long, default_value_t = false)]
    pub allow_unsigned: bool,
}

impl ModelArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.model_dir {
            settings.model_dir = dir.clone();
        }
        if let Some(file) = &self.pubkey_file {
            settings.pubkey_file = Some(file.clone());
        }
        settings.allow_unsigned_models |= self.allow_unsigned;
    }
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Echocardiogram image (PNG or JPEG)
    #[arg(long)]
    pub image: PathBuf,

    #[command(flatten)]
    pub patient: PatientArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Write the report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print and write JSON instead of text
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Seed for the simulated echo metrics (overrides CARDIOGUARD_METRICS_SEED)
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Load the classifier once; failure here is fatal for the session.
///
/// # Errors
/// Returns `ModelUnavailable` or `Config`.
pub fn load_classifier(settings: &Settings) -> Result<Arc<CnnClassifier>, CardioGuardError> {
    let options = settings.load_options()?;
    let classifier = CnnClassifier::load(&settings.model_dir, &options)?;
    Ok(Arc::new(classifier))
}

/// Dispatch a parsed command.
///
/// # Errors
/// Propagates validation, image, model and I/O errors.
pub fn run<W: Write>(cli: Cli, mut settings: Settings, out: &mut W) -> Result<(), CardioGuardError> {
    match cli.command {
        Commands::Analyze(args) => {
            args.model.apply(&mut settings);
            if args.seed.is_some() {
                settings.metrics_seed = args.seed;
            }

            // Validate the form before touching the image or the model.
            let record = args.patient.to_record()?;
            let image = std::fs::read(&args.image)?;

            let classifier = load_classifier(&settings)?;
            let echo = match settings.metrics_seed {
                Some(seed) => EchoSimulator::seeded(seed),
                None => EchoSimulator::from_entropy(),
            };
            let mut service = AnalysisService::new(classifier, echo);
            let result = service.analyze(&image, &record)?;

            let report = Report::new(&record, &result);
            let rendered = if args.json {
                report.to_json()?
            } else {
                report.to_text()
            };

            writeln!(out, "{rendered}")?;
            if let Some(path) = &args.report {
                std::fs::write(path, &rendered)?;
                tracing::info!("Report written");
            }
        }
        Commands::Risk(patient) => {
            let record = patient.to_record()?;
            let factors = RiskFactors::of(&record);
            let category = assess_risk(&record);
            writeln!(
                out,
                "Patient Risk: {category} ({} of 4 risk factors)",
                factors.count()
            )?;
            writeln!(out, "{}", category.description())?;
            for (present, label) in [
                (factors.hypertension, "Hypertension"),
                (factors.diabetes, "Diabetes"),
                (factors.cardiac_symptoms, "Cardiac symptoms"),
                (factors.advanced_stage, "Cancer stage III/IV"),
            ] {
                writeln!(out, "  [{}] {label}", if present { "x" } else { " " })?;
            }
        }
        Commands::VerifyModel(args) => {
            args.apply(&mut settings);
            let classifier = load_classifier(&settings)?;
            let network = classifier.network();
            let (h, w, c) = network.input_shape();
            writeln!(out, "Model: {}", network.name())?;
            writeln!(out, "Input: {h}x{w}x{c}")?;
            writeln!(out, "Layers: {}", network.layer_count())?;
            writeln!(out, "Parameters: {}", network.parameter_count())?;
            match classifier.serial() {
                Some(serial) => writeln!(out, "Signed: yes (serial {serial})")?,
                None => writeln!(out, "Signed: no")?,
            }
        }
    }
    Ok(())
}
