//! CardioGuard: CIC diagnostic assistant
//!
//! Main entry point for the command-line application.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cardioguard::adapters::sanitize::SanitizingMakeWriter;
use cardioguard::cli::{self, Cli};
use cardioguard::config::{LogMode, Settings};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env().context("Invalid CARDIOGUARD_* environment")?;

    // Report output goes to stdout; keep logs off it unless asked.
    let (writer, _guard) = match settings.log_mode {
        LogMode::File => {
            if let Some(parent) = settings.log_file.parent() {
                // Best-effort: don't fail startup just because the directory is missing.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&settings.log_file)
                .with_context(|| format!("Cannot open log file {:?}", settings.log_file))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stdout => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting CardioGuard...");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    cli::run(cli, settings, &mut out)?;

    tracing::info!("CardioGuard finished.");
    Ok(())
}
