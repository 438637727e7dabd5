//! Runtime configuration from `CARDIOGUARD_*` environment variables.
//!
//! Command-line flags override these values (see `cli`).

use std::path::PathBuf;

use crate::adapters::cnn::signature::verifying_key_from_b64;
use crate::adapters::LoadOptions;
use crate::CardioGuardError;

pub const ENV_MODEL_DIR: &str = "CARDIOGUARD_MODEL_DIR";
pub const ENV_PUBKEY_FILE: &str = "CARDIOGUARD_MODEL_SIGNING_PUBKEY_B64_FILE";
pub const ENV_ALLOW_UNSIGNED: &str = "CARDIOGUARD_ALLOW_UNSIGNED_MODELS";
pub const ENV_METRICS_SEED: &str = "CARDIOGUARD_METRICS_SEED";
pub const ENV_LOG_MODE: &str = "CARDIOGUARD_LOG_MODE";
pub const ENV_LOG_FILE: &str = "CARDIOGUARD_LOG_FILE";

const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_LOG_FILE: &str = "cardioguard.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stdout,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub model_dir: PathBuf,
    pub pubkey_file: Option<PathBuf>,
    /// Honoured only in debug builds.
    pub allow_unsigned_models: bool,
    /// Fixed seed for the echo metric generator; entropy when `None`.
    pub metrics_seed: Option<u64>,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            pubkey_file: None,
            allow_unsigned_models: false,
            metrics_seed: None,
            log_mode: LogMode::Stdout,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    /// Returns `CardioGuardError::Config` for unparsable values.
    pub fn from_env() -> Result<Self, CardioGuardError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup` (the environment, or a map in tests).
    ///
    /// # Errors
    /// Returns `CardioGuardError::Config` for unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CardioGuardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(dir) = lookup(ENV_MODEL_DIR) {
            settings.model_dir = PathBuf::from(dir);
        }
        settings.pubkey_file = lookup(ENV_PUBKEY_FILE).map(PathBuf::from);
        settings.allow_unsigned_models = lookup(ENV_ALLOW_UNSIGNED)
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        if let Some(seed) = lookup(ENV_METRICS_SEED) {
            let seed = seed.trim().parse::<u64>().map_err(|_| {
                CardioGuardError::Config(format!("{ENV_METRICS_SEED} must be an unsigned integer"))
            })?;
            settings.metrics_seed = Some(seed);
        }

        if let Some(mode) = lookup(ENV_LOG_MODE) {
            settings.log_mode = match mode.trim() {
                "stdout" | "auto" => LogMode::Stdout,
                "file" => LogMode::File,
                other => {
                    return Err(CardioGuardError::Config(format!(
                        "{ENV_LOG_MODE} must be 'stdout' or 'file', got '{other}'"
                    )))
                }
            };
        }
        if let Some(file) = lookup(ENV_LOG_FILE) {
            settings.log_file = PathBuf::from(file);
        }

        Ok(settings)
    }

    /// Model integrity options derived from these settings.
    ///
    /// # Errors
    /// Returns `CardioGuardError::Config` if the public key file cannot be
    /// read or does not hold a valid key.
    pub fn load_options(&self) -> Result<LoadOptions, CardioGuardError> {
        let verifying_key = match &self.pubkey_file {
            Some(path) => {
                let b64 = std::fs::read_to_string(path).map_err(|e| {
                    CardioGuardError::Config(format!("failed reading public key file: {e}"))
                })?;
                Some(verifying_key_from_b64(&b64).map_err(|e| CardioGuardError::Config(e.to_string()))?)
            }
            None => None,
        };

        Ok(LoadOptions {
            verifying_key,
            allow_unsigned: self.allow_unsigned_models,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).expect("Should parse");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.model_dir, PathBuf::from("models"));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_MODEL_DIR, "/opt/cic"),
            (ENV_ALLOW_UNSIGNED, "yes"),
            (ENV_METRICS_SEED, "17"),
            (ENV_LOG_MODE, "file"),
            (ENV_LOG_FILE, "/tmp/cg.log"),
        ]))
        .expect("Should parse");
        assert_eq!(settings.model_dir, PathBuf::from("/opt/cic"));
        assert!(settings.allow_unsigned_models);
        assert_eq!(settings.metrics_seed, Some(17));
        assert_eq!(settings.log_mode, LogMode::File);
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(Settings::from_lookup(lookup(&[(ENV_METRICS_SEED, "-3")])).is_err());
        assert!(Settings::from_lookup(lookup(&[(ENV_LOG_MODE, "syslog")])).is_err());
    }

    #[test]
    fn test_load_options_reads_pubkey_file() {
        use base64::Engine;
        use ed25519_dalek::SigningKey;

        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("pub.b64");
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes());
        std::fs::write(&path, b64).expect("write");

        let settings = Settings {
            pubkey_file: Some(path),
            ..Settings::default()
        };
        let options = settings.load_options().expect("Should load");
        assert_eq!(options.verifying_key, Some(key.verifying_key()));
        assert!(!options.allow_unsigned);

        let missing = Settings {
            pubkey_file: Some(temp.path().join("nope")),
            ..Settings::default()
        };
        assert!(missing.load_options().is_err());
    }
}
