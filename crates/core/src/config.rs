//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into core services as an
//! `Arc<CoreConfig>`, so request handling never reads process-wide environment variables.

use crate::constants::{
    DEFAULT_GENE_TIMEOUT_SECS, DEFAULT_PATIENT_DATA_DIR, ENSEMBL_URL_ENV, GENE_TIMEOUT_ENV,
    PATIENTS_DIR_NAME, PATIENT_DATA_DIR_ENV, RESOLVE_GENES_ENV,
};
use crate::{PatientError, PatientResult};
use mme_genes::ensembl::DEFAULT_ENSEMBL_URL;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    patient_data_dir: PathBuf,
    resolve_genes: bool,
    ensembl_url: String,
    gene_lookup_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if `ensembl_url` is empty or the timeout is zero.
    pub fn new(
        patient_data_dir: PathBuf,
        resolve_genes: bool,
        ensembl_url: String,
        gene_lookup_timeout: Duration,
    ) -> PatientResult<Self> {
        if ensembl_url.trim().is_empty() {
            return Err(PatientError::InvalidInput(
                "ensembl_url cannot be empty".into(),
            ));
        }
        if gene_lookup_timeout.is_zero() {
            return Err(PatientError::InvalidInput(
                "gene lookup timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            patient_data_dir,
            resolve_genes,
            ensembl_url,
            gene_lookup_timeout,
        })
    }

    /// Resolve configuration from the process environment.
    ///
    /// Intended for binaries at startup only. Unset variables fall back to the defaults in
    /// [`crate::constants`].
    pub fn from_env() -> PatientResult<Self> {
        let patient_data_dir = std::env::var(PATIENT_DATA_DIR_ENV)
            .unwrap_or_else(|_| DEFAULT_PATIENT_DATA_DIR.into());
        let resolve_genes = flag_from_env_value(std::env::var(RESOLVE_GENES_ENV).ok(), true)?;
        let ensembl_url =
            std::env::var(ENSEMBL_URL_ENV).unwrap_or_else(|_| DEFAULT_ENSEMBL_URL.into());
        let timeout = timeout_from_env_value(std::env::var(GENE_TIMEOUT_ENV).ok())?;

        Self::new(
            PathBuf::from(patient_data_dir),
            resolve_genes,
            ensembl_url,
            timeout,
        )
    }

    pub fn patient_data_dir(&self) -> &Path {
        &self.patient_data_dir
    }

    pub fn patients_dir(&self) -> PathBuf {
        self.patient_data_dir.join(PATIENTS_DIR_NAME)
    }

    /// Whether records added through the service have their gene references resolved to
    /// Ensembl accessions.
    pub fn resolve_genes(&self) -> bool {
        self.resolve_genes
    }

    pub fn ensembl_url(&self) -> &str {
        &self.ensembl_url
    }

    pub fn gene_lookup_timeout(&self) -> Duration {
        self.gene_lookup_timeout
    }
}

/// Parse a boolean flag from an optional environment value.
///
/// Accepts `true/false`, `1/0`, `yes/no` and `on/off` (case-insensitive). `None` or
/// empty/whitespace input yields `default`.
pub fn flag_from_env_value(value: Option<String>, default: bool) -> PatientResult<bool> {
    let value = value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    match value.as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(PatientError::InvalidInput(format!(
            "'{other}' is not a boolean flag"
        ))),
    }
}

/// Parse the gene lookup timeout (in whole seconds) from an optional environment value.
pub fn timeout_from_env_value(value: Option<String>) -> PatientResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(Duration::from_secs(DEFAULT_GENE_TIMEOUT_SECS)),
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| PatientError::InvalidInput(format!("'{v}' is not a timeout in seconds"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_ensembl_url() {
        let err = CoreConfig::new(
            PathBuf::from("data"),
            true,
            "  ".into(),
            Duration::from_secs(5),
        )
        .expect_err("empty url");
        assert!(matches!(err, PatientError::InvalidInput(msg) if msg.contains("ensembl_url")));
    }

    #[test]
    fn patients_dir_is_under_data_dir() {
        let cfg = CoreConfig::new(
            PathBuf::from("data"),
            false,
            "https://rest.ensembl.org".into(),
            Duration::from_secs(5),
        )
        .expect("valid config");
        assert_eq!(cfg.patients_dir(), PathBuf::from("data").join("patients"));
        assert!(!cfg.resolve_genes());
    }

    #[test]
    fn parses_flags() {
        assert!(flag_from_env_value(None, true).unwrap());
        assert!(!flag_from_env_value(Some("Off".into()), true).unwrap());
        assert!(flag_from_env_value(Some(" yes ".into()), false).unwrap());
        assert!(flag_from_env_value(Some("maybe".into()), false).is_err());
    }

    #[test]
    fn parses_timeouts() {
        assert_eq!(
            timeout_from_env_value(None).unwrap(),
            Duration::from_secs(DEFAULT_GENE_TIMEOUT_SECS)
        );
        assert_eq!(
            timeout_from_env_value(Some("3".into())).unwrap(),
            Duration::from_secs(3)
        );
        assert!(timeout_from_env_value(Some("soon".into())).is_err());
    }
}
