//! Constants used throughout the MME core crate.

/// Default directory for patient data storage when no explicit directory is configured.
pub const DEFAULT_PATIENT_DATA_DIR: &str = "patient_data";

/// Directory name for canonical patient documents under the data directory.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// File extension for stored patient documents.
pub const PATIENT_FILE_EXTENSION: &str = "json";

/// Wire attribute naming the patient.
pub const ID_KEY: &str = "id";

/// Storage key attribute. Never exposed at the wire boundary.
pub const STORAGE_ID_KEY: &str = "_id";

/// Informational, display-only attribute attached to a resolved gene object.
pub const GENE_NAME_KEY: &str = "geneName";

/// Default gene lookup timeout, in seconds.
pub const DEFAULT_GENE_TIMEOUT_SECS: u64 = 10;

/// Environment variable naming the patient data directory.
pub const PATIENT_DATA_DIR_ENV: &str = "PATIENT_DATA_DIR";

/// Environment variable toggling gene resolution for added patients.
pub const RESOLVE_GENES_ENV: &str = "MME_RESOLVE_GENES";

/// Environment variable overriding the Ensembl REST endpoint.
pub const ENSEMBL_URL_ENV: &str = "MME_ENSEMBL_URL";

/// Environment variable setting the gene lookup timeout in seconds.
pub const GENE_TIMEOUT_ENV: &str = "MME_GENE_TIMEOUT_SECS";
