use mme_schema::SchemaError;

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("required field '{0}' is missing")]
    MissingRequiredField(&'static str),
    #[error("field '{field}' is malformed: {reason}")]
    MalformedField { field: &'static str, reason: String },
    #[error("{0}")]
    SchemaViolation(#[from] SchemaError),
    #[error("stored record is inconsistent: {0}")]
    InconsistentRecord(String),
    #[error("patient repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write patient file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read patient file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete patient file: {0}")]
    FileDelete(std::io::Error),
    #[error("failed to serialize patient: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize patient: {0}")]
    Deserialization(serde_json::Error),
    #[error("patient schema mismatch at {path}: {source}")]
    DeserializationAt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;
