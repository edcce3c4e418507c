//! Matchmaker Exchange wire schema support.
//!
//! Every document that crosses the federation boundary is checked against the MME API schema
//! (`resources/api.json`) before it is accepted or emitted:
//! - inbound match and add requests against `#/definitions/request`
//! - outbound results against `#/definitions/response`
//!
//! The schema is embedded at compile time and compiled once per process into draft-4
//! validators (with `format` checking) that are never mutated afterwards, so validation can
//! run from any number of threads concurrently.
//!
//! Validation reports **every** violated constraint, each with a JSON-pointer path into the
//! offending document, so the boundary layer can give partners precise diagnostics.

pub mod validator;

pub use validator::{Violation, WireSchema};

/// File name of the embedded wire schema.
pub const SCHEMA_FILE: &str = "api.json";

pub(crate) const API_SCHEMA: &str = include_str!("../resources/api.json");

/// Which branch of the wire schema a document is checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Request,
    Response,
}

impl Mode {
    /// Definition name of the schema branch for this mode.
    pub fn definition(self) -> &'static str {
        match self {
            Mode::Request => "request",
            Mode::Response => "response",
        }
    }
}

/// Errors returned by the `mme-schema` crate.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("document violates the MME schema: {}", format_violations(.0))]
    Violations(Vec<Violation>),

    #[error("unknown schema definition: {0}")]
    UnknownDefinition(String),

    #[error("invalid wire schema: {0}")]
    InvalidSchema(String),
}

impl SchemaError {
    /// Violations carried by this error, empty for non-validation errors.
    pub fn violations(&self) -> &[Violation] {
        match self {
            SchemaError::Violations(v) => v,
            _ => &[],
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Type alias for Results that can fail with a [`SchemaError`].
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Validates `document` against the request or response branch of the shared wire schema.
///
/// # Errors
///
/// Returns [`SchemaError::Violations`] listing every violated constraint, or
/// [`SchemaError::InvalidSchema`] if the embedded schema itself could not be loaded.
pub fn validate(document: &serde_json::Value, mode: Mode) -> SchemaResult<()> {
    WireSchema::global()?.validate(document, mode)
}

/// Validates `document` against a named definition of the shared wire schema, for example
/// `"patient"` when checking a single record loaded from a file.
pub fn validate_definition(document: &serde_json::Value, definition: &str) -> SchemaResult<()> {
    WireSchema::global()?.validate_definition(document, definition)
}
