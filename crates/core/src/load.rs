//! Bulk loading and removal of patients.

use crate::canonical::canonicalize;
use crate::patient::RawPatient;
use crate::repositories::{PatientFilter, PatientRepository};
use crate::resolver::IdentifierResolver;
use crate::PatientResult;
use mme_types::PatientId;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Schema definition each loaded entry must satisfy.
const PATIENT_DEFINITION: &str = "patient";

/// Loads a JSON list of raw patients from `path` into `repo`.
///
/// Every entry is validated against the wire schema's patient definition, canonicalised (with
/// gene resolution when `resolver` is supplied) and inserted. Entries that fail validation or
/// canonicalisation are skipped, and patients whose `_id` is already stored are left alone, so
/// loading the same file twice inserts nothing the second time.
///
/// Returns the ids actually inserted. A missing or unparseable file yields an empty list.
pub fn load_demo(
    path: &Path,
    repo: &dyn PatientRepository,
    resolver: Option<&IdentifierResolver>,
) -> Vec<PatientId> {
    let entries = match read_entries(path) {
        Some(entries) => entries,
        None => return Vec::new(),
    };

    let mut inserted = Vec::new();
    for (index, entry) in entries.into_iter().enumerate() {
        match load_entry(entry, repo, resolver) {
            Ok(Some(id)) => inserted.push(id),
            Ok(None) => {}
            Err(err) => warn!(index, error = %err, "skipping patient"),
        }
    }

    info!(
        path = %path.display(),
        inserted = inserted.len(),
        "loaded patients"
    );
    inserted
}

fn read_entries(path: &Path) -> Option<Vec<Value>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            error!(path = %path.display(), error = %err, "cannot read patient file");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(Value::Array(entries)) => Some(entries),
        Ok(_) => {
            error!(path = %path.display(), "patient file is not a JSON list");
            None
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "patient file is not valid JSON");
            None
        }
    }
}

fn load_entry(
    entry: Value,
    repo: &dyn PatientRepository,
    resolver: Option<&IdentifierResolver>,
) -> PatientResult<Option<PatientId>> {
    mme_schema::validate_definition(&entry, PATIENT_DEFINITION)?;
    let patient = canonicalize(RawPatient::from_value(entry)?, resolver)?;

    if repo.insert(&patient)?.inserted() {
        Ok(Some(patient.id().clone()))
    } else {
        info!(patient = %patient.id(), "patient already stored");
        Ok(None)
    }
}

/// Removes every stored patient selected by `filter`, returning how many were removed.
pub fn delete_by_query(filter: &PatientFilter, repo: &dyn PatientRepository) -> PatientResult<usize> {
    let removed = repo.delete_matching(filter)?;
    info!(?filter, removed, "removed patients");
    Ok(removed)
}
