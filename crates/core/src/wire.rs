//! Canonical-to-wire projection for outbound documents.
//!
//! The storage key `_id` never crosses the wire boundary; only `id` is exposed. No gene
//! rewriting happens here: stored records are already canonical.

use crate::constants::{ID_KEY, STORAGE_ID_KEY};
use crate::patient::{CanonicalPatient, RawPatient};
use crate::PatientResult;
use mme_schema::Mode;
use serde_json::{json, Map, Value};

/// Renders a canonical patient as a wire document.
pub fn to_wire(patient: &CanonicalPatient) -> PatientResult<RawPatient> {
    Ok(document_to_wire(patient.to_document()?))
}

/// Renders a stored document as a wire document.
///
/// `id` is taken from `_id` when the document lacks one, then `_id` is removed.
pub fn document_to_wire(mut document: Map<String, Value>) -> RawPatient {
    let storage_id = document.remove(STORAGE_ID_KEY);
    if !document.contains_key(ID_KEY) {
        if let Some(storage_id) = storage_id {
            document.insert(ID_KEY.to_owned(), storage_id);
        }
    }
    RawPatient::new(document)
}

/// A wire patient with its match score.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredPatient {
    pub patient: RawPatient,
    /// Patient similarity score in `[0, 1]`.
    pub score: f64,
}

/// Wraps scored wire patients into an MME response and validates it before it is emitted.
///
/// # Errors
///
/// Returns [`crate::PatientError::SchemaViolation`] listing every violation if the response
/// does not conform to the wire schema.
pub fn build_response(results: Vec<ScoredPatient>) -> PatientResult<Value> {
    let results: Vec<Value> = results
        .into_iter()
        .map(|scored| {
            json!({
                "score": {"patient": scored.score},
                "patient": scored.patient.into_value(),
            })
        })
        .collect();

    let response = json!({ "results": results });
    mme_schema::validate(&response, Mode::Response)?;
    Ok(response)
}
