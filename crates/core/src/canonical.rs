//! Raw-to-canonical patient transformation.
//!
//! [`canonicalize`] is the single entry point through which incoming patients become stored
//! records. It copies the recognised MME attributes, rewrites gene references to Ensembl
//! accessions when a resolver is supplied, and drops attributes that carry no value.

use crate::constants::{ID_KEY, STORAGE_ID_KEY};
use crate::patient::{is_absent, CanonicalPatient, GenomicFeature, OptionalAttributes, RawPatient};
use crate::resolver::IdentifierResolver;
use crate::{PatientError, PatientResult};
use mme_types::PatientId;
use serde_json::{Map, Value};
use tracing::debug;

const CONTACT_KEY: &str = "contact";
const GENOMIC_FEATURES_KEY: &str = "genomicFeatures";

/// Attributes copied into the canonical record besides `id`, `contact` and `genomicFeatures`.
const PASS_THROUGH_KEYS: [&str; 7] = [
    "label",
    "sex",
    "species",
    "ageOfOnset",
    "inheritanceMode",
    "features",
    "disorders",
];

/// Converts a raw patient into its canonical form.
///
/// With `resolver` set, every genomic feature whose `gene.id` is a symbol or an Entrez id is
/// rewritten to the Ensembl accession, and the display symbol is attached as `geneName`.
/// Accessions keep their value (surrounding whitespace is dropped); only their display symbol is
/// looked up. References that cannot be resolved keep their original value.
///
/// Without a resolver, recognised attributes are copied unchanged except that absent values
/// (`null`, empty lists) are removed. Applying the function to its own output is a no-op.
///
/// # Errors
///
/// - [`PatientError::MissingRequiredField`] if `id` or `contact` is absent or `null`.
/// - [`PatientError::MalformedField`] if `id` is not a non-empty string, or if
///   `genomicFeatures` is present but not a list.
pub fn canonicalize(
    raw: RawPatient,
    resolver: Option<&IdentifierResolver>,
) -> PatientResult<CanonicalPatient> {
    let mut fields = raw.into_fields();

    let id = take_id(&mut fields)?;
    let contact = take_present(&mut fields, CONTACT_KEY)
        .ok_or(PatientError::MissingRequiredField(CONTACT_KEY))?;

    let mut genomic_features = take_genomic_features(&mut fields)?;
    if let (Some(resolver), Some(features)) = (resolver, genomic_features.as_mut()) {
        for feature in features.iter_mut() {
            resolve_feature(feature, resolver);
        }
    }

    let [label, sex, species, age_of_onset, inheritance_mode, features, disorders] =
        PASS_THROUGH_KEYS.map(|key| take_present(&mut fields, key));

    fields.remove(STORAGE_ID_KEY);
    if !fields.is_empty() {
        let ignored: Vec<&str> = fields.keys().map(String::as_str).collect();
        debug!(patient = %id, ?ignored, "dropping unrecognised patient attributes");
    }

    Ok(CanonicalPatient::assemble(
        id,
        contact,
        OptionalAttributes {
            label,
            sex,
            species,
            age_of_onset,
            inheritance_mode,
            features,
            genomic_features,
            disorders,
        },
    ))
}

fn take_id(fields: &mut Map<String, Value>) -> PatientResult<PatientId> {
    match take_present(fields, ID_KEY) {
        None => Err(PatientError::MissingRequiredField(ID_KEY)),
        Some(Value::String(id)) => PatientId::new(id).map_err(|err| PatientError::MalformedField {
            field: ID_KEY,
            reason: err.to_string(),
        }),
        Some(other) => Err(PatientError::MalformedField {
            field: ID_KEY,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

/// Removes `key` and returns its value, unless the value is absent.
fn take_present(fields: &mut Map<String, Value>, key: &str) -> Option<Value> {
    fields.remove(key).filter(|value| !is_absent(value))
}

fn take_genomic_features(
    fields: &mut Map<String, Value>,
) -> PatientResult<Option<Vec<GenomicFeature>>> {
    match take_present(fields, GENOMIC_FEATURES_KEY) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(
            items.into_iter().map(GenomicFeature::from_wire).collect(),
        )),
        Some(other) => Err(PatientError::MalformedField {
            field: GENOMIC_FEATURES_KEY,
            reason: format!("expected a list, got {other}"),
        }),
    }
}

fn resolve_feature(feature: &mut GenomicFeature, resolver: &IdentifierResolver) {
    let Some(reference) = feature.gene_ref() else {
        return;
    };

    // For an accession this writes back the trimmed form of the same id.
    let resolved = resolver.resolve(&reference);
    if let Some(accession) = &resolved.accession {
        feature.set_gene_id(accession);
    }
    if let Some(symbol) = &resolved.symbol {
        feature.set_gene_name(symbol);
    }
}
