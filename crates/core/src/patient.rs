//! Patient documents: the raw wire form and the canonical stored form.
//!
//! The wire format deliberately allows unknown attributes, so [`RawPatient`] is an open map.
//! [`CanonicalPatient`] carries the recognised MME attributes only, with these invariants:
//! - `_id` always equals `id`
//! - an optional attribute without a value is absent, never `null` or an empty list
//! - substructures (`contact`, `features`, `disorders`, variants) are opaque payloads
//!
//! Genomic features are the one substructure this crate looks into, because gene references
//! are rewritten to Ensembl accessions during canonicalisation.

use crate::constants::{GENE_NAME_KEY, ID_KEY, STORAGE_ID_KEY};
use crate::{PatientError, PatientResult};
use mme_genes::{EnsemblGeneId, GeneRef, GeneSymbol};
use mme_types::{Informational, PatientId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A patient document as received over the wire. Any attribute is accepted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPatient(Map<String, Value>);

impl RawPatient {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_value(value: Value) -> PatientResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(PatientError::InvalidInput(format!(
                "patient must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// One entry of a patient's `genomicFeatures`.
///
/// The wire object is kept as-is. The display-only gene name is held beside it as an
/// [`Informational`] value, so it never influences equality, and it is only written back into
/// the `gene` object when the feature is serialised.
#[derive(Clone, Debug, PartialEq)]
pub struct GenomicFeature {
    body: Value,
    gene_name: Informational<Option<String>>,
}

impl GenomicFeature {
    /// Builds a feature from its wire object, lifting out any `gene.geneName` annotation.
    pub fn from_wire(mut body: Value) -> Self {
        let gene_name = body
            .get_mut("gene")
            .and_then(Value::as_object_mut)
            .and_then(|gene| {
                let is_text = gene.get(GENE_NAME_KEY).is_some_and(Value::is_string);
                if is_text {
                    gene.remove(GENE_NAME_KEY)
                } else {
                    None
                }
            })
            .and_then(|name| name.as_str().map(str::to_owned));

        Self {
            body,
            gene_name: Informational(gene_name),
        }
    }

    /// Renders the feature back into its wire object.
    pub fn to_wire(&self) -> Value {
        let mut body = self.body.clone();
        if let Some(name) = self.gene_name.get() {
            if let Some(gene) = body.get_mut("gene").and_then(Value::as_object_mut) {
                gene.insert(GENE_NAME_KEY.to_owned(), Value::String(name.clone()));
            }
        }
        body
    }

    /// The raw `gene.id` value, if any.
    pub fn gene_id(&self) -> Option<&Value> {
        self.body.get("gene")?.get(ID_KEY)
    }

    /// The `gene.id` value classified as a gene reference.
    pub fn gene_ref(&self) -> Option<GeneRef> {
        GeneRef::from_json(self.gene_id()?)
    }

    pub fn variant(&self) -> Option<&Value> {
        self.body.get("variant")
    }

    /// Display-only gene symbol attached during canonicalisation.
    pub fn gene_name(&self) -> Option<&str> {
        self.gene_name.get().as_deref()
    }

    pub(crate) fn set_gene_id(&mut self, accession: &EnsemblGeneId) {
        if let Some(gene) = self.body.get_mut("gene").and_then(Value::as_object_mut) {
            gene.insert(ID_KEY.to_owned(), Value::String(accession.to_string()));
        }
    }

    pub(crate) fn set_gene_name(&mut self, symbol: &GeneSymbol) {
        self.gene_name = Informational(Some(symbol.to_string()));
    }
}

impl Serialize for GenomicFeature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GenomicFeature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(GenomicFeature::from_wire)
    }
}

/// The stored, internal form of a patient.
///
/// Built by [`crate::canonical::canonicalize`] or loaded from storage with
/// [`CanonicalPatient::from_stored`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPatient {
    #[serde(rename = "_id")]
    storage_id: PatientId,
    id: PatientId,
    contact: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sex: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    species: Option<Value>,
    #[serde(
        default,
        rename = "ageOfOnset",
        skip_serializing_if = "Option::is_none"
    )]
    age_of_onset: Option<Value>,
    #[serde(
        default,
        rename = "inheritanceMode",
        skip_serializing_if = "Option::is_none"
    )]
    inheritance_mode: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    features: Option<Value>,
    #[serde(
        default,
        rename = "genomicFeatures",
        skip_serializing_if = "Option::is_none"
    )]
    genomic_features: Option<Vec<GenomicFeature>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disorders: Option<Value>,
}

/// Optional attributes of a canonical patient, each already stripped of absent values.
#[derive(Clone, Debug, Default)]
pub(crate) struct OptionalAttributes {
    pub label: Option<Value>,
    pub sex: Option<Value>,
    pub species: Option<Value>,
    pub age_of_onset: Option<Value>,
    pub inheritance_mode: Option<Value>,
    pub features: Option<Value>,
    pub genomic_features: Option<Vec<GenomicFeature>>,
    pub disorders: Option<Value>,
}

impl CanonicalPatient {
    pub(crate) fn assemble(id: PatientId, contact: Value, optional: OptionalAttributes) -> Self {
        let mut patient = Self {
            storage_id: id.clone(),
            id,
            contact,
            label: optional.label,
            sex: optional.sex,
            species: optional.species,
            age_of_onset: optional.age_of_onset,
            inheritance_mode: optional.inheritance_mode,
            features: optional.features,
            genomic_features: optional.genomic_features,
            disorders: optional.disorders,
        };
        patient.strip_absent();
        patient
    }

    /// Loads a canonical patient from a stored document.
    ///
    /// Documents written before `id` was stored alongside `_id` are accepted by copying `_id`
    /// into `id`. Absent-valued attributes are stripped.
    ///
    /// # Errors
    ///
    /// Returns [`PatientError::DeserializationAt`] naming the offending field when the document
    /// does not have the canonical shape, or [`PatientError::InconsistentRecord`] when `_id` and
    /// `id` disagree.
    pub fn from_stored(document: Value) -> PatientResult<Self> {
        let mut document = document;
        if let Some(fields) = document.as_object_mut() {
            if !fields.contains_key(ID_KEY) {
                if let Some(storage_id) = fields.get(STORAGE_ID_KEY).cloned() {
                    fields.insert(ID_KEY.to_owned(), storage_id);
                }
            }
        }

        let mut patient: CanonicalPatient = match serde_path_to_error::deserialize(document) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let path = if path.is_empty() || path == "." {
                    "<root>".to_owned()
                } else {
                    path
                };
                return Err(PatientError::DeserializationAt {
                    path,
                    source: err.into_inner(),
                });
            }
        };

        if patient.storage_id != patient.id {
            return Err(PatientError::InconsistentRecord(format!(
                "_id '{}' does not match id '{}'",
                patient.storage_id, patient.id
            )));
        }

        patient.strip_absent();
        Ok(patient)
    }

    /// Serialises the record to its stored document form (including `_id`).
    pub fn to_document(&self) -> PatientResult<Map<String, Value>> {
        match serde_json::to_value(self).map_err(PatientError::Serialization)? {
            Value::Object(fields) => Ok(fields),
            other => Err(PatientError::InconsistentRecord(format!(
                "patient serialised to a non-object: {other}"
            ))),
        }
    }

    pub fn id(&self) -> &PatientId {
        &self.id
    }

    pub fn storage_id(&self) -> &PatientId {
        &self.storage_id
    }

    pub fn contact(&self) -> &Value {
        &self.contact
    }

    pub fn label(&self) -> Option<&Value> {
        self.label.as_ref()
    }

    /// The label, when it is a string.
    pub fn label_str(&self) -> Option<&str> {
        self.label.as_ref().and_then(Value::as_str)
    }

    pub fn sex(&self) -> Option<&Value> {
        self.sex.as_ref()
    }

    pub fn species(&self) -> Option<&Value> {
        self.species.as_ref()
    }

    pub fn age_of_onset(&self) -> Option<&Value> {
        self.age_of_onset.as_ref()
    }

    pub fn inheritance_mode(&self) -> Option<&Value> {
        self.inheritance_mode.as_ref()
    }

    /// Phenotype features, when stored as a list.
    pub fn features(&self) -> Option<&[Value]> {
        self.features.as_ref()?.as_array().map(Vec::as_slice)
    }

    pub fn genomic_features(&self) -> Option<&[GenomicFeature]> {
        self.genomic_features.as_deref()
    }

    /// Disorders, when stored as a list.
    pub fn disorders(&self) -> Option<&[Value]> {
        self.disorders.as_ref()?.as_array().map(Vec::as_slice)
    }

    fn strip_absent(&mut self) {
        for slot in [
            &mut self.label,
            &mut self.sex,
            &mut self.species,
            &mut self.age_of_onset,
            &mut self.inheritance_mode,
            &mut self.features,
            &mut self.disorders,
        ] {
            if slot.as_ref().is_some_and(is_absent) {
                *slot = None;
            }
        }
        if self.genomic_features.as_ref().is_some_and(Vec::is_empty) {
            self.genomic_features = None;
        }
    }
}

/// Whether a value counts as "no value": `null` or an empty list.
pub(crate) fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_patient_requires_an_object() {
        let err = RawPatient::from_value(json!(["patient_1"])).expect_err("not an object");
        assert!(matches!(err, PatientError::InvalidInput(msg) if msg.contains("JSON object")));
    }

    #[test]
    fn genomic_feature_lifts_gene_name_out_of_body() {
        let feature = GenomicFeature::from_wire(json!({
            "gene": {"id": "ENSG00000072163", "geneName": "LIMS2"},
            "zygosity": 1
        }));
        assert_eq!(feature.gene_name(), Some("LIMS2"));
        assert_eq!(feature.gene_id(), Some(&json!("ENSG00000072163")));
        assert_eq!(
            feature.to_wire(),
            json!({"gene": {"id": "ENSG00000072163", "geneName": "LIMS2"}, "zygosity": 1})
        );
    }

    #[test]
    fn gene_name_does_not_affect_equality() {
        let named = GenomicFeature::from_wire(json!({"gene": {"id": "X", "geneName": "A"}}));
        let plain = GenomicFeature::from_wire(json!({"gene": {"id": "X"}}));
        assert_eq!(named, plain);
    }

    #[test]
    fn malformed_features_are_kept_opaque() {
        let feature = GenomicFeature::from_wire(json!("not an object"));
        assert!(feature.gene_id().is_none());
        assert_eq!(feature.to_wire(), json!("not an object"));
    }

    #[test]
    fn from_stored_accepts_legacy_documents_without_id() {
        let patient = CanonicalPatient::from_stored(json!({
            "_id": "patient_1",
            "contact": {"name": "A", "href": "mailto:a@b.org"},
            "label": null,
            "features": []
        }))
        .expect("legacy document");
        assert_eq!(patient.id().as_str(), "patient_1");
        assert_eq!(patient.storage_id().as_str(), "patient_1");
        assert!(patient.label().is_none());
        assert!(patient.features().is_none());
    }

    #[test]
    fn from_stored_rejects_mismatched_identity() {
        let err = CanonicalPatient::from_stored(json!({
            "_id": "patient_1",
            "id": "patient_2",
            "contact": {}
        }))
        .expect_err("mismatch");
        assert!(matches!(err, PatientError::InconsistentRecord(_)));
    }

    #[test]
    fn from_stored_reports_field_path() {
        let err = CanonicalPatient::from_stored(json!({
            "_id": "patient_1",
            "id": 7,
            "contact": {}
        }))
        .expect_err("numeric id");
        match err {
            PatientError::DeserializationAt { path, .. } => assert_eq!(path, "id"),
            other => panic!("expected DeserializationAt, got {other:?}"),
        }
    }

    #[test]
    fn document_carries_both_identity_keys() {
        let patient = CanonicalPatient::assemble(
            PatientId::new("patient_1").unwrap(),
            json!({"name": "A"}),
            OptionalAttributes {
                sex: Some(json!("MALE")),
                disorders: Some(json!([])),
                ..Default::default()
            },
        );
        let doc = patient.to_document().expect("document");
        assert_eq!(doc.get("_id"), Some(&json!("patient_1")));
        assert_eq!(doc.get("id"), Some(&json!("patient_1")));
        assert_eq!(doc.get("sex"), Some(&json!("MALE")));
        assert!(!doc.contains_key("disorders"));
        assert!(!doc.contains_key("label"));
    }
}
