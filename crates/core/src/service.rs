//! Patient operations used by the API layers.
//!
//! [`PatientService`] ties the pipeline together: schema validation at the boundary,
//! canonicalisation (with gene resolution when configured), and storage. It holds no
//! per-request state and is shared between handlers behind an `Arc`.

use crate::canonical::canonicalize;
use crate::config::CoreConfig;
use crate::patient::RawPatient;
use crate::repositories::{PatientRepository, UpsertOutcome};
use crate::resolver::IdentifierResolver;
use crate::wire::{self, ScoredPatient};
use crate::PatientResult;
use mme_types::PatientId;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Score reported for patients listed from the local store.
const LISTED_PATIENT_SCORE: f64 = 1.0;

/// Outcome of [`PatientService::add_patient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddedPatient {
    pub id: PatientId,
    pub outcome: UpsertOutcome,
}

#[derive(Clone)]
pub struct PatientService {
    cfg: Arc<CoreConfig>,
    repo: Arc<dyn PatientRepository>,
    resolver: Option<Arc<IdentifierResolver>>,
}

impl std::fmt::Debug for PatientService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatientService")
            .field("cfg", &self.cfg)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl PatientService {
    /// Creates a service over `repo`.
    ///
    /// Gene references are only resolved when `resolver` is set and the configuration enables
    /// resolution.
    pub fn new(
        cfg: Arc<CoreConfig>,
        repo: Arc<dyn PatientRepository>,
        resolver: Option<Arc<IdentifierResolver>>,
    ) -> Self {
        Self {
            cfg,
            repo,
            resolver,
        }
    }

    fn resolver(&self) -> Option<&IdentifierResolver> {
        if self.cfg.resolve_genes() {
            self.resolver.as_deref()
        } else {
            None
        }
    }

    /// Validates, canonicalises and stores a wire patient, replacing any stored record with
    /// the same id.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::SchemaViolation` with every violation if the document is not a
    /// valid MME patient; nothing is stored in that case.
    pub fn add_patient(&self, document: Value) -> PatientResult<AddedPatient> {
        mme_schema::validate_definition(&document, "patient")?;
        let patient = canonicalize(RawPatient::from_value(document)?, self.resolver())?;
        let outcome = self.repo.upsert(&patient)?;

        info!(patient = %patient.id(), ?outcome, "stored patient");
        Ok(AddedPatient {
            id: patient.id().clone(),
            outcome,
        })
    }

    /// Removes a stored patient. Returns `false` if there was none.
    pub fn delete_patient(&self, id: &PatientId) -> PatientResult<bool> {
        let removed = self.repo.delete(id)?;
        info!(patient = %id, removed, "delete patient");
        Ok(removed)
    }

    /// Fetches one stored patient in wire form.
    pub fn get_patient(&self, id: &PatientId) -> PatientResult<Option<RawPatient>> {
        self.repo
            .get(id)?
            .map(|patient| wire::to_wire(&patient))
            .transpose()
    }

    /// All stored patients in wire form.
    pub fn list_patients(&self) -> PatientResult<Vec<RawPatient>> {
        self.repo.list()?.iter().map(wire::to_wire).collect()
    }

    /// All stored patients wrapped as a validated MME response.
    pub fn patients_response(&self) -> PatientResult<Value> {
        let results = self
            .list_patients()?
            .into_iter()
            .map(|patient| ScoredPatient {
                patient,
                score: LISTED_PATIENT_SCORE,
            })
            .collect();
        wire::build_response(results)
    }
}
