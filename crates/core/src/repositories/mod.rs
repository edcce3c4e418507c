//! Patient document repositories.
//!
//! Canonical patients are stored keyed by their `_id`. The matching engine and the
//! administration tools only need keyed access plus a full listing, so that is all the
//! [`PatientRepository`] trait offers.

pub mod files;
pub mod memory;

pub use files::FileRepository;
pub use memory::MemoryRepository;

use crate::patient::CanonicalPatient;
use crate::PatientResult;
use mme_types::PatientId;

/// Result of [`PatientRepository::insert`].
///
/// A record whose `_id` is already stored is not an error: it is reported as a duplicate and
/// nothing is written, which keeps bulk loads idempotent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

impl InsertOutcome {
    pub fn inserted(self) -> bool {
        matches!(self, InsertOutcome::Inserted)
    }
}

/// Result of [`PatientRepository::upsert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Selects stored patients for bulk removal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatientFilter {
    /// Exact `_id` match.
    ById(PatientId),
    /// Exact `label` match.
    ByLabel(String),
}

impl PatientFilter {
    pub fn matches(&self, patient: &CanonicalPatient) -> bool {
        match self {
            PatientFilter::ById(id) => patient.storage_id() == id,
            PatientFilter::ByLabel(label) => patient.label_str() == Some(label.as_str()),
        }
    }
}

/// Keyed storage of canonical patients.
///
/// Implementations must be safe to share between request handlers.
pub trait PatientRepository: Send + Sync {
    /// Fetches the patient stored under `id`.
    fn get(&self, id: &PatientId) -> PatientResult<Option<CanonicalPatient>>;

    /// Stores `patient` unless a record with the same `_id` exists.
    fn insert(&self, patient: &CanonicalPatient) -> PatientResult<InsertOutcome>;

    /// Stores `patient`, replacing any record with the same `_id`.
    fn upsert(&self, patient: &CanonicalPatient) -> PatientResult<UpsertOutcome>;

    /// Removes the record stored under `id`. Returns `false` if there was none.
    fn delete(&self, id: &PatientId) -> PatientResult<bool>;

    /// All stored patients, ordered by `_id`.
    fn list(&self) -> PatientResult<Vec<CanonicalPatient>>;

    /// Removes every record selected by `filter` and returns how many were removed.
    fn delete_matching(&self, filter: &PatientFilter) -> PatientResult<usize> {
        if let PatientFilter::ById(id) = filter {
            return Ok(usize::from(self.delete(id)?));
        }

        let mut removed = 0;
        for patient in self.list()? {
            if filter.matches(&patient) && self.delete(patient.storage_id())? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
