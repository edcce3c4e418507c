//! In-process patient repository.

use super::{InsertOutcome, PatientRepository, UpsertOutcome};
use crate::patient::CanonicalPatient;
use crate::{PatientError, PatientResult};
use mme_types::PatientId;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Holds patients in memory. Used by tests and by one-shot CLI runs.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    patients: RwLock<BTreeMap<PatientId, CanonicalPatient>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> PatientError {
    PatientError::RepositoryUnavailable("patient store lock poisoned".into())
}

impl PatientRepository for MemoryRepository {
    fn get(&self, id: &PatientId) -> PatientResult<Option<CanonicalPatient>> {
        let patients = self.patients.read().map_err(poisoned)?;
        Ok(patients.get(id).cloned())
    }

    fn insert(&self, patient: &CanonicalPatient) -> PatientResult<InsertOutcome> {
        let mut patients = self.patients.write().map_err(poisoned)?;
        if patients.contains_key(patient.storage_id()) {
            return Ok(InsertOutcome::Duplicate);
        }
        patients.insert(patient.storage_id().clone(), patient.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn upsert(&self, patient: &CanonicalPatient) -> PatientResult<UpsertOutcome> {
        let mut patients = self.patients.write().map_err(poisoned)?;
        match patients.insert(patient.storage_id().clone(), patient.clone()) {
            Some(_) => Ok(UpsertOutcome::Updated),
            None => Ok(UpsertOutcome::Created),
        }
    }

    fn delete(&self, id: &PatientId) -> PatientResult<bool> {
        let mut patients = self.patients.write().map_err(poisoned)?;
        Ok(patients.remove(id).is_some())
    }

    fn list(&self) -> PatientResult<Vec<CanonicalPatient>> {
        let patients = self.patients.read().map_err(poisoned)?;
        Ok(patients.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::patient;
    use crate::repositories::PatientFilter;

    #[test]
    fn insert_reports_duplicates() {
        let repo = MemoryRepository::new();
        let p = patient("patient_1", None);
        assert_eq!(repo.insert(&p).unwrap(), InsertOutcome::Inserted);
        assert_eq!(repo.insert(&p).unwrap(), InsertOutcome::Duplicate);
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn upsert_replaces() {
        let repo = MemoryRepository::new();
        assert_eq!(
            repo.upsert(&patient("patient_1", None)).unwrap(),
            UpsertOutcome::Created
        );
        assert_eq!(
            repo.upsert(&patient("patient_1", Some("renamed"))).unwrap(),
            UpsertOutcome::Updated
        );

        let id = PatientId::new("patient_1").unwrap();
        let stored = repo.get(&id).unwrap().expect("stored");
        assert_eq!(stored.label_str(), Some("renamed"));
    }

    #[test]
    fn delete_by_label_removes_only_that_label() {
        let repo = MemoryRepository::new();
        for (id, label) in [("a", "family A"), ("b", "family A"), ("c", "family B")] {
            repo.insert(&patient(id, Some(label))).unwrap();
        }

        let removed = repo
            .delete_matching(&PatientFilter::ByLabel("family A".into()))
            .unwrap();
        assert_eq!(removed, 2);

        let left: Vec<String> = repo
            .list()
            .unwrap()
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(left, vec!["c"]);
    }

    #[test]
    fn delete_by_id_removes_one() {
        let repo = MemoryRepository::new();
        repo.insert(&patient("a", None)).unwrap();
        repo.insert(&patient("b", None)).unwrap();

        let filter = PatientFilter::ById(PatientId::new("a").unwrap());
        assert_eq!(repo.delete_matching(&filter).unwrap(), 1);
        assert_eq!(repo.delete_matching(&filter).unwrap(), 0);
        assert_eq!(repo.list().unwrap().len(), 1);
    }
}
