//! File-backed patient repository.
//!
//! Each patient is one JSON document. Identifiers are chosen by federation partners and may
//! contain any character, so file names are derived from the SHA-256 of the `_id` rather than
//! from the id itself:
//!
//! ```text
//! <patients_dir>/<h[0..2]>/<h[2..4]>/<h>.json
//! ```
//!
//! Two levels of sharding keep directory sizes bounded for large deployments.

use super::{InsertOutcome, PatientRepository, UpsertOutcome};
use crate::config::CoreConfig;
use crate::constants::PATIENT_FILE_EXTENSION;
use crate::patient::CanonicalPatient;
use crate::{PatientError, PatientResult};
use mme_types::PatientId;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

/// Stores patients as sharded JSON files under one directory.
#[derive(Clone, Debug)]
pub struct FileRepository {
    root: PathBuf,
}

impl FileRepository {
    /// Opens (creating if necessary) a repository rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::StorageDirCreation` if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> PatientResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(PatientError::StorageDirCreation)?;
        Ok(Self { root })
    }

    /// Opens the repository in the configured patient data directory.
    pub fn from_config(cfg: &CoreConfig) -> PatientResult<Self> {
        Self::open(cfg.patients_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document for `id`.
    pub(crate) fn document_path(&self, id: &PatientId) -> PathBuf {
        let digest = hex::encode(Sha256::digest(id.as_str().as_bytes()));
        self.root
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join(format!("{digest}.{PATIENT_FILE_EXTENSION}"))
    }

    fn read_document(path: &Path) -> PatientResult<Option<CanonicalPatient>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PatientError::FileRead(e)),
        };
        let document = serde_json::from_slice(&bytes).map_err(PatientError::Deserialization)?;
        CanonicalPatient::from_stored(document).map(Some)
    }

    fn encode(patient: &CanonicalPatient) -> PatientResult<Vec<u8>> {
        let document = patient.to_document()?;
        serde_json::to_vec_pretty(&document).map_err(PatientError::Serialization)
    }

    fn ensure_parent(path: &Path) -> PatientResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(PatientError::StorageDirCreation)?;
        }
        Ok(())
    }

    /// Writes `bytes` to a staging file of its own in the directory of `path`.
    ///
    /// Staging files carry no document extension, so listings never pick them up. A staging
    /// file that is never persisted is removed when dropped.
    fn stage(path: &Path, bytes: &[u8]) -> PatientResult<NamedTempFile> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut staging = NamedTempFile::new_in(dir).map_err(PatientError::FileWrite)?;
        staging.write_all(bytes).map_err(PatientError::FileWrite)?;
        staging.as_file().sync_all().map_err(PatientError::FileWrite)?;
        Ok(staging)
    }

    fn document_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let s1_iter = match fs::read_dir(&self.root) {
            Ok(it) => it,
            Err(_) => return files,
        };
        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }

            let s2_iter = match fs::read_dir(&s1_path) {
                Ok(it) => it,
                Err(_) => continue,
            };
            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }

                let doc_iter = match fs::read_dir(&s2_path) {
                    Ok(it) => it,
                    Err(_) => continue,
                };
                for doc in doc_iter.flatten() {
                    let path = doc.path();
                    let is_document = path
                        .extension()
                        .is_some_and(|ext| ext == PATIENT_FILE_EXTENSION);
                    if path.is_file() && is_document {
                        files.push(path);
                    }
                }
            }
        }
        files
    }
}

impl PatientRepository for FileRepository {
    fn get(&self, id: &PatientId) -> PatientResult<Option<CanonicalPatient>> {
        Self::read_document(&self.document_path(id))
    }

    fn insert(&self, patient: &CanonicalPatient) -> PatientResult<InsertOutcome> {
        let path = self.document_path(patient.storage_id());
        Self::ensure_parent(&path)?;
        let bytes = Self::encode(patient)?;

        // Published without replacing, so readers see the whole document or none of it.
        let staging = Self::stage(&path, &bytes)?;
        match staging.persist_noclobber(&path) {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(PatientError::FileWrite(e.error)),
        }
    }

    fn upsert(&self, patient: &CanonicalPatient) -> PatientResult<UpsertOutcome> {
        let path = self.document_path(patient.storage_id());
        Self::ensure_parent(&path)?;
        let bytes = Self::encode(patient)?;

        let existed = path.is_file();
        let staging = Self::stage(&path, &bytes)?;
        staging
            .persist(&path)
            .map_err(|e| PatientError::FileWrite(e.error))?;

        Ok(if existed {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        })
    }

    fn delete(&self, id: &PatientId) -> PatientResult<bool> {
        match fs::remove_file(self.document_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PatientError::FileDelete(e)),
        }
    }

    /// Unreadable or malformed documents are logged and skipped.
    fn list(&self) -> PatientResult<Vec<CanonicalPatient>> {
        let mut patients = Vec::new();
        for path in self.document_files() {
            match Self::read_document(&path) {
                Ok(Some(patient)) => patients.push(patient),
                Ok(None) => {}
                Err(err) => warn!(path = %path.display(), error = %err, "skipping stored patient"),
            }
        }
        patients.sort_by(|a, b| a.storage_id().cmp(b.storage_id()));
        Ok(patients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::patient;
    use crate::repositories::PatientFilter;
    use tempfile::TempDir;

    fn repo() -> (TempDir, FileRepository) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo = FileRepository::open(temp_dir.path().join("patients")).unwrap();
        (temp_dir, repo)
    }

    #[test]
    fn document_path_is_sharded_by_digest() {
        let (_tmp, repo) = repo();
        let id = PatientId::new("patient/1").unwrap();
        let path = repo.document_path(&id);

        let digest = hex::encode(Sha256::digest(b"patient/1"));
        assert_eq!(
            path,
            repo.root()
                .join(&digest[0..2])
                .join(&digest[2..4])
                .join(format!("{digest}.json"))
        );
    }

    #[test]
    fn stores_and_reads_back() {
        let (_tmp, repo) = repo();
        let p = patient("patient_1", Some("family A"));
        assert_eq!(repo.insert(&p).unwrap(), InsertOutcome::Inserted);

        let stored = repo.get(p.id()).unwrap().expect("stored");
        assert_eq!(stored, p);
        assert!(repo
            .get(&PatientId::new("missing").unwrap())
            .unwrap()
            .is_none());
    }

    #[test]
    fn stored_document_carries_storage_key() {
        let (_tmp, repo) = repo();
        let p = patient("patient_1", None);
        repo.insert(&p).unwrap();

        let text = fs::read_to_string(repo.document_path(p.id())).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["_id"], "patient_1");
        assert_eq!(doc["id"], "patient_1");
    }

    #[test]
    fn insert_does_not_overwrite() {
        let (_tmp, repo) = repo();
        repo.insert(&patient("patient_1", Some("first"))).unwrap();
        assert_eq!(
            repo.insert(&patient("patient_1", Some("second"))).unwrap(),
            InsertOutcome::Duplicate
        );
        let stored = repo.get(&PatientId::new("patient_1").unwrap()).unwrap();
        assert_eq!(stored.unwrap().label_str(), Some("first"));
    }

    #[test]
    fn upsert_creates_then_updates() {
        let (_tmp, repo) = repo();
        assert_eq!(
            repo.upsert(&patient("patient_1", None)).unwrap(),
            UpsertOutcome::Created
        );
        assert_eq!(
            repo.upsert(&patient("patient_1", Some("x"))).unwrap(),
            UpsertOutcome::Updated
        );
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_upserts_of_one_patient_all_succeed() {
        let (_tmp, repo) = repo();
        std::thread::scope(|scope| {
            for writer in 0..8 {
                let repo = &repo;
                scope.spawn(move || {
                    for round in 0..50 {
                        let label = format!("writer {writer} round {round}");
                        repo.upsert(&patient("patient_1", Some(label.as_str())))
                            .expect("upsert");
                    }
                });
            }
        });

        assert_eq!(repo.list().unwrap().len(), 1);
        let shard = repo
            .document_path(&PatientId::new("patient_1").unwrap())
            .parent()
            .unwrap()
            .to_path_buf();
        // No staging files are left behind.
        assert_eq!(fs::read_dir(shard).unwrap().count(), 1);
    }

    #[test]
    fn readers_never_see_a_partial_insert() {
        let (_tmp, repo) = repo();
        for n in 0..50 {
            let p = patient(&format!("patient_{n}"), Some("family A"));
            std::thread::scope(|scope| {
                let reader = scope.spawn(|| {
                    for _ in 0..50 {
                        repo.get(p.id()).expect("complete document or none");
                    }
                });
                assert_eq!(repo.insert(&p).unwrap(), InsertOutcome::Inserted);
                reader.join().unwrap();
            });
            assert_eq!(repo.get(p.id()).unwrap().as_ref(), Some(&p));
        }
    }

    #[test]
    fn concurrent_inserts_store_exactly_one_document() {
        let (_tmp, repo) = repo();
        let outcomes: Vec<InsertOutcome> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|writer| {
                    let repo = &repo;
                    scope.spawn(move || {
                        let label = format!("writer {writer}");
                        repo.insert(&patient("patient_1", Some(label.as_str()))).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let inserted = outcomes.iter().filter(|o| o.inserted()).count();
        assert_eq!(inserted, 1);
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn list_skips_malformed_documents() {
        let (_tmp, repo) = repo();
        repo.insert(&patient("b", None)).unwrap();
        repo.insert(&patient("a", None)).unwrap();

        let bogus = repo.document_path(&PatientId::new("bogus").unwrap());
        fs::create_dir_all(bogus.parent().unwrap()).unwrap();
        fs::write(&bogus, b"{not json").unwrap();

        let ids: Vec<String> = repo
            .list()
            .unwrap()
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn delete_and_delete_matching() {
        let (_tmp, repo) = repo();
        for (id, label) in [("a", "L1"), ("b", "L1"), ("c", "L2")] {
            repo.insert(&patient(id, Some(label))).unwrap();
        }

        assert!(repo.delete(&PatientId::new("c").unwrap()).unwrap());
        assert!(!repo.delete(&PatientId::new("c").unwrap()).unwrap());

        let removed = repo
            .delete_matching(&PatientFilter::ByLabel("L1".into()))
            .unwrap();
        assert_eq!(removed, 2);
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn open_missing_root_creates_it() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested").join("patients");
        let repo = FileRepository::open(&root).unwrap();
        assert!(root.is_dir());
        assert!(repo.list().unwrap().is_empty());
    }
}
