//! # MME Core
//!
//! Patient normalisation pipeline for a Matchmaker Exchange node.
//!
//! This crate contains pure data operations:
//! - Canonicalisation of incoming patients, including gene identifier resolution
//! - Phenotype, disorder, gene and variant projections for the matching engine
//! - Projection of stored patients back to the wire format
//! - Keyed patient storage and bulk loading
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `api-rest` and `cli`.
//! Wire schema validation lives in `mme-schema`; gene lookups in `mme-genes`.

pub mod canonical;
pub mod config;
pub mod constants;
pub mod features;
pub mod load;
pub mod patient;
pub mod repositories;
pub mod resolver;
pub mod service;
pub mod wire;

mod error;

pub use canonical::canonicalize;
pub use config::CoreConfig;
pub use error::{PatientError, PatientResult};
pub use features::{extract_disorder_terms, extract_genes, extract_phenotype_terms, extract_variants};
pub use patient::{CanonicalPatient, GenomicFeature, RawPatient};
pub use repositories::{
    FileRepository, InsertOutcome, MemoryRepository, PatientFilter, PatientRepository,
    UpsertOutcome,
};
pub use resolver::{IdentifierResolver, ResolvedGene};
pub use service::{AddedPatient, PatientService};
pub use wire::{to_wire, ScoredPatient};

pub use mme_types::PatientId;
