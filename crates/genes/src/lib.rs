//! Gene nomenclature support for MME nodes.
//!
//! Federation partners refer to genes in three ways: Ensembl stable accessions
//! (`ENSG00000072163`), legacy numeric Entrez identifiers (`16084`), or free-text HGNC symbols
//! (`LIMS2`). This crate provides:
//! - classification of a raw reference into one of those forms ([`GeneRef`])
//! - the external lookup capability the normalisation pipeline depends on ([`GeneLookup`])
//! - an Ensembl REST implementation ([`EnsemblClient`]) and an in-memory one ([`StaticGeneTable`])
//!
//! Resolution policy (what to do when a lookup fails) lives in `mme-core`; this crate only
//! reports what the external service said.

pub mod ensembl;
pub mod lookup;
pub mod reference;

pub use ensembl::{EnsemblClient, EnsemblConfig};
pub use lookup::{GeneLookup, StaticGeneTable};
pub use reference::{EnsemblGeneId, EntrezId, GeneRef, GeneSymbol};

/// Errors returned by gene lookup capabilities.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("gene service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gene service returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("malformed gene service response: {0}")]
    Malformed(String),

    #[error("invalid gene reference: {0}")]
    InvalidReference(String),
}

/// Type alias for Results that can fail with a [`LookupError`].
pub type LookupResult<T> = Result<T, LookupError>;
