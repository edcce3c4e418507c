//! Lexical classification of gene references.
//!
//! A reference is classified purely from its text; no lookup is performed here. An Ensembl
//! accession is recognised by its `ENSG` prefix followed by the 11-digit stable number and an
//! optional `.version` suffix. Anything made only of ASCII digits is a legacy Entrez identifier;
//! everything else is treated as a symbol.

use crate::{LookupError, LookupResult};
use mme_types::NonEmptyText;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

static ENSEMBL_GENE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ENSG[0-9]{11}(\.[0-9]+)?$").expect("static Ensembl gene id pattern")
});

/// Canonical stable gene accession (Ensembl gene id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnsemblGeneId(String);

impl EnsemblGeneId {
    /// Parses an Ensembl gene accession, rejecting anything that does not match the stable
    /// accession pattern.
    pub fn parse(input: &str) -> LookupResult<Self> {
        let trimmed = input.trim();
        if ENSEMBL_GENE_ID.is_match(trimmed) {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(LookupError::InvalidReference(format!(
                "'{input}' is not an Ensembl gene accession"
            )))
        }
    }

    /// Returns true when `input` already has the shape of a stable accession.
    pub fn is_accession(input: &str) -> bool {
        ENSEMBL_GENE_ID.is_match(input.trim())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnsemblGeneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Legacy numeric Entrez gene identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntrezId(u64);

impl EntrezId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntrezId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable HGNC gene symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneSymbol(NonEmptyText);

impl GeneSymbol {
    pub fn new(input: impl AsRef<str>) -> LookupResult<Self> {
        NonEmptyText::new(input)
            .map(Self)
            .map_err(|_| LookupError::InvalidReference("gene symbol cannot be empty".into()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for GeneSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// A gene reference as received from a partner, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneRef {
    Accession(EnsemblGeneId),
    Entrez(EntrezId),
    Symbol(GeneSymbol),
}

impl GeneRef {
    /// Classifies a textual reference.
    ///
    /// Returns `None` for empty or whitespace-only input, and for digit strings too long to be
    /// an Entrez identifier.
    pub fn classify(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if EnsemblGeneId::is_accession(trimmed) {
            return EnsemblGeneId::parse(trimmed).ok().map(GeneRef::Accession);
        }
        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return trimmed.parse::<u64>().ok().map(|n| GeneRef::Entrez(EntrezId(n)));
        }
        GeneSymbol::new(trimmed).ok().map(GeneRef::Symbol)
    }

    /// Classifies a JSON `gene.id` value. Partners occasionally send Entrez ids as JSON
    /// numbers, so non-negative integers are accepted alongside strings.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::classify(s),
            Value::Number(n) => n.as_u64().map(|n| GeneRef::Entrez(EntrezId(n))),
            _ => None,
        }
    }

    pub fn is_accession(&self) -> bool {
        matches!(self, GeneRef::Accession(_))
    }
}

impl fmt::Display for GeneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneRef::Accession(id) => write!(f, "{id}"),
            GeneRef::Entrez(id) => write!(f, "{id}"),
            GeneRef::Symbol(symbol) => write!(f, "{symbol}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_ensembl_accessions() {
        let gene = GeneRef::classify("ENSG00000072163").expect("classified");
        assert!(gene.is_accession());

        let versioned = GeneRef::classify("ENSG00000072163.19").expect("classified");
        assert!(versioned.is_accession());
    }

    #[test]
    fn classifies_numeric_strings_as_entrez() {
        assert_eq!(
            GeneRef::classify("16084"),
            Some(GeneRef::Entrez(EntrezId::new(16084)))
        );
    }

    #[test]
    fn classifies_everything_else_as_symbol() {
        match GeneRef::classify("LIMS2") {
            Some(GeneRef::Symbol(symbol)) => assert_eq!(symbol.as_str(), "LIMS2"),
            other => panic!("expected symbol, got {other:?}"),
        }
        // Prefix alone is not enough to be an accession.
        assert!(matches!(
            GeneRef::classify("ENSG-like"),
            Some(GeneRef::Symbol(_))
        ));
    }

    #[test]
    fn empty_reference_is_not_classified() {
        assert_eq!(GeneRef::classify("  "), None);
    }

    #[test]
    fn json_numbers_are_entrez_ids() {
        assert_eq!(
            GeneRef::from_json(&json!(16084)),
            Some(GeneRef::Entrez(EntrezId::new(16084)))
        );
        assert_eq!(GeneRef::from_json(&json!(null)), None);
        assert_eq!(GeneRef::from_json(&json!({"id": "LIMS2"})), None);
    }

    #[test]
    fn ensembl_parse_rejects_symbols() {
        let err = EnsemblGeneId::parse("LIMS2").expect_err("not an accession");
        assert!(matches!(err, LookupError::InvalidReference(msg) if msg.contains("LIMS2")));
    }
}
