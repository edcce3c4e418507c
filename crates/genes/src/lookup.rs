//! External gene lookup capability.
//!
//! Each method answers one question from an authoritative nomenclature service. `Ok(None)`
//! means the service answered but had no mapping; `Err` means the service could not be asked
//! or its answer could not be understood. Callers decide whether to treat the two differently.

use crate::{EnsemblGeneId, EntrezId, GeneSymbol, LookupResult};
use std::collections::HashMap;

/// Blocking gene nomenclature lookups.
///
/// Implementations own any retry or backoff policy. Every call must be idempotent.
pub trait GeneLookup: Send + Sync {
    /// Maps an HGNC symbol to its Ensembl gene accession.
    fn symbol_to_accession(&self, symbol: &GeneSymbol) -> LookupResult<Option<EnsemblGeneId>>;

    /// Maps a legacy Entrez identifier to its HGNC symbol.
    fn entrez_to_symbol(&self, entrez: EntrezId) -> LookupResult<Option<GeneSymbol>>;

    /// Maps an Ensembl gene accession back to a display symbol.
    fn accession_to_symbol(&self, accession: &EnsemblGeneId) -> LookupResult<Option<GeneSymbol>>;
}

/// In-memory gene table.
///
/// Useful for offline nodes and tests: answers only what it was loaded with and never fails.
#[derive(Debug, Clone, Default)]
pub struct StaticGeneTable {
    symbols: HashMap<String, EnsemblGeneId>,
    entrez: HashMap<u64, GeneSymbol>,
    accessions: HashMap<String, GeneSymbol>,
}

impl StaticGeneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gene under all three naming schemes.
    ///
    /// Symbols are matched case-insensitively, as HGNC symbols are uppercase by convention but
    /// partners do not always follow it.
    pub fn with_gene(
        mut self,
        symbol: GeneSymbol,
        accession: EnsemblGeneId,
        entrez: Option<EntrezId>,
    ) -> Self {
        self.symbols
            .insert(symbol.as_str().to_ascii_uppercase(), accession.clone());
        self.accessions
            .insert(accession.as_str().to_owned(), symbol.clone());
        if let Some(entrez) = entrez {
            self.entrez.insert(entrez.value(), symbol);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl GeneLookup for StaticGeneTable {
    fn symbol_to_accession(&self, symbol: &GeneSymbol) -> LookupResult<Option<EnsemblGeneId>> {
        Ok(self
            .symbols
            .get(&symbol.as_str().to_ascii_uppercase())
            .cloned())
    }

    fn entrez_to_symbol(&self, entrez: EntrezId) -> LookupResult<Option<GeneSymbol>> {
        Ok(self.entrez.get(&entrez.value()).cloned())
    }

    fn accession_to_symbol(&self, accession: &EnsemblGeneId) -> LookupResult<Option<GeneSymbol>> {
        // Versioned accessions map to the same gene as the unversioned form.
        let unversioned = accession.as_str().split('.').next().unwrap_or_default();
        Ok(self.accessions.get(unversioned).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lims2_table() -> StaticGeneTable {
        StaticGeneTable::new().with_gene(
            GeneSymbol::new("LIMS2").unwrap(),
            EnsemblGeneId::parse("ENSG00000072163").unwrap(),
            Some(EntrezId::new(55679)),
        )
    }

    #[test]
    fn resolves_symbol_case_insensitively() {
        let table = lims2_table();
        let accession = table
            .symbol_to_accession(&GeneSymbol::new("lims2").unwrap())
            .expect("lookup")
            .expect("known symbol");
        assert_eq!(accession.as_str(), "ENSG00000072163");
    }

    #[test]
    fn resolves_entrez_and_accession_to_symbol() {
        let table = lims2_table();
        let symbol = table
            .entrez_to_symbol(EntrezId::new(55679))
            .expect("lookup")
            .expect("known entrez");
        assert_eq!(symbol.as_str(), "LIMS2");

        let versioned = EnsemblGeneId::parse("ENSG00000072163.3").unwrap();
        let symbol = table
            .accession_to_symbol(&versioned)
            .expect("lookup")
            .expect("known accession");
        assert_eq!(symbol.as_str(), "LIMS2");
    }

    #[test]
    fn unknown_genes_are_not_errors() {
        let table = lims2_table();
        assert!(table
            .symbol_to_accession(&GeneSymbol::new("NOPE1").unwrap())
            .expect("lookup")
            .is_none());
        assert!(table
            .entrez_to_symbol(EntrezId::new(1))
            .expect("lookup")
            .is_none());
    }
}
