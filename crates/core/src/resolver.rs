//! Gene identifier resolution.
//!
//! Turns a gene reference in any accepted form into an Ensembl accession, and an accession
//! into a display symbol. Lookup failures never propagate: a reference that cannot be
//! resolved is reported as unresolved and the caller keeps the original value. A patient
//! record is never rejected because a nomenclature service is unreachable.
//!
//! Reverse (accession to symbol) answers are cached for the lifetime of the resolver. The
//! cache lock is never held across a lookup, so slow services do not serialise requests.

use mme_genes::{EnsemblGeneId, GeneLookup, GeneRef, GeneSymbol, LookupResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Outcome of resolving one gene reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedGene {
    /// Canonical accession, if one was found (or the reference already was one).
    pub accession: Option<EnsemblGeneId>,
    /// Display symbol, if one is known.
    pub symbol: Option<GeneSymbol>,
}

/// Resolves gene references through an external [`GeneLookup`] capability.
pub struct IdentifierResolver {
    lookup: Arc<dyn GeneLookup>,
    symbols: RwLock<HashMap<EnsemblGeneId, Option<GeneSymbol>>>,
}

impl std::fmt::Debug for IdentifierResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self.symbols.read().map(|c| c.len()).unwrap_or_default();
        f.debug_struct("IdentifierResolver")
            .field("cached_symbols", &cached)
            .finish_non_exhaustive()
    }
}

impl IdentifierResolver {
    pub fn new(lookup: Arc<dyn GeneLookup>) -> Self {
        Self {
            lookup,
            symbols: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves a reference to its stable accession.
    ///
    /// Accessions are returned unchanged without any lookup. Entrez ids are first mapped to a
    /// symbol; symbols are then mapped to an accession. Returns `None` if any step fails or
    /// finds nothing.
    pub fn resolve_to_accession(&self, reference: &GeneRef) -> Option<EnsemblGeneId> {
        match reference {
            GeneRef::Accession(accession) => Some(accession.clone()),
            other => self.resolve(other).accession,
        }
    }

    /// Looks up the display symbol of an accession. Failures yield `None`.
    pub fn accession_to_symbol(&self, accession: &EnsemblGeneId) -> Option<GeneSymbol> {
        if let Ok(cache) = self.symbols.read() {
            if let Some(cached) = cache.get(accession) {
                return cached.clone();
            }
        }

        let answer = self.lookup.accession_to_symbol(accession);
        let symbol = absorb(answer, "accession to symbol", accession.as_str())?;

        if let Ok(mut cache) = self.symbols.write() {
            cache.insert(accession.clone(), symbol.clone());
        }
        symbol
    }

    /// Resolves a reference to an accession and a display symbol.
    ///
    /// The symbol is reported even when the accession lookup fails, as long as it is known
    /// (the reference was a symbol, or its Entrez id mapped to one).
    pub fn resolve(&self, reference: &GeneRef) -> ResolvedGene {
        match reference {
            GeneRef::Accession(accession) => ResolvedGene {
                accession: Some(accession.clone()),
                symbol: self.accession_to_symbol(accession),
            },
            GeneRef::Entrez(entrez) => {
                info!(entrez = %entrez, "converting Entrez gene to symbol");
                let answer = self.lookup.entrez_to_symbol(*entrez);
                let symbol = absorb(answer, "Entrez to symbol", &entrez.to_string()).flatten();
                match symbol {
                    Some(symbol) => self.resolve_symbol(symbol),
                    None => ResolvedGene::default(),
                }
            }
            GeneRef::Symbol(symbol) => self.resolve_symbol(symbol.clone()),
        }
    }

    fn resolve_symbol(&self, symbol: GeneSymbol) -> ResolvedGene {
        info!(symbol = %symbol, "converting gene symbol to Ensembl");
        let answer = self.lookup.symbol_to_accession(&symbol);
        let accession = absorb(answer, "symbol to accession", symbol.as_str()).flatten();
        ResolvedGene {
            accession,
            symbol: Some(symbol),
        }
    }
}

/// Swallows a lookup failure, logging it. Not-found and failure are logged differently but
/// both leave the caller with nothing.
fn absorb<T>(answer: LookupResult<Option<T>>, step: &str, reference: &str) -> Option<Option<T>> {
    match answer {
        Ok(Some(value)) => Some(Some(value)),
        Ok(None) => {
            info!(step, reference, "gene lookup found no match");
            Some(None)
        }
        Err(err) => {
            warn!(step, reference, error = %err, "gene lookup failed");
            None
        }
    }
}
