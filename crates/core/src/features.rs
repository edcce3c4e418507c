//! Projections over a patient's feature collections.
//!
//! These are the terms the matching engine compares: HPO terms from phenotype features, OMIM
//! (or other ontology) terms from disorders, and gene identifiers and variants from genomic
//! features. All functions are total: absent or malformed input yields an empty result.

use crate::constants::{ID_KEY, STORAGE_ID_KEY};
use crate::patient::GenomicFeature;
use serde_json::Value;

/// Extracts phenotype term ids, e.g. `["HP:0100026", "HP:0009882"]`.
///
/// Features are read by their `_id` attribute. Only when no feature in the whole list has an
/// `_id` are they read by `id` instead; the fallback applies to the list, not to individual
/// features, because a record uses one naming convention throughout.
pub fn extract_phenotype_terms(features: Option<&[Value]>) -> Vec<String> {
    let Some(features) = features else {
        return Vec::new();
    };

    let terms = terms_by_key(features, STORAGE_ID_KEY);
    if terms.is_empty() {
        terms_by_key(features, ID_KEY)
    } else {
        terms
    }
}

/// Extracts disorder term ids, e.g. `["MIM:616007", "MIM:614665"]`. Disorders without an
/// `id` are skipped.
pub fn extract_disorder_terms(disorders: Option<&[Value]>) -> Vec<String> {
    disorders
        .map(|d| terms_by_key(d, ID_KEY))
        .unwrap_or_default()
}

/// Unique gene identifiers referenced by genomic features, in first-seen order.
///
/// Numeric identifiers are rendered as their decimal text.
pub fn extract_genes(features: &[GenomicFeature]) -> Vec<String> {
    let mut genes: Vec<String> = Vec::new();
    for gene in features.iter().filter_map(|f| gene_text(f.gene_id()?)) {
        if !genes.contains(&gene) {
            genes.push(gene);
        }
    }
    genes
}

/// Variant payloads of genomic features, in order. Features without a variant are skipped.
pub fn extract_variants(features: &[GenomicFeature]) -> Vec<&Value> {
    features.iter().filter_map(GenomicFeature::variant).collect()
}

fn terms_by_key(items: &[Value], key: &str) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.get(key)?.as_str())
        .filter(|term| !term.is_empty())
        .map(str::to_owned)
        .collect()
}

fn gene_text(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
