//! Ensembl REST implementation of [`GeneLookup`].
//!
//! Uses three endpoints of the Ensembl REST API:
//! - `xrefs/symbol/homo_sapiens/{symbol}?external_db=HGNC` for symbol to accession
//! - `xrefs/name/homo_sapiens/{entrez}?external_db=EntrezGene` for Entrez to symbol
//! - `lookup/id/{accession}` for accession to display symbol
//!
//! Ensembl answers unknown identifiers with HTTP 400 or 404; both are reported as `Ok(None)`.

use crate::{EnsemblGeneId, EntrezId, GeneLookup, GeneSymbol, LookupError, LookupResult};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default Ensembl REST endpoint (GRCh37, as used by most MME partners).
pub const DEFAULT_ENSEMBL_URL: &str = "https://grch37.rest.ensembl.org";

/// Configuration for the Ensembl client.
#[derive(Debug, Clone)]
pub struct EnsemblConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for EnsemblConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENSEMBL_URL.to_owned(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Blocking Ensembl REST client.
#[derive(Debug, Clone)]
pub struct EnsemblClient {
    base_url: Url,
    http_client: Client,
}

#[derive(Debug, Deserialize)]
struct Xref {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    display_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupRecord {
    #[serde(default)]
    display_name: Option<String>,
}

impl EnsemblClient {
    /// Builds a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidReference`] if the base URL cannot be parsed, or
    /// [`LookupError::Transport`] if the HTTP client cannot be constructed.
    pub fn new(config: EnsemblConfig) -> LookupResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            LookupError::InvalidReference(format!("invalid Ensembl URL '{}': {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(LookupError::InvalidReference(format!(
                "Ensembl URL '{}' cannot be used as a base",
                config.base_url
            )));
        }

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent("mme-node/0.1")
            .build()?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    fn endpoint(&self, segments: &[&str], query: Option<(&str, &str)>) -> LookupResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::InvalidReference("Ensembl URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url)
    }

    /// GETs a JSON document, mapping "unknown identifier" statuses to `None`.
    fn get_json<T: DeserializeOwned>(&self, url: Url) -> LookupResult<Option<T>> {
        debug!(url = %url, "querying Ensembl");
        let response = self
            .http_client
            .get(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text()?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| LookupError::Malformed(format!("{url}: {e}")))
    }
}

impl GeneLookup for EnsemblClient {
    fn symbol_to_accession(&self, symbol: &GeneSymbol) -> LookupResult<Option<EnsemblGeneId>> {
        let url = self.endpoint(
            &["xrefs", "symbol", "homo_sapiens", symbol.as_str()],
            Some(("external_db", "HGNC")),
        )?;
        let xrefs: Option<Vec<Xref>> = self.get_json(url)?;
        Ok(xrefs.and_then(|x| first_gene_accession(&x)))
    }

    fn entrez_to_symbol(&self, entrez: EntrezId) -> LookupResult<Option<GeneSymbol>> {
        let entrez = entrez.to_string();
        let url = self.endpoint(
            &["xrefs", "name", "homo_sapiens", entrez.as_str()],
            Some(("external_db", "EntrezGene")),
        )?;
        let xrefs: Option<Vec<Xref>> = self.get_json(url)?;
        Ok(xrefs.and_then(|x| first_display_symbol(&x)))
    }

    fn accession_to_symbol(&self, accession: &EnsemblGeneId) -> LookupResult<Option<GeneSymbol>> {
        let url = self.endpoint(&["lookup", "id", accession.as_str()], None)?;
        let record: Option<LookupRecord> = self.get_json(url)?;
        Ok(record
            .and_then(|r| r.display_name)
            .and_then(|name| GeneSymbol::new(name).ok()))
    }
}

/// Picks the first gene-typed xref carrying a well-formed accession.
fn first_gene_accession(xrefs: &[Xref]) -> Option<EnsemblGeneId> {
    xrefs
        .iter()
        .filter(|x| x.kind.as_deref().map_or(true, |k| k == "gene"))
        .filter_map(|x| x.id.as_deref())
        .find_map(|id| EnsemblGeneId::parse(id).ok())
}

fn first_display_symbol(xrefs: &[Xref]) -> Option<GeneSymbol> {
    xrefs
        .iter()
        .filter_map(|x| x.display_id.as_deref())
        .find_map(|name| GeneSymbol::new(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xrefs(json: &str) -> Vec<Xref> {
        serde_json::from_str(json).expect("valid xref json")
    }

    #[test]
    fn picks_gene_accession_from_symbol_xrefs() {
        let refs = xrefs(
            r#"[
                {"id": "ENST00000324896", "type": "transcript"},
                {"id": "ENSG00000072163", "type": "gene"}
            ]"#,
        );
        let accession = first_gene_accession(&refs).expect("gene xref");
        assert_eq!(accession.as_str(), "ENSG00000072163");
    }

    #[test]
    fn no_gene_xref_means_no_accession() {
        let refs = xrefs(r#"[{"id": "ENST00000324896", "type": "transcript"}]"#);
        assert!(first_gene_accession(&refs).is_none());
        assert!(first_gene_accession(&[]).is_none());
    }

    #[test]
    fn picks_display_symbol_from_entrez_xrefs() {
        let refs = xrefs(r#"[{"display_id": "LIMS2", "primary_id": "55679"}]"#);
        let symbol = first_display_symbol(&refs).expect("display id");
        assert_eq!(symbol.as_str(), "LIMS2");
    }

    #[test]
    fn builds_escaped_endpoint_urls() {
        let client = EnsemblClient::new(EnsemblConfig {
            base_url: "https://rest.example.org/".into(),
            request_timeout: Duration::from_secs(1),
        })
        .expect("client");
        let url = client
            .endpoint(
                &["xrefs", "symbol", "homo_sapiens", "HLA-A/B"],
                Some(("external_db", "HGNC")),
            )
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://rest.example.org/xrefs/symbol/homo_sapiens/HLA-A%2FB?external_db=HGNC"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = EnsemblClient::new(EnsemblConfig {
            base_url: "not a url".into(),
            request_timeout: Duration::from_secs(1),
        })
        .expect_err("invalid url");
        assert!(matches!(err, LookupError::InvalidReference(_)));
    }
}
