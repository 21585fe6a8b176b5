//! MeSH vocabulary adapter
//!
//! Expands keywords with Medical Subject Headings synonyms via the
//! NCBI `esearch`/`esummary` endpoints on the mesh database. Upstream
//! failures are non-fatal: the input keywords come back unchanged.

use crate::adapters::VocabularySource;
use crate::query::dedup_case_insensitive;
use async_trait::async_trait;
use primelit_common::config::FetchConfig;
use primelit_common::errors::{AppError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const SERVICE: &str = "mesh";

/// Maximum MeSH descriptors consulted per keyword
const MAX_DESCRIPTORS: usize = 3;

/// Client for MeSH term expansion
pub struct MeshVocabulary {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

impl MeshVocabulary {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.vocabulary_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.eutils_base.trim_end_matches('/').to_string(),
            api_key: config.ncbi_api_key.clone(),
        })
    }

    async fn descriptor_ids(&self, term: &str) -> Result<Vec<String>> {
        let url = format!("{}/esearch.fcgi", self.base_url);

        let mut params: Vec<(&str, String)> = vec![
            ("db", "mesh".to_string()),
            ("term", term.to_string()),
            ("retmax", MAX_DESCRIPTORS.to_string()),
            ("retmode", "json".to_string()),
        ];
        if let Some(ref key) = self.api_key {
            params.push(("api_key", key.clone()));
        }

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::transient(SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::transient(
                SERVICE,
                format!("esearch returned status {}", response.status()),
            ));
        }

        let body: EsearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::permanent(SERVICE, format!("bad esearch payload: {}", e)))?;

        Ok(body.esearchresult.idlist)
    }

    async fn synonyms(&self, term: &str) -> Result<Vec<String>> {
        let ids = self.descriptor_ids(term).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/esummary.fcgi", self.base_url);

        let mut params: Vec<(&str, String)> = vec![
            ("db", "mesh".to_string()),
            ("id", ids.join(",")),
            ("retmode", "json".to_string()),
        ];
        if let Some(ref key) = self.api_key {
            params.push(("api_key", key.clone()));
        }

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::transient(SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::transient(
                SERVICE,
                format!("esummary returned status {}", response.status()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::permanent(SERVICE, format!("bad esummary payload: {}", e)))?;

        Ok(extract_mesh_terms(&body))
    }
}

/// Pull `ds_meshterms` out of an esummary result document.
fn extract_mesh_terms(body: &Value) -> Vec<String> {
    let Some(result) = body.get("result") else {
        return Vec::new();
    };

    let uids: Vec<&str> = result
        .get("uids")
        .and_then(Value::as_array)
        .map(|uids| uids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut terms = Vec::new();
    for uid in uids {
        let mesh_terms = result
            .get(uid)
            .and_then(|doc| doc.get("ds_meshterms"))
            .and_then(Value::as_array);

        if let Some(mesh_terms) = mesh_terms {
            terms.extend(
                mesh_terms
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
            );
        }
    }
    terms
}

#[async_trait]
impl VocabularySource for MeshVocabulary {
    async fn expand(&self, keywords: &[String]) -> Vec<String> {
        let mut expanded: Vec<String> = keywords.to_vec();

        for keyword in keywords {
            match self.synonyms(keyword).await {
                Ok(synonyms) => expanded.extend(synonyms),
                Err(e) => {
                    // Non-fatal: the keyword simply stays unexpanded.
                    tracing::warn!(
                        keyword = %keyword,
                        error = %e,
                        "MeSH expansion failed, keeping original term"
                    );
                }
            }
        }

        dedup_case_insensitive(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_mesh_terms() {
        let body: Value = serde_json::from_str(
            r#"{
                "header": {"type": "esummary", "version": "0.3"},
                "result": {
                    "uids": ["68019172"],
                    "68019172": {
                        "uid": "68019172",
                        "ds_meshterms": ["Gene Editing", "Genome Editing", " CRISPR-Cas Systems "]
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            extract_mesh_terms(&body),
            vec!["Gene Editing", "Genome Editing", "CRISPR-Cas Systems"]
        );
    }

    #[test]
    fn test_extract_mesh_terms_tolerates_missing_fields() {
        let body: Value = serde_json::from_str(r#"{"result": {"uids": []}}"#).unwrap();
        assert!(extract_mesh_terms(&body).is_empty());

        let no_result: Value = serde_json::from_str(r#"{"error": "down"}"#).unwrap();
        assert!(extract_mesh_terms(&no_result).is_empty());
    }
}
