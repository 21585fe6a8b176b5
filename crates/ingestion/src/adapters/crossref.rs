//! CrossRef citation adapter
//!
//! Resolves a DOI to its current citation total via `/works/{doi}`
//! (`is-referenced-by-count`). CrossRef exposes no per-year counts, so
//! the yearly series is always empty and the caller falls back to the
//! secondary source.

use crate::adapters::{CitationKey, CitationSnapshot, CitationSource};
use async_trait::async_trait;
use chrono::Utc;
use primelit_common::config::FetchConfig;
use primelit_common::db::models::CitationOrigin;
use primelit_common::errors::{AppError, Result};
use serde::Deserialize;
use std::time::Duration;

const SERVICE: &str = "crossref";

/// Client for the CrossRef REST API
pub struct CrossrefClient {
    client: reqwest::Client,
    base_url: String,
    contact_email: Option<String>,
}

#[derive(Deserialize)]
struct WorksResponse {
    message: WorkMessage,
}

#[derive(Deserialize)]
struct WorkMessage {
    #[serde(rename = "is-referenced-by-count", default)]
    is_referenced_by_count: i32,
}

impl CrossrefClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.citations_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.crossref_base.trim_end_matches('/').to_string(),
            contact_email: config.contact_email.clone(),
        })
    }

    async fn fetch_work(&self, doi: &str) -> Result<Option<WorkMessage>> {
        let url = format!("{}/works/{}", self.base_url, doi);

        let mut request = self.client.get(&url);
        if let Some(ref email) = self.contact_email {
            request = request.query(&[("mailto", email.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::transient(SERVICE, e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = format!("works lookup returned status {}", status);
            return if status.is_server_error() || status.as_u16() == 429 {
                Err(AppError::transient(SERVICE, message))
            } else {
                Err(AppError::permanent(SERVICE, message))
            };
        }

        let body: WorksResponse = response
            .json()
            .await
            .map_err(|e| AppError::permanent(SERVICE, format!("bad works payload: {}", e)))?;

        Ok(Some(body.message))
    }
}

#[async_trait]
impl CitationSource for CrossrefClient {
    async fn current_count(&self, key: &CitationKey) -> Result<Option<CitationSnapshot>> {
        let Some(doi) = key.doi.as_deref().filter(|d| !d.trim().is_empty()) else {
            return Ok(None);
        };

        let Some(work) = self.fetch_work(doi.trim()).await? else {
            return Ok(None);
        };

        Ok(Some(CitationSnapshot {
            source: CitationOrigin::Crossref,
            count: work.is_referenced_by_count.max(0),
            observed_on: Utc::now().date_naive(),
        }))
    }

    async fn yearly_counts(&self, _key: &CitationKey) -> Result<Vec<(i32, i32)>> {
        // Not exposed by the CrossRef API.
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_works_payload_parses() {
        let json = r#"{
            "status": "ok",
            "message-type": "work",
            "message": {
                "DOI": "10.1056/nejmoa2031054",
                "is-referenced-by-count": 812,
                "title": ["CRISPR-Cas9 Gene Editing"]
            }
        }"#;

        let body: WorksResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.message.is_referenced_by_count, 812);
    }

    #[test]
    fn test_missing_count_defaults_to_zero() {
        let json = r#"{"message": {"DOI": "10.1/x"}}"#;
        let body: WorksResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.message.is_referenced_by_count, 0);
    }

    #[tokio::test]
    async fn test_no_doi_yields_none() {
        let client = CrossrefClient::new(&FetchConfig::default()).unwrap();
        let key = CitationKey {
            pmid: "123".into(),
            doi: None,
        };
        assert_eq!(client.current_count(&key).await.unwrap(), None);
    }
}
