//! OpenAlex citation adapter
//!
//! Looks a work up by PMID (preferred) or DOI and returns both the
//! current citation total (`cited_by_count`) and the per-year series
//! (`counts_by_year`). Serves as the fallback behind CrossRef.

use crate::adapters::{CitationKey, CitationSnapshot, CitationSource};
use async_trait::async_trait;
use chrono::Utc;
use primelit_common::config::FetchConfig;
use primelit_common::db::models::CitationOrigin;
use primelit_common::errors::{AppError, Result};
use serde::Deserialize;
use std::time::Duration;

const SERVICE: &str = "openalex";

/// Client for the OpenAlex works API
pub struct OpenAlexClient {
    client: reqwest::Client,
    base_url: String,
    contact_email: Option<String>,
}

#[derive(Deserialize)]
struct Work {
    #[serde(default)]
    cited_by_count: i32,
    #[serde(default)]
    counts_by_year: Vec<YearCount>,
}

#[derive(Deserialize)]
struct YearCount {
    year: i32,
    #[serde(default)]
    cited_by_count: i32,
}

impl OpenAlexClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.citations_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.openalex_base.trim_end_matches('/').to_string(),
            contact_email: config.contact_email.clone(),
        })
    }

    fn work_id(key: &CitationKey) -> Option<String> {
        let pmid = key.pmid.trim();
        if !pmid.is_empty() {
            return Some(format!("pmid:{}", pmid));
        }
        key.doi
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| format!("doi:{}", d))
    }

    async fn fetch_work(&self, key: &CitationKey) -> Result<Option<Work>> {
        let Some(id) = Self::work_id(key) else {
            return Ok(None);
        };

        let url = format!("{}/works/{}", self.base_url, id);

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

        let work: Work = response
            .json()
            .await
            .map_err(|e| AppError::permanent(SERVICE, format!("bad works payload: {}", e)))?;

        Ok(Some(work))
    }
}

#[async_trait]
impl CitationSource for OpenAlexClient {
    async fn current_count(&self, key: &CitationKey) -> Result<Option<CitationSnapshot>> {
        let Some(work) = self.fetch_work(key).await? else {
            return Ok(None);
        };

        Ok(Some(CitationSnapshot {
            source: CitationOrigin::OpenAlex,
            count: work.cited_by_count.max(0),
            observed_on: Utc::now().date_naive(),
        }))
    }

    async fn yearly_counts(&self, key: &CitationKey) -> Result<Vec<(i32, i32)>> {
        let Some(work) = self.fetch_work(key).await? else {
            return Ok(Vec::new());
        };

        let mut series: Vec<(i32, i32)> = work
            .counts_by_year
            .into_iter()
            .map(|c| (c.year, c.cited_by_count.max(0)))
            .collect();
        // OpenAlex returns newest-first; the trajectory engine expects
        // chronological order.
        series.sort_by_key(|&(year, _)| year);

        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_payload_parses() {
        let json = r#"{
            "id": "https://openalex.org/W3111093076",
            "cited_by_count": 947,
            "counts_by_year": [
                {"year": 2024, "cited_by_count": 301},
                {"year": 2023, "cited_by_count": 404},
                {"year": 2022, "cited_by_count": 242}
            ]
        }"#;

        let work: Work = serde_json::from_str(json).unwrap();
        assert_eq!(work.cited_by_count, 947);
        assert_eq!(work.counts_by_year.len(), 3);
    }

    #[test]
    fn test_work_id_prefers_pmid() {
        let key = CitationKey {
            pmid: "35298245".into(),
            doi: Some("10.1056/NEJMoa2031054".into()),
        };
        assert_eq!(OpenAlexClient::work_id(&key).as_deref(), Some("pmid:35298245"));

        let doi_only = CitationKey {
            pmid: "".into(),
            doi: Some("10.1056/NEJMoa2031054".into()),
        };
        assert_eq!(
            OpenAlexClient::work_id(&doi_only).as_deref(),
            Some("doi:10.1056/NEJMoa2031054")
        );

        assert_eq!(OpenAlexClient::work_id(&CitationKey::default()), None);
    }
}
