//! PubMed bibliographic adapter
//!
//! Talks to the NCBI E-utilities: `esearch` resolves the boolean
//! expression to a relevance-ranked PMID list (honoring the
//! publication-date filter), `efetch` returns article metadata as XML.
//! Records are re-ordered to the esearch ranking before returning.

use crate::adapters::{ArticleRecord, BibliographicSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use primelit_common::config::FetchConfig;
use primelit_common::db::DateRange;
use primelit_common::errors::{AppError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const SERVICE: &str = "pubmed";

/// Client for the NCBI E-utilities PubMed endpoints
pub struct PubMedClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl PubMedClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.bibliographic_timeout_secs))
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

    async fn esearch(
        &self,
        expression: &str,
        max_results: usize,
        date_range: Option<DateRange>,
    ) -> Result<Vec<String>> {
        let url = format!("{}/esearch.fcgi", self.base_url);

        let retmax = max_results.to_string();
        let mut params: Vec<(&str, String)> = vec![
            ("db", "pubmed".to_string()),
            ("term", expression.to_string()),
            ("retmax", retmax),
            ("retmode", "json".to_string()),
            ("sort", "relevance".to_string()),
        ];
        if let Some((start, end)) = date_range {
            params.push(("datetype", "pdat".to_string()));
            params.push(("mindate", start.format("%Y/%m/%d").to_string()));
            params.push(("maxdate", end.format("%Y/%m/%d").to_string()));
        }
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

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "esearch"));
        }

        let body: EsearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::permanent(SERVICE, format!("bad esearch payload: {}", e)))?;

        Ok(body.esearchresult.idlist)
    }

    async fn efetch(&self, pmids: &[String]) -> Result<Vec<ArticleRecord>> {
        let url = format!("{}/efetch.fcgi", self.base_url);

        let mut params: Vec<(&str, String)> = vec![
            ("db", "pubmed".to_string()),
            ("id", pmids.join(",")),
            ("retmode", "xml".to_string()),
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

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "efetch"));
        }

        let xml = response
            .text()
            .await
            .map_err(|e| AppError::transient(SERVICE, e.to_string()))?;

        parse_efetch(&xml)
    }
}

#[async_trait]
impl BibliographicSource for PubMedClient {
    async fn search(
        &self,
        expression: &str,
        max_results: usize,
        date_range: Option<DateRange>,
    ) -> Result<Vec<ArticleRecord>> {
        if max_results == 0 {
            return Ok(Vec::new());
        }

        let idlist = self.esearch(expression, max_results, date_range).await?;
        if idlist.is_empty() {
            return Ok(Vec::new());
        }

        let records = self.efetch(&idlist).await?;
        Ok(order_by_rank(records, &idlist))
    }
}

fn status_error(status: reqwest::StatusCode, call: &str) -> AppError {
    let message = format!("{} returned status {}", call, status);
    if status.is_server_error() || status.as_u16() == 429 {
        AppError::transient(SERVICE, message)
    } else {
        AppError::permanent(SERVICE, message)
    }
}

/// Restore the esearch relevance order after the unordered efetch.
fn order_by_rank(records: Vec<ArticleRecord>, idlist: &[String]) -> Vec<ArticleRecord> {
    let mut by_pmid: HashMap<String, ArticleRecord> = records
        .into_iter()
        .map(|r| (r.pmid.clone(), r))
        .collect();

    idlist
        .iter()
        .filter_map(|pmid| by_pmid.remove(pmid))
        .collect()
}

// ----------------------------------------------------------------------
// esearch payload
// ----------------------------------------------------------------------

#[derive(Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

// ----------------------------------------------------------------------
// efetch payload
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticle>,
}

#[derive(Debug, Deserialize)]
struct PubmedArticle {
    #[serde(rename = "MedlineCitation")]
    citation: MedlineCitation,
}

#[derive(Debug, Deserialize)]
struct MedlineCitation {
    #[serde(rename = "PMID")]
    pmid: Pmid,
    #[serde(rename = "Article")]
    article: ArticleNode,
}

#[derive(Debug, Deserialize)]
struct Pmid {
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct ArticleNode {
    #[serde(rename = "ArticleTitle")]
    title: Option<String>,
    #[serde(rename = "Abstract")]
    abstract_node: Option<AbstractNode>,
    #[serde(rename = "Journal")]
    journal: Option<JournalNode>,
    #[serde(rename = "AuthorList")]
    author_list: Option<AuthorList>,
    #[serde(rename = "ELocationID", default)]
    elocation_ids: Vec<ELocationId>,
}

#[derive(Debug, Deserialize)]
struct AbstractNode {
    #[serde(rename = "AbstractText", default)]
    sections: Vec<AbstractText>,
}

#[derive(Debug, Deserialize)]
struct AbstractText {
    #[serde(rename = "$text")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JournalNode {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "JournalIssue")]
    issue: Option<JournalIssue>,
}

#[derive(Debug, Deserialize)]
struct JournalIssue {
    #[serde(rename = "PubDate")]
    pub_date: Option<PubDateNode>,
}

#[derive(Debug, Deserialize)]
struct PubDateNode {
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Month")]
    month: Option<String>,
    #[serde(rename = "Day")]
    day: Option<String>,
    #[serde(rename = "MedlineDate")]
    medline_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<AuthorNode>,
}

#[derive(Debug, Deserialize)]
struct AuthorNode {
    #[serde(rename = "LastName")]
    last_name: Option<String>,
    #[serde(rename = "ForeName")]
    fore_name: Option<String>,
    #[serde(rename = "CollectiveName")]
    collective_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ELocationId {
    #[serde(rename = "@EIdType")]
    id_type: Option<String>,
    #[serde(rename = "$text")]
    value: Option<String>,
}

fn parse_efetch(xml: &str) -> Result<Vec<ArticleRecord>> {
    let set: PubmedArticleSet = quick_xml::de::from_str(xml)
        .map_err(|e| AppError::permanent(SERVICE, format!("bad efetch payload: {}", e)))?;

    Ok(set
        .articles
        .into_iter()
        .filter_map(|entry| {
            let article = entry.citation.article;
            let pmid = entry.citation.pmid.value.trim().to_string();
            if pmid.is_empty() {
                return None;
            }

            let abstract_text = article.abstract_node.and_then(|node| {
                let joined = node
                    .sections
                    .into_iter()
                    .filter_map(|s| s.text)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if joined.is_empty() {
                    None
                } else {
                    Some(joined)
                }
            });

            let (journal, pub_date) = article
                .journal
                .map(|j| {
                    let date = j.issue.and_then(|i| i.pub_date).and_then(parse_pub_date);
                    (j.title, date)
                })
                .unwrap_or((None, None));

            let authors = article
                .author_list
                .map(|list| {
                    list.authors
                        .into_iter()
                        .filter_map(author_name)
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();

            let doi = article
                .elocation_ids
                .into_iter()
                .find(|e| e.id_type.as_deref() == Some("doi"))
                .and_then(|e| e.value)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());

            Some(ArticleRecord {
                pmid,
                title: article.title.unwrap_or_default().trim().to_string(),
                abstract_text,
                journal: journal.map(|j| j.trim().to_string()).filter(|j| !j.is_empty()),
                pub_date,
                doi,
                authors,
            })
        })
        .collect())
}

fn author_name(author: AuthorNode) -> Option<String> {
    match (author.fore_name, author.last_name, author.collective_name) {
        (Some(fore), Some(last), _) => Some(format!("{} {}", fore, last)),
        (None, Some(last), _) => Some(last),
        (_, _, Some(collective)) => Some(collective),
        _ => None,
    }
}

fn parse_pub_date(node: PubDateNode) -> Option<NaiveDate> {
    let year = node
        .year
        .as_deref()
        .and_then(|y| y.trim().parse::<i32>().ok())
        .or_else(|| {
            // MedlineDate like "2023 Jan-Feb" or "2022-2023"
            let raw = node.medline_date.as_deref()?;
            raw.split(|c: char| !c.is_ascii_digit())
                .find(|s| s.len() == 4)
                .and_then(|s| s.parse().ok())
        })?;

    let month = node
        .month
        .as_deref()
        .map(str::trim)
        .and_then(month_number)
        .unwrap_or(1);

    let day = node
        .day
        .as_deref()
        .and_then(|d| d.trim().parse::<u32>().ok())
        .unwrap_or(1);

    NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| NaiveDate::from_ymd_opt(year, month, 1))
        .or_else(|| NaiveDate::from_ymd_opt(year, 1, 1))
}

fn month_number(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }

    let name = raw.get(..3)?.to_ascii_lowercase();
    let number = match name.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(number)
}
