//! Upstream adapter interfaces
//!
//! Small capability interfaces over the external services the
//! pipeline consumes. Concrete adapters are wired at coordinator
//! construction; tests substitute deterministic stubs.

mod crossref;
mod mesh;
mod openalex;
mod pubmed;

pub use crossref::CrossrefClient;
pub use mesh::MeshVocabulary;
pub use openalex::OpenAlexClient;
pub use pubmed::PubMedClient;

use async_trait::async_trait;
use chrono::NaiveDate;
use primelit_common::db::models::CitationOrigin;
use primelit_common::db::{ArticleFields, DateRange};
use primelit_common::errors::{AppError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// One article as returned by the bibliographic corpus
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleRecord {
    pub pmid: String,
    pub title: String,
    pub abstract_text: Option<String>,
    pub journal: Option<String>,
    pub pub_date: Option<NaiveDate>,
    pub doi: Option<String>,
    pub authors: Vec<String>,
}

impl ArticleRecord {
    /// The persistable metadata subset
    pub fn fields(&self) -> ArticleFields {
        ArticleFields {
            pmid: self.pmid.clone(),
            title: self.title.clone(),
            abstract_text: self.abstract_text.clone(),
            journal: self.journal.clone(),
            pub_date: self.pub_date,
            doi: self.doi.clone(),
        }
    }

    /// Text fed to the embedder: title plus abstract when present
    pub fn embedding_text(&self) -> String {
        match self.abstract_text.as_deref() {
            Some(abstract_text) if !abstract_text.trim().is_empty() => {
                format!("{}\n{}", self.title, abstract_text)
            }
            _ => self.title.clone(),
        }
    }
}

/// Identifiers used to look an article up in citation services
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationKey {
    pub pmid: String,
    pub doi: Option<String>,
}

/// Latest known total citation count for one article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CitationSnapshot {
    pub source: CitationOrigin,
    pub count: i32,
    pub observed_on: NaiveDate,
}

/// Resolves a query expression against the bibliographic corpus.
/// Result ordering is the upstream relevance rank and must be
/// preserved.
#[async_trait]
pub trait BibliographicSource: Send + Sync {
    async fn search(
        &self,
        expression: &str,
        max_results: usize,
        date_range: Option<DateRange>,
    ) -> Result<Vec<ArticleRecord>>;
}

/// Retrieves citation counts for one article. A missing article is
/// `None` / an empty series, never an error.
#[async_trait]
pub trait CitationSource: Send + Sync {
    async fn current_count(&self, key: &CitationKey) -> Result<Option<CitationSnapshot>>;

    async fn yearly_counts(&self, key: &CitationKey) -> Result<Vec<(i32, i32)>>;
}

/// Expands keywords with controlled-vocabulary synonyms. Returns a
/// superset of the input: originals first, expansions in input order,
/// duplicates removed case-insensitively. Upstream failures are
/// non-fatal and return the input unchanged.
#[async_trait]
pub trait VocabularySource: Send + Sync {
    async fn expand(&self, keywords: &[String]) -> Vec<String>;
}

/// Citation lookup with primary/secondary fallback.
///
/// Tries the primary source first; when the result is missing or zero
/// it consults the secondary and reports whichever source actually
/// answered.
pub struct CitationEnricher {
    primary: Arc<dyn CitationSource>,
    secondary: Arc<dyn CitationSource>,
}

impl CitationEnricher {
    pub fn new(primary: Arc<dyn CitationSource>, secondary: Arc<dyn CitationSource>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl CitationSource for CitationEnricher {
    async fn current_count(&self, key: &CitationKey) -> Result<Option<CitationSnapshot>> {
        if let Some(snapshot) = self.primary.current_count(key).await? {
            if snapshot.count > 0 {
                return Ok(Some(snapshot));
            }
            // Zero from the primary: the secondary may know better.
            if let Some(better) = self.secondary.current_count(key).await? {
                return Ok(Some(better));
            }
            return Ok(Some(snapshot));
        }

        self.secondary.current_count(key).await
    }

    async fn yearly_counts(&self, key: &CitationKey) -> Result<Vec<(i32, i32)>> {
        let series = self.primary.yearly_counts(key).await?;
        if !series.is_empty() {
            return Ok(series);
        }

        self.secondary.yearly_counts(key).await
    }
}

/// Retry a call with exponential backoff. Only transient failures are
/// retried; permanent failures surface immediately.
pub async fn with_retry<T, F, Fut>(service: &str, max_attempts: u32, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..max_attempts.max(1) {
        if attempt > 0 {
            let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
            tokio::time::sleep(delay).await;
        }

        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    service = service,
                    attempt = attempt + 1,
                    max_attempts = max_attempts,
                    error = %e,
                    "Upstream call failed, retrying"
                );
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::transient(service, "retries exhausted")))
}
