//! Ingest processor
//!
//! Realizes one search: normalizes the keyword list, expands it with
//! vocabulary synonyms, fetches articles, and enriches each with
//! authors, citations, and an embedding before linking it to the
//! search. Enrichment failures are isolated per article; one bad
//! article never aborts a search.

use crate::adapters::{
    with_retry, ArticleRecord, BibliographicSource, CitationKey, CitationSource, VocabularySource,
};
use crate::query::{compose_expression, normalize_keywords};
use futures::StreamExt;
use primelit_common::config::IngestConfig;
use primelit_common::db::models::normalize_name;
use primelit_common::db::{DateRange, Store};
use primelit_common::embeddings::Embedder;
use primelit_common::errors::Result;
use primelit_common::metrics::{record_embedding, record_enrichment_failure, record_ingest};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Result of one ingest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub search_id: i64,
    pub articles_ingested: usize,
}

/// Orchestrates a single search
pub struct Ingestor {
    store: Arc<dyn Store>,
    bibliography: Arc<dyn BibliographicSource>,
    citations: Arc<dyn CitationSource>,
    vocabulary: Arc<dyn VocabularySource>,
    embedder: Arc<dyn Embedder>,
    config: IngestConfig,
    max_retries: u32,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn Store>,
        bibliography: Arc<dyn BibliographicSource>,
        citations: Arc<dyn CitationSource>,
        vocabulary: Arc<dyn VocabularySource>,
        embedder: Arc<dyn Embedder>,
        config: IngestConfig,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            bibliography,
            citations,
            vocabulary,
            embedder,
            config,
            max_retries,
        }
    }

    /// Run one search end to end.
    ///
    /// The search row is created before the fetch, so a failed fetch
    /// leaves an empty search behind; scoring such a search yields the
    /// boundary values rather than an error.
    #[instrument(skip(self, idea, keywords), fields(keywords = %keywords))]
    pub async fn run(
        &self,
        idea: &str,
        keywords: &str,
        max_results: usize,
        date_range: Option<DateRange>,
    ) -> Result<IngestOutcome> {
        let started = Instant::now();

        let terms = normalize_keywords(keywords)?;

        // Expand each term separately so the expression can OR a term
        // with its own synonyms.
        let mut groups = Vec::with_capacity(terms.len());
        for term in &terms {
            let group = self.vocabulary.expand(std::slice::from_ref(term)).await;
            groups.push(group);
        }

        let expression = compose_expression(&groups);
        let keyword_text = terms.join("; ");
        let capped = max_results.min(self.config.max_results_cap);

        debug!(expression = %expression, max_results = capped, "Composed query expression");

        let search_id = self
            .store
            .create_search(idea, &keyword_text, capped as i32, date_range)
            .await?;

        let mut records = with_retry("bibliographic", self.max_retries, || {
            self.bibliography.search(&expression, capped, date_range)
        })
        .await?;
        records.truncate(capped);

        info!(
            search_id = search_id,
            fetched = records.len(),
            "Fetched articles, starting enrichment"
        );

        let concurrency = self.config.concurrency.max(1);
        let outcomes: Vec<bool> = futures::stream::iter(
            records
                .into_iter()
                .map(|record| self.ingest_one(search_id, record)),
        )
        .buffer_unordered(concurrency)
        .collect()
        .await;

        let articles_ingested = outcomes.into_iter().filter(|linked| *linked).count();

        record_ingest(started.elapsed().as_secs_f64(), articles_ingested);
        info!(
            search_id = search_id,
            articles_ingested = articles_ingested,
            "Ingest complete"
        );

        Ok(IngestOutcome {
            search_id,
            articles_ingested,
        })
    }

    /// Ingest one article. Returns whether the article was linked to
    /// the search.
    async fn ingest_one(&self, search_id: i64, record: ArticleRecord) -> bool {
        let (article_id, created) = match self.store.upsert_article(&record.fields()).await {
            Ok(result) => result,
            Err(e) => {
                error!(pmid = %record.pmid, error = %e, "Failed to upsert article");
                record_enrichment_failure("article");
                return false;
            }
        };

        debug!(pmid = %record.pmid, article_id = article_id, created = created, "Article upserted");

        let names: Vec<String> = record
            .authors
            .iter()
            .map(|name| normalize_name(name))
            .filter(|name| !name.is_empty())
            .collect();
        if let Err(e) = self.store.attach_authors(article_id, &names).await {
            warn!(pmid = %record.pmid, error = %e, "Failed to attach authors");
            record_enrichment_failure("authors");
        }

        if let Err(e) = self.enrich_citations(article_id, &record).await {
            warn!(pmid = %record.pmid, error = %e, "Failed to enrich citations");
            record_enrichment_failure("citations");
        }

        if let Err(e) = self.embed_article(article_id, &record).await {
            warn!(pmid = %record.pmid, error = %e, "Failed to embed article");
            record_enrichment_failure("vector");
        }

        if let Err(e) = self
            .store
            .link_search_articles(search_id, &[article_id])
            .await
        {
            error!(pmid = %record.pmid, error = %e, "Failed to link article to search");
            return false;
        }

        true
    }

    async fn enrich_citations(&self, article_id: i64, record: &ArticleRecord) -> Result<()> {
        let key = CitationKey {
            pmid: record.pmid.clone(),
            doi: record.doi.clone(),
        };

        let snapshot = with_retry("citations", self.max_retries, || {
            self.citations.current_count(&key)
        })
        .await?;

        if let Some(snapshot) = snapshot {
            self.store
                .record_citation_snapshot(
                    article_id,
                    snapshot.source,
                    snapshot.count,
                    snapshot.observed_on,
                )
                .await?;
        }

        let series = with_retry("citations", self.max_retries, || {
            self.citations.yearly_counts(&key)
        })
        .await?;

        if !series.is_empty() {
            self.store.record_yearly_citations(article_id, &series).await?;
        }

        Ok(())
    }

    async fn embed_article(&self, article_id: i64, record: &ArticleRecord) -> Result<()> {
        let started = Instant::now();
        let result = self.embedder.embed(&record.embedding_text()).await;
        record_embedding(
            started.elapsed().as_secs_f64(),
            self.embedder.model_name(),
            result.is_ok(),
        );

        let vector = result?;
        self.store.upsert_vector(article_id, &vector, None).await
    }
}
