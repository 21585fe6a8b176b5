//! PrimeLit Pipeline Coordinator
//!
//! The public entry point of the search-ingest-score pipeline.
//! `run_search` ingests synchronously, then schedules the scoring
//! chain (cluster rebuild, then scoring) as a background task; reads
//! pass straight through to the store. The coordinator owns every
//! collaborator: adapters and the embedder are wired in at
//! construction and shared by reference, never through globals.

mod background;

pub use background::BackgroundTasks;

use background::ScoreGuard;
use primelit_analysis::{ClusterManager, Scorer};
use primelit_common::config::AppConfig;
use primelit_common::db::models::{Article, OpportunityScore, Search};
use primelit_common::db::{DateRange, ScoreRecord, Store};
use primelit_common::embeddings::Embedder;
use primelit_common::errors::{AppError, Result, ScoreStatus};
use primelit_ingestion::{
    BibliographicSource, CitationSource, IngestOutcome, Ingestor, VocabularySource,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Coordinates ingest, clustering, and scoring for one deployment.
pub struct Coordinator {
    store: Arc<dyn Store>,
    ingestor: Ingestor,
    cluster_manager: Arc<ClusterManager>,
    scorer: Arc<Scorer>,
    /// Exclusive lock around one clustering pass
    clustering_lock: Arc<tokio::sync::Mutex<()>>,
    /// Searches with a scoring task in flight
    scoring_active: Arc<StdMutex<HashSet<i64>>>,
    background: Arc<BackgroundTasks>,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn Store>,
        bibliography: Arc<dyn BibliographicSource>,
        citations: Arc<dyn CitationSource>,
        vocabulary: Arc<dyn VocabularySource>,
        embedder: Arc<dyn Embedder>,
        config: AppConfig,
    ) -> Self {
        let ingestor = Ingestor::new(
            store.clone(),
            bibliography,
            citations,
            vocabulary,
            embedder,
            config.ingest.clone(),
            config.fetch.max_retries,
        );

        let cluster_manager = Arc::new(ClusterManager::new(
            store.clone(),
            config.clustering.clone(),
        ));
        let scorer = Arc::new(Scorer::new(store.clone(), config.scoring.clone()));

        Self {
            store,
            ingestor,
            cluster_manager,
            scorer,
            clustering_lock: Arc::new(tokio::sync::Mutex::new(())),
            scoring_active: Arc::new(StdMutex::new(HashSet::new())),
            background: Arc::new(BackgroundTasks::new()),
        }
    }

    /// Run one search: ingest synchronously, then schedule scoring in
    /// the background. Returns once the search row and its articles
    /// are persisted.
    #[instrument(skip(self, idea))]
    pub async fn run_search(
        &self,
        idea: &str,
        keywords: &str,
        max_results: usize,
        date_range: Option<DateRange>,
    ) -> Result<i64> {
        let IngestOutcome { search_id, .. } = self
            .ingestor
            .run(idea, keywords, max_results, date_range)
            .await?;

        // The scoring task is spawned only after ingest returned, so
        // it observes the full ingest of this search.
        self.schedule_scoring(search_id).await;

        Ok(search_id)
    }

    async fn schedule_scoring(&self, search_id: i64) {
        let cluster_manager = self.cluster_manager.clone();
        let scorer = self.scorer.clone();
        let clustering_lock = self.clustering_lock.clone();
        let scoring_active = self.scoring_active.clone();

        let spawned = self
            .background
            .spawn(async move {
                let Some(_guard) = ScoreGuard::acquire(&scoring_active, search_id) else {
                    debug!(search_id = search_id, "Scoring already in flight, skipping");
                    return;
                };

                if let Err(e) =
                    scoring_chain(&cluster_manager, &scorer, &clustering_lock, search_id).await
                {
                    // The search row stays recoverable: rescore is
                    // idempotent and safe to retry.
                    error!(search_id = search_id, error = %e, "Background scoring failed");
                }
            })
            .await;

        if !spawned {
            warn!(
                search_id = search_id,
                "Coordinator is shutting down, scoring not scheduled"
            );
        }
    }

    /// Run the scoring chain inline. Idempotent; waits for any
    /// in-flight scoring of the same search to finish first.
    pub async fn rescore(&self, search_id: i64) -> Result<ScoreRecord> {
        let _guard = ScoreGuard::acquire_wait(&self.scoring_active, search_id).await;
        scoring_chain(
            &self.cluster_manager,
            &self.scorer,
            &self.clustering_lock,
            search_id,
        )
        .await
    }

    /// Look up the opportunity score of a search. `NotReady` until the
    /// background scoring completes.
    pub async fn get_score(&self, search_id: i64) -> Result<ScoreStatus<OpportunityScore>> {
        if let Some(score) = self.store.get_score(search_id).await? {
            return Ok(ScoreStatus::Ready(score));
        }

        // Distinguish "not scored yet" from "no such search"
        if self.store.get_search(search_id).await?.is_none() {
            return Err(AppError::SearchNotFound { id: search_id });
        }

        Ok(ScoreStatus::NotReady)
    }

    pub async fn list_articles(&self, offset: u64, limit: u64) -> Result<(Vec<Article>, u64)> {
        self.store.list_articles(offset, limit).await
    }

    pub async fn get_article(&self, pmid: &str) -> Result<Option<Article>> {
        self.store.get_article(pmid).await
    }

    pub async fn list_searches(&self, offset: u64, limit: u64) -> Result<(Vec<Search>, u64)> {
        self.store.list_searches(offset, limit).await
    }

    /// Drain in-flight scoring tasks, aborting stragglers after the
    /// grace period.
    pub async fn shutdown(&self, grace: Duration) {
        self.background.shutdown(grace).await;
    }
}

/// Cluster rebuild followed by scoring. The clustering lock serializes
/// passes; concurrent ingests are fine and get picked up next pass.
async fn scoring_chain(
    cluster_manager: &ClusterManager,
    scorer: &Scorer,
    clustering_lock: &tokio::sync::Mutex<()>,
    search_id: i64,
) -> Result<ScoreRecord> {
    {
        let _pass = clustering_lock.lock().await;
        cluster_manager.rebuild().await?;
    }

    scorer.score_search(search_id).await
}
