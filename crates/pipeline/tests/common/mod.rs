//! Shared fixtures for the pipeline integration tests

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use primelit_common::config::AppConfig;
use primelit_common::db::models::CitationOrigin;
use primelit_common::db::{DateRange, MemoryStore};
use primelit_common::embeddings::HashingEmbedder;
use primelit_common::errors::{AppError, Result};
use primelit_ingestion::{
    ArticleRecord, BibliographicSource, CitationKey, CitationSnapshot, CitationSource,
    VocabularySource,
};
use primelit_pipeline::Coordinator;
use std::collections::HashMap;
use std::sync::Arc;

/// Bibliographic stub returning a fixed record list (or failing).
pub struct StubBibliography {
    pub records: Vec<ArticleRecord>,
    pub fail: bool,
}

#[async_trait]
impl BibliographicSource for StubBibliography {
    async fn search(
        &self,
        _expression: &str,
        max_results: usize,
        _date_range: Option<DateRange>,
    ) -> Result<Vec<ArticleRecord>> {
        if self.fail {
            return Err(AppError::permanent("pubmed", "malformed upstream document"));
        }
        Ok(self.records.iter().take(max_results).cloned().collect())
    }
}

/// Citation stub keyed by PMID.
pub struct StubCitations {
    pub series: HashMap<String, Vec<(i32, i32)>>,
}

#[async_trait]
impl CitationSource for StubCitations {
    async fn current_count(&self, key: &CitationKey) -> Result<Option<CitationSnapshot>> {
        let count = self
            .series
            .get(&key.pmid)
            .map(|s| s.iter().map(|&(_, c)| c).sum())
            .unwrap_or(0);
        Ok(Some(CitationSnapshot {
            source: CitationOrigin::Crossref,
            count,
            observed_on: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }))
    }

    async fn yearly_counts(&self, key: &CitationKey) -> Result<Vec<(i32, i32)>> {
        Ok(self.series.get(&key.pmid).cloned().unwrap_or_default())
    }
}

/// Vocabulary stub: no expansions.
pub struct NoopVocabulary;

#[async_trait]
impl VocabularySource for NoopVocabulary {
    async fn expand(&self, keywords: &[String]) -> Vec<String> {
        keywords.to_vec()
    }
}

/// The seed corpus: three articles with known citation trajectories.
/// Forward slopes are 6.5, 0.0, and 1.0; publication ages are 1, 1,
/// and 4 years.
pub fn seed_records() -> (Vec<ArticleRecord>, HashMap<String, Vec<(i32, i32)>>) {
    let current_year = Utc::now().date_naive().year();

    let records = vec![
        ArticleRecord {
            pmid: "101".into(),
            title: "CRISPR gene editing for sickle cell disease".into(),
            abstract_text: Some("Durable correction of the sickle mutation.".into()),
            pub_date: NaiveDate::from_ymd_opt(current_year - 1, 6, 1),
            authors: vec!["Jane Doe".into()],
            ..Default::default()
        },
        ArticleRecord {
            pmid: "102".into(),
            title: "Gene therapy vectors in hemoglobinopathies".into(),
            abstract_text: Some("Lentiviral delivery strategies.".into()),
            pub_date: NaiveDate::from_ymd_opt(current_year - 1, 3, 10),
            authors: vec!["John Smith".into()],
            ..Default::default()
        },
        ArticleRecord {
            pmid: "103".into(),
            title: "Long term outcomes of stem cell transplantation".into(),
            abstract_text: Some("A retrospective cohort study.".into()),
            pub_date: NaiveDate::from_ymd_opt(current_year - 4, 11, 20),
            authors: vec!["Ada Lovelace".into()],
            ..Default::default()
        },
    ];

    let mut series = HashMap::new();
    series.insert("101".to_string(), vec![(2022, 5), (2023, 10), (2024, 18)]);
    series.insert("102".to_string(), vec![(2023, 1)]);
    series.insert(
        "103".to_string(),
        vec![(2020, 0), (2021, 2), (2022, 2), (2023, 3), (2024, 4)],
    );

    (records, series)
}

/// Poll until the background scoring of a search completes.
pub async fn wait_for_score(
    coordinator: &Coordinator,
    search_id: i64,
) -> primelit_common::db::models::OpportunityScore {
    use primelit_common::errors::ScoreStatus;

    for _ in 0..250 {
        if let ScoreStatus::Ready(score) = coordinator.get_score(search_id).await.unwrap() {
            return score;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("scoring did not complete for search {}", search_id);
}

/// Wire a coordinator over a shared in-memory store.
pub fn coordinator(
    store: Arc<MemoryStore>,
    records: Vec<ArticleRecord>,
    series: HashMap<String, Vec<(i32, i32)>>,
    fail_fetch: bool,
) -> Coordinator {
    Coordinator::new(
        store,
        Arc::new(StubBibliography {
            records,
            fail: fail_fetch,
        }),
        Arc::new(StubCitations { series }),
        Arc::new(NoopVocabulary),
        Arc::new(HashingEmbedder::new(64)),
        AppConfig::default(),
    )
}
