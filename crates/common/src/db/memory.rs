//! In-memory store
//!
//! A deterministic [`Store`] implementation backed by collections
//! behind a mutex. It mirrors the transactional semantics of the
//! Postgres repository (merge-on-upsert, duplicate links ignored,
//! history append on every score write) and backs the pipeline tests.

use crate::db::models::{
    Article, ArticleVector, CitationOrigin, Cluster, OpportunityScore, Search,
};
use crate::db::store::{
    merge_article, ArticleFields, ClusterRecord, DateRange, RawScores, ScoreRecord, Store,
};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    articles: BTreeMap<i64, Article>,
    next_article_id: i64,
    authors: BTreeMap<i64, String>,
    next_author_id: i64,
    article_authors: BTreeSet<(i64, i64)>,
    citations: BTreeMap<(i64, &'static str), (i32, NaiveDate)>,
    yearly: BTreeMap<i64, Vec<(i32, i32)>>,
    vectors: BTreeMap<i64, ArticleVector>,
    clusters: BTreeMap<i32, Cluster>,
    searches: BTreeMap<i64, Search>,
    next_search_id: i64,
    search_articles: BTreeSet<(i64, i64)>,
    scores: BTreeMap<i64, OpportunityScore>,
    history: Vec<RawScores>,
}

/// In-memory store used by tests and offline runs
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store poisoned")
    }

    /// Number of article rows, for test assertions
    pub fn article_count(&self) -> usize {
        self.lock().articles.len()
    }

    /// Number of search-article links for one search, for test assertions
    pub fn link_count(&self, search_id: i64) -> usize {
        self.lock()
            .search_articles
            .iter()
            .filter(|(sid, _)| *sid == search_id)
            .count()
    }

    /// Seed the raw score history directly (test helper)
    pub fn push_history(&self, raw: RawScores) {
        self.lock().history.push(raw);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_article(&self, fields: &ArticleFields) -> Result<(i64, bool)> {
        let fields = fields.sanitized();
        if fields.pmid.is_empty() {
            return Err(AppError::Internal {
                message: "article upsert without a PMID".to_string(),
            });
        }

        let mut inner = self.lock();

        let existing_id = inner
            .articles
            .values()
            .find(|a| a.pmid == fields.pmid)
            .map(|a| a.id);

        match existing_id {
            Some(id) => {
                let current = inner.articles.get(&id).cloned().expect("row exists");
                if let Some(merged) = merge_article(&current, &fields) {
                    let row = inner.articles.get_mut(&id).expect("row exists");
                    row.title = merged.title;
                    row.abstract_text = merged.abstract_text;
                    row.journal = merged.journal;
                    row.pub_date = merged.pub_date;
                    row.doi = merged.doi;
                }
                Ok((id, false))
            }
            None => {
                inner.next_article_id += 1;
                let id = inner.next_article_id;
                inner.articles.insert(
                    id,
                    Article {
                        id,
                        pmid: fields.pmid,
                        title: fields.title,
                        abstract_text: fields.abstract_text,
                        doi: fields.doi,
                        journal: fields.journal,
                        pub_date: fields.pub_date,
                    },
                );
                Ok((id, true))
            }
        }
    }

    async fn attach_authors(&self, article_id: i64, names: &[String]) -> Result<()> {
        let mut inner = self.lock();

        if !inner.articles.contains_key(&article_id) {
            return Err(AppError::Internal {
                message: format!("unknown article id {}", article_id),
            });
        }

        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            let found = inner
                .authors
                .iter()
                .find(|(_, n)| n.as_str() == name)
                .map(|(&id, _)| id);

            let author_id = match found {
                Some(id) => id,
                None => {
                    inner.next_author_id += 1;
                    let id = inner.next_author_id;
                    inner.authors.insert(id, name.to_string());
                    id
                }
            };

            inner.article_authors.insert((article_id, author_id));
        }

        Ok(())
    }

    async fn record_citation_snapshot(
        &self,
        article_id: i64,
        source: CitationOrigin,
        count: i32,
        observed_on: NaiveDate,
    ) -> Result<()> {
        self.lock()
            .citations
            .insert((article_id, source.as_str()), (count, observed_on));
        Ok(())
    }

    async fn record_yearly_citations(&self, article_id: i64, series: &[(i32, i32)]) -> Result<()> {
        let mut sorted = series.to_vec();
        sorted.sort_by_key(|&(year, _)| year);
        self.lock().yearly.insert(article_id, sorted);
        Ok(())
    }

    async fn upsert_vector(
        &self,
        article_id: i64,
        vector: &[f32],
        cluster_label: Option<i32>,
    ) -> Result<()> {
        self.lock().vectors.insert(
            article_id,
            ArticleVector {
                article_id,
                vector: vector.to_vec(),
                cluster_label,
            },
        );
        Ok(())
    }

    async fn create_search(
        &self,
        idea: &str,
        keywords: &str,
        max_results: i32,
        date_range: Option<DateRange>,
    ) -> Result<i64> {
        let mut inner = self.lock();
        inner.next_search_id += 1;
        let search_id = inner.next_search_id;

        inner.searches.insert(
            search_id,
            Search {
                search_id,
                idea_text: idea.to_string(),
                keyword_text: keywords.to_string(),
                max_results,
                start_date: date_range.map(|(start, _)| start),
                end_date: date_range.map(|(_, end)| end),
                created_at: Utc::now().into(),
            },
        );

        Ok(search_id)
    }

    async fn link_search_articles(&self, search_id: i64, article_ids: &[i64]) -> Result<()> {
        let mut inner = self.lock();

        if !inner.searches.contains_key(&search_id) {
            return Err(AppError::Internal {
                message: format!("unknown search id {}", search_id),
            });
        }

        for &article_id in article_ids {
            inner.search_articles.insert((search_id, article_id));
        }

        Ok(())
    }

    async fn put_score(&self, search_id: i64, score: &ScoreRecord) -> Result<()> {
        let mut inner = self.lock();

        if !inner.searches.contains_key(&search_id) {
            return Err(AppError::Internal {
                message: format!("unknown search id {}", search_id),
            });
        }

        inner.scores.insert(
            search_id,
            OpportunityScore {
                search_id,
                novelty_score: score.novelty,
                citation_velocity_score: score.velocity,
                recency_score: score.recency,
                overall_score: score.overall,
                computed_at: Utc::now().into(),
            },
        );
        inner.history.push(score.raw);

        Ok(())
    }

    async fn replace_clustering(
        &self,
        assignments: &[(i64, i32)],
        clusters: &[ClusterRecord],
    ) -> Result<()> {
        let mut inner = self.lock();

        for &(article_id, label) in assignments {
            if let Some(vector) = inner.vectors.get_mut(&article_id) {
                vector.cluster_label = Some(label);
            }
        }

        let live: BTreeSet<i32> = clusters.iter().map(|c| c.label).collect();
        inner.clusters.retain(|label, _| live.contains(label));

        for cluster in clusters {
            inner.clusters.insert(
                cluster.label,
                Cluster {
                    cluster_label: cluster.label,
                    centroid: cluster.centroid.clone(),
                    size: cluster.size,
                    velocity: cluster.velocity,
                    last_updated: Utc::now().into(),
                },
            );
        }

        Ok(())
    }

    // ----------------------------------------------------------------------
    // Reads
    // ----------------------------------------------------------------------

    async fn list_articles(&self, offset: u64, limit: u64) -> Result<(Vec<Article>, u64)> {
        let inner = self.lock();
        let total = inner.articles.len() as u64;
        let articles = inner
            .articles
            .values()
            .skip(offset as usize)
            .take(limit.max(1) as usize)
            .cloned()
            .collect();
        Ok((articles, total))
    }

    async fn get_article(&self, pmid: &str) -> Result<Option<Article>> {
        Ok(self
            .lock()
            .articles
            .values()
            .find(|a| a.pmid == pmid)
            .cloned())
    }

    async fn list_searches(&self, offset: u64, limit: u64) -> Result<(Vec<Search>, u64)> {
        let inner = self.lock();
        let total = inner.searches.len() as u64;
        let searches = inner
            .searches
            .values()
            .rev()
            .skip(offset as usize)
            .take(limit.max(1) as usize)
            .cloned()
            .collect();
        Ok((searches, total))
    }

    async fn get_search(&self, search_id: i64) -> Result<Option<Search>> {
        Ok(self.lock().searches.get(&search_id).cloned())
    }

    async fn articles_of_search(&self, search_id: i64) -> Result<Vec<Article>> {
        let inner = self.lock();
        Ok(inner
            .search_articles
            .iter()
            .filter(|(sid, _)| *sid == search_id)
            .filter_map(|(_, aid)| inner.articles.get(aid))
            .cloned()
            .collect())
    }

    async fn vectors_of_search(&self, search_id: i64) -> Result<Vec<ArticleVector>> {
        let inner = self.lock();
        Ok(inner
            .search_articles
            .iter()
            .filter(|(sid, _)| *sid == search_id)
            .filter_map(|(_, aid)| inner.vectors.get(aid))
            .cloned()
            .collect())
    }

    async fn all_vectors(&self) -> Result<Vec<ArticleVector>> {
        Ok(self.lock().vectors.values().cloned().collect())
    }

    async fn yearly_citations(&self, article_id: i64) -> Result<Vec<(i32, i32)>> {
        Ok(self.lock().yearly.get(&article_id).cloned().unwrap_or_default())
    }

    async fn get_score(&self, search_id: i64) -> Result<Option<OpportunityScore>> {
        Ok(self.lock().scores.get(&search_id).cloned())
    }

    async fn raw_score_history(&self) -> Result<Vec<RawScores>> {
        Ok(self.lock().history.clone())
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        Ok(self.lock().clusters.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pmid: &str, title: &str) -> ArticleFields {
        ArticleFields {
            pmid: pmid.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_article_dedupes_by_pmid() {
        let store = MemoryStore::new();

        let (id1, created1) = store.upsert_article(&fields("1", "A")).await.unwrap();
        let (id2, created2) = store.upsert_article(&fields("1", "A")).await.unwrap();

        assert!(created1);
        assert!(!created2);
        assert_eq!(id1, id2);
        assert_eq!(store.article_count(), 1);
    }

    #[tokio::test]
    async fn test_upsert_merges_richer_fields() {
        let store = MemoryStore::new();

        let (id, _) = store.upsert_article(&fields("1", "A")).await.unwrap();

        let richer = ArticleFields {
            pmid: "1".into(),
            title: "A".into(),
            abstract_text: Some("Full abstract".into()),
            ..Default::default()
        };
        store.upsert_article(&richer).await.unwrap();

        let article = store.get_article("1").await.unwrap().unwrap();
        assert_eq!(article.id, id);
        assert_eq!(article.abstract_text.as_deref(), Some("Full abstract"));
    }

    #[tokio::test]
    async fn test_duplicate_links_ignored() {
        let store = MemoryStore::new();
        let (id, _) = store.upsert_article(&fields("1", "A")).await.unwrap();
        let search_id = store.create_search("idea", "a", 5, None).await.unwrap();

        store.link_search_articles(search_id, &[id]).await.unwrap();
        store.link_search_articles(search_id, &[id]).await.unwrap();

        assert_eq!(store.link_count(search_id), 1);
    }

    #[tokio::test]
    async fn test_put_score_appends_history() {
        let store = MemoryStore::new();
        let search_id = store.create_search("idea", "a", 5, None).await.unwrap();

        let record = ScoreRecord {
            novelty: 1.0,
            velocity: 0.5,
            recency: 0.5,
            overall: 0.7,
            raw: RawScores {
                novelty: 1.0,
                citation: 2.0,
                recency: 0.4,
            },
        };

        store.put_score(search_id, &record).await.unwrap();
        store.put_score(search_id, &record).await.unwrap();

        // Overwrite the score, append history twice
        assert!(store.get_score(search_id).await.unwrap().is_some());
        assert_eq!(store.raw_score_history().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_vector_round_trip_is_exact() {
        let store = MemoryStore::new();
        let (id, _) = store.upsert_article(&fields("1", "A")).await.unwrap();

        let vector = vec![0.1f32, -2.5e-8, f32::MAX, f32::MIN_POSITIVE, 0.0];
        store.upsert_vector(id, &vector, None).await.unwrap();

        let stored = store.all_vectors().await.unwrap();
        assert_eq!(stored[0].vector, vector);
    }

    #[tokio::test]
    async fn test_replace_clustering_drops_stale_clusters() {
        let store = MemoryStore::new();
        let (id, _) = store.upsert_article(&fields("1", "A")).await.unwrap();
        store.upsert_vector(id, &[1.0, 0.0], None).await.unwrap();

        let first = vec![ClusterRecord {
            label: 0,
            centroid: vec![1.0, 0.0],
            size: 1,
            velocity: 0.0,
        }];
        store.replace_clustering(&[(id, 0)], &first).await.unwrap();
        assert_eq!(store.list_clusters().await.unwrap().len(), 1);

        store.replace_clustering(&[(id, -1)], &[]).await.unwrap();
        assert!(store.list_clusters().await.unwrap().is_empty());

        let vectors = store.all_vectors().await.unwrap();
        assert_eq!(vectors[0].cluster_label, Some(-1));
    }
}
