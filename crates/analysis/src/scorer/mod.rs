//! Opportunity scorer
//!
//! Computes the raw novelty, citation-velocity, and recency values of
//! one search, normalizes each against the full raw-score history via
//! its empirical CDF position, and persists the combined opportunity
//! score. Percentile normalization is a design contract: it is robust
//! to outliers and needs no tuning parameter, unlike min-max scaling.

use crate::trajectory::forward_slope;
use chrono::{Datelike, Utc};
use primelit_common::config::ScoringConfig;
use primelit_common::db::{RawScores, ScoreRecord, Store};
use primelit_common::errors::{AppError, Result};
use primelit_common::metrics::record_scoring;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Scores one search against the corpus and the score history
pub struct Scorer {
    store: Arc<dyn Store>,
    config: ScoringConfig,
}

impl Scorer {
    pub fn new(store: Arc<dyn Store>, config: ScoringConfig) -> Self {
        Self { store, config }
    }

    /// Score one search and persist the result. Idempotent: re-running
    /// overwrites the score and appends another history row.
    #[instrument(skip(self))]
    pub async fn score_search(&self, search_id: i64) -> Result<ScoreRecord> {
        let started = Instant::now();

        self.store
            .get_search(search_id)
            .await?
            .ok_or(AppError::SearchNotFound { id: search_id })?;

        let raw = self.raw_scores(search_id).await?;

        // Append the new raws before normalizing so at least one
        // sample always exists.
        let mut history = self.store.raw_score_history().await?;
        history.push(raw);

        let novelty = empirical_cdf(history.iter().map(|r| r.novelty), raw.novelty);
        let velocity = empirical_cdf(history.iter().map(|r| r.citation), raw.citation);
        let recency = empirical_cdf(history.iter().map(|r| r.recency), raw.recency);

        let overall = (self.config.novelty_weight * novelty
            + self.config.velocity_weight * velocity
            + self.config.recency_weight * recency)
            .clamp(0.0, 1.0);

        let record = ScoreRecord {
            novelty,
            velocity,
            recency,
            overall,
            raw,
        };

        self.store.put_score(search_id, &record).await?;

        record_scoring(started.elapsed().as_secs_f64());
        info!(
            search_id = search_id,
            novelty = novelty,
            velocity = velocity,
            recency = recency,
            overall = overall,
            "Search scored"
        );

        Ok(record)
    }

    /// Compute the raw component values of one search.
    async fn raw_scores(&self, search_id: i64) -> Result<RawScores> {
        let search_vectors = self.store.vectors_of_search(search_id).await?;
        let all_vectors = self.store.all_vectors().await?;

        let in_search: HashSet<i64> = search_vectors.iter().map(|v| v.article_id).collect();
        let targets: Vec<&[f32]> = search_vectors.iter().map(|v| v.vector.as_slice()).collect();
        let complement: Vec<&[f32]> = all_vectors
            .iter()
            .filter(|v| !in_search.contains(&v.article_id))
            .map(|v| v.vector.as_slice())
            .collect();

        let novelty = mean_nn_distance(&targets, &complement);

        let articles = self.store.articles_of_search(search_id).await?;

        let mut slopes = Vec::with_capacity(articles.len());
        for article in &articles {
            let series = self.store.yearly_citations(article.id).await?;
            slopes.push(forward_slope(&series));
        }
        let citation = if slopes.is_empty() {
            0.0
        } else {
            (slopes.iter().sum::<f64>() / slopes.len() as f64).max(0.0)
        };

        let current_year = Utc::now().date_naive().year();
        let pub_years: Vec<Option<i32>> =
            articles.iter().map(|a| a.pub_date.map(|d| d.year())).collect();
        let recency = recency_raw(&pub_years, current_year, self.config.recency_tau_years);

        Ok(RawScores {
            novelty,
            citation,
            recency,
        })
    }
}

/// Cosine distance in [0, 2]; zero-norm vectors are maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Mean nearest-neighbor cosine distance from each target to the pool.
/// Fewer than two targets, or an empty pool, yields maximal novelty.
pub fn mean_nn_distance(targets: &[&[f32]], pool: &[&[f32]]) -> f64 {
    if targets.len() < 2 || pool.is_empty() {
        return 1.0;
    }

    let total: f64 = targets
        .iter()
        .map(|target| {
            pool.iter()
                .map(|candidate| cosine_distance(target, candidate))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();

    total / targets.len() as f64
}

/// Mean of exp(-age/tau) over articles; missing publication dates
/// contribute zero, future dates count as age zero.
pub fn recency_raw(pub_years: &[Option<i32>], current_year: i32, tau: f64) -> f64 {
    if pub_years.is_empty() {
        return 0.0;
    }

    let total: f64 = pub_years
        .iter()
        .map(|year| match year {
            Some(year) => {
                let age = f64::from((current_year - year).max(0));
                (-age / tau).exp()
            }
            None => 0.0,
        })
        .sum();

    total / pub_years.len() as f64
}

/// Empirical CDF position of `x` within `history` (which already
/// contains `x`), clamped to [0, 1].
pub fn empirical_cdf(history: impl Iterator<Item = f64>, x: f64) -> f64 {
    let mut total = 0usize;
    let mut at_or_below = 0usize;

    for value in history {
        total += 1;
        if value <= x {
            at_or_below += 1;
        }
    }

    (at_or_below as f64 / total.max(1) as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use primelit_common::db::{ArticleFields, MemoryStore};

    #[test]
    fn test_cosine_distance() {
        let a = [1.0f32, 0.0];
        let b = [0.0f32, 1.0];
        let c = [1.0f32, 0.0];

        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-9);
        assert!(cosine_distance(&a, &c).abs() < 1e-9);
        assert!((cosine_distance(&a, &[-1.0, 0.0]) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_vector_is_maximally_distant() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_mean_nn_distance_boundaries() {
        let a: Vec<&[f32]> = vec![&[1.0, 0.0]];
        let pool: Vec<&[f32]> = vec![&[0.0, 1.0]];

        // Fewer than two targets
        assert_eq!(mean_nn_distance(&a, &pool), 1.0);

        // Empty complement
        let two: Vec<&[f32]> = vec![&[1.0, 0.0], &[0.0, 1.0]];
        assert_eq!(mean_nn_distance(&two, &[]), 1.0);

        // Empty search set
        assert_eq!(mean_nn_distance(&[], &pool), 1.0);
    }

    #[test]
    fn test_mean_nn_distance_uses_nearest() {
        let targets: Vec<&[f32]> = vec![&[1.0, 0.0], &[0.0, 1.0]];
        let pool: Vec<&[f32]> = vec![&[1.0, 0.0], &[-1.0, 0.0]];

        // First target matches exactly (distance 0); second target's
        // nearest is orthogonal (distance 1)
        let result = mean_nn_distance(&targets, &pool);
        assert!((result - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_recency_raw() {
        let tau = 5.0;

        // Published today contributes 1.0
        assert!((recency_raw(&[Some(2025)], 2025, tau) - 1.0).abs() < 1e-9);

        // Missing date contributes 0
        assert_eq!(recency_raw(&[None], 2025, tau), 0.0);

        // Seed scenario: ages 1, 1, 4 over three articles
        let expected = ((-1.0f64 / tau).exp() * 2.0 + (-4.0f64 / tau).exp()) / 3.0;
        let result = recency_raw(&[Some(2024), Some(2024), Some(2021)], 2025, tau);
        assert!((result - expected).abs() < 1e-9);

        // Empty set
        assert_eq!(recency_raw(&[], 2025, tau), 0.0);

        // Future dates clamp to age zero
        assert!((recency_raw(&[Some(2030)], 2025, tau) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empirical_cdf() {
        let history = [0.1, 0.2, 0.3, 0.4, 0.5];

        assert!((empirical_cdf(history.iter().copied(), 0.5) - 1.0).abs() < 1e-9);
        assert!((empirical_cdf(history.iter().copied(), 0.1) - 0.2).abs() < 1e-9);
        assert!((empirical_cdf(history.iter().copied(), 0.3) - 0.6).abs() < 1e-9);

        // Singleton history: always 1.0
        assert_eq!(empirical_cdf([0.7].into_iter(), 0.7), 1.0);
    }

    #[test]
    fn test_empirical_cdf_uniform_history_centers_on_half() {
        // 101 evenly spaced values; 0.5 sits in the middle
        let history: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
        let result = empirical_cdf(history.iter().copied(), 0.5);
        assert!((result - 0.505).abs() < 0.02);
    }

    async fn seed_search(
        store: &MemoryStore,
        pmid_offset: usize,
        vectors: &[Vec<f32>],
        pub_date: Option<NaiveDate>,
    ) -> i64 {
        let search_id = store.create_search("idea", "kw", 10, None).await.unwrap();
        for (i, vector) in vectors.iter().enumerate() {
            let fields = ArticleFields {
                pmid: format!("{}", pmid_offset + i),
                title: format!("Article {}", pmid_offset + i),
                pub_date,
                ..Default::default()
            };
            let (id, _) = store.upsert_article(&fields).await.unwrap();
            store.upsert_vector(id, vector, None).await.unwrap();
            store.link_search_articles(search_id, &[id]).await.unwrap();
        }
        search_id
    }

    #[tokio::test]
    async fn test_first_search_normalizes_to_one() {
        let store = Arc::new(MemoryStore::new());
        let search_id = seed_search(
            &store,
            1,
            &[vec![1.0, 0.0], vec![0.9, 0.1]],
            NaiveDate::from_ymd_opt(2024, 6, 1),
        )
        .await;

        let scorer = Scorer::new(store.clone(), ScoringConfig::default());
        let record = scorer.score_search(search_id).await.unwrap();

        // Empty complement: raw novelty 1.0; first history entry: all
        // normalized components 1.0, overall 1.0
        assert!((record.raw.novelty - 1.0).abs() < 1e-9);
        assert!((record.novelty - 1.0).abs() < 1e-9);
        assert!((record.velocity - 1.0).abs() < 1e-9);
        assert!((record.recency - 1.0).abs() < 1e-9);
        assert!((record.overall - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_search_boundary_values() {
        let store = Arc::new(MemoryStore::new());
        let search_id = store.create_search("idea", "kw", 10, None).await.unwrap();

        let scorer = Scorer::new(store.clone(), ScoringConfig::default());
        let record = scorer.score_search(search_id).await.unwrap();

        assert_eq!(record.raw.novelty, 1.0);
        assert_eq!(record.raw.citation, 0.0);
        assert_eq!(record.raw.recency, 0.0);
    }

    #[tokio::test]
    async fn test_overall_is_convex_combination() {
        let store = Arc::new(MemoryStore::new());
        // Pre-existing history so normalization is nontrivial
        for i in 0..10 {
            store.push_history(RawScores {
                novelty: i as f64 / 10.0,
                citation: i as f64,
                recency: i as f64 / 20.0,
            });
        }

        let search_id = seed_search(
            &store,
            1,
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
            NaiveDate::from_ymd_opt(2023, 1, 1),
        )
        .await;

        let scorer = Scorer::new(store.clone(), ScoringConfig::default());
        let record = scorer.score_search(search_id).await.unwrap();

        for value in [
            record.novelty,
            record.velocity,
            record.recency,
            record.overall,
        ] {
            assert!((0.0..=1.0).contains(&value));
        }

        let expected = 0.4 * record.novelty + 0.4 * record.velocity + 0.2 * record.recency;
        assert!((record.overall - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_normalization_against_uniform_history() {
        let store = Arc::new(MemoryStore::new());
        // 100 historical searches with raw novelty uniform in [0, 1]
        for i in 0..100 {
            store.push_history(RawScores {
                novelty: i as f64 / 99.0,
                citation: 0.0,
                recency: 0.0,
            });
        }

        // A search whose raw novelty lands at 1.0 (empty complement)
        // ranks at the top of the distribution; verify the CDF math on
        // the middle instead.
        let history = store.raw_score_history().await.unwrap();
        let mut novelty: Vec<f64> = history.iter().map(|r| r.novelty).collect();
        novelty.push(0.5);
        let normalized = empirical_cdf(novelty.iter().copied(), 0.5);
        assert!((normalized - 0.5).abs() < 0.02);
    }

    #[tokio::test]
    async fn test_rescore_appends_history() {
        let store = Arc::new(MemoryStore::new());
        let search_id = seed_search(
            &store,
            1,
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
            None,
        )
        .await;

        let scorer = Scorer::new(store.clone(), ScoringConfig::default());
        let first = scorer.score_search(search_id).await.unwrap();
        let second = scorer.score_search(search_id).await.unwrap();

        // Identical raw values, one more history row
        assert_eq!(first.raw, second.raw);
        assert_eq!(store.raw_score_history().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_search_errors() {
        let store = Arc::new(MemoryStore::new());
        let scorer = Scorer::new(store, ScoringConfig::default());

        let err = scorer.score_search(999).await.unwrap_err();
        assert!(matches!(err, AppError::SearchNotFound { id: 999 }));
    }
}
