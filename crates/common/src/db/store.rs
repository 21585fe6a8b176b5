//! Store capability interface
//!
//! The transactional persistence contract consumed by the ingest and
//! scoring pipelines. `Repository` is the production implementation;
//! `MemoryStore` backs tests with identical semantics.

use crate::db::models::{
    Article, ArticleVector, CitationOrigin, Cluster, OpportunityScore, Search,
};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Inclusive publication-date filter
pub type DateRange = (NaiveDate, NaiveDate);

/// Incoming article metadata, keyed by PMID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFields {
    pub pmid: String,
    pub title: String,
    pub abstract_text: Option<String>,
    pub journal: Option<String>,
    pub pub_date: Option<NaiveDate>,
    pub doi: Option<String>,
}

impl ArticleFields {
    /// Trim whitespace and drop empty optional fields so that empty
    /// upstream values can never clear existing data.
    pub fn sanitized(&self) -> ArticleFields {
        fn clean(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        ArticleFields {
            pmid: self.pmid.trim().to_string(),
            title: self.title.trim().to_string(),
            abstract_text: clean(&self.abstract_text),
            journal: clean(&self.journal),
            pub_date: self.pub_date,
            doi: clean(&self.doi),
        }
    }
}

/// Merged field values for an article update; `None` when the upsert
/// would not change the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedArticle {
    pub title: String,
    pub abstract_text: Option<String>,
    pub journal: Option<String>,
    pub pub_date: Option<NaiveDate>,
    pub doi: Option<String>,
}

/// Merge incoming fields into an existing row. Non-empty incoming
/// values overwrite; empty values never clear. Returns `None` when the
/// result is identical to the current row, so identical upserts stay
/// observable no-ops.
pub fn merge_article(current: &Article, incoming: &ArticleFields) -> Option<MergedArticle> {
    let incoming = incoming.sanitized();

    let merged = MergedArticle {
        title: if incoming.title.is_empty() {
            current.title.clone()
        } else {
            incoming.title
        },
        abstract_text: incoming
            .abstract_text
            .or_else(|| current.abstract_text.clone()),
        journal: incoming.journal.or_else(|| current.journal.clone()),
        pub_date: incoming.pub_date.or(current.pub_date),
        doi: incoming.doi.or_else(|| current.doi.clone()),
    };

    let unchanged = merged.title == current.title
        && merged.abstract_text == current.abstract_text
        && merged.journal == current.journal
        && merged.pub_date == current.pub_date
        && merged.doi == current.doi;

    if unchanged {
        None
    } else {
        Some(merged)
    }
}

/// Raw (pre-normalization) component values of one scoring pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawScores {
    pub novelty: f64,
    pub citation: f64,
    pub recency: f64,
}

/// A complete scoring result: normalized components plus the raw
/// values appended to history in the same transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub novelty: f64,
    pub velocity: f64,
    pub recency: f64,
    pub overall: f64,
    pub raw: RawScores,
}

/// One cluster to persist after a clustering pass
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub label: i32,
    pub centroid: Vec<f32>,
    pub size: i32,
    pub velocity: f64,
}

/// Transactional persistence for the pipeline.
///
/// Every mutating operation runs in a single transaction; partial
/// failure leaves no observable state change. Unique violations on
/// PMID or (search_id, article_id) are no-ops, never errors.
#[async_trait]
pub trait Store: Send + Sync {
    /// Upsert an article by PMID. Returns the article id and whether
    /// the row was created by this call.
    async fn upsert_article(&self, fields: &ArticleFields) -> Result<(i64, bool)>;

    /// Ensure author rows exist (by normalized name) and link them to
    /// the article. Idempotent.
    async fn attach_authors(&self, article_id: i64, names: &[String]) -> Result<()>;

    /// Replace the citation snapshot for (article, source).
    async fn record_citation_snapshot(
        &self,
        article_id: i64,
        source: CitationOrigin,
        count: i32,
        observed_on: NaiveDate,
    ) -> Result<()>;

    /// Replace the yearly citation series of the article atomically.
    async fn record_yearly_citations(&self, article_id: i64, series: &[(i32, i32)]) -> Result<()>;

    /// Upsert the embedding (and cluster label) of an article.
    async fn upsert_vector(
        &self,
        article_id: i64,
        vector: &[f32],
        cluster_label: Option<i32>,
    ) -> Result<()>;

    /// Create a search row; ids increase monotonically.
    async fn create_search(
        &self,
        idea: &str,
        keywords: &str,
        max_results: i32,
        date_range: Option<DateRange>,
    ) -> Result<i64>;

    /// Link articles to a search; duplicates are ignored.
    async fn link_search_articles(&self, search_id: i64, article_ids: &[i64]) -> Result<()>;

    /// Overwrite the opportunity score of a search and append the raw
    /// values to the score history in the same transaction.
    async fn put_score(&self, search_id: i64, score: &ScoreRecord) -> Result<()>;

    /// Rewrite every vector's cluster label, upsert the given cluster
    /// rows, and delete clusters that no longer have members, in one
    /// transaction.
    async fn replace_clustering(
        &self,
        assignments: &[(i64, i32)],
        clusters: &[ClusterRecord],
    ) -> Result<()>;

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    async fn list_articles(&self, offset: u64, limit: u64) -> Result<(Vec<Article>, u64)>;

    async fn get_article(&self, pmid: &str) -> Result<Option<Article>>;

    async fn list_searches(&self, offset: u64, limit: u64) -> Result<(Vec<Search>, u64)>;

    async fn get_search(&self, search_id: i64) -> Result<Option<Search>>;

    async fn articles_of_search(&self, search_id: i64) -> Result<Vec<Article>>;

    async fn vectors_of_search(&self, search_id: i64) -> Result<Vec<ArticleVector>>;

    async fn all_vectors(&self) -> Result<Vec<ArticleVector>>;

    async fn yearly_citations(&self, article_id: i64) -> Result<Vec<(i32, i32)>>;

    async fn get_score(&self, search_id: i64) -> Result<Option<OpportunityScore>>;

    /// Full raw score history, oldest first.
    async fn raw_score_history(&self) -> Result<Vec<RawScores>>;

    async fn list_clusters(&self) -> Result<Vec<Cluster>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current() -> Article {
        Article {
            id: 1,
            pmid: "12345".into(),
            title: "Original title".into(),
            abstract_text: Some("Original abstract".into()),
            doi: None,
            journal: Some("Nature".into()),
            pub_date: None,
        }
    }

    #[test]
    fn test_identical_upsert_is_noop() {
        let row = current();
        let incoming = ArticleFields {
            pmid: "12345".into(),
            title: "Original title".into(),
            abstract_text: Some("Original abstract".into()),
            journal: Some("Nature".into()),
            pub_date: None,
            doi: None,
        };
        assert_eq!(merge_article(&row, &incoming), None);
    }

    #[test]
    fn test_empty_fields_never_clear() {
        let row = current();
        let incoming = ArticleFields {
            pmid: "12345".into(),
            title: "".into(),
            abstract_text: Some("  ".into()),
            journal: None,
            pub_date: None,
            doi: None,
        };
        assert_eq!(merge_article(&row, &incoming), None);
    }

    #[test]
    fn test_richer_fetch_fills_gaps() {
        let row = current();
        let incoming = ArticleFields {
            pmid: "12345".into(),
            title: "Original title".into(),
            abstract_text: None,
            journal: None,
            pub_date: NaiveDate::from_ymd_opt(2023, 4, 1),
            doi: Some("10.1000/xyz".into()),
        };
        let merged = merge_article(&row, &incoming).expect("fields changed");
        assert_eq!(merged.doi.as_deref(), Some("10.1000/xyz"));
        assert_eq!(merged.pub_date, NaiveDate::from_ymd_opt(2023, 4, 1));
        // Untouched fields survive
        assert_eq!(merged.abstract_text.as_deref(), Some("Original abstract"));
        assert_eq!(merged.journal.as_deref(), Some("Nature"));
    }

    #[test]
    fn test_non_empty_overwrites() {
        let row = current();
        let incoming = ArticleFields {
            pmid: "12345".into(),
            title: "Corrected title".into(),
            abstract_text: Some("Expanded abstract".into()),
            journal: None,
            pub_date: None,
            doi: None,
        };
        let merged = merge_article(&row, &incoming).expect("fields changed");
        assert_eq!(merged.title, "Corrected title");
        assert_eq!(merged.abstract_text.as_deref(), Some("Expanded abstract"));
    }

    #[test]
    fn test_sanitized_drops_blank_options() {
        let fields = ArticleFields {
            pmid: " 99 ".into(),
            title: "  T  ".into(),
            abstract_text: Some("".into()),
            journal: Some("  ".into()),
            pub_date: None,
            doi: Some(" 10.1/abc ".into()),
        };
        let clean = fields.sanitized();
        assert_eq!(clean.pmid, "99");
        assert_eq!(clean.title, "T");
        assert_eq!(clean.abstract_text, None);
        assert_eq!(clean.journal, None);
        assert_eq!(clean.doi.as_deref(), Some("10.1/abc"));
    }
}
