//! Repository pattern for database operations
//!
//! SeaORM implementation of the [`Store`] contract. Every mutating
//! operation runs in a single transaction; unique-violation conflicts
//! resolve to no-ops instead of surfacing.

use crate::db::models::*;
use crate::db::store::{
    merge_article, ArticleFields, ClusterRecord, DateRange, RawScores, ScoreRecord, Store,
};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    /// Apply the merged field values to an existing article row.
    async fn apply_merge(
        txn: &DatabaseTransaction,
        current: Article,
        fields: &ArticleFields,
    ) -> Result<i64> {
        let id = current.id;
        if let Some(merged) = merge_article(&current, fields) {
            let mut active: ArticleActiveModel = current.into();
            active.title = Set(merged.title);
            active.abstract_text = Set(merged.abstract_text);
            active.journal = Set(merged.journal);
            active.pub_date = Set(merged.pub_date);
            active.doi = Set(merged.doi);
            active.update(txn).await?;
        }
        Ok(id)
    }

    async fn find_by_pmid(txn: &DatabaseTransaction, pmid: &str) -> Result<Option<Article>> {
        ArticleEntity::find()
            .filter(ArticleColumn::Pmid.eq(pmid))
            .one(txn)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl Store for Repository {
    async fn upsert_article(&self, fields: &ArticleFields) -> Result<(i64, bool)> {
        let fields = fields.sanitized();
        if fields.pmid.is_empty() {
            return Err(AppError::Internal {
                message: "article upsert without a PMID".to_string(),
            });
        }

        let txn = self.conn().begin().await?;

        let result = match Self::find_by_pmid(&txn, &fields.pmid).await? {
            Some(current) => (Self::apply_merge(&txn, current, &fields).await?, false),
            None => {
                let active = ArticleActiveModel {
                    pmid: Set(fields.pmid.clone()),
                    title: Set(fields.title.clone()),
                    abstract_text: Set(fields.abstract_text.clone()),
                    journal: Set(fields.journal.clone()),
                    pub_date: Set(fields.pub_date),
                    doi: Set(fields.doi.clone()),
                    ..Default::default()
                };

                let insert = ArticleEntity::insert(active)
                    .on_conflict(
                        OnConflict::column(ArticleColumn::Pmid)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec(&txn)
                    .await;

                match insert {
                    Ok(res) => (res.last_insert_id, true),
                    // Lost a concurrent-insert race; merge into the winner.
                    Err(DbErr::RecordNotInserted) => {
                        let current =
                            Self::find_by_pmid(&txn, &fields.pmid).await?.ok_or_else(|| {
                                AppError::Internal {
                                    message: format!(
                                        "article {} vanished during upsert",
                                        fields.pmid
                                    ),
                                }
                            })?;
                        (Self::apply_merge(&txn, current, &fields).await?, false)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        txn.commit().await?;
        Ok(result)
    }

    async fn attach_authors(&self, article_id: i64, names: &[String]) -> Result<()> {
        let txn = self.conn().begin().await?;

        let mut author_ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            let existing = AuthorEntity::find()
                .filter(AuthorColumn::FullName.eq(name))
                .one(&txn)
                .await?;

            let author_id = match existing {
                Some(author) => author.id,
                None => {
                    let insert = AuthorEntity::insert(AuthorActiveModel {
                        full_name: Set(name.to_string()),
                        ..Default::default()
                    })
                    .on_conflict(
                        OnConflict::column(AuthorColumn::FullName)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec(&txn)
                    .await;

                    match insert {
                        Ok(res) => res.last_insert_id,
                        Err(DbErr::RecordNotInserted) => AuthorEntity::find()
                            .filter(AuthorColumn::FullName.eq(name))
                            .one(&txn)
                            .await?
                            .map(|a| a.id)
                            .ok_or_else(|| AppError::Internal {
                                message: format!("author {} vanished during upsert", name),
                            })?,
                        Err(e) => return Err(e.into()),
                    }
                }
            };
            author_ids.push(author_id);
        }

        if !author_ids.is_empty() {
            let links = author_ids.into_iter().map(|author_id| ArticleAuthorActiveModel {
                article_id: Set(article_id),
                author_id: Set(author_id),
            });

            ArticleAuthorEntity::insert_many(links)
                .on_conflict(
                    OnConflict::columns([
                        ArticleAuthorColumn::ArticleId,
                        ArticleAuthorColumn::AuthorId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn record_citation_snapshot(
        &self,
        article_id: i64,
        source: CitationOrigin,
        count: i32,
        observed_on: NaiveDate,
    ) -> Result<()> {
        let active = CitationActiveModel {
            article_id: Set(article_id),
            source: Set(source.as_str().to_string()),
            count: Set(count),
            last_update: Set(observed_on),
            ..Default::default()
        };

        CitationEntity::insert(active)
            .on_conflict(
                OnConflict::columns([CitationColumn::ArticleId, CitationColumn::Source])
                    .update_columns([CitationColumn::Count, CitationColumn::LastUpdate])
                    .to_owned(),
            )
            .exec_without_returning(self.conn())
            .await?;

        Ok(())
    }

    async fn record_yearly_citations(&self, article_id: i64, series: &[(i32, i32)]) -> Result<()> {
        let txn = self.conn().begin().await?;

        CitationsPerYearEntity::delete_many()
            .filter(CitationsPerYearColumn::ArticleId.eq(article_id))
            .exec(&txn)
            .await?;

        if !series.is_empty() {
            let rows = series
                .iter()
                .map(|&(year, citation_count)| CitationsPerYearActiveModel {
                    article_id: Set(article_id),
                    year: Set(year),
                    citation_count: Set(citation_count),
                    ..Default::default()
                });

            CitationsPerYearEntity::insert_many(rows)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn upsert_vector(
        &self,
        article_id: i64,
        vector: &[f32],
        cluster_label: Option<i32>,
    ) -> Result<()> {
        let active = ArticleVectorActiveModel {
            article_id: Set(article_id),
            vector: Set(vector.to_vec()),
            cluster_label: Set(cluster_label),
        };

        ArticleVectorEntity::insert(active)
            .on_conflict(
                OnConflict::column(ArticleVectorColumn::ArticleId)
                    .update_columns([
                        ArticleVectorColumn::Vector,
                        ArticleVectorColumn::ClusterLabel,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.conn())
            .await?;

        Ok(())
    }

    async fn create_search(
        &self,
        idea: &str,
        keywords: &str,
        max_results: i32,
        date_range: Option<DateRange>,
    ) -> Result<i64> {
        let active = SearchActiveModel {
            idea_text: Set(idea.to_string()),
            keyword_text: Set(keywords.to_string()),
            max_results: Set(max_results),
            start_date: Set(date_range.map(|(start, _)| start)),
            end_date: Set(date_range.map(|(_, end)| end)),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let res = SearchEntity::insert(active).exec(self.conn()).await?;
        Ok(res.last_insert_id)
    }

    async fn link_search_articles(&self, search_id: i64, article_ids: &[i64]) -> Result<()> {
        if article_ids.is_empty() {
            return Ok(());
        }

        let links = article_ids.iter().map(|&article_id| SearchArticleActiveModel {
            search_id: Set(search_id),
            article_id: Set(article_id),
        });

        SearchArticleEntity::insert_many(links)
            .on_conflict(
                OnConflict::columns([
                    SearchArticleColumn::SearchId,
                    SearchArticleColumn::ArticleId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.conn())
            .await?;

        Ok(())
    }

    async fn put_score(&self, search_id: i64, score: &ScoreRecord) -> Result<()> {
        let txn = self.conn().begin().await?;

        let active = OpportunityScoreActiveModel {
            search_id: Set(search_id),
            novelty_score: Set(score.novelty),
            citation_velocity_score: Set(score.velocity),
            recency_score: Set(score.recency),
            overall_score: Set(score.overall),
            computed_at: Set(Utc::now().into()),
        };

        OpportunityScoreEntity::insert(active)
            .on_conflict(
                OnConflict::column(OpportunityScoreColumn::SearchId)
                    .update_columns([
                        OpportunityScoreColumn::NoveltyScore,
                        OpportunityScoreColumn::CitationVelocityScore,
                        OpportunityScoreColumn::RecencyScore,
                        OpportunityScoreColumn::OverallScore,
                        OpportunityScoreColumn::ComputedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let history = SearchHistoryActiveModel {
            search_id: Set(search_id),
            novelty_raw: Set(score.raw.novelty),
            citation_raw: Set(score.raw.citation),
            recency_raw: Set(score.raw.recency),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        SearchHistoryEntity::insert(history)
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    async fn replace_clustering(
        &self,
        assignments: &[(i64, i32)],
        clusters: &[ClusterRecord],
    ) -> Result<()> {
        let txn = self.conn().begin().await?;

        for &(article_id, label) in assignments {
            ArticleVectorEntity::update_many()
                .col_expr(ArticleVectorColumn::ClusterLabel, Expr::value(label))
                .filter(ArticleVectorColumn::ArticleId.eq(article_id))
                .exec(&txn)
                .await?;
        }

        for cluster in clusters {
            let active = ClusterActiveModel {
                cluster_label: Set(cluster.label),
                centroid: Set(cluster.centroid.clone()),
                size: Set(cluster.size),
                velocity: Set(cluster.velocity),
                last_updated: Set(Utc::now().into()),
            };

            ClusterEntity::insert(active)
                .on_conflict(
                    OnConflict::column(ClusterColumn::ClusterLabel)
                        .update_columns([
                            ClusterColumn::Centroid,
                            ClusterColumn::Size,
                            ClusterColumn::Velocity,
                            ClusterColumn::LastUpdated,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        // Clusters without surviving members are removed.
        let live_labels: Vec<i32> = clusters.iter().map(|c| c.label).collect();
        let delete = if live_labels.is_empty() {
            ClusterEntity::delete_many()
        } else {
            ClusterEntity::delete_many()
                .filter(ClusterColumn::ClusterLabel.is_not_in(live_labels))
        };
        delete.exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Reads
    // ----------------------------------------------------------------------

    async fn list_articles(&self, offset: u64, limit: u64) -> Result<(Vec<Article>, u64)> {
        let limit = limit.max(1);
        let paginator = ArticleEntity::find()
            .order_by_asc(ArticleColumn::Id)
            .paginate(self.conn(), limit);

        let total = paginator.num_items().await?;
        let articles = paginator.fetch_page(offset / limit).await?;

        Ok((articles, total))
    }

    async fn get_article(&self, pmid: &str) -> Result<Option<Article>> {
        ArticleEntity::find()
            .filter(ArticleColumn::Pmid.eq(pmid))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn list_searches(&self, offset: u64, limit: u64) -> Result<(Vec<Search>, u64)> {
        let limit = limit.max(1);
        let paginator = SearchEntity::find()
            .order_by_desc(SearchColumn::SearchId)
            .paginate(self.conn(), limit);

        let total = paginator.num_items().await?;
        let searches = paginator.fetch_page(offset / limit).await?;

        Ok((searches, total))
    }

    async fn get_search(&self, search_id: i64) -> Result<Option<Search>> {
        SearchEntity::find_by_id(search_id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn articles_of_search(&self, search_id: i64) -> Result<Vec<Article>> {
        let links = SearchArticleEntity::find()
            .filter(SearchArticleColumn::SearchId.eq(search_id))
            .all(self.conn())
            .await?;

        let ids: Vec<i64> = links.into_iter().map(|l| l.article_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        ArticleEntity::find()
            .filter(ArticleColumn::Id.is_in(ids))
            .order_by_asc(ArticleColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn vectors_of_search(&self, search_id: i64) -> Result<Vec<ArticleVector>> {
        let links = SearchArticleEntity::find()
            .filter(SearchArticleColumn::SearchId.eq(search_id))
            .all(self.conn())
            .await?;

        let ids: Vec<i64> = links.into_iter().map(|l| l.article_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        ArticleVectorEntity::find()
            .filter(ArticleVectorColumn::ArticleId.is_in(ids))
            .order_by_asc(ArticleVectorColumn::ArticleId)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn all_vectors(&self) -> Result<Vec<ArticleVector>> {
        ArticleVectorEntity::find()
            .order_by_asc(ArticleVectorColumn::ArticleId)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn yearly_citations(&self, article_id: i64) -> Result<Vec<(i32, i32)>> {
        let rows = CitationsPerYearEntity::find()
            .filter(CitationsPerYearColumn::ArticleId.eq(article_id))
            .order_by_asc(CitationsPerYearColumn::Year)
            .all(self.conn())
            .await?;

        Ok(rows.into_iter().map(|r| (r.year, r.citation_count)).collect())
    }

    async fn get_score(&self, search_id: i64) -> Result<Option<OpportunityScore>> {
        OpportunityScoreEntity::find_by_id(search_id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn raw_score_history(&self) -> Result<Vec<RawScores>> {
        let rows = SearchHistoryEntity::find()
            .order_by_asc(SearchHistoryColumn::Id)
            .all(self.conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| RawScores {
                novelty: r.novelty_raw,
                citation: r.citation_raw,
                recency: r.recency_raw,
            })
            .collect())
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        ClusterEntity::find()
            .order_by_asc(ClusterColumn::ClusterLabel)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }
}
