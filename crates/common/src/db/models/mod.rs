//! SeaORM entity models
//!
//! One entity per table of the PrimeLit schema.

mod article;
mod article_author;
mod article_vector;
mod author;
mod citation;
mod citations_per_year;
mod cluster;
mod opportunity_score;
mod search;
mod search_article;
mod search_history;

pub use article::{
    Column as ArticleColumn, Entity as ArticleEntity, Model as Article,
    ActiveModel as ArticleActiveModel,
};

pub use author::{
    normalize_name, Column as AuthorColumn, Entity as AuthorEntity, Model as Author,
    ActiveModel as AuthorActiveModel,
};

pub use article_author::{
    Column as ArticleAuthorColumn, Entity as ArticleAuthorEntity, Model as ArticleAuthor,
    ActiveModel as ArticleAuthorActiveModel,
};

pub use citation::{
    CitationOrigin, Column as CitationColumn, Entity as CitationEntity, Model as Citation,
    ActiveModel as CitationActiveModel,
};

pub use citations_per_year::{
    Column as CitationsPerYearColumn, Entity as CitationsPerYearEntity, Model as CitationsPerYear,
    ActiveModel as CitationsPerYearActiveModel,
};

pub use article_vector::{
    Column as ArticleVectorColumn, Entity as ArticleVectorEntity, Model as ArticleVector,
    ActiveModel as ArticleVectorActiveModel, NOISE_LABEL,
};

pub use cluster::{
    Column as ClusterColumn, Entity as ClusterEntity, Model as Cluster,
    ActiveModel as ClusterActiveModel,
};

pub use search::{
    Column as SearchColumn, Entity as SearchEntity, Model as Search,
    ActiveModel as SearchActiveModel,
};

pub use search_article::{
    Column as SearchArticleColumn, Entity as SearchArticleEntity, Model as SearchArticle,
    ActiveModel as SearchArticleActiveModel,
};

pub use opportunity_score::{
    Column as OpportunityScoreColumn, Entity as OpportunityScoreEntity, Model as OpportunityScore,
    ActiveModel as OpportunityScoreActiveModel,
};

pub use search_history::{
    Column as SearchHistoryColumn, Entity as SearchHistoryEntity, Model as SearchHistory,
    ActiveModel as SearchHistoryActiveModel,
};
