//! Citation snapshot entity
//!
//! Latest known total citation count per (article, source). Newer
//! observations overwrite older ones for the same pair.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Closed enumeration of citation sources
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationOrigin {
    Crossref,
    OpenAlex,
}

impl CitationOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationOrigin::Crossref => "crossref",
            CitationOrigin::OpenAlex => "openalex",
        }
    }
}

impl From<String> for CitationOrigin {
    fn from(s: String) -> Self {
        match s.as_str() {
            "openalex" => CitationOrigin::OpenAlex,
            _ => CitationOrigin::Crossref,
        }
    }
}

impl From<CitationOrigin> for String {
    fn from(origin: CitationOrigin) -> Self {
        origin.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "citations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub article_id: i64,

    #[sea_orm(column_type = "Text")]
    pub source: String,

    pub count: i32,

    pub last_update: Date,
}

impl Model {
    /// Get the source as an enum
    pub fn origin(&self) -> CitationOrigin {
        CitationOrigin::from(self.source.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::ArticleId",
        to = "super::article::Column::Id",
        on_delete = "Cascade"
    )]
    Article,
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
