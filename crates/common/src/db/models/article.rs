//! Article entity
//!
//! Keyed by a surrogate id; the external corpus identifier (PMID) is
//! globally unique. Rows are never deleted by the pipeline and fields
//! are only ever overwritten with non-empty values.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text", unique)]
    pub pmid: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_name = "abstract", column_type = "Text", nullable)]
    pub abstract_text: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub doi: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub journal: Option<String>,

    pub pub_date: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::article_author::Entity")]
    ArticleAuthors,

    #[sea_orm(has_many = "super::citation::Entity")]
    Citations,

    #[sea_orm(has_many = "super::citations_per_year::Entity")]
    CitationsPerYear,

    #[sea_orm(has_one = "super::article_vector::Entity")]
    Vector,

    #[sea_orm(has_many = "super::search_article::Entity")]
    SearchArticles,
}

impl Related<super::article_vector::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vector.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Text fed to the embedder: title plus abstract when present.
    pub fn embedding_text(&self) -> String {
        match self.abstract_text.as_deref() {
            Some(abstract_text) if !abstract_text.trim().is_empty() => {
                format!("{}\n{}", self.title, abstract_text)
            }
            _ => self.title.clone(),
        }
    }
}
