//! Search-article join entity
//!
//! An article belongs to a search iff it was returned by (or
//! re-matched by) that search. Duplicates are ignored on insert.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "search_articles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub search_id: i64,

    #[sea_orm(primary_key, auto_increment = false)]
    pub article_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::search::Entity",
        from = "Column::SearchId",
        to = "super::search::Column::SearchId",
        on_delete = "Cascade"
    )]
    Search,

    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::ArticleId",
        to = "super::article::Column::Id",
        on_delete = "Cascade"
    )]
    Article,
}

impl Related<super::search::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Search.def()
    }
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
