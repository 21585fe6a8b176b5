//! Search entity
//!
//! One row per pipeline invocation; ids increase monotonically.
//! Searches are not deduplicated by content.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "searches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub search_id: i64,

    #[sea_orm(column_type = "Text")]
    pub idea_text: String,

    /// Final keyword string, semicolon-separated
    #[sea_orm(column_type = "Text")]
    pub keyword_text: String,

    pub max_results: i32,

    pub start_date: Option<Date>,

    pub end_date: Option<Date>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::search_article::Entity")]
    SearchArticles,

    #[sea_orm(has_one = "super::opportunity_score::Entity")]
    Score,

    #[sea_orm(has_many = "super::search_history::Entity")]
    History,
}

impl Related<super::opportunity_score::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Score.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
