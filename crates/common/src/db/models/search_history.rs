//! Score history entity
//!
//! Raw (pre-normalization) component values, one row appended per
//! scoring pass. The scorer percentile-ranks new searches against
//! this distribution; rows are never updated once written.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "search_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub search_id: i64,

    pub novelty_raw: f64,

    pub citation_raw: f64,

    pub recency_raw: f64,

    pub created_at: DateTimeWithTimeZone,
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
}

impl Related<super::search::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Search.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
