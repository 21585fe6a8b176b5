//! Opportunity score entity
//!
//! One-to-one with a search; absent until background scoring has
//! completed. All four components are normalized to [0, 1].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "opportunity_scores")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub search_id: i64,

    pub novelty_score: f64,

    pub citation_velocity_score: f64,

    pub recency_score: f64,

    pub overall_score: f64,

    pub computed_at: DateTimeWithTimeZone,
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
