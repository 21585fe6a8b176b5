//! Article vector entity
//!
//! Exactly one embedding per article, stored as a native real[]
//! column. The cluster label is null until the first clustering pass;
//! -1 marks noise points that belong to no cluster.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Label reserved for points the clusterer rejects as noise
pub const NOISE_LABEL: i32 = -1;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "article_vectors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub article_id: i64,

    pub vector: Vec<f32>,

    pub cluster_label: Option<i32>,
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

impl Model {
    /// Whether the vector currently belongs to a cluster
    pub fn is_clustered(&self) -> bool {
        matches!(self.cluster_label, Some(label) if label != NOISE_LABEL)
    }
}
