//! Cluster entity
//!
//! One row per non-noise cluster label. The noise label -1 is never
//! persisted here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clusters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub cluster_label: i32,

    pub centroid: Vec<f32>,

    pub size: i32,

    /// Mean forward citation slope of the member articles
    pub velocity: f64,

    pub last_updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
