//! Author entity
//!
//! Deduplicated across the corpus by normalized full name; homonym
//! collisions are accepted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "authors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text", unique)]
    pub full_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::article_author::Entity")]
    ArticleAuthors,
}

impl ActiveModelBehavior for ActiveModel {}

/// Normalize an author name for deduplication: case-folded,
/// whitespace-collapsed.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Jane   Q.  Doe "), "jane q. doe");
        assert_eq!(normalize_name("SMITH, John"), "smith, john");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_normalize_name_is_idempotent() {
        let once = normalize_name("Ada  LOVELACE");
        assert_eq!(normalize_name(&once), once);
    }
}
