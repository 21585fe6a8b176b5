//! PrimeLit Analysis
//!
//! The scoring half of the pipeline:
//! - Cluster manager (seeded projection + density clustering)
//! - Citation trajectory engine (forward citation slope)
//! - Opportunity scorer (novelty / velocity / recency with
//!   empirical-CDF normalization)

pub mod cluster;
pub mod scorer;
pub mod trajectory;

pub use cluster::{ClusterManager, ClusterSummary};
pub use scorer::Scorer;
pub use trajectory::forward_slope;
