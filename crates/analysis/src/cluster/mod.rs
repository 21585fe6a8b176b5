//! Cluster manager
//!
//! Maintains a valid clustering of the full article-vector population.
//! Every pass recomputes from scratch: project all vectors down with a
//! seeded random projection, run density clustering, then rewrite
//! labels, centroids, sizes, and velocities in one store transaction.
//! Incremental labeling is deliberately not attempted.

mod density;
mod projection;

pub use density::{cluster, DensityConfig, NOISE};
pub use projection::RandomProjection;

use crate::trajectory::forward_slope;
use primelit_common::config::ClusteringConfig;
use primelit_common::db::{ClusterRecord, Store};
use primelit_common::errors::Result;
use primelit_common::metrics::record_clustering;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Result of one clustering pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterSummary {
    pub clusters: usize,
    pub noise: usize,
    pub total: usize,
}

/// Recomputes the clustering of all article vectors
pub struct ClusterManager {
    store: Arc<dyn Store>,
    config: ClusteringConfig,
}

impl ClusterManager {
    pub fn new(store: Arc<dyn Store>, config: ClusteringConfig) -> Self {
        Self { store, config }
    }

    /// Run one full clustering pass.
    #[instrument(skip(self))]
    pub async fn rebuild(&self) -> Result<ClusterSummary> {
        let started = Instant::now();

        let vectors = self.store.all_vectors().await?;
        let total = vectors.len();

        if vectors.is_empty() {
            self.store.replace_clustering(&[], &[]).await?;
            record_clustering(started.elapsed().as_secs_f64(), 0, 0);
            return Ok(ClusterSummary {
                clusters: 0,
                noise: 0,
                total: 0,
            });
        }

        let input_dim = vectors[0].vector.len();
        let projection = RandomProjection::new(
            input_dim,
            self.config.projection_dims,
            self.config.random_seed,
        );

        let projected: Vec<Vec<f32>> = vectors
            .iter()
            .map(|v| projection.project(&v.vector))
            .collect();

        let labels = cluster(
            &projected,
            &DensityConfig {
                min_cluster_size: self.config.min_cluster_size,
                n_neighbors: self.config.n_neighbors,
            },
        );

        let assignments: Vec<(i64, i32)> = vectors
            .iter()
            .zip(labels.iter())
            .map(|(v, &label)| (v.article_id, label))
            .collect();

        // Group members per non-noise label
        let mut members: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (index, &label) in labels.iter().enumerate() {
            if label != NOISE {
                members.entry(label).or_default().push(index);
            }
        }

        let mut cluster_records = Vec::with_capacity(members.len());
        for (&label, indices) in &members {
            let centroid = centroid(indices.iter().map(|&i| vectors[i].vector.as_slice()));

            let mut slopes = Vec::with_capacity(indices.len());
            for &index in indices {
                let series = self.store.yearly_citations(vectors[index].article_id).await?;
                slopes.push(forward_slope(&series));
            }
            let velocity = slopes.iter().sum::<f64>() / slopes.len().max(1) as f64;

            cluster_records.push(ClusterRecord {
                label,
                centroid,
                size: indices.len() as i32,
                velocity,
            });
        }

        self.store
            .replace_clustering(&assignments, &cluster_records)
            .await?;

        let noise = labels.iter().filter(|&&l| l == NOISE).count();
        record_clustering(
            started.elapsed().as_secs_f64(),
            cluster_records.len(),
            noise,
        );
        info!(
            clusters = cluster_records.len(),
            noise = noise,
            total = total,
            "Clustering pass complete"
        );

        Ok(ClusterSummary {
            clusters: cluster_records.len(),
            noise,
            total,
        })
    }
}

/// Arithmetic mean of the member vectors
fn centroid<'a>(members: impl Iterator<Item = &'a [f32]>) -> Vec<f32> {
    let mut sum: Vec<f64> = Vec::new();
    let mut count = 0usize;

    for vector in members {
        if sum.is_empty() {
            sum = vec![0.0; vector.len()];
        }
        for (acc, &value) in sum.iter_mut().zip(vector.iter()) {
            *acc += f64::from(value);
        }
        count += 1;
    }

    sum.into_iter()
        .map(|total| (total / count.max(1) as f64) as f32)
        .collect()
}
