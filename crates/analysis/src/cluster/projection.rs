//! Seeded random projection
//!
//! Sparse sign projection (Achlioptas-style ±1 entries scaled by
//! 1/sqrt(d)) used to bring embeddings down to a dimensionality the
//! density clusterer handles cheaply. The matrix is generated from a
//! fixed seed so identical vector sets always project identically.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random sign-projection matrix
pub struct RandomProjection {
    matrix: Vec<Vec<f32>>,
    input_dim: usize,
    output_dim: usize,
}

impl RandomProjection {
    pub fn new(input_dim: usize, output_dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let scale = 1.0 / (output_dim.max(1) as f32).sqrt();

        let matrix = (0..output_dim)
            .map(|_| {
                (0..input_dim)
                    .map(|_| if rng.gen_bool(0.5) { scale } else { -scale })
                    .collect()
            })
            .collect();

        Self {
            matrix,
            input_dim,
            output_dim,
        }
    }

    /// Project one vector. Inputs already at or below the target
    /// dimensionality pass through unchanged.
    pub fn project(&self, vector: &[f32]) -> Vec<f32> {
        if self.input_dim <= self.output_dim {
            return vector.to_vec();
        }

        self.matrix
            .iter()
            .map(|row| {
                row.iter()
                    .zip(vector.iter())
                    .map(|(weight, value)| weight * value)
                    .sum()
            })
            .collect()
    }

    /// Project a whole population
    pub fn project_all(&self, vectors: &[Vec<f32>]) -> Vec<Vec<f32>> {
        vectors.iter().map(|v| self.project(v)).collect()
    }
}
