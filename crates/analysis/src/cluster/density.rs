//! Density-based clustering
//!
//! DBSCAN over the projected vectors with the neighborhood radius
//! derived from the data: eps is the median distance to the k-th
//! nearest neighbor (k = n_neighbors). Scan order is the input order,
//! so the labeling is fully deterministic: labels are assigned 0, 1, …
//! in discovery order and -1 marks noise.

use std::collections::VecDeque;

/// Noise label
pub const NOISE: i32 = -1;

const UNCLASSIFIED: i32 = -2;

/// Density clustering parameters
#[derive(Debug, Clone)]
pub struct DensityConfig {
    /// Minimum points for a dense neighborhood (and so for a cluster)
    pub min_cluster_size: usize,

    /// Neighbor rank used for the eps heuristic
    pub n_neighbors: usize,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 5,
            n_neighbors: 15,
        }
    }
}

/// Label every point; -1 is noise. Populations smaller than
/// `min_cluster_size` are all noise.
pub fn cluster(points: &[Vec<f32>], config: &DensityConfig) -> Vec<i32> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }

    let min_points = config.min_cluster_size.max(2);
    if n < min_points {
        return vec![NOISE; n];
    }

    let eps = estimate_eps(points, config.n_neighbors);
    let neighborhoods = neighborhoods(points, eps);

    let mut labels = vec![UNCLASSIFIED; n];
    let mut next_label = 0;

    for seed in 0..n {
        if labels[seed] != UNCLASSIFIED {
            continue;
        }

        // Border points become noise first; a later core point may
        // still claim them into its cluster.
        if neighborhoods[seed].len() + 1 < min_points {
            labels[seed] = NOISE;
            continue;
        }

        let label = next_label;
        next_label += 1;
        labels[seed] = label;

        let mut queue: VecDeque<usize> = neighborhoods[seed].iter().copied().collect();
        while let Some(point) = queue.pop_front() {
            if labels[point] == NOISE {
                labels[point] = label;
                continue;
            }
            if labels[point] != UNCLASSIFIED {
                continue;
            }
            labels[point] = label;

            if neighborhoods[point].len() + 1 >= min_points {
                queue.extend(neighborhoods[point].iter().copied());
            }
        }
    }

    labels
}

fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(x - y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Median k-th-nearest-neighbor distance
fn estimate_eps(points: &[Vec<f32>], n_neighbors: usize) -> f64 {
    let n = points.len();
    let k = n_neighbors.clamp(1, n - 1);

    let mut kth_distances: Vec<f64> = (0..n)
        .map(|i| {
            let mut distances: Vec<f64> = (0..n)
                .filter(|&j| j != i)
                .map(|j| euclidean(&points[i], &points[j]))
                .collect();
            distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            distances[k - 1]
        })
        .collect();

    kth_distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    kth_distances[kth_distances.len() / 2]
}

fn neighborhoods(points: &[Vec<f32>], eps: f64) -> Vec<Vec<usize>> {
    let n = points.len();
    (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| j != i && euclidean(&points[i], &points[j]) <= eps)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(center: (f32, f32), count: usize) -> Vec<Vec<f32>> {
        // Deterministic ring of points around the center
        (0..count)
            .map(|i| {
                let angle = i as f32;
                vec![
                    center.0 + 0.1 * angle.cos(),
                    center.1 + 0.1 * angle.sin(),
                ]
            })
            .collect()
    }

    fn config(min_cluster_size: usize, n_neighbors: usize) -> DensityConfig {
        DensityConfig {
            min_cluster_size,
            n_neighbors,
        }
    }

    #[test]
    fn test_two_blobs_two_clusters() {
        let mut points = blob((0.0, 0.0), 6);
        points.extend(blob((10.0, 10.0), 6));

        let labels = cluster(&points, &config(3, 3));

        assert_eq!(labels.len(), 12);
        // First blob discovered first
        assert!(labels[..6].iter().all(|&l| l == 0));
        assert!(labels[6..].iter().all(|&l| l == 1));
    }

    #[test]
    fn test_far_outlier_is_noise() {
        let mut points = blob((0.0, 0.0), 6);
        points.extend(blob((10.0, 10.0), 6));
        points.push(vec![100.0, 100.0]);

        let labels = cluster(&points, &config(3, 3));
        assert_eq!(*labels.last().unwrap(), NOISE);
        assert!(labels[..6].iter().all(|&l| l == 0));
    }

    #[test]
    fn test_small_population_is_all_noise() {
        let points = blob((0.0, 0.0), 3);
        let labels = cluster(&points, &config(5, 3));
        assert_eq!(labels, vec![NOISE, NOISE, NOISE]);
    }

    #[test]
    fn test_empty_population() {
        let labels = cluster(&[], &DensityConfig::default());
        assert!(labels.is_empty());
    }

    #[test]
    fn test_deterministic_relabeling() {
        let mut points = blob((0.0, 0.0), 8);
        points.extend(blob((7.0, 7.0), 8));
        points.extend(blob((-7.0, 7.0), 8));

        let first = cluster(&points, &config(4, 4));
        let second = cluster(&points, &config(4, 4));
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_cluster_meets_min_size() {
        let mut points = blob((0.0, 0.0), 6);
        points.extend(blob((10.0, 10.0), 6));
        points.push(vec![100.0, 100.0]);

        let min_size = 3;
        let labels = cluster(&points, &config(min_size, 3));

        let max_label = labels.iter().copied().max().unwrap_or(NOISE);
        for label in 0..=max_label {
            let size = labels.iter().filter(|&&l| l == label).count();
            assert!(size >= min_size, "cluster {} has size {}", label, size);
        }
    }
}
