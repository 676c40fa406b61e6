use linfa::prelude::*;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2};
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

use crate::config::ClusterConfig;
use crate::utils::AnalysisError;

/// Fitted k-means partition of the cohort
#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// Cluster id per sample (0..n_clusters)
    pub assignments: Vec<usize>,
    /// Centroids reported by the fitted model, one row per cluster
    pub centroids: Array2<f64>,
    /// Sum of squared distances of samples to their assigned centroid
    pub inertia: f64,
}

impl KMeansFit {
    /// Number of samples assigned to each cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.nrows()];
        for &id in &self.assignments {
            sizes[id] += 1;
        }
        sizes
    }
}

/// Run K-Means clustering with a fixed seed and several initializations
///
/// # Arguments
/// * `features` - Feature matrix (rows=samples, cols=features)
/// * `n_clusters` - Number of clusters
/// * `settings` - Seed, number of runs, iteration cap and tolerance
///
/// # Returns
/// * `Ok(KMeansFit)` - Assignments and centroids of the best-inertia run
/// * `Err(AnalysisError)` - If validation or clustering fails
///
/// # Note
/// The same seed and settings give the same partition; cluster ids carry no
/// meaning across different settings.
pub fn run_kmeans(
    features: &Array2<f64>,
    n_clusters: usize,
    settings: &ClusterConfig,
) -> Result<KMeansFit, AnalysisError> {
    if features.nrows() == 0 {
        return Err(AnalysisError::ValidationError(
            "empty feature matrix".to_string(),
        ));
    }

    if n_clusters == 0 {
        return Err(AnalysisError::ValidationError(
            "n_clusters must be > 0".to_string(),
        ));
    }

    if n_clusters > features.nrows() {
        return Err(AnalysisError::ModelError(format!(
            "n_clusters ({}) cannot exceed number of samples ({})",
            n_clusters,
            features.nrows()
        )));
    }

    // linfa needs records + targets, unit targets for unsupervised
    let targets = Array1::from_elem(features.nrows(), ());
    let dataset = Dataset::new(features.clone(), targets);

    let rng = Xoshiro256Plus::seed_from_u64(settings.seed);
    let model = KMeans::params_with_rng(n_clusters, rng)
        .n_runs(settings.n_init)
        .max_n_iterations(settings.max_iterations)
        .tolerance(settings.tolerance)
        .fit(&dataset)
        .map_err(|e| AnalysisError::ModelError(format!("K-Means clustering failed: {}", e)))?;

    let predictions = model.predict(dataset.records());
    let assignments: Vec<usize> = predictions.into_iter().collect();
    let centroids = model.centroids().to_owned();

    let inertia = features
        .rows()
        .into_iter()
        .zip(&assignments)
        .map(|(row, &id)| {
            row.iter()
                .zip(centroids.row(id).iter())
                .map(|(x, c)| (x - c).powi(2))
                .sum::<f64>()
        })
        .sum();

    Ok(KMeansFit {
        assignments,
        centroids,
        inertia,
    })
}
