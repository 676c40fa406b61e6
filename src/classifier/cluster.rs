use ndarray::Array2;

use super::{Classifier, StudentType};
use crate::config::ClusterConfig;
use crate::dimension::{Dimension, DimensionScores};
use crate::insight_core::{run_kmeans, validate_features};
use crate::utils::{columns_to_matrix, standard_scale, AnalysisError};

/// The four semantic types need exactly four clusters
pub const N_CLUSTERS: usize = 4;

/// One fitted clustering of the cohort and its semantic labeling
#[derive(Debug, Clone)]
pub struct ClusterFit {
    /// Cluster id per student
    pub assignments: Vec<usize>,
    /// Mean standardized (K, C, A, B) vector per cluster
    pub centroids: Array2<f64>,
    pub sizes: Vec<usize>,
    /// Student type per cluster id
    pub mapping: [StudentType; N_CLUSTERS],
    pub inertia: f64,
}

impl ClusterFit {
    /// Every student inherits the type of their cluster
    pub fn labels(&self) -> Vec<StudentType> {
        self.assignments.iter().map(|&id| self.mapping[id]).collect()
    }
}

/// K-means (k=4) on standardized dimension scores, labeled by centroid ranking
#[derive(Debug, Clone, Default)]
pub struct ClusterClassifier {
    settings: ClusterConfig,
}

impl ClusterClassifier {
    pub fn new(settings: ClusterConfig) -> Self {
        Self { settings }
    }

    /// Standardized n x 4 feature matrix in `Dimension::ALL` order
    ///
    /// Missing scores are imputed with the dimension's cohort mean; an absent
    /// dimension becomes a constant zero column.
    pub fn standardized_features(scores: &DimensionScores) -> Result<Array2<f64>, AnalysisError> {
        let columns: Vec<Vec<Option<f64>>> = Dimension::ALL
            .iter()
            .map(|&dim| match scores.get(dim) {
                Some(col) => col.to_vec(),
                None => vec![None; scores.len()],
            })
            .collect();
        let matrix = columns_to_matrix(&columns)?;
        standard_scale(&matrix)
    }

    /// Fit the clustering and derive the cluster-to-type mapping
    pub fn fit(&self, scores: &DimensionScores) -> Result<ClusterFit, AnalysisError> {
        if scores.len() < N_CLUSTERS {
            return Err(AnalysisError::ModelError(format!(
                "cluster classification needs at least {} students, got {}",
                N_CLUSTERS,
                scores.len()
            )));
        }

        let features = Self::standardized_features(scores)?;
        validate_features(&features, Dimension::ALL.len())?;

        let kmeans = run_kmeans(&features, N_CLUSTERS, &self.settings)?;
        let sizes = kmeans.cluster_sizes();
        let centroids = cluster_means(&features, &kmeans.assignments, &kmeans.centroids);
        let mapping = map_clusters(&centroids)?;

        let fit = ClusterFit {
            assignments: kmeans.assignments,
            centroids,
            sizes,
            mapping,
            inertia: kmeans.inertia,
        };
        log_fit(&fit);
        Ok(fit)
    }
}

impl Classifier for ClusterClassifier {
    fn name(&self) -> &'static str {
        "cluster"
    }

    fn classify(&self, scores: &DimensionScores) -> Result<Vec<StudentType>, AnalysisError> {
        Ok(self.fit(scores)?.labels())
    }
}

/// Per-cluster mean of the standardized features
///
/// An empty cluster keeps the centroid reported by k-means.
fn cluster_means(features: &Array2<f64>, assignments: &[usize], fallback: &Array2<f64>) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros(fallback.dim());
    let mut counts = vec![0usize; fallback.nrows()];

    for (row, &id) in features.rows().into_iter().zip(assignments) {
        let mut target = sums.row_mut(id);
        target += &row;
        counts[id] += 1;
    }

    for (id, &count) in counts.iter().enumerate() {
        if count == 0 {
            sums.row_mut(id).assign(&fallback.row(id));
        } else {
            sums.row_mut(id).mapv_inplace(|v| v / count as f64);
        }
    }
    sums
}

/// Map cluster ids to student types by greedy centroid ranking
///
/// The elimination order matters, each step only sees the clusters left by
/// the previous ones:
/// 1. lowest Affect centroid (highest anxiety) -> High-Pressure
/// 2. highest Knowledge of the rest -> Excellent
/// 3. lowest Knowledge of the rest -> Warning
/// 4. the remaining cluster -> Potential
///
/// Ties go to the lowest cluster id.
pub fn map_clusters(centroids: &Array2<f64>) -> Result<[StudentType; N_CLUSTERS], AnalysisError> {
    if centroids.dim() != (N_CLUSTERS, Dimension::ALL.len()) {
        return Err(AnalysisError::ModelError(format!(
            "expected {} x {} centroids, got {:?}",
            N_CLUSTERS,
            Dimension::ALL.len(),
            centroids.dim()
        )));
    }

    let mut pool: Vec<usize> = (0..N_CLUSTERS).collect();
    let mut mapping = [StudentType::Unclassified; N_CLUSTERS];
    let affect = |id: usize| centroids[[id, Dimension::Affect.index()]];
    let knowledge = |id: usize| centroids[[id, Dimension::Knowledge.index()]];

    let steps: [(StudentType, &dyn Fn(usize) -> f64, bool); 3] = [
        (StudentType::HighPressure, &affect, false),
        (StudentType::Excellent, &knowledge, true),
        (StudentType::Warning, &knowledge, false),
    ];
    for (label, key, highest) in steps {
        let chosen = pick(&pool, key, highest);
        mapping[chosen] = label;
        pool.retain(|&id| id != chosen);
    }
    mapping[pool[0]] = StudentType::Potential;

    Ok(mapping)
}

/// First cluster in `pool` with the highest (or lowest) key
fn pick(pool: &[usize], key: &dyn Fn(usize) -> f64, highest: bool) -> usize {
    let mut best = pool[0];
    for &id in &pool[1..] {
        let better = if highest {
            key(id) > key(best)
        } else {
            key(id) < key(best)
        };
        if better {
            best = id;
        }
    }
    best
}

fn log_fit(fit: &ClusterFit) {
    let total: usize = fit.sizes.iter().sum();
    tracing::info!("K-Means fit: inertia {:.4}", fit.inertia);
    for (id, label) in fit.mapping.iter().enumerate() {
        let share = if total == 0 {
            0.0
        } else {
            fit.sizes[id] as f64 / total as f64 * 100.0
        };
        tracing::info!(
            "Cluster {} -> {} ({}, {:.1}%), centroid (K, C, A, B) = {:?}",
            id,
            label.english_name(),
            fit.sizes[id],
            share,
            fit.centroids.row(id).to_vec()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use std::collections::HashSet;

    /// Four well separated groups of three students each, rows are (K, C, A, B)
    fn cohort() -> DimensionScores {
        let groups = [
            [0.90, 0.90, 0.80, 0.80], // strong everywhere
            [0.85, 0.50, 0.05, 0.50], // strong knowledge, very anxious
            [0.20, 0.70, 0.70, 0.90], // weak knowledge, engaged
            [0.05, 0.10, 0.50, 0.10], // weak everywhere
        ];
        let jitter = [0.0, 0.01, -0.01];
        let rows: Vec<[f64; 4]> = groups
            .iter()
            .flat_map(|g| jitter.iter().map(move |j| g.map(|v| v + j)))
            .collect();

        Dimension::ALL.iter().fold(DimensionScores::new(rows.len()), |acc, &dim| {
            acc.with_dimension(dim, rows.iter().map(|r| Some(r[dim.index()])).collect())
        })
    }

    #[test]
    fn test_map_clusters_greedy_order() {
        // columns (K, C, A, B)
        let centroids = arr2(&[
            [-1.0, 0.0, 0.5, 0.0],
            [1.2, 0.0, 0.8, 0.0],
            [1.5, 0.0, -1.5, 0.0],
            [-0.2, 0.0, 0.3, 0.0],
        ]);
        let mapping = map_clusters(&centroids).unwrap();
        // cluster 2 has the highest knowledge but is taken first as High-Pressure
        assert_eq!(
            mapping,
            [
                StudentType::Warning,
                StudentType::Excellent,
                StudentType::HighPressure,
                StudentType::Potential,
            ]
        );
    }

    #[test]
    fn test_map_clusters_ties_go_to_lowest_id() {
        let centroids = Array2::<f64>::zeros((4, 4));
        let mapping = map_clusters(&centroids).unwrap();
        assert_eq!(
            mapping,
            [
                StudentType::HighPressure,
                StudentType::Excellent,
                StudentType::Warning,
                StudentType::Potential,
            ]
        );
    }

    #[test]
    fn test_map_clusters_wrong_shape() {
        let centroids = Array2::<f64>::zeros((3, 4));
        assert!(map_clusters(&centroids).is_err());
    }

    #[test]
    fn test_cluster_means_with_empty_cluster() {
        let features = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let fallback = arr2(&[[9.0, 9.0], [7.0, 7.0]]);
        let means = cluster_means(&features, &[0, 0], &fallback);
        assert_eq!(means, arr2(&[[2.0, 3.0], [7.0, 7.0]]));
    }

    #[test]
    fn test_standardized_features_impute_and_gap() {
        let scores = DimensionScores::new(3)
            .with_dimension(Dimension::Knowledge, vec![Some(0.2), None, Some(0.6)])
            .with_dimension(Dimension::Affect, vec![Some(0.1), Some(0.5), Some(0.9)]);
        let features = ClusterClassifier::standardized_features(&scores).unwrap();

        assert_eq!(features.dim(), (3, 4));
        // imputed knowledge lands on the mean
        assert_eq!(features[[1, 0]], 0.0);
        // absent cognition and behavior are constant zero
        assert!(features.column(1).iter().all(|&v| v == 0.0));
        assert!(features.column(3).iter().all(|&v| v == 0.0));
        assert!(validate_features(&features, 4).is_ok());
    }

    #[test]
    fn test_every_student_gets_one_of_four_types() {
        let scores = cohort();
        let labels = ClusterClassifier::new(ClusterConfig::default()).classify(&scores).unwrap();

        assert_eq!(labels.len(), scores.len());
        assert!(labels.iter().all(|l| *l != StudentType::Unclassified));
        let distinct: HashSet<StudentType> = labels.iter().copied().collect();
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn test_semantic_mapping_on_separated_cohort() {
        let labels = ClusterClassifier::new(ClusterConfig::default()).classify(&cohort()).unwrap();

        for (group, expected) in [
            StudentType::Excellent,
            StudentType::HighPressure,
            StudentType::Potential,
            StudentType::Warning,
        ]
        .iter()
        .enumerate()
        {
            for member in 0..3 {
                assert_eq!(labels[group * 3 + member], *expected);
            }
        }
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let classifier = ClusterClassifier::new(ClusterConfig::default());
        let first = classifier.fit(&cohort()).unwrap();
        let second = classifier.fit(&cohort()).unwrap();
        assert_eq!(first.assignments, second.assignments);
        assert_eq!(first.mapping, second.mapping);
        assert_eq!(first.sizes.iter().sum::<usize>(), 12);
    }

    #[test]
    fn test_too_few_students() {
        let scores = DimensionScores::new(3)
            .with_dimension(Dimension::Knowledge, vec![Some(0.1), Some(0.5), Some(0.9)]);
        let result = ClusterClassifier::new(ClusterConfig::default()).classify(&scores);
        assert!(matches!(result, Err(AnalysisError::ModelError(_))));
    }
}
