/// Clustering core: feature validation and seeded k-means
pub mod feature;
pub mod model;

// Re-export commonly used functions
pub use feature::validate_features;
pub use model::{run_kmeans, KMeansFit};
