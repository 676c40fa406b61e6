//! Student Profile Engine - batch profiling of PISA-style survey records
//!
//! This library loads a cohort of student survey records, cleans them, scores
//! every student on four learning dimensions (knowledge, cognition, affect,
//! behavior) and assigns each one a student type, either by cohort-median
//! thresholds or by k-means clustering.

pub mod classifier;
pub mod cleaner;
pub mod config;
pub mod dataset;
pub mod dimension;
pub mod emitter;
pub mod engine;
pub mod insight_core;
pub mod loader;
pub mod scorer;
pub mod stats;
pub mod utils;

pub use classifier::{Classifier, ClusterClassifier, Strategy, StudentType, ThresholdClassifier, TYPE_COLUMN};
pub use config::PipelineConfig;
pub use dataset::{Cell, Dataset, Record};
pub use dimension::{Dimension, DimensionScores};
pub use emitter::{write_profiles, DEFAULT_OUTPUT};
pub use engine::{ProfileEngine, ProfileRun, ID_COLUMN};
pub use loader::load_dataset;
pub use stats::Statistics;
pub use utils::AnalysisError;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
