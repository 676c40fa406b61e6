//! Student type classification
//!
//! Two interchangeable strategies share the [`Classifier`] capability:
//! a deterministic cohort-median rule cascade and k-means clustering with
//! centroid-based labeling.

pub mod cluster;
pub mod threshold;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{ClusterConfig, ScaleTransform};
use crate::dimension::DimensionScores;
use crate::utils::AnalysisError;

pub use cluster::{map_clusters, ClusterClassifier, ClusterFit};
pub use threshold::ThresholdClassifier;

/// Output column holding the student type
pub const TYPE_COLUMN: &str = "学生类型";

/// Categorical student type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StudentType {
    /// High knowledge with high cognition
    Excellent,
    /// High knowledge with high anxiety
    HighPressure,
    /// Low knowledge but good affect and behavior
    Potential,
    /// Low across knowledge, cognition and behavior
    Warning,
    Unclassified,
}

impl StudentType {
    pub const ALL: [StudentType; 5] = [
        StudentType::Excellent,
        StudentType::HighPressure,
        StudentType::Potential,
        StudentType::Warning,
        StudentType::Unclassified,
    ];

    /// Label written to the output table
    pub fn label(self) -> &'static str {
        match self {
            StudentType::Excellent => "优秀全面型",
            StudentType::HighPressure => "高压成绩型",
            StudentType::Potential => "潜力型",
            StudentType::Warning => "警示型",
            StudentType::Unclassified => "待分类",
        }
    }

    pub fn english_name(self) -> &'static str {
        match self {
            StudentType::Excellent => "Excellent",
            StudentType::HighPressure => "High Pressure",
            StudentType::Potential => "Potential",
            StudentType::Warning => "Warning",
            StudentType::Unclassified => "Unclassified",
        }
    }
}

impl Default for StudentType {
    fn default() -> Self {
        StudentType::Unclassified
    }
}

impl fmt::Display for StudentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StudentType {
    type Err = AnalysisError;

    /// Accepts the output label or the English name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        StudentType::ALL
            .iter()
            .copied()
            .find(|t| t.label() == s || t.english_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| AnalysisError::ValidationError(format!("unknown student type '{}'", s)))
    }
}

impl Serialize for StudentType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for StudentType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Assigns every student exactly one type
pub trait Classifier {
    fn name(&self) -> &'static str;

    /// One label per student, in cohort order
    fn classify(&self, scores: &DimensionScores) -> Result<Vec<StudentType>, AnalysisError>;
}

/// Which classifier variant a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Cohort-median rule cascade
    #[default]
    Threshold,
    /// K-means (k=4) with centroid ranking
    Cluster,
}

impl Strategy {
    /// Behavior scale each variant assumes for the ST326 items
    ///
    /// Threshold scoring divides by 5; clustering treats the items as 1-4.
    pub fn behavior_scale(self) -> ScaleTransform {
        match self {
            Strategy::Threshold => ScaleTransform::Divide { max: 5.0 },
            Strategy::Cluster => ScaleTransform::Range { min: 1.0, max: 4.0 },
        }
    }

    pub fn build(self, clustering: &ClusterConfig) -> Box<dyn Classifier> {
        match self {
            Strategy::Threshold => Box::new(ThresholdClassifier::new()),
            Strategy::Cluster => Box::new(ClusterClassifier::new(clustering.clone())),
        }
    }
}
