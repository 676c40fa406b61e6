//! Pipeline configuration
//!
//! Every survey-instrument constant (sentinel codes, column conventions,
//! assumed scale maxima, k-means settings) lives here so callers and tests
//! can override it. Defaults follow the PISA 2022 student questionnaire.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::dataset::Dataset;
use crate::utils::AnalysisError;

/// Sentinel codes meaning "not applicable / invalid / missing" in the source survey
pub const DEFAULT_SENTINEL_CODES: [f64; 6] = [97.0, 98.0, 99.0, 997.0, 998.0, 999.0];

/// Knowledge (plausible value) score fields
pub const DEFAULT_KNOWLEDGE_COLUMNS: [&str; 3] = ["PVMATH", "PVREAD", "PVSCIE"];

/// Top-level configuration for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub identifier: IdentifierConfig,
    pub cleaning: CleaningConfig,
    pub scoring: ScoringConfig,
    pub clustering: ClusterConfig,
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; omitted fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, AnalysisError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::ValidationError(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| AnalysisError::ValidationError(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the scorer or clusterer meaningless
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let scoring = &self.scoring;
        scoring.cognition.scale.validate("cognition")?;
        scoring.affect.scale.validate("affect")?;
        if let Some(scale) = &scoring.behavior.scale {
            scale.validate("behavior")?;
        }
        if scoring.precision > 10 {
            return Err(AnalysisError::ValidationError(format!(
                "precision must be <= 10, got {}",
                scoring.precision
            )));
        }
        if self.clustering.n_init == 0 {
            return Err(AnalysisError::ValidationError(
                "clustering.n_init must be > 0".to_string(),
            ));
        }
        if self.clustering.max_iterations == 0 {
            return Err(AnalysisError::ValidationError(
                "clustering.max_iterations must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the unique student identifier comes from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IdentifierConfig {
    pub source_column: String,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            source_column: "CNTSTUID".to_string(),
        }
    }
}

/// Which rows the cleaner drops for missing key scores
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Drop only rows where every existing key column is missing
    #[default]
    AllMissing,
    /// Drop rows where any existing key column is missing
    AnyMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleaningConfig {
    pub sentinel_codes: Vec<f64>,
    pub key_columns: Vec<String>,
    pub drop_policy: DropPolicy,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            sentinel_codes: DEFAULT_SENTINEL_CODES.to_vec(),
            key_columns: DEFAULT_KNOWLEDGE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            drop_policy: DropPolicy::AllMissing,
        }
    }
}

/// Picks the raw columns that feed one dimension
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSelector {
    /// A fixed list of column names, absent names are skipped
    Exact { columns: Vec<String> },
    /// Every column whose name starts with the prefix, in table order
    Prefix { prefix: String },
}

impl ColumnSelector {
    pub fn prefix(prefix: &str) -> Self {
        Self::Prefix {
            prefix: prefix.to_string(),
        }
    }

    pub fn exact(columns: &[&str]) -> Self {
        Self::Exact {
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Names of the matching columns present in `dataset`
    pub fn select(&self, dataset: &Dataset) -> Vec<String> {
        match self {
            Self::Exact { columns } => columns
                .iter()
                .filter(|c| dataset.has_column(c))
                .cloned()
                .collect(),
            Self::Prefix { prefix } => dataset
                .columns
                .iter()
                .filter(|c| c.starts_with(prefix.as_str()))
                .cloned()
                .collect(),
        }
    }
}

/// Maps a raw row mean onto the unit interval
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScaleTransform {
    /// mean / max
    Divide { max: f64 },
    /// (mean - min) / (max - min)
    Range { min: f64, max: f64 },
    /// (max - mean) / max, for negatively keyed instruments
    Inverted { max: f64 },
}

impl ScaleTransform {
    pub fn apply(&self, mean: f64) -> f64 {
        match *self {
            Self::Divide { max } => mean / max,
            Self::Range { min, max } => (mean - min) / (max - min),
            Self::Inverted { max } => (max - mean) / max,
        }
    }

    fn validate(&self, dimension: &str) -> Result<(), AnalysisError> {
        let ok = match *self {
            Self::Divide { max } | Self::Inverted { max } => max > 0.0,
            Self::Range { min, max } => max > min,
        };
        if ok {
            Ok(())
        } else {
            Err(AnalysisError::ValidationError(format!(
                "{} scale has an empty range: {:?}",
                dimension, self
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub selector: ColumnSelector,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            selector: ColumnSelector::exact(&DEFAULT_KNOWLEDGE_COLUMNS),
        }
    }
}

/// Task persistence items (ST307), 1-4 agreement scale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CognitionConfig {
    pub selector: ColumnSelector,
    /// Codes treated as missing within this group only
    pub sentinel_codes: Vec<f64>,
    pub scale: ScaleTransform,
    /// Score assigned when a student answered none of the items
    pub missing_floor: f64,
}

impl Default for CognitionConfig {
    fn default() -> Self {
        Self {
            selector: ColumnSelector::prefix("ST307Q"),
            sentinel_codes: vec![97.0],
            scale: ScaleTransform::Divide { max: 4.0 },
            missing_floor: 0.0,
        }
    }
}

/// Mathematics anxiety items (ST297), 1-4 agreement scale, higher is worse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AffectConfig {
    pub selector: ColumnSelector,
    pub scale: ScaleTransform,
    /// Switch to `1 - mean` when the whole group is observed within {0, 1}
    pub detect_binary: bool,
}

impl Default for AffectConfig {
    fn default() -> Self {
        Self {
            selector: ColumnSelector::prefix("ST297Q"),
            scale: ScaleTransform::Inverted { max: 4.0 },
            detect_binary: true,
        }
    }
}

/// Digital resource use items (ST326)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorConfig {
    pub selector: ColumnSelector,
    /// `None` takes the scale assumed by the chosen classifier strategy
    pub scale: Option<ScaleTransform>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            selector: ColumnSelector::prefix("ST326Q"),
            scale: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub knowledge: KnowledgeConfig,
    pub cognition: CognitionConfig,
    pub affect: AffectConfig,
    pub behavior: BehaviorConfig,
    /// Decimal places kept on every stored score
    pub precision: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            knowledge: KnowledgeConfig::default(),
            cognition: CognitionConfig::default(),
            affect: AffectConfig::default(),
            behavior: BehaviorConfig::default(),
            precision: 2,
        }
    }
}

/// K-means settings for the cluster classifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClusterConfig {
    pub seed: u64,
    pub n_init: usize,
    pub max_iterations: u64,
    pub tolerance: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_init: 10,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}
