use std::collections::BTreeMap;
use std::path::Path;

use crate::classifier::{Strategy, StudentType, TYPE_COLUMN};
use crate::cleaner::{clean, student_ids};
pub use crate::cleaner::ID_COLUMN;
use crate::config::PipelineConfig;
use crate::dataset::{Cell, Dataset};
use crate::dimension::Dimension;
use crate::emitter::write_profiles;
use crate::loader::{load_dataset, strip_description_row};
use crate::scorer::score_dimensions;
use crate::utils::AnalysisError;

/// Runs the load -> clean -> score -> classify pipeline for one cohort
#[derive(Debug, Clone)]
pub struct ProfileEngine {
    config: PipelineConfig,
    strategy: Strategy,
}

impl ProfileEngine {
    /// Create an engine with default configuration
    pub fn new(strategy: Strategy) -> Self {
        Self::with_config(PipelineConfig::default(), strategy)
    }

    pub fn with_config(config: PipelineConfig, strategy: Strategy) -> Self {
        Self { config, strategy }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Load a source file and profile it
    pub fn run_file(&self, path: &Path) -> Result<ProfileRun, AnalysisError> {
        let dataset = load_dataset(path)?;
        self.run(&dataset)
    }

    /// Profile a loaded cohort and write the result
    ///
    /// Nothing is written unless every stage succeeds.
    pub fn run_to_file(&self, input: &Path, output: &Path) -> Result<ProfileRun, AnalysisError> {
        let run = self.run_file(input)?;
        write_profiles(&run.profiles, output)?;
        Ok(run)
    }

    /// Profile a loaded cohort
    ///
    /// The input table is not modified; every stage builds a new table.
    pub fn run(&self, dataset: &Dataset) -> Result<ProfileRun, AnalysisError> {
        self.config.validate()?;
        let identifier = &self.config.identifier;

        let raw = strip_description_row(dataset, &identifier.source_column);
        let cleaned = clean(&raw, &self.config.cleaning, identifier)?;
        if cleaned.dataset.is_empty() {
            return Err(AnalysisError::ValidationError(
                "no records left after cleaning".to_string(),
            ));
        }

        let behavior_scale = self
            .config
            .scoring
            .behavior
            .scale
            .unwrap_or_else(|| self.strategy.behavior_scale());
        let scored = score_dimensions(&cleaned.dataset, &self.config.scoring, behavior_scale)?;

        let classifier = self.strategy.build(&self.config.clustering);
        let labels = classifier.classify(&scored.scores)?;
        if labels.len() != scored.dataset.len() {
            return Err(AnalysisError::ModelError(format!(
                "{} classifier returned {} labels for {} students",
                classifier.name(),
                labels.len(),
                scored.dataset.len()
            )));
        }

        let ids = student_ids(&scored.dataset, identifier)?;
        let profiles = scored
            .dataset
            .with_column(
                TYPE_COLUMN,
                labels.iter().map(|t| Cell::Text(t.label().to_string())).collect(),
            )
            .with_column(ID_COLUMN, ids.iter().map(|&id| Cell::Number(id as f64)).collect());

        let type_counts = count_types(&labels);
        tracing::info!(
            "Profiled {} students with the {} classifier: {:?}",
            profiles.len(),
            classifier.name(),
            type_counts
        );

        Ok(ProfileRun {
            profiles,
            dropped_missing_scores: cleaned.dropped_missing_scores,
            dropped_missing_id: cleaned.dropped_missing_id,
            schema_gaps: scored.report.schema_gaps,
            type_counts,
        })
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct ProfileRun {
    /// Raw columns, four dimension scores, type and identifier
    pub profiles: Dataset,
    pub dropped_missing_scores: usize,
    pub dropped_missing_id: usize,
    /// Dimensions left missing because their raw columns were absent
    pub schema_gaps: Vec<Dimension>,
    pub type_counts: BTreeMap<StudentType, usize>,
}

impl ProfileRun {
    pub fn dropped(&self) -> usize {
        self.dropped_missing_scores + self.dropped_missing_id
    }

    /// Student types in cohort order, read back from the profile table
    pub fn student_types(&self) -> Vec<StudentType> {
        read_types(&self.profiles)
    }
}

/// Count students per type
pub fn count_types(labels: &[StudentType]) -> BTreeMap<StudentType, usize> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(*label).or_insert(0) += 1;
    }
    counts
}

/// Parse the type column of a profile table; unknown or missing values read as Unclassified
pub fn read_types(profiles: &Dataset) -> Vec<StudentType> {
    let Some(idx) = profiles.column_index(TYPE_COLUMN) else {
        return vec![StudentType::Unclassified; profiles.len()];
    };
    profiles
        .data
        .iter()
        .map(|r| match r.get(idx) {
            Cell::Text(s) => s.parse().unwrap_or_default(),
            _ => StudentType::Unclassified,
        })
        .collect()
}
