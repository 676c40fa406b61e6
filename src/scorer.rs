//! Dimension scoring
//!
//! Each dimension has its own normalization rule because the raw instruments
//! use different scales:
//! - Knowledge: per-column cohort min-max, then row mean
//! - Cognition: extra sentinel pass, row mean over an assumed maximum, all-missing floors to 0
//! - Affect: inverted row mean (anxiety), or `1 - mean` for binary-coded items
//! - Behavior: row mean through the strategy's assumed scale

use std::collections::BTreeMap;

use crate::config::{AffectConfig, CognitionConfig, ColumnSelector, ScaleTransform, ScoringConfig};
use crate::dataset::Dataset;
use crate::dimension::{Dimension, DimensionScores};
use crate::utils::{clamp_unit, columns_to_matrix, min_max_scale, round_to, row_means, AnalysisError};

/// What the scorer saw while scoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringReport {
    /// Dimensions with no raw columns in the table, left missing for everyone
    pub schema_gaps: Vec<Dimension>,
    pub columns_used: BTreeMap<Dimension, Vec<String>>,
    /// Whether the affect group was detected as binary-coded
    pub affect_binary: bool,
}

/// Output of the scoring stage
#[derive(Debug, Clone)]
pub struct ScoringOutcome {
    /// Input table plus the four dimension columns
    pub dataset: Dataset,
    pub scores: DimensionScores,
    pub report: ScoringReport,
}

/// Compute the four dimension scores for a cleaned table
///
/// # Arguments
/// * `dataset` - Cleaned cohort
/// * `config` - Column selectors and scale constants
/// * `behavior_scale` - Scale assumed for the behavior items by the chosen strategy
pub fn score_dimensions(
    dataset: &Dataset,
    config: &ScoringConfig,
    behavior_scale: ScaleTransform,
) -> Result<ScoringOutcome, AnalysisError> {
    let mut scores = DimensionScores::new(dataset.len());
    let mut report = ScoringReport::default();

    for dim in Dimension::ALL {
        let columns = selector_for(config, dim).select(dataset);
        if columns.is_empty() {
            tracing::warn!("No raw columns for {} dimension, leaving it missing", dim);
            report.schema_gaps.push(dim);
            continue;
        }
        tracing::debug!("{} dimension uses columns {:?}", dim, columns);

        let raw: Vec<Vec<Option<f64>>> = columns
            .iter()
            .filter_map(|c| dataset.numeric_column(c))
            .collect();

        let values = match dim {
            Dimension::Knowledge => knowledge_scores(&raw)?,
            Dimension::Cognition => cognition_scores(&raw, &config.cognition)?,
            Dimension::Affect => {
                let (values, binary) = affect_scores(&raw, &config.affect)?;
                report.affect_binary = binary;
                values
            }
            Dimension::Behavior => behavior_scores(&raw, behavior_scale)?,
        };

        let finished = values
            .into_iter()
            .map(|v| v.map(|x| round_to(clamp_unit(x), config.precision)))
            .collect();
        scores = scores.with_dimension(dim, finished);
        report.columns_used.insert(dim, columns);
    }

    let augmented = Dimension::ALL
        .iter()
        .fold(dataset.clone(), |table, &dim| table.with_column(dim.column_name(), scores.cells(dim)));

    tracing::info!(
        "Scored {} students on {:?}",
        dataset.len(),
        scores.available()
    );

    Ok(ScoringOutcome {
        dataset: augmented,
        scores,
        report,
    })
}

fn selector_for(config: &ScoringConfig, dim: Dimension) -> &ColumnSelector {
    match dim {
        Dimension::Knowledge => &config.knowledge.selector,
        Dimension::Cognition => &config.cognition.selector,
        Dimension::Affect => &config.affect.selector,
        Dimension::Behavior => &config.behavior.selector,
    }
}

/// Cohort min-max per column, then the mean of the normalized columns
pub fn knowledge_scores(raw: &[Vec<Option<f64>>]) -> Result<Vec<Option<f64>>, AnalysisError> {
    let matrix = columns_to_matrix(raw)?;
    if matrix.nrows() == 0 {
        return Ok(Vec::new());
    }
    let normalized = min_max_scale(&matrix)?;
    Ok(row_means(&normalized))
}

/// Row mean over the assumed maximum; students with no valid answers get the floor
pub fn cognition_scores(
    raw: &[Vec<Option<f64>>],
    config: &CognitionConfig,
) -> Result<Vec<Option<f64>>, AnalysisError> {
    // item codes collide with valid values elsewhere, so this group gets its own pass
    let filtered: Vec<Vec<Option<f64>>> = raw
        .iter()
        .map(|col| {
            col.iter()
                .map(|v| v.filter(|x| !config.sentinel_codes.contains(x)))
                .collect()
        })
        .collect();

    let matrix = columns_to_matrix(&filtered)?;
    Ok(row_means(&matrix)
        .into_iter()
        .map(|mean| Some(mean.map_or(config.missing_floor, |m| config.scale.apply(m))))
        .collect())
}

/// Inverted anxiety mean
///
/// Returns the scores and whether the group was treated as binary-coded.
pub fn affect_scores(
    raw: &[Vec<Option<f64>>],
    config: &AffectConfig,
) -> Result<(Vec<Option<f64>>, bool), AnalysisError> {
    let observed_max = raw
        .iter()
        .flatten()
        .flatten()
        .copied()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
    let binary = config.detect_binary && observed_max.is_some_and(|m| m <= 1.0);
    if binary {
        tracing::info!("Affect items observed within [0, 1], scoring as binary");
    }

    let matrix = columns_to_matrix(raw)?;
    let values = row_means(&matrix)
        .into_iter()
        .map(|mean| {
            mean.map(|m| {
                if binary {
                    clamp_unit(1.0 - m)
                } else {
                    config.scale.apply(m)
                }
            })
        })
        .collect();
    Ok((values, binary))
}

/// Row mean through the strategy's assumed scale
pub fn behavior_scores(
    raw: &[Vec<Option<f64>>],
    scale: ScaleTransform,
) -> Result<Vec<Option<f64>>, AnalysisError> {
    let matrix = columns_to_matrix(raw)?;
    Ok(row_means(&matrix)
        .into_iter()
        .map(|mean| mean.map(|m| scale.apply(m)))
        .collect())
}
