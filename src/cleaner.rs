//! Survey cleanup: sentinel codes, numeric coercion and row drops

use std::collections::HashSet;

use crate::config::{CleaningConfig, DropPolicy, IdentifierConfig};
use crate::dataset::{Cell, Dataset};
use crate::utils::AnalysisError;

/// Output column holding the normalized identifier
///
/// A source table that already carries it (for example a re-run on a profile
/// table without the survey identifier) keeps its values.
pub const ID_COLUMN: &str = "student_id";

/// Result of the cleaning stage
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub dataset: Dataset,
    /// Rows removed because their key score fields were missing
    pub dropped_missing_scores: usize,
    /// Rows removed because they had no usable integer identifier
    pub dropped_missing_id: usize,
}

impl CleanOutcome {
    pub fn dropped(&self) -> usize {
        self.dropped_missing_scores + self.dropped_missing_id
    }
}

/// Clean a loaded table
///
/// Steps, in order:
/// 1. sentinel codes in every numeric-typed column become missing, except in
///    the identifier columns (a student id of 99 is a real id)
/// 2. key score columns and the identifier column are forced to numeric
/// 3. sentinel codes in the key columns become missing again, catching values
///    that were text-typed during step 1
/// 4. rows failing the drop policy on the existing key columns are removed
/// 5. rows without an integral identifier are removed (when the column exists)
///
/// The input is left untouched.
pub fn clean(
    dataset: &Dataset,
    cleaning: &CleaningConfig,
    identifier: &IdentifierConfig,
) -> Result<CleanOutcome, AnalysisError> {
    let exempt = [identifier.source_column.as_str(), ID_COLUMN];
    let mut cleaned = replace_sentinels(dataset, &cleaning.sentinel_codes, &exempt);

    let key_idx: Vec<usize> = cleaning
        .key_columns
        .iter()
        .filter_map(|c| cleaned.column_index(c))
        .collect();
    let id_idx = cleaned.column_index(&identifier.source_column);

    let coerce: Vec<usize> = key_idx.iter().copied().chain(id_idx).collect();
    for record in cleaned.data.iter_mut() {
        for &idx in &coerce {
            record.values[idx] = record.values[idx].coerce_numeric();
        }
        for &idx in &key_idx {
            if is_sentinel(record.get(idx), &cleaning.sentinel_codes) {
                record.values[idx] = Cell::Missing;
            }
        }
    }

    let before = cleaned.len();
    if key_idx.is_empty() {
        tracing::warn!("No key score columns present, skipping row drop");
    } else {
        cleaned = cleaned.retain_rows(|_, record| {
            let missing = key_idx.iter().filter(|&&i| record.get(i).is_missing()).count();
            match cleaning.drop_policy {
                DropPolicy::AllMissing => missing < key_idx.len(),
                DropPolicy::AnyMissing => missing == 0,
            }
        });
    }
    let dropped_missing_scores = before - cleaned.len();

    let before = cleaned.len();
    if let Some(idx) = id_idx {
        cleaned = cleaned.retain_rows(|_, record| integral_id(record.get(idx)).is_some());
    }
    let dropped_missing_id = before - cleaned.len();

    if dropped_missing_scores > 0 || dropped_missing_id > 0 {
        tracing::warn!(
            "Dropped {} rows missing key scores and {} rows missing '{}'",
            dropped_missing_scores,
            dropped_missing_id,
            identifier.source_column
        );
    }
    tracing::info!("Cleaning kept {} of {} rows", cleaned.len(), dataset.len());

    Ok(CleanOutcome {
        dataset: cleaned,
        dropped_missing_scores,
        dropped_missing_id,
    })
}

/// Replace sentinel codes with missing in every numeric-typed column not in `exempt`
pub fn replace_sentinels(dataset: &Dataset, codes: &[f64], exempt: &[&str]) -> Dataset {
    let mut cleaned = dataset.clone();
    let numeric: Vec<usize> = (0..dataset.columns.len())
        .filter(|&idx| !exempt.contains(&dataset.columns[idx].as_str()))
        .filter(|&idx| dataset.is_numeric_column(idx))
        .collect();

    for record in cleaned.data.iter_mut() {
        for &idx in &numeric {
            if is_sentinel(&record.values[idx], codes) {
                record.values[idx] = Cell::Missing;
            }
        }
    }
    cleaned
}

fn is_sentinel(cell: &Cell, codes: &[f64]) -> bool {
    matches!(cell, Cell::Number(v) if codes.contains(v))
}

/// Student identifiers for a cleaned table
///
/// Uses the identifier column when present. Without it, an existing
/// `student_id` column with an integer in every row is kept; otherwise rows
/// are numbered `1..=n`.
pub fn student_ids(dataset: &Dataset, identifier: &IdentifierConfig) -> Result<Vec<i64>, AnalysisError> {
    let Some(idx) = dataset.column_index(&identifier.source_column) else {
        if let Some(ids) = existing_ids(dataset) {
            tracing::info!(
                "Identifier column '{}' absent, keeping existing '{}'",
                identifier.source_column,
                ID_COLUMN
            );
            return Ok(ids);
        }
        tracing::warn!(
            "Identifier column '{}' absent, assigning sequential ids",
            identifier.source_column
        );
        return Ok((1..=dataset.len() as i64).collect());
    };

    let ids = dataset
        .data
        .iter()
        .enumerate()
        .map(|(row, record)| {
            integral_id(record.get(idx)).ok_or_else(|| {
                AnalysisError::ValidationError(format!(
                    "row {} has no integer '{}'",
                    row, identifier.source_column
                ))
            })
        })
        .collect::<Result<Vec<i64>, _>>()?;

    let mut seen = HashSet::new();
    let duplicates = ids.iter().filter(|id| !seen.insert(**id)).count();
    if duplicates > 0 {
        tracing::warn!("{} duplicate student identifiers in cohort", duplicates);
    }
    Ok(ids)
}

fn existing_ids(dataset: &Dataset) -> Option<Vec<i64>> {
    let idx = dataset.column_index(ID_COLUMN)?;
    dataset.data.iter().map(|r| integral_id(r.get(idx))).collect()
}

fn integral_id(cell: &Cell) -> Option<i64> {
    match cell.coerce_numeric() {
        Cell::Number(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Some(v as i64),
        _ => None,
    }
}
