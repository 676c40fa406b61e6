use std::cmp::Ordering;

use super::{Classifier, StudentType};
use crate::dimension::{Dimension, DimensionScores};
use crate::stats::median_of;
use crate::utils::AnalysisError;

/// Minimum number of available dimensions before any rule is applied
pub const MIN_DIMENSIONS: usize = 2;

/// One cascade rule: every condition compares a score strictly against the cohort median
struct Rule {
    label: StudentType,
    conditions: &'static [(Dimension, Ordering)],
}

/// Evaluated in order; a student keeps the first rule that matches
const RULES: [Rule; 4] = [
    Rule {
        label: StudentType::Excellent,
        conditions: &[
            (Dimension::Knowledge, Ordering::Greater),
            (Dimension::Cognition, Ordering::Greater),
        ],
    },
    Rule {
        label: StudentType::HighPressure,
        conditions: &[
            (Dimension::Knowledge, Ordering::Greater),
            (Dimension::Affect, Ordering::Less),
        ],
    },
    Rule {
        label: StudentType::Potential,
        conditions: &[
            (Dimension::Knowledge, Ordering::Less),
            (Dimension::Affect, Ordering::Greater),
            (Dimension::Behavior, Ordering::Greater),
        ],
    },
    Rule {
        label: StudentType::Warning,
        conditions: &[
            (Dimension::Knowledge, Ordering::Less),
            (Dimension::Cognition, Ordering::Less),
            (Dimension::Behavior, Ordering::Less),
        ],
    },
];

/// Cohort-median rule cascade
///
/// Deterministic: the same scores always give the same labels. A score equal
/// to the median satisfies neither side of a rule, and rules that need an
/// unavailable dimension are skipped.
#[derive(Debug, Clone, Default)]
pub struct ThresholdClassifier;

impl ThresholdClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Cohort median per available dimension (`None` when unavailable or all missing)
    pub fn medians(scores: &DimensionScores) -> [Option<f64>; 4] {
        let mut medians = [None; 4];
        for dim in Dimension::ALL {
            medians[dim.index()] = scores.get(dim).and_then(median_of);
        }
        medians
    }

    /// Label one student against precomputed medians
    pub fn classify_row(
        scores: &DimensionScores,
        medians: &[Option<f64>; 4],
        row: usize,
    ) -> StudentType {
        let mut label = StudentType::Unclassified;

        for rule in &RULES {
            if rule.conditions.iter().any(|(dim, _)| !scores.is_available(*dim)) {
                continue;
            }
            if label != StudentType::Unclassified {
                break;
            }
            let matched = rule.conditions.iter().all(|&(dim, ordering)| {
                match (scores.value(row, dim), medians[dim.index()]) {
                    (Some(value), Some(median)) => value.partial_cmp(&median) == Some(ordering),
                    _ => false,
                }
            });
            if matched {
                label = rule.label;
            }
        }

        label
    }
}

impl Classifier for ThresholdClassifier {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn classify(&self, scores: &DimensionScores) -> Result<Vec<StudentType>, AnalysisError> {
        let available = scores.available();
        if available.len() < MIN_DIMENSIONS {
            tracing::warn!(
                "Only {} dimension(s) available, every student stays unclassified",
                available.len()
            );
            return Ok(vec![StudentType::Unclassified; scores.len()]);
        }

        let medians = Self::medians(scores);
        tracing::info!("Cohort medians (K, C, A, B): {:?}", medians);

        Ok((0..scores.len())
            .map(|row| Self::classify_row(scores, &medians, row))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(rows: &[[f64; 4]]) -> DimensionScores {
        Dimension::ALL.iter().fold(DimensionScores::new(rows.len()), |acc, &dim| {
            acc.with_dimension(dim, rows.iter().map(|r| Some(r[dim.index()])).collect())
        })
    }

    const MEDIANS: [Option<f64>; 4] = [Some(0.5); 4];

    #[test]
    fn test_excellent_takes_precedence() {
        let s = scores(&[[0.7, 0.6, 0.5, 0.5]]);
        assert_eq!(ThresholdClassifier::classify_row(&s, &MEDIANS, 0), StudentType::Excellent);

        // would also satisfy High-Pressure, but Excellent is evaluated first
        let s = scores(&[[0.7, 0.6, 0.2, 0.5]]);
        assert_eq!(ThresholdClassifier::classify_row(&s, &MEDIANS, 0), StudentType::Excellent);
    }

    #[test]
    fn test_high_pressure() {
        let s = scores(&[[0.8, 0.3, 0.2, 0.9]]);
        assert_eq!(ThresholdClassifier::classify_row(&s, &MEDIANS, 0), StudentType::HighPressure);
    }

    #[test]
    fn test_potential_and_warning() {
        let s = scores(&[[0.2, 0.9, 0.8, 0.8], [0.2, 0.1, 0.8, 0.1]]);
        assert_eq!(ThresholdClassifier::classify_row(&s, &MEDIANS, 0), StudentType::Potential);
        assert_eq!(ThresholdClassifier::classify_row(&s, &MEDIANS, 1), StudentType::Warning);
    }

    #[test]
    fn test_median_tie_falls_through() {
        let s = scores(&[[0.5, 0.9, 0.1, 0.9], [0.8, 0.5, 0.5, 0.5]]);
        assert_eq!(ThresholdClassifier::classify_row(&s, &MEDIANS, 0), StudentType::Unclassified);
        assert_eq!(ThresholdClassifier::classify_row(&s, &MEDIANS, 1), StudentType::Unclassified);
    }

    #[test]
    fn test_missing_row_value_does_not_match() {
        let s = DimensionScores::new(1)
            .with_dimension(Dimension::Knowledge, vec![Some(0.9)])
            .with_dimension(Dimension::Cognition, vec![None])
            .with_dimension(Dimension::Affect, vec![Some(0.1)]);
        assert_eq!(ThresholdClassifier::classify_row(&s, &MEDIANS, 0), StudentType::HighPressure);
    }

    #[test]
    fn test_rules_needing_absent_dimension_are_skipped() {
        // no behavior column: Potential and Warning can never fire
        let s = DimensionScores::new(1)
            .with_dimension(Dimension::Knowledge, vec![Some(0.1)])
            .with_dimension(Dimension::Cognition, vec![Some(0.1)])
            .with_dimension(Dimension::Affect, vec![Some(0.9)]);
        assert_eq!(ThresholdClassifier::classify_row(&s, &MEDIANS, 0), StudentType::Unclassified);
    }

    #[test]
    fn test_classify_uses_cohort_medians() {
        let s = scores(&[
            [0.9, 0.9, 0.5, 0.5],
            [0.9, 0.1, 0.1, 0.5],
            [0.5, 0.5, 0.5, 0.5],
            [0.1, 0.5, 0.9, 0.9],
            [0.1, 0.1, 0.5, 0.1],
        ]);
        let labels = ThresholdClassifier::new().classify(&s).unwrap();
        assert_eq!(
            labels,
            vec![
                StudentType::Excellent,
                StudentType::HighPressure,
                StudentType::Unclassified,
                StudentType::Potential,
                StudentType::Warning,
            ]
        );
    }

    #[test]
    fn test_fewer_than_two_dimensions_is_unclassified() {
        let s = DimensionScores::new(2).with_dimension(Dimension::Knowledge, vec![Some(0.1), Some(0.9)]);
        let labels = ThresholdClassifier::new().classify(&s).unwrap();
        assert_eq!(labels, vec![StudentType::Unclassified; 2]);
    }

    #[test]
    fn test_deterministic() {
        let s = scores(&[[0.9, 0.2, 0.3, 0.4], [0.1, 0.8, 0.7, 0.6], [0.5, 0.5, 0.9, 0.1]]);
        let classifier = ThresholdClassifier::new();
        assert_eq!(classifier.classify(&s).unwrap(), classifier.classify(&s).unwrap());
    }
}
