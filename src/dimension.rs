//! The four profile dimensions and their per-student scores

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dataset::{Cell, Dataset};

/// One of the four normalized competency axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    Knowledge,
    Cognition,
    Affect,
    Behavior,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Knowledge,
        Dimension::Cognition,
        Dimension::Affect,
        Dimension::Behavior,
    ];

    pub fn index(self) -> usize {
        match self {
            Dimension::Knowledge => 0,
            Dimension::Cognition => 1,
            Dimension::Affect => 2,
            Dimension::Behavior => 3,
        }
    }

    /// Output column name read by the dashboard and recommendation consumers
    pub fn column_name(self) -> &'static str {
        match self {
            Dimension::Knowledge => "知识维度_综合得分",
            Dimension::Cognition => "认知维度_综合得分",
            Dimension::Affect => "情感维度_综合得分",
            Dimension::Behavior => "行为维度_综合得分",
        }
    }

    pub fn english_name(self) -> &'static str {
        match self {
            Dimension::Knowledge => "Knowledge",
            Dimension::Cognition => "Cognition",
            Dimension::Affect => "Affection",
            Dimension::Behavior => "Behavior",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.english_name())
    }
}

/// Per-student scores for the whole cohort
///
/// A dimension whose raw column group is absent from the source is `None`
/// (a schema gap); a present dimension holds one optional score per student.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DimensionScores {
    columns: [Option<Vec<Option<f64>>>; 4],
    len: usize,
}

impl DimensionScores {
    /// Empty scores for `len` students, every dimension absent
    pub fn new(len: usize) -> Self {
        Self {
            columns: Default::default(),
            len,
        }
    }

    /// Set one dimension's scores; `NaN` is stored as missing
    pub fn with_dimension(mut self, dimension: Dimension, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(values.len(), self.len);
        let values = values.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect();
        self.columns[dimension.index()] = Some(values);
        self
    }

    /// Read the dimension columns back from a profiled table
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Dimension::ALL.iter().fold(Self::new(dataset.len()), |scores, &dim| {
            match dataset.numeric_column(dim.column_name()) {
                Some(values) => scores.with_dimension(dim, values),
                None => scores,
            }
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, dimension: Dimension) -> Option<&[Option<f64>]> {
        self.columns[dimension.index()].as_deref()
    }

    pub fn is_available(&self, dimension: Dimension) -> bool {
        self.columns[dimension.index()].is_some()
    }

    /// Dimensions whose raw column group was present
    pub fn available(&self) -> Vec<Dimension> {
        Dimension::ALL
            .iter()
            .copied()
            .filter(|d| self.is_available(*d))
            .collect()
    }

    /// Score of one student on one dimension
    pub fn value(&self, row: usize, dimension: Dimension) -> Option<f64> {
        self.get(dimension).and_then(|col| col.get(row).copied().flatten())
    }

    /// Output cells for one dimension (all missing when the group was absent)
    pub fn cells(&self, dimension: Dimension) -> Vec<Cell> {
        match self.get(dimension) {
            Some(col) => col.iter().map(|v| Cell::from_option(*v)).collect(),
            None => vec![Cell::Missing; self.len],
        }
    }
}
