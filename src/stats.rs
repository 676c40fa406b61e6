use crate::dataset::Dataset;

/// Statistics computed from a dataset column
#[derive(Debug, Clone)]
pub struct Statistics {
    pub field: String,
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl Statistics {
    /// Compute statistics for a numeric column, ignoring missing cells
    pub fn compute(dataset: &Dataset, field: &str) -> Option<Self> {
        let column = dataset.numeric_column(field)?;
        let values: Vec<f64> = column.iter().flatten().copied().collect();

        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Statistics {
            field: field.to_string(),
            count,
            missing: column.len() - count,
            mean,
            median: median(&values)?,
            min,
            max,
        })
    }
}

/// Median of the present values; even counts average the two middle values
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median of an optional column, skipping missing entries
pub fn median_of(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    median(&present)
}
