use ndarray::Array2;

use crate::utils::AnalysisError;

/// Apply MinMax scaling per column: (x - min) / (max - min)
///
/// # Arguments
/// * `features` - Feature matrix to scale, `NaN` marks a missing entry
///
/// # Returns
/// * `Ok(scaled)` - Scaled feature matrix with present values in [0, 1]
/// * `Err(AnalysisError)` - If the matrix is empty
///
/// # Note
/// Min and max are taken over the present entries only, so the result is
/// relative to the observed cohort. Missing entries stay `NaN`.
/// Constant columns (min == max) scale to 0.0.
pub fn min_max_scale(features: &Array2<f64>) -> Result<Array2<f64>, AnalysisError> {
    if features.nrows() == 0 {
        return Err(AnalysisError::ValidationError(
            "cannot scale an empty feature matrix".to_string(),
        ));
    }

    let mut scaled = features.clone();

    for col_idx in 0..features.ncols() {
        let col = features.column(col_idx);
        let present = col.iter().copied().filter(|v| !v.is_nan());
        let (min, max) = present.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if min > max {
            // whole column missing
            continue;
        }
        let range = max - min;

        for row_idx in 0..features.nrows() {
            let value = features[[row_idx, col_idx]];
            if value.is_nan() {
                continue;
            }
            scaled[[row_idx, col_idx]] = if range.abs() < f64::EPSILON {
                0.0
            } else {
                (value - min) / range
            };
        }
    }

    Ok(scaled)
}

/// Apply Standard scaling per column: (x - mean) / std
///
/// # Arguments
/// * `features` - Feature matrix to scale, `NaN` marks a missing entry
///
/// # Returns
/// * `Ok(scaled)` - Matrix with zero mean and unit (population) variance per column
/// * `Err(AnalysisError)` - If the matrix is empty
///
/// # Note
/// Missing entries are imputed with the column mean first, so they land on
/// exactly 0.0 and the variance is that of the imputed column.
/// Constant and fully missing columns are set to 0.0.
pub fn standard_scale(features: &Array2<f64>) -> Result<Array2<f64>, AnalysisError> {
    if features.nrows() == 0 {
        return Err(AnalysisError::ValidationError(
            "cannot scale an empty feature matrix".to_string(),
        ));
    }

    let n_rows = features.nrows() as f64;
    let mut scaled = Array2::<f64>::zeros(features.dim());

    for col_idx in 0..features.ncols() {
        let col = features.column(col_idx);
        let present: Vec<f64> = col.iter().copied().filter(|v| !v.is_nan()).collect();
        if present.is_empty() {
            continue;
        }

        let mean = present.iter().sum::<f64>() / present.len() as f64;
        // imputed entries contribute zero deviation
        let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n_rows;
        let std = variance.sqrt();
        if std.abs() < f64::EPSILON {
            continue;
        }

        for row_idx in 0..features.nrows() {
            let value = features[[row_idx, col_idx]];
            if !value.is_nan() {
                scaled[[row_idx, col_idx]] = (value - mean) / std;
            }
        }
    }

    Ok(scaled)
}
