use ndarray::Array2;

use super::error::AnalysisError;

/// Stack optional columns into a row-major matrix, `None` becomes `NaN`
///
/// # Arguments
/// * `columns` - One vector per column, all of the same length
///
/// # Returns
/// * `Ok(matrix)` with shape (rows, columns.len())
/// * `Err(AnalysisError::ValidationError)` if column lengths disagree
pub fn columns_to_matrix(columns: &[Vec<Option<f64>>]) -> Result<Array2<f64>, AnalysisError> {
    let n_rows = columns.first().map_or(0, Vec::len);
    if let Some(bad) = columns.iter().find(|col| col.len() != n_rows) {
        return Err(AnalysisError::ValidationError(format!(
            "column length {} does not match {}",
            bad.len(),
            n_rows
        )));
    }

    Ok(Array2::from_shape_fn((n_rows, columns.len()), |(row, col)| {
        columns[col][row].unwrap_or(f64::NAN)
    }))
}

/// Row-wise mean over the present (non-`NaN`) entries
///
/// A row with no present entries has no mean and yields `None`.
pub fn row_means(matrix: &Array2<f64>) -> Vec<Option<f64>> {
    matrix
        .rows()
        .into_iter()
        .map(|row| {
            let (sum, count) = row
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            if count == 0 {
                None
            } else {
                Some(sum / count as f64)
            }
        })
        .collect()
}

/// Round to a fixed number of decimals (half away from zero)
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Clamp into the unit interval
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Render a number the way the output table expects it
///
/// Integral values print without a fractional part so identifiers and raw
/// item codes survive a round trip unchanged.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
