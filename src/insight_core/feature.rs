use ndarray::Array2;

use crate::utils::AnalysisError;

/// Validate feature matrix dimensions and values before clustering
///
/// # Arguments
/// * `features` - Feature matrix to validate
/// * `expected_cols` - Number of feature columns the caller built
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(AnalysisError::ValidationError)` if invalid
pub fn validate_features(features: &Array2<f64>, expected_cols: usize) -> Result<(), AnalysisError> {
    if features.nrows() == 0 {
        return Err(AnalysisError::ValidationError(
            "feature matrix cannot be empty".to_string(),
        ));
    }

    if features.ncols() != expected_cols {
        return Err(AnalysisError::ValidationError(format!(
            "feature matrix must have {} columns, got {}",
            expected_cols,
            features.ncols()
        )));
    }

    // Scaled features must be fully imputed
    if features.iter().any(|v| v.is_nan() || v.is_infinite()) {
        return Err(AnalysisError::ValidationError(
            "feature matrix contains NaN or Inf values".to_string(),
        ));
    }

    Ok(())
}
