use thiserror::Error;

/// Typed failure reasons returned by the profiling pipeline
///
/// Only structural failures are errors. Missing dimension groups and dropped
/// rows are reported through the stage outcomes instead.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    /// Source file missing, unreadable, malformed or empty
    #[error("LoadFailure: {0}")]
    LoadFailure(String),
    /// Input that cannot be processed (no surviving rows, bad configuration)
    #[error("ValidationError: {0}")]
    ValidationError(String),
    /// Clustering errors
    #[error("ModelError: {0}")]
    ModelError(String),
    /// Output serialization or write errors
    #[error("EmitError: {0}")]
    EmitError(String),
}
