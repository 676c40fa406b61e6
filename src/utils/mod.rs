/// Utility modules for error handling, scaling and numeric conversions
pub mod error;
pub mod scaling;
pub mod type_convert;

// Re-export commonly used types
pub use error::AnalysisError;
pub use scaling::{min_max_scale, standard_scale};
pub use type_convert::{clamp_unit, columns_to_matrix, format_number, round_to, row_means};
