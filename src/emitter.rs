//! Profile output: the augmented table written for downstream consumers

use std::fs;
use std::path::Path;

use crate::dataset::{Cell, Dataset};
use crate::utils::AnalysisError;

/// Default destination, read by the dashboard and recommendation services
pub const DEFAULT_OUTPUT: &str = "student_profiles.csv";

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Delimited(u8),
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Delimited(b',')),
            "tsv" => Ok(Self::Delimited(b'\t')),
            "json" => Ok(Self::Json),
            _ => Err(AnalysisError::EmitError(format!(
                "unsupported output extension '{}' for {}",
                ext,
                path.display()
            ))),
        }
    }
}

/// Render the table as delimited text with a header row
pub fn render_delimited(dataset: &Dataset, delimiter: u8) -> Result<Vec<u8>, AnalysisError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(&dataset.columns)
        .map_err(|e| AnalysisError::EmitError(format!("failed to write header: {}", e)))?;
    for record in &dataset.data {
        writer
            .write_record(record.values.iter().map(Cell::render))
            .map_err(|e| AnalysisError::EmitError(format!("failed to write record: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| AnalysisError::EmitError(format!("failed to flush output: {}", e)))
}

/// Render the table as a JSON array of objects, keys in column order
pub fn render_json(dataset: &Dataset) -> Result<Vec<u8>, AnalysisError> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = dataset
        .data
        .iter()
        .map(|record| {
            dataset
                .columns
                .iter()
                .enumerate()
                .map(|(idx, col)| {
                    let value = serde_json::to_value(record.get(idx)).unwrap_or(serde_json::Value::Null);
                    (col.clone(), value)
                })
                .collect()
        })
        .collect();

    serde_json::to_vec_pretty(&rows)
        .map_err(|e| AnalysisError::EmitError(format!("failed to serialize JSON: {}", e)))
}

/// Write the profile table to `path`
///
/// The whole output is rendered in memory first, so a failure never leaves a
/// partial file behind. An existing file is replaced.
pub fn write_profiles(dataset: &Dataset, path: &Path) -> Result<(), AnalysisError> {
    let bytes = match OutputFormat::from_path(path)? {
        OutputFormat::Delimited(delimiter) => render_delimited(dataset, delimiter)?,
        OutputFormat::Json => render_json(dataset)?,
    };

    fs::write(path, bytes)
        .map_err(|e| AnalysisError::EmitError(format!("cannot write {}: {}", path.display(), e)))?;
    tracing::info!("Saved {} profiles to {}", dataset.len(), path.display());
    Ok(())
}
