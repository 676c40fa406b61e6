//! Source loading: delimited text, spreadsheets and JSON, picked by file extension

use calamine::{open_workbook_auto, Data, Reader};
use std::fs;
use std::path::Path;

use crate::dataset::{ensure_unique_headers, Cell, Dataset, Record};
use crate::utils::AnalysisError;

/// Supported source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited(u8),
    /// Delimiter decided from the header line
    SniffedText,
    Spreadsheet,
    Json,
}

impl SourceFormat {
    /// Pick a format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(Self::Delimited(b',')),
            "tsv" | "tab" => Ok(Self::Delimited(b'\t')),
            "txt" => Ok(Self::SniffedText),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Spreadsheet),
            "json" => Ok(Self::Json),
            _ => Err(AnalysisError::LoadFailure(format!(
                "unsupported source extension '{}' for {}",
                ext,
                path.display()
            ))),
        }
    }
}

/// Load a tabular source into memory
///
/// # Returns
/// * `Ok(Dataset)` with every raw column preserved in source order
/// * `Err(AnalysisError::LoadFailure)` if the file is missing, unreadable,
///   malformed or has no data rows
pub fn load_dataset(path: &Path) -> Result<Dataset, AnalysisError> {
    if !path.exists() {
        return Err(AnalysisError::LoadFailure(format!(
            "source file not found: {}",
            path.display()
        )));
    }

    let format = SourceFormat::from_path(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("cohort")
        .to_string();

    let dataset = match format {
        SourceFormat::Delimited(delimiter) => {
            let content = read_text(path)?;
            parse_delimited(&name, &content, delimiter)?
        }
        SourceFormat::SniffedText => {
            let content = read_text(path)?;
            let header = content.lines().next().unwrap_or_default();
            let delimiter = if header.contains('\t') { b'\t' } else { b',' };
            parse_delimited(&name, &content, delimiter)?
        }
        SourceFormat::Spreadsheet => load_spreadsheet(&name, path)?,
        SourceFormat::Json => {
            let content = read_text(path)?;
            Dataset::from_json(name, &content)
                .map_err(|e| AnalysisError::LoadFailure(format!("{}: {}", path.display(), e)))?
        }
    };

    if dataset.columns.is_empty() || dataset.is_empty() {
        return Err(AnalysisError::LoadFailure(format!(
            "source has no data rows: {}",
            path.display()
        )));
    }

    tracing::info!(
        "Loaded {} records x {} columns from {}",
        dataset.len(),
        dataset.columns.len(),
        path.display()
    );
    Ok(dataset)
}

fn read_text(path: &Path) -> Result<String, AnalysisError> {
    fs::read_to_string(path)
        .map_err(|e| AnalysisError::LoadFailure(format!("cannot read {}: {}", path.display(), e)))
}

fn parse_delimited(name: &str, content: &str, delimiter: u8) -> Result<Dataset, AnalysisError> {
    Dataset::from_csv(name, content, delimiter)
        .map_err(|e| AnalysisError::LoadFailure(format!("malformed delimited source: {}", e)))
}

/// Read the first worksheet, first row is the header
fn load_spreadsheet(name: &str, path: &Path) -> Result<Dataset, AnalysisError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AnalysisError::LoadFailure(format!("cannot open {}: {}", path.display(), e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AnalysisError::LoadFailure(format!("no worksheet in {}", path.display())))?
        .map_err(|e| AnalysisError::LoadFailure(format!("cannot read worksheet: {}", e)))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| AnalysisError::LoadFailure(format!("empty worksheet in {}", path.display())))?;
    let columns: Vec<String> = header.iter().map(|c| c.to_string().trim().to_string()).collect();
    ensure_unique_headers(&columns)
        .map_err(|e| AnalysisError::LoadFailure(format!("{}: {}", path.display(), e)))?;

    let mut dataset = Dataset::new(name, columns);
    for row in rows {
        let values: Vec<Cell> = row.iter().map(spreadsheet_cell).collect();
        if values.iter().all(Cell::is_missing) {
            continue;
        }
        dataset.add_record(Record::new(values));
    }
    Ok(dataset)
}

fn spreadsheet_cell(data: &Data) -> Cell {
    match data {
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) => Cell::from_option(Some(*v)),
        Data::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        Data::String(s) => Cell::parse(s),
        Data::Empty | Data::Error(_) => Cell::Missing,
        other => Cell::parse(&other.to_string()),
    }
}

/// Drop a codebook description row sitting directly under the header
///
/// PISA exports sometimes repeat a human-readable label row ("Student ID",
/// "School ID", ...) as the first data row. It is recognised by a non-numeric
/// value in the identifier column.
pub fn strip_description_row(dataset: &Dataset, id_column: &str) -> Dataset {
    let Some(idx) = dataset.column_index(id_column) else {
        return dataset.clone();
    };
    let is_description = dataset
        .data
        .first()
        .map(|r| matches!(r.get(idx), Cell::Text(_)))
        .unwrap_or(false);

    if is_description {
        tracing::info!("Removing description row under the header of '{}'", dataset.name);
        dataset.retain_rows(|i, _| i != 0)
    } else {
        dataset.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(ext: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(ext).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SourceFormat::from_path(Path::new("a.CSV")).unwrap(), SourceFormat::Delimited(b','));
        assert_eq!(SourceFormat::from_path(Path::new("a.tsv")).unwrap(), SourceFormat::Delimited(b'\t'));
        assert_eq!(SourceFormat::from_path(Path::new("a.xlsx")).unwrap(), SourceFormat::Spreadsheet);
        assert_eq!(SourceFormat::from_path(Path::new("a.json")).unwrap(), SourceFormat::Json);
        assert!(SourceFormat::from_path(Path::new("a.parquet")).is_err());
        assert!(SourceFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_load_csv() {
        let file = write_temp(".csv", "CNTSTUID,PVMATH\n1,500\n2,600\n");
        let dataset = load_dataset(file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.numeric_column("PVMATH").unwrap(), vec![Some(500.0), Some(600.0)]);
    }

    #[test]
    fn test_load_sniffed_tab_text() {
        let file = write_temp(".txt", "CNTSTUID\tPVMATH\n1\t500\n");
        let dataset = load_dataset(file.path()).unwrap();
        assert_eq!(dataset.columns, vec!["CNTSTUID", "PVMATH"]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_dataset(Path::new("/nonexistent/cohort.csv"));
        assert!(matches!(result, Err(AnalysisError::LoadFailure(_))));
    }

    #[test]
    fn test_load_header_only_is_failure() {
        let file = write_temp(".csv", "CNTSTUID,PVMATH\n");
        let result = load_dataset(file.path());
        assert!(matches!(result, Err(AnalysisError::LoadFailure(_))));
    }

    #[test]
    fn test_load_malformed_json_is_failure() {
        let file = write_temp(".json", "{not json");
        let result = load_dataset(file.path());
        assert!(matches!(result, Err(AnalysisError::LoadFailure(_))));
    }

    #[test]
    fn test_load_corrupt_spreadsheet_is_failure() {
        let file = write_temp(".xlsx", "definitely not a zip archive");
        let result = load_dataset(file.path());
        assert!(matches!(result, Err(AnalysisError::LoadFailure(_))));
    }

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
    }

    #[test]
    fn test_load_xlsx_workbook() {
        let dataset = load_dataset(&fixture("cohort.xlsx")).unwrap();

        assert_eq!(dataset.name, "cohort");
        assert_eq!(dataset.columns, vec!["CNTSTUID", "CNT", "PVMATH", "PVREAD"]);
        // the blank worksheet row between 102 and 103 is skipped
        assert_eq!(dataset.len(), 3);
        assert_eq!(
            dataset.numeric_column("CNTSTUID").unwrap(),
            vec![Some(101.0), Some(102.0), Some(103.0)]
        );
        assert_eq!(
            dataset.numeric_column("PVMATH").unwrap(),
            vec![Some(512.5), Some(99.0), Some(601.0)]
        );
        // empty cell reads as missing, not zero
        assert_eq!(
            dataset.numeric_column("PVREAD").unwrap(),
            vec![Some(480.0), None, Some(590.0)]
        );
        assert_eq!(dataset.data[1].get(1), &Cell::Text("SGP".to_string()));
    }

    #[test]
    fn test_load_xlsx_duplicate_header_is_failure() {
        let result = load_dataset(&fixture("duplicate_header.xlsx"));
        match result {
            Err(AnalysisError::LoadFailure(msg)) => assert!(msg.contains("PVMATH")),
            other => panic!("expected LoadFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_spreadsheet_cell_mapping() {
        assert_eq!(spreadsheet_cell(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(spreadsheet_cell(&Data::Float(0.5)), Cell::Number(0.5));
        assert_eq!(spreadsheet_cell(&Data::String(" 42 ".to_string())), Cell::Number(42.0));
        assert_eq!(spreadsheet_cell(&Data::String("CHN".to_string())), Cell::Text("CHN".to_string()));
        assert_eq!(spreadsheet_cell(&Data::Empty), Cell::Missing);
    }

    #[test]
    fn test_strip_description_row() {
        let dataset = Dataset::from_csv(
            "t",
            "CNTSCHID,CNTSTUID,PVMATH\nSchool ID,Student ID,Math score\n1,10,500",
            b',',
        )
        .unwrap();
        let stripped = strip_description_row(&dataset, "CNTSTUID");
        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped.data[0].get_numeric(1), Some(10.0));

        // numeric first row is kept
        let again = strip_description_row(&stripped, "CNTSTUID");
        assert_eq!(again.len(), 1);
    }
}
