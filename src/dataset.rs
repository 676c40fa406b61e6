use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::utils::format_number;

/// A single raw table value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Parse a raw text field: blanks and NA markers are missing, numbers are numeric
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed {
            "" | "NaN" | "nan" | "NA" | "N/A" | "null" => Cell::Missing,
            _ => match trimmed.parse::<f64>() {
                Ok(value) if !value.is_nan() => Cell::Number(value),
                _ => Cell::Text(trimmed.to_string()),
            },
        }
    }

    /// Build a cell from an optional number, `NaN` counts as missing
    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(v) if !v.is_nan() => Cell::Number(v),
            _ => Cell::Missing,
        }
    }

    /// The numeric value, if this cell holds one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Force the cell to a number: parsable text converts, anything else is missing
    pub fn coerce_numeric(&self) -> Cell {
        match self {
            Cell::Number(v) => Cell::Number(*v),
            Cell::Text(s) => Cell::from_option(s.trim().parse::<f64>().ok()),
            Cell::Missing => Cell::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Text rendering used by the delimited writer
    pub fn render(&self) -> String {
        match self {
            Cell::Number(v) => format_number(*v),
            Cell::Text(s) => s.clone(),
            Cell::Missing => String::new(),
        }
    }
}

/// One student row, cells aligned with the dataset's columns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Record {
    pub values: Vec<Cell>,
}

impl Record {
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }

    /// Get a cell by column index, out-of-range reads as missing
    pub fn get(&self, idx: usize) -> &Cell {
        self.values.get(idx).unwrap_or(&Cell::Missing)
    }

    /// Get a numeric value by column index
    pub fn get_numeric(&self, idx: usize) -> Option<f64> {
        self.get(idx).as_number()
    }
}

/// An ordered table of student records with a stable column set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub columns: Vec<String>,
    pub data: Vec<Record>,
}

impl Dataset {
    /// Create a new empty dataset with the given header
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            data: Vec::new(),
        }
    }

    /// Add a record, padding or truncating it to the column count
    pub fn add_record(&mut self, mut record: Record) {
        record.values.resize(self.columns.len(), Cell::Missing);
        self.data.push(record);
    }

    /// Get the number of records
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Position of a column by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Column values as optional numbers (text counts as missing)
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.data.iter().map(|r| r.get_numeric(idx)).collect())
    }

    /// A column is numeric-typed when every cell is a number or missing
    pub fn is_numeric_column(&self, idx: usize) -> bool {
        self.data
            .iter()
            .all(|r| matches!(r.get(idx), Cell::Number(_) | Cell::Missing))
    }

    /// Return a copy of the dataset with `name` set to `cells`
    ///
    /// An existing column of the same name is overwritten in place, otherwise
    /// the column is appended.
    pub fn with_column(mut self, name: &str, cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len(), self.data.len());
        match self.column_index(name) {
            Some(idx) => {
                for (record, cell) in self.data.iter_mut().zip(cells) {
                    record.values[idx] = cell;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (record, cell) in self.data.iter_mut().zip(cells) {
                    record.values.push(cell);
                }
            }
        }
        self
    }

    /// Keep only the records whose position passes `keep`
    pub fn retain_rows(&self, mut keep: impl FnMut(usize, &Record) -> bool) -> Self {
        let data = self
            .data
            .iter()
            .enumerate()
            .filter(|(i, r)| keep(*i, r))
            .map(|(_, r)| r.clone())
            .collect();
        Self {
            name: self.name.clone(),
            columns: self.columns.clone(),
            data,
        }
    }

    /// Load dataset from delimited text
    pub fn from_csv(name: impl Into<String>, csv_data: &str, delimiter: u8) -> crate::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        ensure_unique_headers(&headers)?;

        let mut dataset = Dataset::new(name, headers);
        for result in reader.records() {
            let record = result?;
            let values = record.iter().map(Cell::parse).collect();
            dataset.add_record(Record::new(values));
        }

        Ok(dataset)
    }

    /// Load dataset from a JSON array of flat objects
    ///
    /// Columns follow first-seen order across all objects.
    pub fn from_json(name: impl Into<String>, json_data: &str) -> crate::Result<Self> {
        let items: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(json_data)?;

        let mut columns: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for item in &items {
            for key in item.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }

        let mut dataset = Dataset::new(name, columns.clone());
        for item in items {
            let values = columns
                .iter()
                .map(|col| match item.get(col) {
                    None | Some(serde_json::Value::Null) => Cell::Missing,
                    Some(serde_json::Value::Number(n)) => Cell::from_option(n.as_f64()),
                    Some(serde_json::Value::String(s)) => Cell::parse(s),
                    Some(serde_json::Value::Bool(b)) => Cell::Number(if *b { 1.0 } else { 0.0 }),
                    Some(other) => Cell::Text(other.to_string()),
                })
                .collect();
            dataset.add_record(Record::new(values));
        }

        Ok(dataset)
    }
}

/// Reject a header row that names the same column twice
pub(crate) fn ensure_unique_headers(headers: &[String]) -> crate::Result<()> {
    let mut seen = HashSet::new();
    for header in headers {
        if !seen.insert(header.as_str()) {
            anyhow::bail!("duplicate column '{}' in header", header);
        }
    }
    Ok(())
}
