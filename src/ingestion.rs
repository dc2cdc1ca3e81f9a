//! Intake collaborators: turn uploaded bytes into raw rows.
//!
//! The pipeline only depends on [`TabularParser`]. Binary spreadsheet readers
//! live outside this crate and plug in through the same trait.

use crate::error::{DashboardError, Result};
use crate::record::{CellValue, RawRow};
use serde_json::Value;

pub trait TabularParser: Send + Sync {
    /// Parses the first sheet of `bytes` into one [`RawRow`] per data row.
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawRow>>;
}

impl<P: TabularParser + ?Sized> TabularParser for Box<P> {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawRow>> {
        (**self).parse(bytes)
    }
}

impl<P: TabularParser + ?Sized> TabularParser for &P {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawRow>> {
        (**self).parse(bytes)
    }
}

/// Delimited text with a header row.
#[derive(Debug, Clone)]
pub struct CsvTableParser {
    delimiter: u8,
    infer_numbers: bool,
}

impl Default for CsvTableParser {
    fn default() -> Self {
        Self {
            delimiter: b',',
            infer_numbers: false,
        }
    }
}

impl CsvTableParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Store cells that are complete numbers as [`CellValue::Number`], the
    /// way a spreadsheet reader reports numeric cells. Needed for serial
    /// dates exported as plain numbers.
    pub fn with_number_inference(mut self, infer: bool) -> Self {
        self.infer_numbers = infer;
        self
    }

    fn cell(&self, raw: &str) -> CellValue {
        if raw.trim().is_empty() {
            return CellValue::Empty;
        }
        if self.infer_numbers {
            if let Ok(n) = raw.trim().parse::<f64>() {
                if n.is_finite() {
                    return CellValue::Number(n);
                }
            }
        }
        CellValue::Text(raw.to_string())
    }
}

impl TabularParser for CsvTableParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let row: RawRow = headers
                .iter()
                .zip(record.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, field)| (header.clone(), self.cell(field)))
                .collect();
            rows.push(row);
        }

        Ok(rows)
    }
}

/// A JSON array of flat objects, as produced by sheet-to-JSON exports.
#[derive(Debug, Clone, Default)]
pub struct JsonRowsParser;

impl JsonRowsParser {
    pub fn new() -> Self {
        Self
    }

    fn cell(value: Value) -> CellValue {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or_default(),
            Value::String(s) => CellValue::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => CellValue::Text(nested.to_string()),
        }
    }
}

impl TabularParser for JsonRowsParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawRow>> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Array(items) = value else {
            return Err(DashboardError::ParseError(
                "expected a JSON array of row objects".to_string(),
            ));
        };

        items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(map) => Ok(map
                    .into_iter()
                    .map(|(header, value)| (header, Self::cell(value)))
                    .collect()),
                other => Err(DashboardError::ParseError(format!(
                    "row {} is not an object: {}",
                    idx, other
                ))),
            })
            .collect()
    }
}
