//! Recipient records from spreadsheets and CSV files

use crate::{CertificateError, InputKind, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// One recipient, read from a data row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientRecord {
    /// 1-based data row number, header excluded
    pub row: usize,
    /// Name cell, stringified and trimmed; may be empty
    pub name: String,
}

impl RecipientRecord {
    pub fn new(row: usize, name: impl Into<String>) -> Self {
        Self {
            row,
            name: name.into(),
        }
    }
}

/// Supported data file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// xlsx, xlsm, xlsb, xls or ods; the first worksheet is read
    Workbook,
    Csv,
}

impl DataFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Ok(Self::Workbook),
            Some("csv") => Ok(Self::Csv),
            _ => Err(CertificateError::UnsupportedDataFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Read recipient records from `path`
///
/// The first row is the header and must contain `column` (exact,
/// case-sensitive). Rows whose cells are all empty are skipped.
pub fn read_records(path: &Path, column: &str) -> Result<Vec<RecipientRecord>> {
    if !path.is_file() {
        return Err(CertificateError::InputNotFound {
            kind: InputKind::Data,
            path: path.to_path_buf(),
        });
    }

    let records = match DataFormat::from_path(path)? {
        DataFormat::Workbook => read_workbook(path, column)?,
        DataFormat::Csv => read_csv(path, column)?,
    };

    tracing::debug!(
        path = %path.display(),
        records = records.len(),
        "read recipient records"
    );
    Ok(records)
}

fn read_workbook(path: &Path, column: &str) -> Result<Vec<RecipientRecord>> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| CertificateError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CertificateError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| CertificateError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let index = rows
        .next()
        .and_then(|header| header.iter().position(|cell| cell_text(cell) == column))
        .ok_or_else(|| missing_column(path, column))?;

    let mut records = Vec::new();
    for (i, row) in rows.enumerate() {
        if row.iter().all(|cell| cell_text(cell).trim().is_empty()) {
            continue;
        }
        let name = row.get(index).map(cell_text).unwrap_or_default();
        records.push(RecipientRecord::new(i + 1, name.trim()));
    }

    Ok(records)
}

fn read_csv(path: &Path, column: &str) -> Result<Vec<RecipientRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let index = reader
        .headers()?
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| missing_column(path, column))?;

    let mut records = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let name = record.get(index).unwrap_or_default();
        records.push(RecipientRecord::new(i + 1, name.trim()));
    }

    Ok(records)
}

/// Text of a cell the way a spreadsheet displays it: whole floats lose
/// their fraction, empty cells are empty
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn missing_column(path: &Path, column: &str) -> CertificateError {
    CertificateError::MissingColumn {
        column: column.to_string(),
        path: path.to_path_buf(),
    }
}
