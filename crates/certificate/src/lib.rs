//! Certificate generation - fill a PDF template once per recipient
//!
//! This crate provides:
//! - Job configuration (JSON, camelCase keys)
//! - Recipient records read from a spreadsheet or CSV file
//! - Output filename sanitization
//! - The batch orchestrator: locate the placeholder once, then render one
//!   certificate per record
//!
//! # Example
//!
//! ```ignore
//! use certificate::{run, JobConfig};
//!
//! let config = JobConfig::new("template.pdf", "names.xlsx");
//! let report = run(&config)?;
//! println!("{} certificates written", report.generated.len());
//! ```

mod config;
mod filename;
mod generator;
mod records;

pub use config::{
    JobConfig, RowFailurePolicy, TextStyle, DEFAULT_FONT, DEFAULT_FONT_SIZE, DEFAULT_NAME_COLUMN,
    DEFAULT_OUTPUT_DIR, DEFAULT_PLACEHOLDER,
};
pub use filename::{output_file_name, safe_name, FILE_PREFIX};
pub use generator::{locate, run, BatchReport, CertificateGenerator, SkippedRow};
pub use records::{read_records, DataFormat, RecipientRecord};

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which input could not be found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Template,
    Data,
    Config,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template => write!(f, "template"),
            Self::Data => write!(f, "spreadsheet"),
            Self::Config => write!(f, "config"),
        }
    }
}

/// Errors that can occur during certificate generation
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("{kind} file not found: {}", path.display())]
    InputNotFound { kind: InputKind, path: PathBuf },

    #[error("placeholder '{0}' not found on page 1 of the template")]
    PlaceholderNotFound(String),

    #[error("row {row}: name is empty")]
    MalformedRow { row: usize },

    #[error("column '{column}' not found in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("unsupported data file format: {}", path.display())]
    UnsupportedDataFormat { path: PathBuf },

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("row {row} ({name}): {source}")]
    RowFailed {
        row: usize,
        name: String,
        #[source]
        source: Box<CertificateError>,
    },

    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for certificate operations
pub type Result<T> = std::result::Result<T, CertificateError>;
