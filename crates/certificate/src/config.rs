//! Job configuration

use crate::{CertificateError, InputKind, Result};
use pdf_core::FontSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "certificates_output";
pub const DEFAULT_PLACEHOLDER: &str = "NAME_PLACEHOLDER";
pub const DEFAULT_NAME_COLUMN: &str = "Name";
pub const DEFAULT_FONT: &str = "Times-Italic";
pub const DEFAULT_FONT_SIZE: f32 = 37.0;

/// What to do when a single row cannot be rendered
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RowFailurePolicy {
    /// Stop the batch at the first failing row
    #[default]
    Abort,
    /// Log the row and continue with the rest
    Skip,
}

/// Font used for the recipient's name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TextStyle {
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub size: f32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: default_font(),
            size: default_font_size(),
        }
    }
}

impl TextStyle {
    /// Resolve to a concrete font, failing on unknown families
    pub fn font_spec(&self) -> Result<FontSpec> {
        Ok(FontSpec::new(&self.font, self.size)?)
    }
}

/// A certificate batch job
///
/// Only `template` and `data` are required in JSON; everything else falls
/// back to the defaults above.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobConfig {
    /// Single-page PDF containing the placeholder
    pub template: PathBuf,

    /// Spreadsheet or CSV file with one recipient per row
    pub data: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    #[serde(default = "default_name_column")]
    pub name_column: String,

    #[serde(default)]
    pub style: TextStyle,

    /// Size of the worker pool; 1 renders sequentially
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub on_row_error: RowFailurePolicy,
}

impl JobConfig {
    /// Job with default settings for the given inputs
    pub fn new(template: impl Into<PathBuf>, data: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            data: data.into(),
            output_dir: default_output_dir(),
            placeholder: default_placeholder(),
            name_column: default_name_column(),
            style: TextStyle::default(),
            workers: default_workers(),
            on_row_error: RowFailurePolicy::default(),
        }
    }

    /// Parse a job from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CertificateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a job file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CertificateError::InputNotFound {
                kind: InputKind::Config,
                path: path.to_path_buf(),
            });
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Check settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.placeholder.is_empty() {
            return Err(CertificateError::Config(
                "placeholder must not be empty".to_string(),
            ));
        }
        if self.name_column.is_empty() {
            return Err(CertificateError::Config(
                "nameColumn must not be empty".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(CertificateError::Config(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_name_column() -> String {
    DEFAULT_NAME_COLUMN.to_string()
}

fn default_font() -> String {
    DEFAULT_FONT.to_string()
}

fn default_font_size() -> f32 {
    DEFAULT_FONT_SIZE
}

fn default_workers() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_minimal_config() {
        let config =
            JobConfig::from_json(r#"{ "template": "template.pdf", "data": "names.xlsx" }"#)
                .unwrap();

        assert_eq!(config, JobConfig::new("template.pdf", "names.xlsx"));
        assert_eq!(config.output_dir, PathBuf::from("certificates_output"));
        assert_eq!(config.placeholder, "NAME_PLACEHOLDER");
        assert_eq!(config.name_column, "Name");
        assert_eq!(config.style, TextStyle::default());
        assert_eq!(config.workers, 1);
        assert_eq!(config.on_row_error, RowFailurePolicy::Abort);
    }

    #[test]
    fn test_full_config() {
        let config = JobConfig::from_json(
            r#"{
                "template": "cert.pdf",
                "data": "people.csv",
                "outputDir": "out",
                "placeholder": "{{NAME}}",
                "nameColumn": "Full Name",
                "style": { "font": "tiit", "size": 30 },
                "workers": 4,
                "onRowError": "skip"
            }"#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.placeholder, "{{NAME}}");
        assert_eq!(config.name_column, "Full Name");
        assert_eq!(config.style.size, 30.0);
        assert_eq!(config.workers, 4);
        assert_eq!(config.on_row_error, RowFailurePolicy::Skip);
        assert_eq!(config.style.font_spec().unwrap().size(), 30.0);
    }

    #[test]
    fn test_missing_required_field() {
        let err = JobConfig::from_json(r#"{ "template": "template.pdf" }"#).unwrap_err();
        assert!(matches!(
            err,
            CertificateError::Config(msg) if msg.contains("data")
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = JobConfig::from_json(
            r#"{ "template": "t.pdf", "data": "d.csv", "outputFolder": "x" }"#,
        )
        .unwrap_err();
        assert!(matches!(err, CertificateError::Config(_)));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = JobConfig::from_json(r#"{ "template": "t.pdf", "data": "d.csv", "workers": 0 }"#)
            .unwrap_err();
        assert!(matches!(err, CertificateError::Config(_)));
    }

    #[test]
    fn test_unknown_font_family() {
        let style = TextStyle {
            font: "Comic Sans".to_string(),
            size: 37.0,
        };
        let err = style.font_spec().unwrap_err();
        assert!(matches!(
            err,
            CertificateError::Pdf(pdf_core::PdfError::FontResolution(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let err = JobConfig::from_file("does/not/exist.json").unwrap_err();
        assert!(matches!(
            err,
            CertificateError::InputNotFound {
                kind: InputKind::Config,
                ..
            }
        ));
    }
}
