//! Certificate rendering and the batch orchestrator

use crate::config::{JobConfig, RowFailurePolicy};
use crate::filename::output_path;
use crate::records::{read_records, RecipientRecord};
use crate::{CertificateError, InputKind, Result};
use pdf_core::{FontSpec, PdfDocument, Point, Rect};
use rayon::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Page that carries the placeholder
const TEMPLATE_PAGE: usize = 1;

/// Renders certificates from a template with a located placeholder
///
/// The template is loaded and searched once; every certificate starts from a
/// fresh clone of it, so the template itself is never modified.
#[derive(Clone)]
pub struct CertificateGenerator {
    template: PdfDocument,
    placeholder_box: Rect,
    center: Point,
    font: FontSpec,
}

impl CertificateGenerator {
    /// Load a template file and locate the placeholder on its first page
    pub fn open<P: AsRef<Path>>(path: P, placeholder: &str, font: FontSpec) -> Result<Self> {
        let template = open_template(path.as_ref())?;
        Self::new(template, placeholder, font)
    }

    /// Locate the placeholder in an already opened template
    ///
    /// The first match on page 1 wins.
    pub fn new(template: PdfDocument, placeholder: &str, font: FontSpec) -> Result<Self> {
        let matches = template.search_text(TEMPLATE_PAGE, placeholder)?;
        let placeholder_box = *matches
            .first()
            .ok_or_else(|| CertificateError::PlaceholderNotFound(placeholder.to_string()))?;

        if matches.len() > 1 {
            tracing::warn!(
                "placeholder '{placeholder}' appears {} times on page 1, using the first",
                matches.len()
            );
        }

        let center = placeholder_box.center();
        tracing::debug!(?placeholder_box, ?center, "located placeholder");

        Ok(Self {
            template,
            placeholder_box,
            center,
            font,
        })
    }

    pub fn placeholder_box(&self) -> Rect {
        self.placeholder_box
    }

    /// Point the names are centered on; its y is used as the baseline
    pub fn center(&self) -> Point {
        self.center
    }

    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    /// A copy of the template with `name` centered over the placeholder
    pub fn render(&self, name: &str) -> Result<PdfDocument> {
        let mut document = self.template.clone();
        document.insert_text_centered(TEMPLATE_PAGE, self.center, name, &self.font)?;
        Ok(document)
    }

    /// Render one record and write it into `output_dir`
    ///
    /// The file is written to a temporary name first and renamed into
    /// place, replacing any existing certificate of the same name.
    pub fn generate(&self, record: &RecipientRecord, output_dir: &Path) -> Result<PathBuf> {
        let name = record.name.trim();
        if name.is_empty() {
            return Err(CertificateError::MalformedRow { row: record.row });
        }

        let path = output_path(output_dir, name);
        let bytes = self.render(name)?.to_bytes()?;
        write_atomically(&path, &bytes)?;

        tracing::info!("Created certificate for {name} at {}", path.display());
        Ok(path)
    }
}

/// A row that was logged and left out under [`RowFailurePolicy::Skip`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub row: usize,
    pub name: String,
    pub reason: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Written files, in input row order
    pub generated: Vec<PathBuf>,
    pub skipped: Vec<SkippedRow>,
    /// Rows whose output path was claimed again by a later row
    pub superseded: usize,
}

/// Run a whole job
///
/// Inputs are checked before anything is written: the font style, the
/// data file, then the template and its placeholder. Only then is the
/// output directory created and are rows rendered.
pub fn run(config: &JobConfig) -> Result<BatchReport> {
    config.validate()?;
    let font = config.style.font_spec()?;

    let records = read_records(&config.data, &config.name_column)?;
    let generator = CertificateGenerator::open(&config.template, &config.placeholder, font)?;
    std::fs::create_dir_all(&config.output_dir)?;

    let (records, superseded) = dedupe_outputs(records, &config.output_dir);
    tracing::debug!(
        rows = records.len(),
        workers = config.workers,
        "rendering certificates"
    );

    let render = |record: &RecipientRecord| -> Result<PathBuf> {
        generator
            .generate(record, &config.output_dir)
            .map_err(|source| CertificateError::RowFailed {
                row: record.row,
                name: record.name.clone(),
                source: Box::new(source),
            })
    };

    let pool = if config.workers > 1 {
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .build()
                .map_err(|e| CertificateError::Config(e.to_string()))?,
        )
    } else {
        None
    };

    let mut report = BatchReport {
        superseded,
        ..BatchReport::default()
    };

    match config.on_row_error {
        RowFailurePolicy::Abort => {
            report.generated = match &pool {
                Some(pool) => pool.install(|| {
                    records
                        .par_iter()
                        .map(render)
                        .collect::<Result<Vec<PathBuf>>>()
                })?,
                None => records
                    .iter()
                    .map(render)
                    .collect::<Result<Vec<PathBuf>>>()?,
            };
        }
        RowFailurePolicy::Skip => {
            let results: Vec<Result<PathBuf>> = match &pool {
                Some(pool) => pool.install(|| records.par_iter().map(render).collect()),
                None => records.iter().map(render).collect(),
            };

            for (record, result) in records.iter().zip(results) {
                match result {
                    Ok(path) => report.generated.push(path),
                    Err(e) => {
                        tracing::warn!("skipping {e}");
                        report.skipped.push(SkippedRow {
                            row: record.row,
                            name: record.name.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(report)
}

/// Every match of `placeholder` on page 1 of a template
pub fn locate<P: AsRef<Path>>(template: P, placeholder: &str) -> Result<Vec<Rect>> {
    let document = open_template(template.as_ref())?;
    Ok(document.search_text(TEMPLATE_PAGE, placeholder)?)
}

fn open_template(path: &Path) -> Result<PdfDocument> {
    if !path.is_file() {
        return Err(CertificateError::InputNotFound {
            kind: InputKind::Template,
            path: path.to_path_buf(),
        });
    }
    Ok(PdfDocument::open(path)?)
}

/// Keep only the last record for each output path
///
/// Records with a blank name are kept; they fail later as malformed.
fn dedupe_outputs(
    records: Vec<RecipientRecord>,
    output_dir: &Path,
) -> (Vec<RecipientRecord>, usize) {
    let mut last_writer: HashMap<PathBuf, usize> = HashMap::new();
    for record in &records {
        if !record.name.is_empty() {
            last_writer.insert(output_path(output_dir, &record.name), record.row);
        }
    }

    let mut superseded = 0;
    let kept = records
        .into_iter()
        .filter(|record| {
            if record.name.is_empty() {
                return true;
            }
            match last_writer.get(&output_path(output_dir, &record.name)) {
                Some(&row) if row != record.row => {
                    tracing::warn!(
                        "row {} ({}) has the same output file as row {row}, which replaces it",
                        record.row,
                        record.name
                    );
                    superseded += 1;
                    false
                }
                _ => true,
            }
        })
        .collect();

    (kept, superseded)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
