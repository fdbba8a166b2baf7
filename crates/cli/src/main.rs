//! # certgen CLI
//!
//! Generates one PDF certificate per spreadsheet row by writing each
//! recipient's name centered over a placeholder in a template.
//!
//! ## Usage
//!
//! ```bash
//! # template.pdf + names.xlsx -> certificates_output/
//! certgen generate
//!
//! # Explicit inputs, four workers
//! certgen generate --template award.pdf --data people.csv --jobs 4
//!
//! # Settings from a job file, with an override
//! certgen generate --config job.json --output-dir out
//!
//! # Show where the placeholder is
//! certgen locate --template award.pdf
//! ```

use anyhow::{bail, Context};
use certificate::{JobConfig, RowFailurePolicy};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_TEMPLATE: &str = "template.pdf";
const DEFAULT_DATA: &str = "names.xlsx";
const DEFAULT_LOG_FILTER: &str = "certgen=info,certificate=info,pdf_core=warn";
const VERBOSE_LOG_FILTER: &str = "certgen=debug,certificate=debug,pdf_core=debug";

/// certgen - Personalized PDF certificates from a template and a spreadsheet
#[derive(Parser, Debug)]
#[command(name = "certgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug details (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render one certificate per data row
    Generate(GenerateArgs),

    /// Print the bounding boxes of the placeholder on page 1
    Locate {
        /// Template PDF
        #[arg(long, value_name = "FILE", default_value = DEFAULT_TEMPLATE)]
        template: PathBuf,

        /// Text to search for
        #[arg(long, default_value = certificate::DEFAULT_PLACEHOLDER)]
        placeholder: String,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// JSON job file; other flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Template PDF [default: template.pdf]
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Spreadsheet (xlsx, xlsm, xlsb, xls, ods) or CSV file [default: names.xlsx]
    #[arg(long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Directory for generated certificates [default: certificates_output]
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Placeholder text in the template [default: NAME_PLACEHOLDER]
    #[arg(long)]
    placeholder: Option<String>,

    /// Header of the column holding recipient names [default: Name]
    #[arg(long)]
    name_column: Option<String>,

    /// Font family [default: Times-Italic]
    #[arg(long)]
    font: Option<String>,

    /// Font size in points [default: 37]
    #[arg(long)]
    size: Option<f32>,

    /// Number of worker threads [default: 1]
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Log rows that fail and continue with the rest
    #[arg(long)]
    skip_failed_rows: bool,
}

impl GenerateArgs {
    /// Job settings: the config file (or defaults), then flag overrides
    fn into_config(self) -> anyhow::Result<JobConfig> {
        let mut config = match &self.config {
            Some(path) => JobConfig::from_file(path)
                .with_context(|| format!("loading job file {}", path.display()))?,
            None => JobConfig::new(DEFAULT_TEMPLATE, DEFAULT_DATA),
        };

        if let Some(template) = self.template {
            config.template = template;
        }
        if let Some(data) = self.data {
            config.data = data;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        if let Some(placeholder) = self.placeholder {
            config.placeholder = placeholder;
        }
        if let Some(name_column) = self.name_column {
            config.name_column = name_column;
        }
        if let Some(font) = self.font {
            config.style.font = font;
        }
        if let Some(size) = self.size {
            config.style.size = size;
        }
        if let Some(jobs) = self.jobs {
            config.workers = jobs;
        }
        if self.skip_failed_rows {
            config.on_row_error = RowFailurePolicy::Skip;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        VERBOSE_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Generate(args) => {
            let config = args.into_config()?;
            let report = certificate::run(&config)?;

            tracing::info!(
                "{} certificate(s) written to {}",
                report.generated.len(),
                config.output_dir.display()
            );
            if report.superseded > 0 {
                tracing::warn!(
                    "{} row(s) replaced by later rows with the same file name",
                    report.superseded
                );
            }
            if !report.skipped.is_empty() {
                tracing::warn!("{} row(s) skipped", report.skipped.len());
            }
        }

        Commands::Locate {
            template,
            placeholder,
        } => {
            let matches = certificate::locate(&template, &placeholder)?;
            if matches.is_empty() {
                bail!(
                    "placeholder '{placeholder}' not found on page 1 of {}",
                    template.display()
                );
            }

            for (i, rect) in matches.iter().enumerate() {
                let center = rect.center();
                println!(
                    "{}: ({:.2}, {:.2}) - ({:.2}, {:.2})  center ({:.2}, {:.2})",
                    i + 1,
                    rect.x0,
                    rect.y0,
                    rect.x1,
                    rect.y1,
                    center.x,
                    center.y
                );
            }
        }
    }

    Ok(())
}
