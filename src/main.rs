//! CLI for bib2md - Convert a collection of BibTeX files to a clean Markdown publication list.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, ValueEnum};

use bib2md::{Config, ConfigError, EntryOrder, Error, Layout, MissingYearPolicy, RunReport};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Convert a collection of BibTeX files to a clean, year-partitioned Markdown publication list
#[derive(Parser)]
#[command(name = "bib2md")]
#[command(version)]
#[command(after_help = "\
Examples:
  bib2md
  bib2md -i bib/journals.bib bib/talks.bib -o papers.md
  bib2md --layout single --missing-year skip
  bib2md --config site/bib2md.toml --json

Every run writes into a fresh build/<timestamp>/ directory.")]
struct Cli {
    /// Input BibTeX files (default: every file in the input directory)
    #[arg(short, long, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Output Markdown file name (no directories), written inside the build directory
    #[arg(short, long)]
    output: Option<String>,

    /// TOML configuration file (default: ./bib2md.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory scanned for input files when --input is not given
    #[arg(long)]
    bib_root: Option<PathBuf>,

    /// Directory holding the per-run build directories
    #[arg(long)]
    build_root: Option<PathBuf>,

    /// Template document rendered by the converter
    #[arg(long)]
    template: Option<PathBuf>,

    /// Render one file per year, or the whole bibliography at once
    #[arg(long, value_enum)]
    layout: Option<Layout>,

    /// What to do with entries lacking an integer year
    #[arg(long, value_enum)]
    missing_year: Option<MissingYearPolicy>,

    /// Order of entries in written bibliography files
    #[arg(long, value_enum)]
    entry_order: Option<EntryOrder>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration.
    fn apply(&self, mut config: Config) -> Config {
        if !self.input.is_empty() {
            config.inputs = self.input.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(dir) = &self.bib_root {
            config.bib_root = dir.clone();
        }
        if let Some(dir) = &self.build_root {
            config.build_root = dir.clone();
        }
        if let Some(template) = &self.template {
            config.render.template = template.clone();
        }
        if let Some(layout) = self.layout {
            config.layout = layout;
        }
        if let Some(policy) = self.missing_year {
            config.missing_year = policy;
        }
        if let Some(order) = self.entry_order {
            config.entry_order = order;
        }
        config
    }
}

// ---------------------------------------------------------------------------
// AppError — semantic exit codes
// ---------------------------------------------------------------------------

enum AppError {
    /// Exit 10 — input, template or build directory problem
    Filesystem(String),
    /// Exit 11 — malformed bibliography
    Parse(String),
    /// Exit 12 — entry without an integer year
    MissingField(String),
    /// Exit with the tool's own code, or 13 when it has none
    ExternalTool { message: String, code: Option<i32> },
    /// Exit 14 — configuration file not found / invalid, or a bad output name
    Config(String),
    /// Exit 15 — cannot write the report
    Report(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Filesystem(_) => 10,
            AppError::Parse(_) => 11,
            AppError::MissingField(_) => 12,
            AppError::ExternalTool { code, .. } => code.filter(|c| *c != 0).unwrap_or(13),
            AppError::Config(_) => 14,
            AppError::Report(_) => 15,
        }
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        let message = e.to_string();
        match e {
            Error::ExternalTool(tool) => AppError::ExternalTool {
                message,
                code: tool.exit_code(),
            },
            Error::Parse { .. } => AppError::Parse(message),
            Error::MissingField { .. } | Error::InvalidYear { .. } => {
                AppError::MissingField(message)
            }
            Error::Filesystem { .. } | Error::NoInputs { .. } => AppError::Filesystem(message),
            Error::InvalidOutputName { .. } => AppError::Config(message),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Filesystem(msg) => {
                write!(
                    f,
                    "{}\n  hint: verify the input files, the template and the build directory exist and are accessible",
                    msg
                )
            }
            AppError::Parse(msg) => {
                write!(
                    f,
                    "{}\n  hint: the merged file is kept in the build directory for inspection",
                    msg
                )
            }
            AppError::MissingField(msg) => {
                write!(
                    f,
                    "{}\n  hint: add an integer year to the entry, or rerun with --missing-year skip",
                    msg
                )
            }
            AppError::ExternalTool { message, .. } => {
                write!(
                    f,
                    "{}\n  hint: bibtool and pandoc must be installed and on PATH (or configured in bib2md.toml)",
                    message
                )
            }
            AppError::Config(msg) => write!(f, "{}", msg),
            AppError::Report(msg) => write!(f, "{}", msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "bib2md=warn",
        1 => "bib2md=info",
        2 => "bib2md=debug",
        _ => "bib2md=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let config = cli.apply(Config::load(cli.config.as_deref())?);
    let report = bib2md::run(&config)?;
    print_report(&report, cli.json)
}

fn print_report(report: &RunReport, json: bool) -> Result<(), AppError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if json {
        serde_json::to_writer_pretty(&mut handle, report)
            .map_err(|e| AppError::Report(format!("stdout: {}", e)))?;
        writeln!(handle).map_err(|e| AppError::Report(format!("stdout: {}", e)))?;
    } else {
        writeln!(handle, "{}", report.output.display())
            .map_err(|e| AppError::Report(format!("stdout: {}", e)))?;
    }

    if !report.skipped.is_empty() {
        eprintln!(
            "skipped {} entr{} without a year: {}",
            report.skipped.len(),
            if report.skipped.len() == 1 { "y" } else { "ies" },
            report.skipped.join(", ")
        );
    }
    Ok(())
}
