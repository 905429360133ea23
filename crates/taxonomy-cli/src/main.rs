//! taxonomy - build, export and check three-level taxonomies
//!
//! Usage:
//!
//! ```bash
//! taxonomy build data/sample_taxonomy.csv --snapshot taxonomy.bin
//! taxonomy export --snapshot taxonomy.bin --format json -o taxonomy.json
//! taxonomy check data/sample_taxonomy.csv data/sample_component.json --strict
//! taxonomy terms data/sample_taxonomy.csv Envelope.Wall
//! ```

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use commands::{BuildArgs, Source};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use taxonomy_core::{CheckMode, ExportFormat, TaxonomyConfig, TermOrder};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "taxonomy")]
#[command(about = "Build, export and check controlled-vocabulary taxonomies")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "TAXONOMY_CONFIG")]
    config: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG still wins when set)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a taxonomy from a CSV table and report diagnostics
    Build {
        /// CSV taxonomy table
        csv: PathBuf,
        /// Also write a snapshot of the built tree
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Print diagnostics as JSON
        #[arg(long)]
        json_diagnostics: bool,
    },

    /// Export the taxonomy as XML or JSON
    Export {
        /// CSV taxonomy table
        #[arg(required_unless_present = "snapshot", conflicts_with = "snapshot")]
        csv: Option<PathBuf>,
        /// Load a snapshot instead of a CSV table
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Output format (default from config, else xml)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Include publication flags on every term
        #[arg(long)]
        extended: bool,
        /// Order terms and enumeration values alphabetically
        #[arg(long)]
        alphabetical: bool,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Check component records (JSON) against the taxonomy
    Check {
        /// Load a snapshot instead of a CSV table
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Also enforce required terms, value types and repeats
        #[arg(long)]
        strict: bool,
        /// CSV table (omit with --snapshot) followed by record files
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,
    },

    /// Print the effective terms of a node
    Terms {
        /// Load a snapshot instead of a CSV table
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// CSV table (omit with --snapshot) followed by the node path
        #[arg(required = true, num_args = 1..=2, value_name = "ARGS")]
        args: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Xml,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xml => ExportFormat::Xml,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => TaxonomyConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => TaxonomyConfig::default(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let code = match cli.command {
        Command::Build {
            csv,
            snapshot,
            json_diagnostics,
        } => {
            let args = BuildArgs {
                csv: &csv,
                snapshot: snapshot.as_deref(),
                json_diagnostics,
            };
            commands::build(&args, &config.build, &mut out)?;
            ExitCode::SUCCESS
        }
        Command::Export {
            csv,
            snapshot,
            format,
            extended,
            alphabetical,
            output,
        } => {
            if let Some(format) = format {
                config.export.format = format.into();
            }
            config.export.extended_fields |= extended;
            if alphabetical {
                config.build.term_order = TermOrder::Alphabetical;
            }
            let source = match (csv, snapshot) {
                (_, Some(path)) => Source::Snapshot(path),
                (Some(path), None) => Source::Csv(path),
                (None, None) => anyhow::bail!("a CSV table or --snapshot is required"),
            };
            commands::export(
                &source,
                &config.build,
                &config.export,
                output.as_deref(),
                &mut out,
            )?;
            ExitCode::SUCCESS
        }
        Command::Check {
            snapshot,
            strict,
            files,
        } => {
            config.conformance.strict |= strict;
            let mode = if config.conformance.strict {
                CheckMode::Strict
            } else {
                CheckMode::Default
            };
            let (source, records) = Source::split(snapshot, files)?;
            if commands::check(&source, &records, mode, &config.build, &mut out)? {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Terms { snapshot, args } => {
            let (source, rest) = Source::split(snapshot, args)?;
            let [path] = rest.as_slice() else {
                anyhow::bail!("expected exactly one node path");
            };
            commands::terms(&source, path, &config.build, &mut out)?;
            ExitCode::SUCCESS
        }
    };

    out.flush()?;
    Ok(code)
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "taxonomy=debug,taxonomy_core=debug"
    } else {
        "taxonomy=info,taxonomy_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
