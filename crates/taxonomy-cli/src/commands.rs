//! Subcommand implementations.
//!
//! Each command writes its report to the supplied writer so it can be
//! exercised against a buffer in tests; only `main` touches stdout.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use taxonomy_core::export::render;
use taxonomy_core::snapshot::{read_snapshot, write_snapshot};
use taxonomy_core::{
    ingest, BuildConfig, CheckMode, ComponentRecord, ConformanceChecker, Diagnostic,
    ExportConfig, Severity, TaxonomyTree, TreeBuilder,
};

/// Where a tree comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Csv(PathBuf),
    Snapshot(PathBuf),
}

impl Source {
    /// Resolve the source for commands that take `(<csv> | --snapshot)`
    /// followed by more positionals. Without `--snapshot` the first
    /// positional is the CSV table.
    pub fn split<T: Into<PathBuf>>(
        snapshot: Option<PathBuf>,
        mut positionals: Vec<T>,
    ) -> Result<(Source, Vec<T>)> {
        match snapshot {
            Some(path) => Ok((Source::Snapshot(path), positionals)),
            None if positionals.is_empty() => bail!("a CSV table or --snapshot is required"),
            None => {
                let csv = positionals.remove(0).into();
                Ok((Source::Csv(csv), positionals))
            }
        }
    }
}

/// A loaded tree and the diagnostics its build produced (none for snapshots).
pub struct Loaded {
    pub tree: TaxonomyTree,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn load(source: &Source, config: &BuildConfig) -> Result<Loaded> {
    match source {
        Source::Csv(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open taxonomy table: {}", path.display()))?;
            let rows = ingest::read_rows(BufReader::new(file))
                .with_context(|| format!("Failed to read taxonomy table: {}", path.display()))?;
            let output = TreeBuilder::new(config.clone())
                .build(rows)
                .with_context(|| format!("Failed to build taxonomy from {}", path.display()))?;
            Ok(Loaded {
                tree: output.tree,
                diagnostics: output.diagnostics,
            })
        }
        Source::Snapshot(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open snapshot: {}", path.display()))?;
            let tree = read_snapshot(BufReader::new(file))
                .with_context(|| format!("Failed to restore snapshot: {}", path.display()))?;
            if tree.term_order() != config.term_order {
                tracing::warn!(
                    snapshot = ?tree.term_order(),
                    requested = ?config.term_order,
                    "snapshot term order is fixed; ignoring requested order"
                );
            }
            Ok(Loaded {
                tree,
                diagnostics: Vec::new(),
            })
        }
    }
}

// ── build ──

pub struct BuildArgs<'a> {
    pub csv: &'a Path,
    pub snapshot: Option<&'a Path>,
    pub json_diagnostics: bool,
}

pub fn build(args: &BuildArgs<'_>, config: &BuildConfig, out: &mut impl Write) -> Result<()> {
    let loaded = load(&Source::Csv(args.csv.to_path_buf()), config)?;

    if args.json_diagnostics {
        serde_json::to_writer_pretty(&mut *out, &loaded.diagnostics)?;
        writeln!(out)?;
    } else {
        for diagnostic in &loaded.diagnostics {
            writeln!(out, "{}", diagnostic)?;
        }
        let count = |s: Severity| loaded.diagnostics.iter().filter(|d| d.severity == s).count();
        writeln!(
            out,
            "{} nodes, {} errors, {} warnings, {} notes",
            loaded.tree.len(),
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info)
        )?;
    }

    if let Some(path) = args.snapshot {
        let file = File::create(path)
            .with_context(|| format!("Failed to create snapshot: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_snapshot(&loaded.tree, &mut writer)
            .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;
        writer.flush()?;
    }

    Ok(())
}

// ── export ──

pub fn export(
    source: &Source,
    build_config: &BuildConfig,
    export_config: &ExportConfig,
    output: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let loaded = load(source, build_config)?;
    let rendered = render(&loaded.tree, export_config)?;

    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write export: {}", path.display()))?,
        None => writeln!(out, "{}", rendered)?,
    }
    Ok(())
}

// ── check ──

/// A record file holds one record or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    One(ComponentRecord),
    Many(Vec<ComponentRecord>),
}

fn read_records(path: &Path) -> Result<Vec<ComponentRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read component record: {}", path.display()))?;
    let parsed: RecordFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse component record: {}", path.display()))?;
    Ok(match parsed {
        RecordFile::One(record) => vec![record],
        RecordFile::Many(records) => records,
    })
}

/// Check every record in `records`. Returns whether all were valid.
pub fn check(
    source: &Source,
    records: &[PathBuf],
    mode: CheckMode,
    config: &BuildConfig,
    out: &mut impl Write,
) -> Result<bool> {
    if records.is_empty() {
        bail!("no component record files given");
    }

    let loaded = load(source, config)?;
    let checker = ConformanceChecker::new(&loaded.tree).with_mode(mode);

    let mut all_valid = true;
    for path in records {
        for (idx, record) in read_records(path)?.iter().enumerate() {
            let report = checker.check(record);
            all_valid &= report.valid;
            writeln!(
                out,
                "{}#{}: {}",
                path.display(),
                idx,
                if report.valid { "valid" } else { "invalid" }
            )?;
            for diagnostic in &report.diagnostics {
                writeln!(out, "  {}", diagnostic)?;
            }
        }
    }
    Ok(all_valid)
}

// ── terms ──

pub fn terms(
    source: &Source,
    path: &str,
    config: &BuildConfig,
    out: &mut impl Write,
) -> Result<()> {
    let loaded = load(source, config)?;
    let Some(terms) = loaded.tree.effective_terms_at(path) else {
        bail!("no taxonomy node at '{}'", path);
    };

    for term in terms {
        writeln!(
            out,
            "{}\t{}\t{}",
            term.name,
            term.data_type.map(|d| d.as_str()).unwrap_or("-"),
            term.source_row
        )?;
    }
    Ok(())
}
