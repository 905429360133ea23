//! Controlled-vocabulary taxonomy engine.
//!
//! This crate turns a flat table of taxonomy rows into a three-level tree of
//! categories, resolves the terms each category inherits from its ancestors,
//! and checks component records against that tree.
//!
//! # Architecture
//!
//! ```text
//! RawTermRow* ──► TreeBuilder ──► TaxonomyTree ──┬──► export (XML / JSON)
//!                    │                           ├──► snapshot (bincode blob)
//!                    └── validate (per row)      └──► conformance checks
//! ```
//!
//! # Key Concepts
//!
//! - **RawTermRow**: one row of the source table, as delivered by any tabular
//!   reader (see [`ingest`] for the delimited-text one)
//! - **TreeBuilder**: single-pass construction, synthesizing missing ancestors
//! - **TaxonomyTree**: arena of nodes keyed by dot-joined hierarchy path;
//!   read-only once built
//! - **Diagnostic**: recoverable finding about a row or record; fatal problems
//!   are [`TaxonomyError`]s instead
//!
//! # Example
//!
//! ```ignore
//! use taxonomy_core::{BuildConfig, ComponentRecord, TreeBuilder};
//!
//! let output = TreeBuilder::new(BuildConfig::default()).build(rows)?;
//! let report = taxonomy_core::check(&output.tree, &ComponentRecord::new("Envelope.Wall"));
//! ```

mod builder;
mod config;
mod conformance;
mod diagnostic;
mod error;
pub mod export;
pub mod ingest;
pub mod snapshot;
mod tree;
mod types;
pub mod validate;

pub use builder::{BuildOutput, TreeBuilder};
pub use config::{
    BuildConfig, ConformanceConfig, ExportConfig, ExportFormat, RootTermConfig, TaxonomyConfig,
};
pub use conformance::{check, check_with, CheckMode, ConformanceChecker, ConformanceReport};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use error::TaxonomyError;
pub use tree::{DepthFirst, NodeId, TaxonomyNode, TaxonomyTree};
pub use types::{
    ComponentAttribute, ComponentRecord, DataType, PublicationFlags, RawTermRow, TermDefinition,
    TermOrder, UnitSpec,
};

/// Maximum number of dot-separated segments in a hierarchy path.
pub const MAX_DEPTH: usize = 3;

/// Path of the root node.
pub const ROOT_PATH: &str = "";

/// Display name of the root node.
pub const ROOT_NAME: &str = "root";

/// Separator between hierarchy path segments.
pub const PATH_SEPARATOR: char = '.';

/// Separator between values in a delimited enumeration list.
pub const ENUM_SEPARATOR: char = '|';

/// Split a hierarchy path into its segments. The root path has none.
pub fn path_segments(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split(PATH_SEPARATOR).collect()
    }
}

/// Parent path of `path`, or `None` for the root.
///
/// ```
/// assert_eq!(taxonomy_core::parent_path("Envelope.Wall"), Some("Envelope"));
/// assert_eq!(taxonomy_core::parent_path("Envelope"), Some(""));
/// assert_eq!(taxonomy_core::parent_path(""), None);
/// ```
pub fn parent_path(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    match path.rfind(PATH_SEPARATOR) {
        Some(idx) => Some(&path[..idx]),
        None => Some(ROOT_PATH),
    }
}
