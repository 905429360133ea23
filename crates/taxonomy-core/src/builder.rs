//! Single-pass tree construction from taxonomy rows.
//!
//! The builder owns the node arena while rows are pushed. Nothing can read
//! inherited terms until [`TreeBuilder::finish`] hands the arena over to a
//! [`TaxonomyTree`], so there is no way to query a half-built tree.

use crate::config::BuildConfig;
use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::error::TaxonomyError;
use crate::tree::{NodeId, TaxonomyNode, TaxonomyTree};
use crate::types::{RawTermRow, TermDefinition};
use crate::validate::validate_row;
use crate::{parent_path, PATH_SEPARATOR, ROOT_NAME, ROOT_PATH};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Result of a build: the tree plus everything worth telling the caller.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub tree: TaxonomyTree,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Default)]
struct BuildStats {
    rows: usize,
    rows_skipped: usize,
    terms: usize,
    terms_rejected: usize,
    synthesized: usize,
}

/// Incremental taxonomy builder.
///
/// ```ignore
/// let mut builder = TreeBuilder::new(BuildConfig::default());
/// for row in rows {
///     builder.push_row(row)?;
/// }
/// let BuildOutput { tree, diagnostics } = builder.finish();
/// ```
#[derive(Debug)]
pub struct TreeBuilder {
    config: BuildConfig,
    nodes: Vec<TaxonomyNode>,
    index: HashMap<String, usize>,
    diagnostics: Vec<Diagnostic>,
    last_row: usize,
    stats: BuildStats,
}

impl TreeBuilder {
    /// Start a build. The root and its implicit type term exist immediately.
    pub fn new(config: BuildConfig) -> Self {
        let mut root = TaxonomyNode::new(ROOT_PATH, ROOT_NAME, None);
        root.description = config.root_description.clone();
        root.own_terms.push(
            TermDefinition::new(
                config.root_term.name.clone(),
                Some(config.root_term.data_type),
                0,
            )
            .with_description(config.root_term.description.clone()),
        );

        let mut index = HashMap::new();
        index.insert(ROOT_PATH.to_string(), 0);

        Self {
            config,
            nodes: vec![root],
            index,
            diagnostics: Vec::new(),
            last_row: 0,
            stats: BuildStats::default(),
        }
    }

    /// Build a tree from a complete row sequence.
    pub fn build(
        mut self,
        rows: impl IntoIterator<Item = RawTermRow>,
    ) -> Result<BuildOutput, TaxonomyError> {
        for row in rows {
            self.push_row(row)?;
        }
        Ok(self.finish())
    }

    /// Ingest one row.
    ///
    /// A row with `source_row == 0` is numbered after the previous row.
    /// Explicit numbers must increase strictly; anything else means the
    /// caller broke the row-sequence contract and the build cannot continue.
    pub fn push_row(&mut self, mut row: RawTermRow) -> Result<(), TaxonomyError> {
        if row.source_row == 0 {
            row.source_row = self.last_row + 1;
        } else if row.source_row <= self.last_row {
            return Err(TaxonomyError::RowOutOfOrder {
                previous: self.last_row,
                current: row.source_row,
            });
        }
        self.last_row = row.source_row;
        self.stats.rows += 1;

        let check = validate_row(&row);
        self.diagnostics.extend(check.diagnostics);

        if !check.path_valid {
            warn!(
                row = row.source_row,
                path = row.hierarchy_path(),
                "skipping row with invalid hierarchy"
            );
            self.stats.rows_skipped += 1;
            return Ok(());
        }

        let idx = self.ensure_node(row.hierarchy_path());

        let Some(term_name) = row.term_name() else {
            self.nodes[idx].description = row.description.trim().to_string();
            return Ok(());
        };

        if !check.term_valid {
            warn!(
                row = row.source_row,
                term = term_name,
                "rejecting term that failed validation"
            );
            self.stats.terms_rejected += 1;
            return Ok(());
        }

        let node = &mut self.nodes[idx];
        if let Some(existing) = node.own_terms.iter().find(|t| t.name == term_name) {
            let diagnostic = Diagnostic::warning(
                DiagnosticCode::DuplicateTerm,
                format!(
                    "term '{}' already declared on this node at row {}",
                    term_name, existing.source_row
                ),
            )
            .at_row(row.source_row)
            .at_path(node.path.clone())
            .about(term_name);
            self.diagnostics.push(diagnostic);
            self.stats.terms_rejected += 1;
            return Ok(());
        }

        node.own_terms.push(TermDefinition::from_row(&row, check.data_type));
        self.stats.terms += 1;
        Ok(())
    }

    /// Sort children for presentation, run the description pass and seal
    /// the tree.
    pub fn finish(mut self) -> BuildOutput {
        for idx in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[idx].children);
            children.sort_by(|a, b| self.nodes[a.index()].name.cmp(&self.nodes[b.index()].name));
            self.nodes[idx].children = children;
        }
        debug!(nodes = self.nodes.len(), "sorted children by name");

        if self.config.report_missing_descriptions {
            for node in self.nodes.iter().skip(1) {
                if node.description.trim().is_empty() {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticCode::MissingDescription,
                            format!("node '{}' has no description", node.name),
                        )
                        .at_path(node.path.clone()),
                    );
                }
            }
        }

        info!(
            rows = self.stats.rows,
            rows_skipped = self.stats.rows_skipped,
            nodes = self.nodes.len(),
            synthesized = self.stats.synthesized,
            terms = self.stats.terms,
            terms_rejected = self.stats.terms_rejected,
            diagnostics = self.diagnostics.len(),
            "taxonomy built"
        );

        BuildOutput {
            tree: TaxonomyTree::from_arena(self.nodes, self.config.term_order),
            diagnostics: self.diagnostics,
        }
    }

    /// Diagnostics collected so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Arena index of `path`, creating it and any missing ancestors first.
    fn ensure_node(&mut self, path: &str) -> usize {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }

        let parent = parent_path(path).unwrap_or(ROOT_PATH);
        let parent_idx = match self.index.get(parent).copied() {
            Some(idx) => idx,
            None => {
                let idx = self.ensure_node(parent);
                debug!(path = parent, "synthesized missing ancestor");
                self.stats.synthesized += 1;
                idx
            }
        };

        let name = path.rsplit(PATH_SEPARATOR).next().unwrap_or(path);
        let idx = self.nodes.len();
        self.nodes.push(TaxonomyNode::new(path, name, Some(parent)));
        self.index.insert(path.to_string(), idx);
        self.nodes[parent_idx].children.push(NodeId::from_index(idx));
        idx
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::types::TermOrder;
    use crate::MAX_DEPTH;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn arb_path() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["A", "B", "C"]), 1..=4)
            .prop_map(|segments| segments.join("."))
    }

    fn arb_row() -> impl Strategy<Value = RawTermRow> {
        (
            arb_path(),
            prop::sample::select(vec!["", "Color", "Size", "Type", "Weight"]),
            prop::sample::select(vec!["string", "double", "enum", "Double", ""]),
            prop::sample::select(vec!["", "Red|Blue", "n/a"]),
        )
            .prop_map(|(path, name, data_type, values)| {
                RawTermRow::term(&path, name, data_type).with_enumeration(values)
            })
    }

    fn build(rows: Vec<RawTermRow>, order: TermOrder) -> TaxonomyTree {
        let config = BuildConfig {
            term_order: order,
            ..BuildConfig::default()
        };
        TreeBuilder::new(config).build(rows).expect("build").tree
    }

    fn arb_order() -> impl Strategy<Value = TermOrder> {
        prop_oneof![Just(TermOrder::RowOrder), Just(TermOrder::Alphabetical)]
    }

    proptest! {
        #[test]
        fn no_orphans_and_unique_paths(rows in prop::collection::vec(arb_row(), 0..40)) {
            let tree = build(rows, TermOrder::RowOrder);
            let paths: HashSet<&str> = tree.paths().collect();
            prop_assert_eq!(paths.len(), tree.len());
            for node in tree.iter() {
                if !node.is_root() {
                    prop_assert!(tree.parent(node).is_some(), "orphan {}", node.path());
                }
            }
            prop_assert_eq!(tree.iter().count(), tree.len());
        }

        #[test]
        fn depth_never_exceeds_limit(rows in prop::collection::vec(arb_row(), 0..40)) {
            let tree = build(rows, TermOrder::RowOrder);
            for path in tree.paths() {
                let depth = if path.is_empty() { 0 } else { path.split(PATH_SEPARATOR).count() };
                prop_assert!(depth <= MAX_DEPTH);
            }
        }

        #[test]
        fn effective_terms_are_idempotent(
            rows in prop::collection::vec(arb_row(), 0..40),
            order in arb_order(),
        ) {
            let tree = build(rows, order);
            for node in tree.iter() {
                prop_assert_eq!(tree.effective_terms(node), tree.effective_terms(node));
            }
        }

        #[test]
        fn effective_terms_are_deduplicated_union_with_parent(
            rows in prop::collection::vec(arb_row(), 0..40),
            order in arb_order(),
        ) {
            let tree = build(rows, order);
            for node in tree.iter() {
                let effective = tree.effective_terms(node);
                let names: Vec<&str> = effective.iter().map(|t| t.name.as_str()).collect();
                let unique: HashSet<&str> = names.iter().copied().collect();
                prop_assert_eq!(unique.len(), names.len());

                let mut expected: HashSet<&str> =
                    node.own_terms().iter().map(|t| t.name.as_str()).collect();
                if let Some(parent) = tree.parent(node) {
                    expected.extend(tree.effective_terms(parent).iter().map(|t| t.name.as_str()));
                }
                prop_assert_eq!(unique, expected);

                match order {
                    TermOrder::RowOrder => prop_assert!(
                        effective.windows(2).all(|w| w[0].source_row < w[1].source_row)
                    ),
                    TermOrder::Alphabetical => prop_assert!(
                        effective.windows(2).all(|w| w[0].name < w[1].name)
                    ),
                }
            }
        }
    }
}
