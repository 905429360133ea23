//! Component conformance: does a record's category and attribute list fit
//! the taxonomy?
//!
//! Every rule runs and reports independently; an invalid record is a normal
//! outcome, so checking never fails.

use crate::diagnostic::{has_errors, Diagnostic, DiagnosticCode};
use crate::tree::{TaxonomyNode, TaxonomyTree};
use crate::types::{ComponentRecord, DataType, TermDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Which rule set to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    /// Category count, category resolution and attribute names.
    #[default]
    Default,
    /// Default rules plus required terms, value types, enum membership and
    /// repeated attributes.
    Strict,
}

/// Outcome of checking one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ConformanceReport {
    fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            valid: !has_errors(&diagnostics),
            diagnostics,
        }
    }
}

/// Check `record` against `tree` with the default rules.
pub fn check(tree: &TaxonomyTree, record: &ComponentRecord) -> ConformanceReport {
    ConformanceChecker::new(tree).check(record)
}

pub fn check_with(
    tree: &TaxonomyTree,
    record: &ComponentRecord,
    mode: CheckMode,
) -> ConformanceReport {
    ConformanceChecker::new(tree).with_mode(mode).check(record)
}

/// Read-only checker bound to one tree. Cheap to copy; any number may run
/// against the same tree at once.
#[derive(Debug, Clone, Copy)]
pub struct ConformanceChecker<'t> {
    tree: &'t TaxonomyTree,
    mode: CheckMode,
}

impl<'t> ConformanceChecker<'t> {
    pub fn new(tree: &'t TaxonomyTree) -> Self {
        Self {
            tree,
            mode: CheckMode::Default,
        }
    }

    pub fn with_mode(mut self, mode: CheckMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> CheckMode {
        self.mode
    }

    pub fn check(&self, record: &ComponentRecord) -> ConformanceReport {
        let mut diagnostics = Vec::new();

        if record.categories.len() != 1 {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::CategoryCount,
                format!(
                    "record must declare exactly one category, found {}",
                    record.categories.len()
                ),
            ));
        }

        let mut resolved: Option<&TaxonomyNode> = None;
        for category in &record.categories {
            match self.resolve(category) {
                Some(node) => {
                    resolved.get_or_insert(node);
                }
                None => diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::UnknownCategory,
                        format!("category '{}' does not exist in the taxonomy", category),
                    )
                    .at_path(category.as_str()),
                ),
            }
        }

        if let Some(node) = resolved {
            let terms = self.tree.effective_terms(node);
            self.check_attributes(node, &terms, record, &mut diagnostics);
            if self.mode == CheckMode::Strict {
                self.check_strict(node, &terms, record, &mut diagnostics);
            }
        }

        let report = ConformanceReport::from_diagnostics(diagnostics);
        debug!(
            categories = ?record.categories,
            attributes = record.attributes.len(),
            valid = report.valid,
            findings = report.diagnostics.len(),
            "checked component record"
        );
        report
    }

    /// A blank category never resolves, even though the root's path is blank.
    fn resolve(&self, category: &str) -> Option<&'t TaxonomyNode> {
        let category = category.trim();
        if category.is_empty() {
            return None;
        }
        self.tree.get(category)
    }

    fn check_attributes(
        &self,
        node: &TaxonomyNode,
        terms: &[&TermDefinition],
        record: &ComponentRecord,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for attribute in &record.attributes {
            if !terms.iter().any(|t| t.name == attribute.name) {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::UnknownAttribute,
                        format!(
                            "attribute '{}' is not a term of '{}'",
                            attribute.name,
                            node.path()
                        ),
                    )
                    .at_path(node.path())
                    .about(attribute.name.as_str()),
                );
            }
        }
    }

    fn check_strict(
        &self,
        node: &TaxonomyNode,
        terms: &[&TermDefinition],
        record: &ComponentRecord,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let located = |d: Diagnostic, subject: &str| d.at_path(node.path()).about(subject);

        for term in terms.iter().filter(|t| t.is_required()) {
            if !record.attributes.iter().any(|a| a.name == term.name) {
                diagnostics.push(located(
                    Diagnostic::error(
                        DiagnosticCode::MissingRequiredTerm,
                        format!("required term '{}' is missing", term.name),
                    ),
                    &term.name,
                ));
            }
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for attribute in &record.attributes {
            let Some(term) = terms.iter().find(|t| t.name == attribute.name) else {
                continue;
            };

            let count = seen.entry(attribute.name.as_str()).or_default();
            *count += 1;
            if *count == 2 && !term.allow_multiple {
                diagnostics.push(located(
                    Diagnostic::error(
                        DiagnosticCode::RepeatedAttribute,
                        format!(
                            "attribute '{}' appears more than once but does not allow multiple values",
                            attribute.name
                        ),
                    ),
                    &attribute.name,
                ));
            }

            if let Some(problem) = value_problem(term, attribute.value.trim()) {
                diagnostics.push(located(
                    Diagnostic::error(DiagnosticCode::InvalidValue, problem),
                    &attribute.name,
                ));
            }
        }
    }
}

/// Why `value` is not acceptable for `term`, if it is not. Blank values
/// are not type-checked.
fn value_problem(term: &TermDefinition, value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    match term.data_type? {
        DataType::Integer if value.parse::<i64>().is_err() => Some(format!(
            "value '{}' of '{}' is not an integer",
            value, term.name
        )),
        DataType::Double if value.parse::<f64>().is_err() => Some(format!(
            "value '{}' of '{}' is not a number",
            value, term.name
        )),
        DataType::Enum if !term.enumeration_values.iter().any(|v| v == value) => {
            Some(format!(
                "value '{}' of '{}' is not one of {}",
                value,
                term.name,
                term.enumeration_values.join(", ")
            ))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuildConfig, RawTermRow, TreeBuilder};

    fn tree() -> TaxonomyTree {
        let rows = vec![
            RawTermRow::node("Envelope", "Envelope stuff"),
            RawTermRow::term("Envelope", "Material", "enum").with_enumeration("Brick|Wood"),
            RawTermRow::term("Envelope.Wall", "R-Value", "double").with_flag("required", "x"),
            RawTermRow::term("Envelope.Wall", "Layers", "integer"),
            RawTermRow {
                allow_multiple: true,
                ..RawTermRow::term("Envelope.Wall", "Finish", "string")
            },
        ];
        TreeBuilder::new(BuildConfig::default())
            .build(rows)
            .unwrap()
            .tree
    }

    fn codes(report: &ConformanceReport) -> Vec<DiagnosticCode> {
        report.diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn known_category_and_attributes_are_valid() {
        let tree = tree();
        let record = ComponentRecord::new("Envelope.Wall")
            .with_attribute("R-Value", "30")
            .with_attribute("Material", "Brick")
            .with_attribute("Type", "Wall");
        let report = check(&tree, &record);
        assert!(report.valid, "{:?}", report.diagnostics);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn each_unknown_attribute_is_reported() {
        let tree = tree();
        let record = ComponentRecord::new("Envelope.Wall")
            .with_attribute("Color", "Blue")
            .with_attribute("R-Value", "30")
            .with_attribute("Weight", "3");
        let report = check(&tree, &record);
        assert!(!report.valid);
        let subjects: Vec<_> = report
            .diagnostics
            .iter()
            .map(|d| d.subject.as_deref())
            .collect();
        assert_eq!(subjects, vec![Some("Color"), Some("Weight")]);
    }

    #[test]
    fn attribute_names_match_exactly() {
        let tree = tree();
        let record = ComponentRecord::new("Envelope.Wall").with_attribute("r-value", "30");
        assert!(!check(&tree, &record).valid);
    }

    #[test]
    fn descendant_terms_are_not_visible_to_ancestors() {
        let tree = tree();
        let record = ComponentRecord::new("Envelope").with_attribute("R-Value", "30");
        let report = check(&tree, &record);
        assert_eq!(codes(&report), vec![DiagnosticCode::UnknownAttribute]);
    }

    #[test]
    fn zero_categories_is_invalid() {
        let tree = tree();
        let record = ComponentRecord::default().with_attribute("Type", "x");
        let report = check(&tree, &record);
        assert!(!report.valid);
        assert_eq!(codes(&report), vec![DiagnosticCode::CategoryCount]);
    }

    #[test]
    fn two_categories_are_invalid_even_when_both_resolve() {
        let tree = tree();
        let record = ComponentRecord {
            categories: vec!["Envelope".into(), "Envelope.Wall".into()],
            attributes: Vec::new(),
        };
        let report = check(&tree, &record);
        assert!(!report.valid);
        assert_eq!(codes(&report), vec![DiagnosticCode::CategoryCount]);
    }

    #[test]
    fn attributes_checked_against_first_resolving_category() {
        let tree = tree();
        let record = ComponentRecord {
            categories: vec!["Mechanical".into(), "Envelope.Wall".into()],
            attributes: vec![],
        }
        .with_attribute("R-Value", "30");
        let report = check(&tree, &record);
        assert_eq!(
            codes(&report),
            vec![DiagnosticCode::CategoryCount, DiagnosticCode::UnknownCategory]
        );
    }

    #[test]
    fn unknown_category_is_invalid() {
        let tree = tree();
        let report = check(&tree, &ComponentRecord::new("Envelope.Door"));
        assert!(!report.valid);
        assert_eq!(report.diagnostics[0].path.as_deref(), Some("Envelope.Door"));
    }

    #[test]
    fn blank_category_does_not_resolve_to_root() {
        let tree = tree();
        let report = check(&tree, &ComponentRecord::new("  "));
        assert_eq!(codes(&report), vec![DiagnosticCode::UnknownCategory]);
    }

    #[test]
    fn default_mode_ignores_values_and_required_terms() {
        let tree = tree();
        let record = ComponentRecord::new("Envelope.Wall").with_attribute("Layers", "many");
        assert!(check(&tree, &record).valid);
    }

    #[test]
    fn strict_reports_missing_required_term() {
        let tree = tree();
        let record = ComponentRecord::new("Envelope.Wall").with_attribute("Layers", "2");
        let report = check_with(&tree, &record, CheckMode::Strict);
        assert!(!report.valid);
        assert_eq!(codes(&report), vec![DiagnosticCode::MissingRequiredTerm]);
        assert_eq!(report.diagnostics[0].subject.as_deref(), Some("R-Value"));
    }

    #[test]
    fn strict_checks_value_types() {
        let tree = tree();
        let record = ComponentRecord::new("Envelope.Wall")
            .with_attribute("R-Value", "thirty")
            .with_attribute("Layers", "2.5")
            .with_attribute("Material", "Steel");
        let report = check_with(&tree, &record, CheckMode::Strict);
        assert_eq!(
            codes(&report),
            vec![
                DiagnosticCode::InvalidValue,
                DiagnosticCode::InvalidValue,
                DiagnosticCode::InvalidValue
            ]
        );
        assert!(report.diagnostics[2].message.contains("Brick, Wood"));
    }

    #[test]
    fn strict_accepts_well_typed_values() {
        let tree = tree();
        let record = ComponentRecord::new("Envelope.Wall")
            .with_attribute("R-Value", "30.5")
            .with_attribute("Layers", "-2")
            .with_attribute("Material", "Wood");
        let report = check_with(&tree, &record, CheckMode::Strict);
        assert!(report.valid, "{:?}", report.diagnostics);
    }

    #[test]
    fn strict_reports_repeated_single_valued_attribute_once() {
        let tree = tree();
        let record = ComponentRecord::new("Envelope.Wall")
            .with_attribute("R-Value", "30")
            .with_attribute("R-Value", "31")
            .with_attribute("R-Value", "32")
            .with_attribute("Finish", "Paint")
            .with_attribute("Finish", "Varnish");
        let report = check_with(&tree, &record, CheckMode::Strict);
        assert_eq!(codes(&report), vec![DiagnosticCode::RepeatedAttribute]);
    }

    #[test]
    fn checker_reports_its_mode() {
        let tree = tree();
        let checker = ConformanceChecker::new(&tree).with_mode(CheckMode::Strict);
        assert_eq!(checker.mode(), CheckMode::Strict);
    }
}
