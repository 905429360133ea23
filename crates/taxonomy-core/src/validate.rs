//! Per-row structural checks applied while the tree is being built.
//!
//! The validator never fails: it reports what it found and leaves the
//! decision to skip a row or a term to [`crate::TreeBuilder`].

use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::types::{parse_enumeration, DataType, RawTermRow};
use crate::{MAX_DEPTH, PATH_SEPARATOR};

/// Values that stand in for "no enumeration" in hand-maintained sheets.
pub const ENUMERATION_PLACEHOLDERS: [&str; 6] = ["-", "n/a", "na", "none", "null", "tbd"];

const LEVEL_FIELDS: [&str; MAX_DEPTH] = ["first_level", "second_level", "third_level"];

/// Outcome of validating one row.
#[derive(Debug, Clone, Default)]
pub struct RowCheck {
    /// The hierarchy path is usable; when false the whole row is skipped.
    pub path_valid: bool,
    /// The declared term (if any) may be added to the tree.
    pub term_valid: bool,
    /// Parsed data type of a valid term.
    pub data_type: Option<DataType>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RowCheck {
    pub fn is_valid(&self) -> bool {
        self.path_valid && self.term_valid
    }
}

/// Validate the hierarchy path and, when the row names a term, the term.
pub fn validate_row(row: &RawTermRow) -> RowCheck {
    let mut diagnostics = Vec::new();
    let path_valid = validate_path(row, &mut diagnostics);
    let (term_valid, data_type) = if row.term_name().is_some() {
        validate_term(row, &mut diagnostics)
    } else {
        (true, None)
    };

    RowCheck {
        path_valid,
        term_valid,
        data_type,
        diagnostics,
    }
}

/// Check that each present path segment equals the matching level field and
/// that the path is at most [`MAX_DEPTH`] segments deep.
pub fn validate_path(row: &RawTermRow, diagnostics: &mut Vec<Diagnostic>) -> bool {
    let path = row.hierarchy_path();
    let locate = |d: Diagnostic| located(d, row).at_path(path);

    if path.is_empty() {
        diagnostics.push(locate(Diagnostic::error(
            DiagnosticCode::EmptyPath,
            "row has no level hierarchy",
        )));
        return false;
    }

    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();

    if segments.len() > MAX_DEPTH {
        diagnostics.push(locate(Diagnostic::error(
            DiagnosticCode::DepthExceeded,
            format!(
                "hierarchy has {} levels, at most {} allowed",
                segments.len(),
                MAX_DEPTH
            ),
        )));
        return false;
    }

    if segments.iter().any(|s| s.trim().is_empty()) {
        diagnostics.push(locate(Diagnostic::error(
            DiagnosticCode::EmptySegment,
            "hierarchy contains an empty level",
        )));
        return false;
    }

    let levels = row.levels();
    let mut valid = true;
    for (idx, segment) in segments.iter().enumerate() {
        if *segment != levels[idx] {
            diagnostics.push(locate(Diagnostic::error(
                DiagnosticCode::LevelMismatch,
                format!(
                    "level {} of hierarchy is '{}' but {} is '{}'",
                    idx + 1,
                    segment,
                    LEVEL_FIELDS[idx],
                    levels[idx]
                ),
            )));
            valid = false;
        }
    }

    for idx in segments.len()..MAX_DEPTH {
        if !levels[idx].is_empty() {
            diagnostics.push(locate(Diagnostic::info(
                DiagnosticCode::UnusedLevel,
                format!(
                    "{} '{}' is below the hierarchy depth and is ignored",
                    LEVEL_FIELDS[idx], levels[idx]
                ),
            )));
        }
    }

    valid
}

/// Check data type and enumeration rules of a term row.
///
/// Returns whether the term may be added, and its parsed data type.
pub fn validate_term(
    row: &RawTermRow,
    diagnostics: &mut Vec<Diagnostic>,
) -> (bool, Option<DataType>) {
    let term = row.name.trim();
    let locate = |d: Diagnostic| located(d, row).at_path(row.hierarchy_path()).about(term);

    let raw = row.data_type.trim();
    let data_type = if raw.is_empty() {
        None
    } else {
        match DataType::parse(raw) {
            Some(dt) => Some(dt),
            None => {
                let hint = match DataType::parse(&raw.to_lowercase()) {
                    Some(dt) => format!("data types are lower-case, use '{}'", dt),
                    None => format!(
                        "expected one of {}",
                        DataType::ALL
                            .iter()
                            .map(DataType::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                };
                diagnostics.push(locate(Diagnostic::warning(
                    DiagnosticCode::InvalidDataType,
                    format!("term '{}' has invalid data type '{}': {}", term, raw, hint),
                )));
                return (false, None);
            }
        }
    };

    let values = parse_enumeration(&row.enumeration_values);
    if data_type == Some(DataType::Enum) {
        if is_placeholder_list(&values) {
            diagnostics.push(locate(Diagnostic::warning(
                DiagnosticCode::MissingEnumeration,
                format!("enum term '{}' has no enumeration values", term),
            )));
            return (false, data_type);
        }
    } else if !values.is_empty() {
        diagnostics.push(locate(Diagnostic::warning(
            DiagnosticCode::UnexpectedEnumeration,
            format!(
                "term '{}' lists enumeration values but is not an enum",
                term
            ),
        )));
    }

    (true, data_type)
}

/// Empty, or a single placeholder such as `N/A`.
pub fn is_placeholder_list(values: &[String]) -> bool {
    match values {
        [] => true,
        [only] => ENUMERATION_PLACEHOLDERS
            .iter()
            .any(|p| only.eq_ignore_ascii_case(p)),
        _ => false,
    }
}

fn located(diagnostic: Diagnostic, row: &RawTermRow) -> Diagnostic {
    if row.source_row > 0 {
        diagnostic.at_row(row.source_row)
    } else {
        diagnostic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(check: &RowCheck) -> Vec<DiagnosticCode> {
        check.diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn well_formed_term_row_passes() {
        let row = RawTermRow::term("Envelope.Wall", "R-Value", "double").with_source_row(3);
        let check = validate_row(&row);
        assert!(check.is_valid());
        assert_eq!(check.data_type, Some(DataType::Double));
        assert!(check.diagnostics.is_empty(), "{:?}", check.diagnostics);
    }

    #[test]
    fn node_row_skips_term_checks() {
        let row = RawTermRow::node("Envelope", "Envelope stuff").with_enumeration("junk");
        let check = validate_row(&row);
        assert!(check.is_valid());
        assert!(check.diagnostics.is_empty());
    }

    #[test]
    fn empty_path_is_rejected() {
        let row = RawTermRow::term("", "Orphan", "string");
        let check = validate_row(&row);
        assert!(!check.path_valid);
        assert_eq!(codes(&check), vec![DiagnosticCode::EmptyPath]);
    }

    #[test]
    fn four_levels_are_rejected() {
        let row = RawTermRow::node("A.B.C.D", "");
        let check = validate_row(&row);
        assert!(!check.path_valid);
        assert_eq!(codes(&check), vec![DiagnosticCode::DepthExceeded]);
    }

    #[test]
    fn empty_segment_is_rejected() {
        let row = RawTermRow::node("A..B", "");
        let check = validate_row(&row);
        assert!(!check.path_valid);
        assert!(codes(&check).contains(&DiagnosticCode::EmptySegment));
    }

    #[test]
    fn level_field_must_match_segment() {
        let mut row = RawTermRow::node("Envelope.Wall", "walls").with_source_row(9);
        row.second_level = "Walls".into();
        let check = validate_row(&row);
        assert!(!check.path_valid);
        let d = &check.diagnostics[0];
        assert_eq!(d.code, DiagnosticCode::LevelMismatch);
        assert_eq!(d.row, Some(9));
        assert!(d.message.contains("second_level"));
    }

    #[test]
    fn level_below_depth_is_informational() {
        let mut row = RawTermRow::node("Envelope", "x");
        row.second_level = "Wall".into();
        let check = validate_row(&row);
        assert!(check.path_valid);
        assert_eq!(codes(&check), vec![DiagnosticCode::UnusedLevel]);
    }

    #[test]
    fn upper_case_data_type_gets_hint() {
        let row = RawTermRow::term("Envelope", "R-Value", "Double");
        let check = validate_row(&row);
        assert!(check.path_valid);
        assert!(!check.term_valid);
        let d = &check.diagnostics[0];
        assert_eq!(d.code, DiagnosticCode::InvalidDataType);
        assert!(d.message.contains("'double'"), "{}", d.message);
        assert_eq!(d.subject.as_deref(), Some("R-Value"));
    }

    #[test]
    fn unknown_data_type_is_rejected() {
        let row = RawTermRow::term("Envelope", "Weight", "float");
        let check = validate_row(&row);
        assert!(!check.term_valid);
        assert!(check.diagnostics[0].message.contains("autocomplete"));
    }

    #[test]
    fn missing_data_type_is_allowed() {
        let row = RawTermRow::term("Envelope", "Notes", "");
        let check = validate_row(&row);
        assert!(check.is_valid());
        assert_eq!(check.data_type, None);
    }

    #[test]
    fn enum_without_values_is_rejected() {
        let row = RawTermRow::term("Envelope", "Material", "enum");
        let check = validate_row(&row);
        assert!(!check.term_valid);
        assert_eq!(codes(&check), vec![DiagnosticCode::MissingEnumeration]);
    }

    #[test]
    fn enum_with_placeholder_is_rejected() {
        let row = RawTermRow::term("Envelope", "Material", "enum").with_enumeration(" N/A ");
        assert!(!validate_row(&row).term_valid);
    }

    #[test]
    fn enum_with_values_passes() {
        let row = RawTermRow::term("Envelope", "Material", "enum").with_enumeration("Brick|None");
        let check = validate_row(&row);
        assert!(check.term_valid);
        assert_eq!(check.data_type, Some(DataType::Enum));
    }

    #[test]
    fn enumeration_on_non_enum_is_warned_but_kept() {
        let row = RawTermRow::term("Envelope", "Color", "string").with_enumeration("Red|Blue");
        let check = validate_row(&row);
        assert!(check.term_valid);
        assert_eq!(codes(&check), vec![DiagnosticCode::UnexpectedEnumeration]);
    }

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder_list(&[]));
        assert!(is_placeholder_list(&["TBD".to_string()]));
        assert!(!is_placeholder_list(&["Brick".to_string()]));
        assert!(!is_placeholder_list(&["none".to_string(), "some".to_string()]));
    }
}
