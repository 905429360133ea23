//! Recoverable findings about rows, nodes and component records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a diagnostic is. The engine never acts on severity itself;
/// callers decide what is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Stable identifier of the rule that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    // Row paths
    EmptyPath,
    EmptySegment,
    DepthExceeded,
    LevelMismatch,
    UnusedLevel,
    // Terms
    InvalidDataType,
    MissingEnumeration,
    UnexpectedEnumeration,
    DuplicateTerm,
    // Nodes
    MissingDescription,
    // Component records
    CategoryCount,
    UnknownCategory,
    UnknownAttribute,
    MissingRequiredTerm,
    InvalidValue,
    RepeatedAttribute,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::EmptyPath => "empty_path",
            DiagnosticCode::EmptySegment => "empty_segment",
            DiagnosticCode::DepthExceeded => "depth_exceeded",
            DiagnosticCode::LevelMismatch => "level_mismatch",
            DiagnosticCode::UnusedLevel => "unused_level",
            DiagnosticCode::InvalidDataType => "invalid_data_type",
            DiagnosticCode::MissingEnumeration => "missing_enumeration",
            DiagnosticCode::UnexpectedEnumeration => "unexpected_enumeration",
            DiagnosticCode::DuplicateTerm => "duplicate_term",
            DiagnosticCode::MissingDescription => "missing_description",
            DiagnosticCode::CategoryCount => "category_count",
            DiagnosticCode::UnknownCategory => "unknown_category",
            DiagnosticCode::UnknownAttribute => "unknown_attribute",
            DiagnosticCode::MissingRequiredTerm => "missing_required_term",
            DiagnosticCode::InvalidValue => "invalid_value",
            DiagnosticCode::RepeatedAttribute => "repeated_attribute",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A located, human-readable finding.
///
/// `row`, `path` and `subject` (term or attribute name) are filled whenever
/// known so the offending input can be found without rescanning the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub row: Option<usize>,
    pub path: Option<String>,
    pub subject: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            row: None,
            path: None,
            subject: None,
        }
    }

    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn about(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity, self.code)?;
        if let Some(row) = self.row {
            write!(f, " row {}", row)?;
        }
        if let Some(path) = &self.path {
            write!(f, " '{}'", path)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// True if any diagnostic in `diagnostics` is error-level.
pub(crate) fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location() {
        let d = Diagnostic::error(DiagnosticCode::DepthExceeded, "too deep")
            .at_row(7)
            .at_path("A.B.C.D");
        assert_eq!(d.to_string(), "error [depth_exceeded] row 7 'A.B.C.D': too deep");
    }

    #[test]
    fn display_without_location() {
        let d = Diagnostic::info(DiagnosticCode::MissingDescription, "no description");
        assert_eq!(d.to_string(), "info [missing_description]: no description");
    }

    #[test]
    fn severity_orders_by_seriousness() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let diags = vec![Diagnostic::warning(DiagnosticCode::UnusedLevel, "x")];
        assert!(!has_errors(&diags));
        let diags = vec![Diagnostic::error(DiagnosticCode::UnknownAttribute, "y")];
        assert!(has_errors(&diags));
    }
}
