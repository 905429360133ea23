//! Fatal error types.
//!
//! Anything reported here aborts the operation. Per-row and per-record
//! problems are [`crate::Diagnostic`]s and never surface as errors.

use thiserror::Error;

/// Errors that abort tree construction, ingestion, export or snapshot restore.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    /// Rows must arrive in strictly increasing source order.
    #[error("row sequence out of order: source row {current} follows {previous}")]
    RowOutOfOrder { previous: usize, current: usize },

    /// The tabular source lacks a column the row model requires.
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// The tabular source could not be decoded.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Snapshot encoding failed.
    #[error("snapshot serialization failed: {0}")]
    SnapshotEncode(String),

    /// Snapshot bytes could not be decoded.
    #[error("snapshot deserialization failed: {0}")]
    SnapshotDecode(String),

    /// Snapshot was written by an incompatible format version.
    #[error("snapshot version mismatch: expected {expected}, got {actual}")]
    SnapshotVersion { expected: u32, actual: u32 },

    /// Snapshot payload does not match its recorded content hash.
    #[error("snapshot hash mismatch: recorded {recorded}, computed {computed}")]
    SnapshotHash { recorded: String, computed: String },

    /// Snapshot does not contain the root node.
    #[error("snapshot has no root node")]
    SnapshotMissingRoot,

    /// Snapshot nodes do not form a valid tree.
    #[error("snapshot corrupt at '{path}': {reason}")]
    SnapshotCorrupt { path: String, reason: String },

    /// Rendering the export document failed.
    #[error("export failed: {0}")]
    Export(String),

    /// Configuration could not be read or parsed.
    #[error("invalid config: {0}")]
    Config(String),
}

impl TaxonomyError {
    /// True when the error was caused by the caller's input rather than by
    /// an encoder or the environment.
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            TaxonomyError::RowOutOfOrder { .. }
                | TaxonomyError::MissingColumn(_)
                | TaxonomyError::Csv(_)
                | TaxonomyError::SnapshotMissingRoot
                | TaxonomyError::SnapshotCorrupt { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TaxonomyError::RowOutOfOrder {
            previous: 12,
            current: 7,
        };
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains('7'));

        let err = TaxonomyError::MissingColumn("level_hierarchy".into());
        assert!(err.to_string().contains("level_hierarchy"));
    }

    #[test]
    fn input_errors_are_classified() {
        assert!(TaxonomyError::RowOutOfOrder {
            previous: 2,
            current: 2
        }
        .is_fatal_input());
        assert!(TaxonomyError::SnapshotMissingRoot.is_fatal_input());
        assert!(!TaxonomyError::Export("io".into()).is_fatal_input());
        assert!(!TaxonomyError::SnapshotEncode("x".into()).is_fatal_input());
    }
}
