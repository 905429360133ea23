//! Engine configuration.
//!
//! Every section has a `Default`, so a YAML file only needs the keys it
//! changes:
//!
//! ```yaml
//! build:
//!   term_order: alphabetical
//!   root_term:
//!     name: Category
//! export:
//!   format: json
//!   extended_fields: true
//! conformance:
//!   strict: true
//! ```

use crate::error::TaxonomyError;
use crate::types::{DataType, TermOrder};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    pub build: BuildConfig,
    pub export: ExportConfig,
    pub conformance: ConformanceConfig,
}

impl TaxonomyConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TaxonomyError> {
        serde_yaml::from_str(yaml).map_err(|e| TaxonomyError::Config(e.to_string()))
    }

    /// Load config from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, TaxonomyError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TaxonomyError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            TaxonomyError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }
}

/// Tree construction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Ordering of effective term lists; fixed for the life of the tree.
    pub term_order: TermOrder,
    /// The implicit type term every node inherits from the root.
    pub root_term: RootTermConfig,
    /// Description given to the synthetic root.
    pub root_description: String,
    /// Report nodes left without a description after the build.
    pub report_missing_descriptions: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            term_order: TermOrder::RowOrder,
            root_term: RootTermConfig::default(),
            root_description: String::new(),
            report_missing_descriptions: true,
        }
    }
}

/// The root's implicit type term. It always carries source row 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootTermConfig {
    pub name: String,
    pub description: String,
    pub data_type: DataType,
}

impl Default for RootTermConfig {
    fn default() -> Self {
        Self {
            name: "Type".to_string(),
            description: "Kind of component".to_string(),
            data_type: DataType::String,
        }
    }
}

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xml,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xml" => Ok(ExportFormat::Xml),
            "json" => Ok(ExportFormat::Json),
            other => Err(TaxonomyError::Config(format!(
                "unknown export format '{}', expected xml or json",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// Include each term's publication flags.
    pub extended_fields: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConformanceConfig {
    /// Also enforce required terms, value types, enum membership and
    /// repeated attributes.
    pub strict: bool,
}
