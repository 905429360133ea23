//! Row model: taxonomy rows, term definitions and component records.
//!
//! These are plain value types. Validation lives in [`crate::validate`],
//! construction in [`crate::TreeBuilder`].

use crate::{ENUM_SEPARATOR, PATH_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Data type ──

/// Value type of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Double,
    Integer,
    Enum,
    File,
    String,
    Autocomplete,
}

impl DataType {
    pub const ALL: [DataType; 6] = [
        DataType::Double,
        DataType::Integer,
        DataType::Enum,
        DataType::File,
        DataType::String,
        DataType::Autocomplete,
    ];

    /// Parse the lower-case wire name. Any other spelling is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Double => "double",
            DataType::Integer => "integer",
            DataType::Enum => "enum",
            DataType::File => "file",
            DataType::String => "string",
            DataType::Autocomplete => "autocomplete",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Term ordering ──

/// Ordering applied to effective term lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermOrder {
    /// Order of appearance in the source table.
    #[default]
    RowOrder,
    /// Term name ascending.
    Alphabetical,
}

// ── Units ──

/// Imperial (IP) and metric (SI) unit metadata of a term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub ip_unit_label: String,
    pub ip_unit_symbol: String,
    pub ip_display_mask: String,
    pub si_unit_label: String,
    pub si_unit_symbol: String,
    pub si_display_mask: String,
}

impl UnitSpec {
    pub fn is_empty(&self) -> bool {
        self == &UnitSpec::default()
    }
}

// ── Publication flags ──

/// Publication flags carried through from the source table untouched.
///
/// Keys are column names (`required`, `searchable`, `facetable`, ...); the
/// engine only ever interprets `required`, and only in strict conformance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationFlags(BTreeMap<String, String>);

impl PublicationFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// True when the flag is present with a truthy value.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_truthy)
    }

    pub fn is_required(&self) -> bool {
        self.is_set("required")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Spreadsheet-style boolean: `true`, `yes`, `1` or `x`, any case.
pub fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("x")
        || v == "1"
}

/// Split a pipe-delimited enumeration cell, trimming values and dropping
/// empty ones. Declared order is kept.
pub fn parse_enumeration(raw: &str) -> Vec<String> {
    raw.split(ENUM_SEPARATOR)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Raw row ──

/// One row of the taxonomy source table.
///
/// `source_row` of 0 means "unnumbered": the builder assigns the next number
/// in sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTermRow {
    pub first_level: String,
    pub second_level: String,
    pub third_level: String,
    pub level_hierarchy: String,
    /// Term name. Blank means the row only describes its node.
    pub name: String,
    pub description: String,
    pub abbreviation: String,
    pub data_type: String,
    /// Pipe-delimited list, e.g. `"Brick|Wood|Steel"`.
    pub enumeration_values: String,
    pub allow_multiple: bool,
    pub units: UnitSpec,
    pub unit_conversion_factor: String,
    pub default_value: String,
    pub min_value: String,
    pub max_value: String,
    pub source_row: usize,
    pub flags: PublicationFlags,
}

impl RawTermRow {
    /// Row at `path` with the level fields filled from the path segments.
    pub fn at_path(path: &str) -> Self {
        let mut segments = path.split(PATH_SEPARATOR);
        let mut next = || segments.next().unwrap_or_default().to_string();
        let first_level = next();
        let second_level = next();
        let third_level = next();
        Self {
            first_level,
            second_level,
            third_level,
            level_hierarchy: path.to_string(),
            ..Default::default()
        }
    }

    /// Node-description row: no term name.
    pub fn node(path: &str, description: &str) -> Self {
        Self {
            description: description.to_string(),
            ..Self::at_path(path)
        }
    }

    /// Term row with a data type.
    pub fn term(path: &str, name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            ..Self::at_path(path)
        }
    }

    pub fn with_source_row(mut self, row: usize) -> Self {
        self.source_row = row;
        self
    }

    pub fn with_enumeration(mut self, values: &str) -> Self {
        self.enumeration_values = values.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_flag(mut self, key: &str, value: &str) -> Self {
        self.flags.insert(key, value);
        self
    }

    /// Trimmed term name, `None` when blank.
    pub fn term_name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Trimmed hierarchy path.
    pub fn hierarchy_path(&self) -> &str {
        self.level_hierarchy.trim()
    }

    /// Declared level fields in order, trimmed.
    pub fn levels(&self) -> [&str; 3] {
        [
            self.first_level.trim(),
            self.second_level.trim(),
            self.third_level.trim(),
        ]
    }
}

// ── Term definition ──

/// A controlled-vocabulary attribute attached to one taxonomy node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermDefinition {
    pub name: String,
    pub description: String,
    pub abbreviation: String,
    pub data_type: Option<DataType>,
    pub enumeration_values: Vec<String>,
    pub allow_multiple: bool,
    pub units: UnitSpec,
    pub unit_conversion_factor: Option<String>,
    pub default_value: Option<String>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub source_row: usize,
    pub flags: PublicationFlags,
}

impl TermDefinition {
    /// Minimal term, used for the root's implicit type term.
    pub fn new(name: impl Into<String>, data_type: Option<DataType>, source_row: usize) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            abbreviation: String::new(),
            data_type,
            enumeration_values: Vec::new(),
            allow_multiple: false,
            units: UnitSpec::default(),
            unit_conversion_factor: None,
            default_value: None,
            min_value: None,
            max_value: None,
            source_row,
            flags: PublicationFlags::default(),
        }
    }

    /// Build from a row that already passed term validation.
    pub(crate) fn from_row(row: &RawTermRow, data_type: Option<DataType>) -> Self {
        Self {
            name: row.name.trim().to_string(),
            description: row.description.trim().to_string(),
            abbreviation: row.abbreviation.trim().to_string(),
            data_type,
            enumeration_values: parse_enumeration(&row.enumeration_values),
            allow_multiple: row.allow_multiple,
            units: row.units.clone(),
            unit_conversion_factor: non_blank(&row.unit_conversion_factor),
            default_value: non_blank(&row.default_value),
            min_value: non_blank(&row.min_value),
            max_value: non_blank(&row.max_value),
            source_row: row.source_row,
            flags: row.flags.clone(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_required(&self) -> bool {
        self.flags.is_required()
    }

    /// Enumeration values, sorted when `order` is alphabetical.
    pub fn enumeration_in(&self, order: TermOrder) -> Vec<&str> {
        let mut values: Vec<&str> = self.enumeration_values.iter().map(String::as_str).collect();
        if order == TermOrder::Alphabetical {
            values.sort_unstable();
        }
        values
    }
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

// ── Component record ──

/// One attribute of a component record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentAttribute {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// A component's declared category and attributes, as submitted for checking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<ComponentAttribute>,
}

impl ComponentRecord {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            categories: vec![category.into()],
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(ComponentAttribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}
