//! Export of a built tree to a nested document (XML or JSON).
//!
//! The walk is depth-first in presentation order. Only leaves carry terms,
//! and those are the leaf's effective terms, so a consumer never has to
//! resolve inheritance itself.

use crate::config::{ExportConfig, ExportFormat};
use crate::error::TaxonomyError;
use crate::tree::{TaxonomyNode, TaxonomyTree};
use crate::types::{DataType, PublicationFlags, TermDefinition, TermOrder, UnitSpec};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;
use tracing::debug;

/// One node of the export document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportNode {
    pub name: String,
    pub path: String,
    pub description: String,
    pub terms: Vec<ExportTerm>,
    pub children: Vec<ExportNode>,
}

/// One term of a leaf node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportTerm {
    pub name: String,
    pub abbreviation: String,
    pub description: String,
    pub data_type: Option<DataType>,
    pub allow_multiple: bool,
    pub enumeration_values: Vec<String>,
    #[serde(flatten)]
    pub units: UnitSpec,
    pub unit_conversion_factor: Option<String>,
    pub default_value: Option<String>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub source_row: usize,
    /// Publication flags; only present in extended exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<PublicationFlags>,
}

impl ExportTerm {
    fn from_term(term: &TermDefinition, order: TermOrder, extended: bool) -> Self {
        Self {
            name: term.name.clone(),
            abbreviation: term.abbreviation.clone(),
            description: term.description.clone(),
            data_type: term.data_type,
            allow_multiple: term.allow_multiple,
            enumeration_values: term
                .enumeration_in(order)
                .into_iter()
                .map(str::to_string)
                .collect(),
            units: term.units.clone(),
            unit_conversion_factor: term.unit_conversion_factor.clone(),
            default_value: term.default_value.clone(),
            min_value: term.min_value.clone(),
            max_value: term.max_value.clone(),
            source_row: term.source_row,
            flags: extended.then(|| term.flags.clone()),
        }
    }
}

/// Build the export document for `tree`, starting at the root.
pub fn export_document(tree: &TaxonomyTree, config: &ExportConfig) -> ExportNode {
    export_node(tree, tree.root(), config.extended_fields)
}

fn export_node(tree: &TaxonomyTree, node: &TaxonomyNode, extended: bool) -> ExportNode {
    let terms = if node.is_leaf() {
        tree.effective_terms(node)
            .into_iter()
            .map(|t| ExportTerm::from_term(t, tree.term_order(), extended))
            .collect()
    } else {
        Vec::new()
    };

    ExportNode {
        name: node.name().to_string(),
        path: node.path().to_string(),
        description: node.description().to_string(),
        terms,
        children: tree
            .children(node)
            .map(|child| export_node(tree, child, extended))
            .collect(),
    }
}

/// Render `tree` in the configured format.
pub fn render(tree: &TaxonomyTree, config: &ExportConfig) -> Result<String, TaxonomyError> {
    let document = export_document(tree, config);
    let output = match config.format {
        ExportFormat::Xml => to_xml(&document)?,
        ExportFormat::Json => to_json(&document)?,
    };
    debug!(format = ?config.format, bytes = output.len(), "rendered export");
    Ok(output)
}

pub fn to_json(document: &ExportNode) -> Result<String, TaxonomyError> {
    serde_json::to_string_pretty(document).map_err(export_error)
}

/// `<taxonomy>` wrapping nested `<tag>` elements.
pub fn to_xml(document: &ExportNode) -> Result<String, TaxonomyError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(export_error)?;
    start(&mut writer, "taxonomy")?;
    write_tag(&mut writer, document)?;
    end(&mut writer, "taxonomy")?;
    String::from_utf8(writer.into_inner()).map_err(export_error)
}

fn write_tag<W: Write>(writer: &mut Writer<W>, node: &ExportNode) -> Result<(), TaxonomyError> {
    start(writer, "tag")?;
    text(writer, "name", &node.name)?;
    text(writer, "path", &node.path)?;
    text(writer, "description", &node.description)?;
    for term in &node.terms {
        write_term(writer, term)?;
    }
    for child in &node.children {
        write_tag(writer, child)?;
    }
    end(writer, "tag")
}

fn write_term<W: Write>(writer: &mut Writer<W>, term: &ExportTerm) -> Result<(), TaxonomyError> {
    start(writer, "term")?;
    text(writer, "name", &term.name)?;
    text(writer, "abbreviation", &term.abbreviation)?;
    text(writer, "description", &term.description)?;
    text(
        writer,
        "data_type",
        term.data_type.map(|d| d.as_str()).unwrap_or_default(),
    )?;
    text(writer, "allow_multiple", if term.allow_multiple { "true" } else { "false" })?;

    if !term.enumeration_values.is_empty() {
        start(writer, "enumeration_values")?;
        for value in &term.enumeration_values {
            text(writer, "value", value)?;
        }
        end(writer, "enumeration_values")?;
    }

    let units = &term.units;
    text(writer, "ip_unit_label", &units.ip_unit_label)?;
    text(writer, "ip_unit_symbol", &units.ip_unit_symbol)?;
    text(writer, "ip_display_mask", &units.ip_display_mask)?;
    text(writer, "si_unit_label", &units.si_unit_label)?;
    text(writer, "si_unit_symbol", &units.si_unit_symbol)?;
    text(writer, "si_display_mask", &units.si_display_mask)?;

    let optional = |v: &Option<String>| v.clone().unwrap_or_default();
    text(writer, "unit_conversion_factor", &optional(&term.unit_conversion_factor))?;
    text(writer, "default_value", &optional(&term.default_value))?;
    text(writer, "min_value", &optional(&term.min_value))?;
    text(writer, "max_value", &optional(&term.max_value))?;
    text(writer, "source_row", &term.source_row.to_string())?;

    if let Some(flags) = &term.flags {
        for (key, value) in flags.iter() {
            writer
                .create_element("flag")
                .with_attribute(("name", key))
                .write_text_content(BytesText::new(value))
                .map_err(export_error)?;
        }
    }

    end(writer, "term")
}

fn start<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), TaxonomyError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(export_error)
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<(), TaxonomyError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(export_error)
}

fn text<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<(), TaxonomyError> {
    writer
        .create_element(name)
        .write_text_content(BytesText::new(value))
        .map_err(export_error)?;
    Ok(())
}

fn export_error(e: impl Display) -> TaxonomyError {
    TaxonomyError::Export(e.to_string())
}
