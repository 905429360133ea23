//! CSV -> tree -> export / snapshot / conformance.

use taxonomy_core::export::{export_document, render};
use taxonomy_core::ingest::rows_from_str;
use taxonomy_core::snapshot::{from_bytes, to_bytes};
use taxonomy_core::{
    check_with, BuildConfig, CheckMode, ComponentRecord, DiagnosticCode, ExportConfig,
    ExportFormat, TaxonomyConfig, TermOrder, TreeBuilder,
};

const TABLE: &str = "\
level_hierarchy,first_level,second_level,third_level,name,description,data_type,enumeration_values,allow_multiple,required
Envelope,Envelope,,,,Building envelope,,,,
Envelope,Envelope,,,Material,Primary material,enum,Wood|Brick|Concrete,,x
Envelope.Wall,Envelope,Wall,,,Walls,,,,
Envelope.Wall,Envelope,Wall,,R-Value,Thermal resistance,double,,,
Envelope.Wall,Envelope,Wall,,Layers,Layer count,integer,,,
Envelope.Wall.Exterior,Envelope,Wall,Exterior,Finish,Surface finish,string,,yes,
Envelope.Roof,Envelope,Roof,,Slope,Roof pitch,Double,,,
Envelope.Door.Front.Glass,Envelope,Door,Front,Tint,,string,,,
Mechanical.Fan,Mechanical,Fan,,,Fans,,,,
";

fn build(order: TermOrder) -> taxonomy_core::BuildOutput {
    let rows = rows_from_str(TABLE).expect("table parses");
    let config = BuildConfig {
        term_order: order,
        ..BuildConfig::default()
    };
    TreeBuilder::new(config).build(rows).expect("table builds")
}

#[test]
fn table_builds_expected_tree() {
    let output = build(TermOrder::RowOrder);
    let tree = &output.tree;

    let paths: Vec<&str> = tree.iter().map(|n| n.path()).collect();
    assert_eq!(
        paths,
        vec![
            "",
            "Envelope",
            "Envelope.Roof",
            "Envelope.Wall",
            "Envelope.Wall.Exterior",
            "Mechanical",
            "Mechanical.Fan",
        ]
    );

    let codes: Vec<(DiagnosticCode, Option<usize>)> =
        output.diagnostics.iter().map(|d| (d.code, d.row)).collect();
    // Upper-case data type on line 8, four levels on line 9, then the
    // description pass.
    assert!(codes.contains(&(DiagnosticCode::InvalidDataType, Some(8))));
    assert!(codes.contains(&(DiagnosticCode::DepthExceeded, Some(9))));
    assert!(codes.contains(&(DiagnosticCode::MissingDescription, None)));

    let missing: Vec<&str> = output
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::MissingDescription)
        .filter_map(|d| d.path.as_deref())
        .collect();
    assert_eq!(
        missing,
        vec!["Envelope.Wall.Exterior", "Envelope.Roof", "Mechanical"]
    );
}

#[test]
fn inherited_terms_follow_source_lines() {
    let output = build(TermOrder::RowOrder);
    let terms = output
        .tree
        .effective_terms_at("Envelope.Wall.Exterior")
        .unwrap();
    let names: Vec<(&str, usize)> = terms
        .iter()
        .map(|t| (t.name.as_str(), t.source_row))
        .collect();
    assert_eq!(
        names,
        vec![
            ("Type", 0),
            ("Material", 3),
            ("R-Value", 5),
            ("Layers", 6),
            ("Finish", 7)
        ]
    );
    assert!(terms[4].allow_multiple);
    assert!(terms[1].is_required());
}

#[test]
fn export_carries_leaf_terms_only() {
    let output = build(TermOrder::Alphabetical);
    let doc = export_document(&output.tree, &ExportConfig::default());
    let envelope = &doc.children[0];
    assert!(envelope.terms.is_empty());

    let roof = &envelope.children[0];
    assert_eq!(roof.name, "Roof");
    let names: Vec<&str> = roof.terms.iter().map(|t| t.name.as_str()).collect();
    // Slope was rejected for its data type.
    assert_eq!(names, vec!["Material", "Type"]);
    assert_eq!(
        roof.terms[0].enumeration_values,
        vec!["Brick", "Concrete", "Wood"]
    );

    let json = render(
        &output.tree,
        &ExportConfig {
            format: ExportFormat::Json,
            extended_fields: true,
        },
    )
    .unwrap();
    assert!(json.contains("\"required\": \"x\""));
}

#[test]
fn snapshot_restores_equivalent_tree() {
    let output = build(TermOrder::RowOrder);
    let restored = from_bytes(&to_bytes(&output.tree).unwrap()).unwrap();

    for node in output.tree.iter() {
        let other = restored.get(node.path()).unwrap();
        assert_eq!(
            output.tree.effective_terms(node),
            restored.effective_terms(other)
        );
    }

    let xml_before = render(&output.tree, &ExportConfig::default()).unwrap();
    let xml_after = render(&restored, &ExportConfig::default()).unwrap();
    assert_eq!(xml_before, xml_after);
}

#[test]
fn strict_check_against_table() {
    let output = build(TermOrder::RowOrder);
    let record = ComponentRecord::new("Envelope.Wall.Exterior")
        .with_attribute("Finish", "Paint")
        .with_attribute("Finish", "Sealant")
        .with_attribute("Layers", "three");

    let report = check_with(&output.tree, &record, CheckMode::Strict);
    let codes: Vec<DiagnosticCode> = report.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(
        codes,
        vec![
            DiagnosticCode::MissingRequiredTerm,
            DiagnosticCode::InvalidValue
        ]
    );
    assert!(!report.valid);

    let record = record.with_attribute("Material", "Brick");
    let record = ComponentRecord {
        attributes: record
            .attributes
            .into_iter()
            .filter(|a| a.name != "Layers")
            .collect(),
        ..record
    };
    assert!(check_with(&output.tree, &record, CheckMode::Strict).valid);
}

#[test]
fn config_file_drives_build_order() {
    let config = TaxonomyConfig::from_yaml_str("build:\n  term_order: alphabetical\n").unwrap();
    let rows = rows_from_str(TABLE).unwrap();
    let output = TreeBuilder::new(config.build).build(rows).unwrap();
    let terms = output.tree.effective_terms_at("Envelope.Wall").unwrap();
    let names: Vec<&str> = terms.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Layers", "Material", "R-Value", "Type"]);
}
