//! Delimited-text ingestion.
//!
//! Reads a CSV table with a header row into [`RawTermRow`]s. Columns are
//! matched by header name (trimmed, case-insensitive); required columns
//! must be present, recognised optional ones are mapped onto the row model,
//! and any other column is carried as a publication flag.
//!
//! ```text
//! level_hierarchy,first_level,second_level,third_level,name,data_type,enumeration_values,required
//! Envelope,Envelope,,,,,,
//! Envelope.Wall,Envelope,Wall,,R-Value,double,,x
//! ```

use crate::error::TaxonomyError;
use crate::types::{is_truthy, RawTermRow};
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

/// Columns every taxonomy table must have.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "level_hierarchy",
    "first_level",
    "second_level",
    "third_level",
    "name",
];

/// Columns mapped onto named row fields when present.
pub const OPTIONAL_COLUMNS: [&str; 15] = [
    "description",
    "abbreviation",
    "data_type",
    "enumeration_values",
    "allow_multiple",
    "ip_unit_label",
    "ip_unit_symbol",
    "ip_display_mask",
    "si_unit_label",
    "si_unit_symbol",
    "si_display_mask",
    "unit_conversion_factor",
    "default_value",
    "min_value",
    "max_value",
];

/// Header name -> column index, plus the flag columns.
struct ColumnMap {
    known: HashMap<String, usize>,
    flags: Vec<(String, usize)>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, TaxonomyError> {
        let mut known = HashMap::new();
        let mut flags = Vec::new();
        for (idx, header) in headers.iter().enumerate() {
            let key = header.trim().to_ascii_lowercase();
            if REQUIRED_COLUMNS.contains(&key.as_str()) || OPTIONAL_COLUMNS.contains(&key.as_str())
            {
                known.insert(key, idx);
            } else if !key.is_empty() {
                flags.push((key, idx));
            }
        }

        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !known.contains_key(**c)) {
            return Err(TaxonomyError::MissingColumn((*missing).to_string()));
        }

        Ok(Self { known, flags })
    }

    fn parse_row(&self, record: &csv::StringRecord, source_row: usize) -> RawTermRow {
        let get_field = |col: &str| -> String {
            self.known
                .get(col)
                .and_then(|&idx| record.get(idx))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        let mut row = RawTermRow {
            first_level: get_field("first_level"),
            second_level: get_field("second_level"),
            third_level: get_field("third_level"),
            level_hierarchy: get_field("level_hierarchy"),
            name: get_field("name"),
            description: get_field("description"),
            abbreviation: get_field("abbreviation"),
            data_type: get_field("data_type"),
            enumeration_values: get_field("enumeration_values"),
            allow_multiple: is_truthy(&get_field("allow_multiple")),
            unit_conversion_factor: get_field("unit_conversion_factor"),
            default_value: get_field("default_value"),
            min_value: get_field("min_value"),
            max_value: get_field("max_value"),
            source_row,
            ..Default::default()
        };
        row.units.ip_unit_label = get_field("ip_unit_label");
        row.units.ip_unit_symbol = get_field("ip_unit_symbol");
        row.units.ip_display_mask = get_field("ip_display_mask");
        row.units.si_unit_label = get_field("si_unit_label");
        row.units.si_unit_symbol = get_field("si_unit_symbol");
        row.units.si_display_mask = get_field("si_display_mask");

        for (key, idx) in &self.flags {
            if let Some(value) = record.get(*idx).map(str::trim).filter(|v| !v.is_empty()) {
                row.flags.insert(key.as_str(), value);
            }
        }

        row
    }
}

/// Read every row of a CSV taxonomy table.
///
/// `source_row` is the physical line the record starts on (the header is
/// line 1). Records with every cell blank are skipped. A missing required
/// column or a record whose field count differs from the header is fatal.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawTermRow>, TaxonomyError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let columns = ColumnMap::from_headers(csv_reader.headers()?)?;

    let mut rows = Vec::new();
    let mut blank = 0usize;
    for (idx, record) in csv_reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            blank += 1;
            continue;
        }
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        rows.push(columns.parse_row(&record, line));
    }

    debug!(
        rows = rows.len(),
        blank,
        flag_columns = columns.flags.len(),
        "read taxonomy table"
    );
    Ok(rows)
}

/// [`read_rows`] over an in-memory string.
pub fn rows_from_str(csv: &str) -> Result<Vec<RawTermRow>, TaxonomyError> {
    read_rows(csv.as_bytes())
}
