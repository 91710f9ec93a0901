//! Table loading: one [`Table`] per sheet, read with calamine.
//!
//! Physical rows in [`LayoutConfig`](crate::config::LayoutConfig) are 1-based;
//! calamine positions are 0-based absolute `(row, col)` pairs, so every lookup
//! goes through [`cell`] which does the conversion.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::pipeline::header::{resolve_header, HeaderColumn};
use crate::table::{Table, Value};
use calamine::{open_workbook_auto, Data, Range, Reader};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

static RE_RESERVED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap());

/// Load every sheet of a workbook, in workbook order.
pub fn load_workbook(path: &Path, config: &ConversionConfig) -> Result<Vec<Table>, ConvertError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ConvertError::Workbook {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    debug!("{} sheet(s) in {}", sheet_names.len(), path.display());

    let mut tables = Vec::with_capacity(sheet_names.len());
    for sheet in sheet_names {
        config.check_cancelled()?;
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| ConvertError::Workbook {
                path: path.to_path_buf(),
                detail: format!("sheet '{sheet}': {e}"),
            })?;
        let table = table_from_range(&sheet, &range, config)?;
        info!(
            "Loaded sheet '{}' as '{}': {} columns, {} rows",
            sheet,
            table.name,
            table.columns().len(),
            table.len()
        );
        tables.push(table);
    }

    dedupe_table_names(&mut tables);
    Ok(tables)
}

/// Build a table from the cell range of one sheet.
pub fn table_from_range(
    sheet: &str,
    range: &Range<Data>,
    config: &ConversionConfig,
) -> Result<Table, ConvertError> {
    let layout = &config.layout;
    let schema = &config.schema;
    let Some((last_row, last_col)) = range.end() else {
        return Err(ConvertError::MissingTitle {
            sheet: sheet.to_string(),
            row: layout.title_row,
        });
    };

    // ── Title ────────────────────────────────────────────────────────────
    let title = (0..=last_col)
        .map(|c| cell(range, layout.title_row, c).to_label())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .ok_or_else(|| ConvertError::MissingTitle {
            sheet: sheet.to_string(),
            row: layout.title_row,
        })?;

    // ── Header ───────────────────────────────────────────────────────────
    let levels: Vec<Vec<String>> = layout
        .header_rows
        .iter()
        .map(|&r| (0..=last_col).map(|c| cell(range, r, c).to_label()).collect())
        .collect();
    let header: Vec<HeaderColumn> = resolve_header(levels, schema);
    let columns: Vec<String> = header.iter().map(|h| h.name.clone()).collect();

    let location = columns
        .iter()
        .position(|c| c == &schema.location_column)
        .ok_or_else(|| ConvertError::MissingColumn {
            sheet: sheet.to_string(),
            column: schema.location_column.clone(),
        })?;

    let mut table = Table::new(sheet, sanitize_name(&title), columns);

    // ── Rows ─────────────────────────────────────────────────────────────
    // Last physical row = calamine's 0-based end row + 1.
    for physical in layout.data_start_row..=last_row + 1 {
        let cells: Vec<Value> = header
            .iter()
            .map(|h| cell(range, physical, h.position))
            .collect();
        let has_source_data = cells.iter().skip(1).any(|v| !v.is_blank());
        table.push_row(physical, cells, has_source_data);
    }

    table.map_column(location, |v| {
        if v.is_blank() {
            *v = Value::text(title.as_str());
        }
    });

    Ok(table)
}

/// Value at a 1-based physical row and 0-based column.
fn cell(range: &Range<Data>, physical_row: u32, col: u32) -> Value {
    match physical_row.checked_sub(1) {
        Some(row) => range.get_value((row, col)).map(to_value).unwrap_or_default(),
        None => Value::Empty,
    }
}

fn to_value(data: &Data) -> Value {
    match data {
        Data::Empty | Data::Error(_) => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(f) => Value::Number(*f),
        Data::Int(i) => Value::Number(*i as f64),
        Data::Bool(b) => Value::Bool(*b),
        other => Value::Text(other.to_string()),
    }
}

/// Make a table title safe to use as a file name.
pub fn sanitize_name(title: &str) -> String {
    let cleaned = RE_RESERVED.replace_all(title.trim(), "_");
    let cleaned = cleaned.trim_end_matches(['.', ' ']);
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Suffix later tables sharing a name with `_<sheet>`.
fn dedupe_table_names(tables: &mut [Table]) {
    let mut used: HashSet<String> = HashSet::new();
    for table in tables.iter_mut() {
        if !used.insert(table.name.clone()) {
            let renamed = format!("{}_{}", table.name, sanitize_name(&table.sheet));
            info!(
                "Sheet '{}' repeats title '{}'; writing it as '{}'",
                table.sheet, table.name, renamed
            );
            table.name = renamed;
            used.insert(table.name.clone());
        }
    }
}
