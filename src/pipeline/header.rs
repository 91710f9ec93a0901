//! Header resolution: flatten the multi-row survey header into column names.
//!
//! The survey sheets use a three-level header with merged cells, e.g.
//!
//! ```text
//! row 3 │ NO │ DETAIL LOKASI │ TITIK KORDINAT        │ JENIS RAMBU │ Rekap
//! row 4 │    │               │ Longitude │ Latitude  │ Larangan    │
//! row 5 │    │               │           │           │             │
//! ```
//!
//! Merged cells only carry their label in the top-left cell, so upper levels
//! are forward-filled first (`TITIK KORDINAT` spreads over both coordinate
//! columns), then each column's labels are joined with `_`. Placeholder
//! segments (empty cells, or text containing the placeholder token) are
//! dropped; recap columns are removed entirely.

use crate::config::ColumnSchema;
use tracing::debug;

/// One retained column of a resolved header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderColumn {
    /// 0-based column position in the sheet.
    pub position: u32,
    /// Flattened, de-duplicated name. May be empty.
    pub name: String,
}

/// Join the non-placeholder segments of one column with `_` and trim.
///
/// A segment is a placeholder when it is blank or contains `placeholder`.
pub fn flatten_segments<S: AsRef<str>>(segments: &[S], placeholder: &str) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.trim().is_empty() && !s.contains(placeholder))
        .collect::<Vec<_>>()
        .join("_")
        .trim()
        .to_string()
}

/// Forward-fill empty cells of every level but the last.
///
/// A blank cell takes the label to its left unless a higher level started a
/// new label at that column, which stops the fill for all lower levels.
pub fn forward_fill_levels(levels: &mut [Vec<String>]) {
    let width = levels.iter().map(Vec::len).max().unwrap_or(0);
    let upper = levels.len().saturating_sub(1);
    let mut open = vec![true; width];

    for level in levels.iter_mut().take(upper) {
        level.resize(width, String::new());
        let Some(first) = level.first().cloned() else {
            continue;
        };
        let mut last = first;
        for (i, cell) in level.iter_mut().enumerate().skip(1) {
            if !open[i] {
                last = cell.clone();
            }
            if cell.trim().is_empty() {
                cell.clone_from(&last);
            } else {
                open[i] = false;
                last = cell.clone();
            }
        }
    }
}

/// Resolve the header levels of a sheet into retained columns.
///
/// `levels[j][c]` is the label of header level `j` at column `c` (blank for
/// empty cells). Recap columns are dropped; duplicates get `.1`, `.2`, …
pub fn resolve_header(mut levels: Vec<Vec<String>>, schema: &ColumnSchema) -> Vec<HeaderColumn> {
    forward_fill_levels(&mut levels);
    let width = levels.iter().map(Vec::len).max().unwrap_or(0);

    let mut columns: Vec<HeaderColumn> = Vec::with_capacity(width);
    for position in 0..width {
        let segments: Vec<&str> = levels
            .iter()
            .map(|level| level.get(position).map(String::as_str).unwrap_or(""))
            .collect();
        let name = flatten_segments(&segments, &schema.placeholder_token);
        if schema.is_recap_column(&name) {
            debug!("Dropping recap column {} ('{}')", position, name);
            continue;
        }
        columns.push(HeaderColumn {
            position: position as u32,
            name,
        });
    }

    dedupe_names(&mut columns);
    columns
}

fn dedupe_names(columns: &mut [HeaderColumn]) {
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for col in columns.iter_mut() {
        let mut candidate = col.name.clone();
        while let Some(count) = seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{}.{}", col.name, count);
        }
        seen.insert(candidate.clone(), 0);
        col.name = candidate;
    }
}
