//! Row pruning: drop rows that carry nothing but a running number.

use crate::config::ColumnSchema;
use crate::table::Table;
use tracing::debug;

/// Remove rows with no source data outside the first column.
///
/// A row survives when any of its source cells beyond the first held data
/// when loaded, or when its documentation field is non-blank (an artefact
/// path or the failure sentinel). Values filled in by earlier stages do not
/// count. Returns the number of rows removed.
pub fn prune(table: &mut Table, schema: &ColumnSchema) -> usize {
    let doc = table.column_index(&schema.documentation_column);
    let before = table.len();
    table.retain_rows(|row| {
        row.has_source_data
            || doc
                .and_then(|i| row.cells.get(i))
                .is_some_and(|v| !v.is_blank())
    });
    let removed = before - table.len();
    if removed > 0 {
        debug!("Pruned {} empty row(s) from '{}'", removed, table.name);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn table() -> Table {
        let mut t = Table::new(
            "S1",
            "Jalan",
            vec!["NO".into(), "DETAIL LOKASI".into(), "DOKUMENTASI".into()],
        );
        // loaded with data
        t.push_row(6, vec![Value::Number(1.0), Value::text("Dago"), Value::text("")], true);
        // only a running number; location was filled by the loader
        t.push_row(7, vec![Value::Number(2.0), Value::text("Jalan"), Value::text("")], false);
        // no source data but an image was found
        t.push_row(
            8,
            vec![
                Value::Number(3.0),
                Value::text("Jalan"),
                Value::text("extracted_images/S1_8.jpg"),
            ],
            false,
        );
        t.push_row(
            9,
            vec![Value::Empty, Value::text("Jalan"), Value::text("Image extraction failed")],
            false,
        );
        t
    }

    #[test]
    fn keeps_source_rows_and_rows_with_documentation() {
        let mut t = table();
        let removed = prune(&mut t, &ColumnSchema::default());
        assert_eq!(removed, 1);
        let rows: Vec<u32> = t.rows().iter().map(|r| r.physical_row).collect();
        assert_eq!(rows, vec![6, 8, 9]);
    }

    #[test]
    fn pruning_is_idempotent() {
        let mut t = table();
        prune(&mut t, &ColumnSchema::default());
        assert_eq!(prune(&mut t, &ColumnSchema::default()), 0);
        assert_eq!(t.len(), 3);
    }
}
