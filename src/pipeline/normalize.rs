//! Column normalisation: Yes/No flag columns and the documentation column.

use crate::config::ColumnSchema;
use crate::table::{Table, Value};
use tracing::debug;

/// Normalise flag columns and guarantee a text documentation column.
///
/// Running this twice leaves the table unchanged.
pub fn normalize(table: &mut Table, schema: &ColumnSchema) {
    let flag_columns: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| schema.is_flag_column(name))
        .map(|(i, _)| i)
        .collect();

    for col in flag_columns {
        let name = table.columns()[col].clone();
        table.map_column(col, |v| {
            if let Some(flag) = normalize_flag(v, schema) {
                *v = flag;
            } else {
                debug!("Flag column '{}' keeps value '{}'", name, v);
            }
        });
    }

    let doc = match table.column_index(&schema.documentation_column) {
        Some(i) => i,
        None => table.push_column(schema.documentation_column.clone(), Value::text("")),
    };
    table.map_column(doc, |v| {
        if !matches!(v, Value::Text(_)) {
            *v = Value::Text(v.to_label());
        }
    });
}

/// `None` when the value is neither blank nor a `1` marker, nor already a
/// normalised token.
fn normalize_flag(v: &Value, schema: &ColumnSchema) -> Option<Value> {
    if v.is_blank() {
        return Some(Value::text(schema.flag_no.as_str()));
    }
    match v {
        Value::Number(n) if *n == 1.0 => Some(Value::text(schema.flag_yes.as_str())),
        Value::Text(s) if *s == schema.flag_yes || *s == schema.flag_no => Some(v.clone()),
        _ => None,
    }
}
