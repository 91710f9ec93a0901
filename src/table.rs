//! In-memory table model: one [`Table`] per spreadsheet tab.
//!
//! A table owns its column names and rows. Every row holds exactly one
//! [`Value`] per column; the mutating methods keep that invariant.

use serde::{Serialize, Serializer};
use std::fmt;

/// A single cell value after loading.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// `true` for `Empty` and for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(n) => n.is_nan(),
            Value::Bool(_) => false,
        }
    }

    /// Numeric view: numbers, and text that parses as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Render as a label: integral numbers lose their `.0`, `Empty` is `""`.
    pub fn to_label(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
        }
    }

    /// JSON view used by the GeoJSON exporter.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Empty => serde_json::Value::Null,
            Value::Number(n) => number_to_json(*n),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_label())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER
}

fn format_number(n: f64) -> String {
    if is_integral(n) {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if is_integral(n) {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// One data row, tied to its physical spreadsheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based spreadsheet row the values were read from.
    pub physical_row: u32,
    /// One value per table column.
    pub cells: Vec<Value>,
    /// Whether any source cell outside the first column held data when loaded.
    pub has_source_data: bool,
}

/// A named tabular dataset loaded from one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Sheet (tab) name in the workbook.
    pub sheet: String,
    /// Table name, read from the sheet's title row.
    pub name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(sheet: impl Into<String>, name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            sheet: sheet.into(),
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row. Short rows are padded with `Empty`, long rows truncated.
    pub fn push_row(&mut self, physical_row: u32, mut cells: Vec<Value>, has_source_data: bool) {
        cells.resize(self.columns.len(), Value::Empty);
        self.rows.push(Row {
            physical_row,
            cells,
            has_source_data,
        });
    }

    /// Append a column holding `fill` in every row; returns its index.
    pub fn push_column(&mut self, name: impl Into<String>, fill: Value) -> usize {
        self.columns.push(name.into());
        for row in &mut self.rows {
            row.cells.push(fill.clone());
        }
        self.columns.len() - 1
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.cells.get(column))
    }

    pub fn set_value(&mut self, row: usize, column: usize, value: Value) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.cells.get_mut(column)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Apply `f` to every value of one column.
    pub fn map_column<F>(&mut self, column: usize, mut f: F)
    where
        F: FnMut(&mut Value),
    {
        for row in &mut self.rows {
            if let Some(cell) = row.cells.get_mut(column) {
                f(cell);
            }
        }
    }

    /// Keep only the rows for which `keep` returns `true`.
    pub fn retain_rows<F>(&mut self, keep: F)
    where
        F: FnMut(&Row) -> bool,
    {
        self.rows.retain(keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new("S1", "Jalan", vec!["NO".into(), "A".into()]);
        t.push_row(6, vec![Value::Number(1.0), Value::text("x")], true);
        t.push_row(7, vec![Value::Number(2.0)], false);
        t
    }

    #[test]
    fn rows_are_padded_to_column_count() {
        let t = sample();
        assert_eq!(t.rows()[1].cells, vec![Value::Number(2.0), Value::Empty]);
    }

    #[test]
    fn push_column_fills_every_row() {
        let mut t = sample();
        let idx = t.push_column("DOKUMENTASI", Value::text(""));
        assert_eq!(idx, 2);
        assert!(t.rows().iter().all(|r| r.cells.len() == 3));
        assert_eq!(t.value(1, 2), Some(&Value::text("")));
    }

    #[test]
    fn set_value_out_of_bounds_is_rejected() {
        let mut t = sample();
        assert!(t.set_value(0, 1, Value::text("y")));
        assert!(!t.set_value(5, 1, Value::text("y")));
        assert!(!t.set_value(0, 9, Value::text("y")));
    }

    #[test]
    fn blank_detection() {
        assert!(Value::Empty.is_blank());
        assert!(Value::text("  ").is_blank());
        assert!(Value::Number(f64::NAN).is_blank());
        assert!(!Value::Number(0.0).is_blank());
        assert!(!Value::text("No").is_blank());
        assert!(!Value::Bool(false).is_blank());
    }

    #[test]
    fn labels_drop_integral_fraction() {
        assert_eq!(Value::Number(1.0).to_label(), "1");
        assert_eq!(Value::Number(106.8125).to_label(), "106.8125");
        assert_eq!(Value::Empty.to_label(), "");
    }

    #[test]
    fn json_view() {
        assert_eq!(Value::Number(3.0).to_json(), serde_json::json!(3));
        assert_eq!(Value::Number(-6.25).to_json(), serde_json::json!(-6.25));
        assert_eq!(Value::Number(f64::INFINITY).to_json(), serde_json::Value::Null);
        assert_eq!(Value::Empty.to_json(), serde_json::Value::Null);
        assert_eq!(Value::text("Jl. Ahmad Yani").to_json(), serde_json::json!("Jl. Ahmad Yani"));
    }

    #[test]
    fn numeric_view_parses_text() {
        assert_eq!(Value::text(" 106.8 ").as_f64(), Some(106.8));
        assert_eq!(Value::text("n/a").as_f64(), None);
        assert_eq!(Value::Bool(true).as_f64(), None);
    }
}
