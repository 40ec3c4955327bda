//! In-memory representation of one parsed sheet

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One named sheet of cells. CSV files parse to a single row set named
/// "Sheet1"; workbooks parse to one per non-empty sheet, in workbook order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowSet {
    pub name: String,
    pub columns: Vec<String>,
    /// Cell values: null, string, number, or bool
    pub rows: Vec<Vec<Value>>,
}

/// Shape summary of a row set, used to describe sheets in prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSummary {
    pub name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub column_names: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub non_empty_rows: usize,
}

impl RowSet {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Count of rows with at least one non-null, non-empty cell
    pub fn non_empty_rows(&self) -> usize {
        self.rows.iter().filter(|row| !row_is_empty(row)).count()
    }

    /// Project rows to JSON objects keyed by column name. Nulls become empty
    /// strings; output is truncated to `max_rows`.
    pub fn to_json_rows(&self, max_rows: usize) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .take(max_rows)
            .map(|row| {
                let mut object = Map::new();
                for (i, column) in self.columns.iter().enumerate() {
                    let cell = row.get(i).cloned().unwrap_or(Value::Null);
                    let cell = if cell.is_null() {
                        Value::String(String::new())
                    } else {
                        cell
                    };
                    object.insert(column.clone(), cell);
                }
                object
            })
            .collect()
    }

    /// Summarize shape and numeric columns
    pub fn summarize(&self) -> SheetSummary {
        let numeric_columns = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| self.column_is_numeric(*i))
            .map(|(_, name)| name.clone())
            .collect();

        SheetSummary {
            name: self.name.clone(),
            row_count: self.rows.len(),
            column_count: self.columns.len(),
            column_names: self.columns.clone(),
            numeric_columns,
            non_empty_rows: self.non_empty_rows(),
        }
    }

    /// A column is numeric when it has at least one non-null cell and every
    /// non-null cell is a number.
    fn column_is_numeric(&self, index: usize) -> bool {
        let mut seen = 0usize;
        for row in &self.rows {
            match row.get(index) {
                Some(Value::Null) | None => {}
                Some(Value::Number(_)) => seen += 1,
                Some(Value::String(s)) if s.trim().is_empty() => {}
                Some(_) => return false,
            }
        }
        seen > 0
    }
}

fn row_is_empty(row: &[Value]) -> bool {
    row.iter().all(|cell| match cell {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    })
}
