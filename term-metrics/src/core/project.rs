//! In-memory tabular dataset: a column model and an ordered list of rows.

use super::Value;
use crate::error::{Result, TermError};
use serde::{Deserialize, Serialize};

/// A single cell of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// The cell's value
    pub value: Value,
}

impl Cell {
    /// Creates a new cell holding the given value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// A row of cells, addressed by cell index.
///
/// Missing cells (`None`) and cells holding [`Value::Null`] are both blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    cells: Vec<Option<Cell>>,
}

impl Row {
    /// Creates a row from cell values. Null values become missing cells.
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            cells: values
                .into_iter()
                .map(|v| match v.into() {
                    Value::Null => None,
                    value => Some(Cell { value }),
                })
                .collect(),
        }
    }

    /// Returns the cell at `index`, if present.
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index).and_then(Option::as_ref)
    }

    /// Returns the value at `index`, or [`Value::Null`] for a missing cell.
    pub fn cell_value(&self, index: usize) -> Value {
        self.cell(index)
            .map_or(Value::Null, |cell| cell.value.clone())
    }

    /// Replaces the cell at `index`, growing the row if needed.
    pub fn set_cell(&mut self, index: usize, cell: Option<Cell>) {
        if index >= self.cells.len() {
            self.cells.resize(index + 1, None);
        }
        self.cells[index] = cell;
    }

    /// Number of cell slots in this row.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the row has no cell slots.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Ordered column names; a column's position is its cell index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnModel {
    columns: Vec<String>,
}

impl ColumnModel {
    /// Creates a column model from column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the cell index of `name`.
    pub fn cell_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the column names in order.
    pub fn names(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A named dataset whose rows are evaluated by metrics and row filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    name: String,
    columns: ColumnModel,
    rows: Vec<Row>,
}

impl Project {
    /// Creates an empty project with the given columns.
    pub fn new(name: impl Into<String>, columns: ColumnModel) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Adds rows to the project.
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Row>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Appends a row.
    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// The project name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The project's column model.
    pub fn columns(&self) -> &ColumnModel {
        &self.columns
    }

    /// All rows in row-index order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Resolves a column name to its cell index.
    pub fn require_cell_index(&self, column: &str) -> Result<usize> {
        self.columns
            .cell_index(column)
            .ok_or_else(|| TermError::ColumnNotFound {
                column: column.to_string(),
            })
    }
}
