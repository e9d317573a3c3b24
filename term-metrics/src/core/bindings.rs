//! Binding context handed to expressions for one row.
//!
//! A [`Bindings`] value has a fixed set of fields (row, row index, bound column,
//! bound cell) plus named extra slots. During a metric pass a single instance is
//! reused for every row, and within a row it is re-bound for each check's target
//! column, so no check can observe a column binding left by the previous one.

use super::{Cell, ColumnModel, Project, Row, Value};
use crate::error::Result;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Named values an [`Evaluable`](super::Evaluable) is evaluated against.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    project_name: String,
    columns: ColumnModel,
    row: Row,
    row_index: usize,
    column_name: String,
    cell: Option<Cell>,
    extras: BTreeMap<String, Value>,
}

impl Bindings {
    /// Creates empty bindings for `project`.
    pub fn for_project(project: &Project) -> Self {
        Self {
            project_name: project.name().to_string(),
            columns: project.columns().clone(),
            ..Self::default()
        }
    }

    /// Name of the project the bindings were created for.
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Index of the currently bound row.
    pub fn row_index(&self) -> usize {
        self.row_index
    }

    /// The currently bound row.
    pub fn row(&self) -> &Row {
        &self.row
    }

    /// Name of the currently bound column. Empty when no column is bound.
    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// The currently bound cell, if any.
    pub fn cell(&self) -> Option<&Cell> {
        self.cell.as_ref()
    }

    /// The bound cell's value, or [`Value::Null`] when there is no cell.
    pub fn value(&self) -> Value {
        self.cell
            .as_ref()
            .map_or(Value::Null, |cell| cell.value.clone())
    }

    /// Looks up a cell value of the bound row by column name.
    ///
    /// Returns `None` if the column is not part of the column model; a column
    /// that exists but has no cell in this row yields [`Value::Null`].
    pub fn cell_value(&self, column: &str) -> Option<Value> {
        self.columns
            .cell_index(column)
            .map(|index| self.row.cell_value(index))
    }

    /// Reads an extra named slot.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.extras.get(name)
    }

    /// Writes an extra named slot.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.extras.insert(name.into(), value.into());
    }

    /// Replaces the bound row.
    pub fn set_row(&mut self, row: &Row, row_index: usize) {
        self.row.clone_from(row);
        self.row_index = row_index;
    }

    /// Replaces the bound column and cell.
    pub fn set_column(&mut self, column_name: &str, cell: Option<&Cell>) {
        column_name.clone_into(&mut self.column_name);
        self.cell = cell.cloned();
    }
}

/// Builds the binding context for rows of a project.
///
/// Implementations may enrich the bindings (extra slots, derived values) or
/// reject rows they cannot bind; a rejected row is skipped by the caller
/// without ending the pass.
pub trait BindingBuilder: Debug + Send + Sync {
    /// Creates fresh bindings for a project.
    fn create_bindings(&self, project: &Project) -> Bindings {
        Bindings::for_project(project)
    }

    /// Binds a row, its index, a column name and that column's cell.
    fn bind(
        &self,
        bindings: &mut Bindings,
        row: &Row,
        row_index: usize,
        column_name: &str,
        cell: Option<&Cell>,
    ) -> Result<()>;

    /// Re-binds only the column and cell, keeping the bound row.
    fn rebind_column(&self, bindings: &mut Bindings, column_name: &str, cell: Option<&Cell>) {
        bindings.set_column(column_name, cell);
    }
}

/// Binds exactly the row, row index, column name and cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBindingBuilder;

impl BindingBuilder for DefaultBindingBuilder {
    fn bind(
        &self,
        bindings: &mut Bindings,
        row: &Row,
        row_index: usize,
        column_name: &str,
        cell: Option<&Cell>,
    ) -> Result<()> {
        bindings.set_row(row, row_index);
        bindings.set_column(column_name, cell);
        Ok(())
    }
}
