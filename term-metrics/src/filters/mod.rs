//! Row filters.
//!
//! A [`RowFilter`] is a pure per-row predicate used by
//! [`FilteredRows`](crate::engine::FilteredRows) to restrict which rows a pass
//! visits. [`MetricsRowFilter`] selects rows by evaluating an expression and
//! comparing the result against match literals, with separate switches for
//! blank and error results.

use crate::core::{BindingBuilder, DefaultBindingBuilder, Expression, Project, Row, Value};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::trace;

/// Decides whether a row is visible.
pub trait RowFilter: Debug + Send + Sync {
    /// Returns true if the row passes the filter.
    fn filter_row(&self, project: &Project, row_index: usize, row: &Row) -> bool;
}

/// Selects rows whose expression result matches one of a set of literals.
///
/// The expression is evaluated against fresh bindings for every row. A result
/// matches when it is
///
/// - an error and `select_error` is set,
/// - blank (null or empty) and `select_blank` is set,
/// - data equal to one of the match literals; two numbers compare by value.
///
/// Array results, including JSON arrays, match when any element matches; JSON
/// elements that cannot be decoded are ignored.
///
/// The final verdict is `matched && !invert`: an inverted filter rejects every
/// row.
///
/// # Examples
///
/// ```rust
/// use term_metrics::core::{ColumnModel, Expression, Project, Row, Value};
/// use term_metrics::filters::{MetricsRowFilter, RowFilter};
///
/// let project = Project::new("p", ColumnModel::new(["status"]));
/// let filter = MetricsRowFilter::new(Expression::from_fn("value", |b| b.value()))
///     .with_column("status", Some(0))
///     .with_matches(vec![Value::from("open")]);
///
/// assert!(filter.filter_row(&project, 0, &Row::new(vec!["open"])));
/// assert!(!filter.filter_row(&project, 1, &Row::new(vec!["closed"])));
/// ```
#[derive(Debug, Clone)]
pub struct MetricsRowFilter {
    expression: Expression,
    column_name: String,
    cell_index: Option<usize>,
    matches: Vec<Value>,
    select_blank: bool,
    select_error: bool,
    invert: bool,
    builder: Arc<dyn BindingBuilder>,
}

impl MetricsRowFilter {
    /// Creates a filter that is not based on a particular column and matches
    /// nothing yet.
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            column_name: String::new(),
            cell_index: None,
            matches: Vec::new(),
            select_blank: false,
            select_error: false,
            invert: false,
            builder: Arc::new(DefaultBindingBuilder),
        }
    }

    /// Bases the expression on a column and the cell index it occupies.
    pub fn with_column(mut self, column_name: impl Into<String>, cell_index: Option<usize>) -> Self {
        self.column_name = column_name.into();
        self.cell_index = cell_index;
        self
    }

    /// Sets the literals a data result is compared against.
    pub fn with_matches(mut self, matches: Vec<Value>) -> Self {
        self.matches = matches;
        self
    }

    /// Sets whether blank results match.
    pub fn with_select_blank(mut self, select_blank: bool) -> Self {
        self.select_blank = select_blank;
        self
    }

    /// Sets whether error results match.
    pub fn with_select_error(mut self, select_error: bool) -> Self {
        self.select_error = select_error;
        self
    }

    /// Sets the invert flag.
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Uses a custom binding builder.
    pub fn with_binding_builder(mut self, builder: Arc<dyn BindingBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// The column the expression is based on; empty for row-level filters.
    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    /// The configured match literals.
    pub fn matches(&self) -> &[Value] {
        &self.matches
    }

    /// Returns true if the filter is inverted.
    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    /// Tests one scalar result.
    pub fn test_value(&self, value: &Value) -> bool {
        if value.is_error() {
            self.select_error
        } else if value.is_non_blank_data() {
            self.matches.iter().any(|m| value.matches_literal(m))
        } else {
            self.select_blank
        }
    }

    fn matches_result(&self, result: &Value) -> bool {
        match result {
            Value::Array(values) => values.iter().any(|v| self.test_value(v)),
            Value::Json(serde_json::Value::Array(elements)) => elements
                .iter()
                .filter_map(|element| Value::from_json_scalar(element).ok())
                .any(|v| self.test_value(&v)),
            scalar => self.test_value(scalar),
        }
    }
}

impl RowFilter for MetricsRowFilter {
    fn filter_row(&self, project: &Project, row_index: usize, row: &Row) -> bool {
        let cell = self.cell_index.and_then(|index| row.cell(index));

        let mut bindings = self.builder.create_bindings(project);
        if let Err(err) = self
            .builder
            .bind(&mut bindings, row, row_index, &self.column_name, cell)
        {
            trace!(row_index, error = %err, "Failed to bind row for filtering");
            return false;
        }

        let result = self.expression.evaluate(&bindings);
        let matched = self.matches_result(&result);
        trace!(row_index, matched, "Filtered row");
        matched && !self.invert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ColumnModel;
    use serde_json::json;

    fn project() -> Project {
        Project::new("p", ColumnModel::new(["a", "b"]))
    }

    fn identity() -> Expression {
        Expression::from_fn("value", |b| b.value())
    }

    fn returning(value: Value) -> Expression {
        Expression::from_fn("constant", move |_| value.clone())
    }

    fn filter(expression: Expression) -> MetricsRowFilter {
        MetricsRowFilter::new(expression).with_column("a", Some(0))
    }

    fn row(value: impl Into<Value>) -> Row {
        Row::new(vec![value.into(), Value::Null])
    }

    #[test]
    fn test_numeric_match_across_kinds() {
        let f = filter(identity()).with_matches(vec![Value::Float(3.0)]);
        assert!(f.filter_row(&project(), 0, &row(3)));
        assert!(!f.filter_row(&project(), 0, &row(4)));
    }

    #[test]
    fn test_literal_equality_for_strings() {
        let f = filter(identity()).with_matches(vec![Value::from("3")]);
        assert!(f.filter_row(&project(), 0, &row("3")));
        assert!(!f.filter_row(&project(), 0, &row(3)));
    }

    #[test]
    fn test_array_matches_any_element() {
        let f = filter(returning(Value::from(vec!["x", "y"]))).with_matches(vec![Value::from("y")]);
        assert!(f.filter_row(&project(), 0, &row("ignored")));

        let f = filter(returning(Value::from(vec!["x", "z"]))).with_matches(vec![Value::from("y")]);
        assert!(!f.filter_row(&project(), 0, &row("ignored")));
    }

    #[test]
    fn test_json_array_ignores_undecodable_elements() {
        let result = Value::Json(json!([{"nested": true}, [1, 2], 5]));
        let f = filter(returning(result)).with_matches(vec![Value::Int(5)]);
        assert!(f.filter_row(&project(), 0, &row(1)));

        let result = Value::Json(json!([{"nested": true}]));
        let f = filter(returning(result))
            .with_matches(vec![Value::Int(5)])
            .with_select_error(true);
        assert!(!f.filter_row(&project(), 0, &row(1)));
    }

    #[test]
    fn test_error_selection() {
        let f = filter(returning(Value::error("boom")));
        assert!(!f.filter_row(&project(), 0, &row(1)));
        assert!(f.clone().with_select_error(true).filter_row(&project(), 0, &row(1)));
    }

    #[test]
    fn test_blank_selection() {
        let f = filter(identity()).with_matches(vec![Value::from("")]);
        assert!(!f.filter_row(&project(), 0, &Row::new(vec![Value::Null, Value::Null])));
        assert!(!f.filter_row(&project(), 0, &row("")));

        let f = f.with_select_blank(true);
        assert!(f.filter_row(&project(), 0, &Row::new(vec![Value::Null, Value::Null])));
        assert!(f.filter_row(&project(), 0, &row("")));
    }

    #[test]
    fn test_invert_rejects_everything() {
        let f = filter(identity())
            .with_matches(vec![Value::Int(1)])
            .with_select_blank(true)
            .with_invert(true);
        assert!(!f.filter_row(&project(), 0, &row(1)));
        assert!(!f.filter_row(&project(), 0, &row(2)));
        assert!(!f.filter_row(&project(), 0, &row("")));
    }

    #[test]
    fn test_row_level_filter_has_no_cell() {
        let f = MetricsRowFilter::new(identity()).with_select_blank(true);
        assert!(f.filter_row(&project(), 0, &row(1)));
        assert_eq!(f.column_name(), "");
    }

    #[test]
    fn test_missing_cell_is_blank() {
        let f = MetricsRowFilter::new(identity())
            .with_column("b", Some(7))
            .with_select_blank(true);
        assert!(f.filter_row(&project(), 0, &row(1)));
    }
}
