//! Metric data model: checks, rules and their dirty-row bookkeeping.

use super::Expression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Sparse map from row index to the per-check results of that row.
///
/// Only rows judged dirty are present.
pub type DirtyIndex = BTreeMap<usize, Vec<bool>>;

/// One boolean check of a metric.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalTuple {
    #[serde(rename = "column", skip_serializing_if = "Option::is_none")]
    target_column: Option<String>,
    #[serde(skip)]
    resolved_column: OnceLock<String>,
    #[serde(rename = "evaluable")]
    expression: Expression,
    disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

impl EvalTuple {
    /// Creates an enabled check on the metric's own column.
    pub fn new(expression: Expression) -> Self {
        Self {
            target_column: None,
            resolved_column: OnceLock::new(),
            expression,
            disabled: false,
            comment: None,
        }
    }

    /// Targets an explicit column instead of the metric's column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Sets the disabled flag.
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Attaches a free-text comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// The configured target column, if any.
    pub fn target_column(&self) -> Option<&str> {
        self.target_column.as_deref()
    }

    /// The column this check evaluates against.
    ///
    /// Without a configured target the first context column passed in is
    /// cached and returned from then on; the configuration itself is left
    /// untouched.
    pub fn resolve_column(&self, context_column: &str) -> &str {
        match &self.target_column {
            Some(column) => column,
            None => self
                .resolved_column
                .get_or_init(|| context_column.to_string()),
        }
    }

    /// The compiled check.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Returns true if the check is skipped during evaluation.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Enables or disables the check.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// The attached comment, if any.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// How the results of a row's checks combine into a verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Concat {
    /// Dirty if any check failed.
    #[default]
    And,
    /// Dirty only if every check failed.
    Or,
    /// Dirty unless exactly one check passed.
    Xor,
}

impl Concat {
    /// Decides whether a row with these check results is dirty.
    ///
    /// A row without any (non-error) result is never dirty.
    pub fn is_dirty(self, results: &[bool]) -> bool {
        if results.is_empty() {
            return false;
        }
        match self {
            Concat::And => results.iter().any(|passed| !passed),
            Concat::Or => results.iter().all(|passed| !passed),
            Concat::Xor => results.iter().filter(|passed| **passed).count() != 1,
        }
    }
}

/// Read access shared by [`Metric`] and [`SpanningMetric`].
pub trait QualityRule {
    /// The rule's name.
    fn name(&self) -> &str;

    /// Ordered checks of the rule.
    fn eval_tuples(&self) -> &[EvalTuple];

    /// Dirty rows found by the most recent complete pass.
    fn dirty_index(&self) -> &DirtyIndex;

    /// Quality of the most recent complete pass; `None` before the first one.
    fn measure(&self) -> Option<f64>;

    /// How check results combine.
    fn concat(&self) -> Concat;

    /// Number of enabled checks.
    fn enabled_tuples(&self) -> usize {
        self.eval_tuples()
            .iter()
            .filter(|t| !t.is_disabled())
            .count()
    }
}

/// A data-quality rule bound to one column.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    column_name: Option<String>,
    eval_tuples: Vec<EvalTuple>,
    concat: Concat,
    dirty_index: DirtyIndex,
    measure: Option<f64>,
}

impl Metric {
    /// Creates a metric bound to `column`.
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            column_name: Some(column.into()),
            eval_tuples: Vec::new(),
            concat: Concat::default(),
            dirty_index: DirtyIndex::new(),
            measure: None,
        }
    }

    /// Creates a metric not bound to any column (row-level predicates).
    pub fn row_level(name: impl Into<String>) -> Self {
        Self {
            column_name: None,
            ..Self::new(name, String::new())
        }
    }

    /// Appends a check.
    pub fn with_tuple(mut self, tuple: EvalTuple) -> Self {
        self.eval_tuples.push(tuple);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets how check results combine.
    pub fn with_concat(mut self, concat: Concat) -> Self {
        self.concat = concat;
        self
    }

    /// The bound column, `None` for row-level metrics.
    pub fn column_name(&self) -> Option<&str> {
        self.column_name.as_deref()
    }

    /// The description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Mutable access to the checks, e.g. to toggle them.
    pub fn eval_tuples_mut(&mut self) -> &mut [EvalTuple] {
        &mut self.eval_tuples
    }

    /// Appends a check.
    pub fn push_tuple(&mut self, tuple: EvalTuple) {
        self.eval_tuples.push(tuple);
    }

    pub(crate) fn publish(&mut self, dirty_index: DirtyIndex, measure: f64) {
        self.dirty_index = dirty_index;
        self.measure = Some(measure);
    }
}

impl QualityRule for Metric {
    fn name(&self) -> &str {
        &self.name
    }

    fn eval_tuples(&self) -> &[EvalTuple] {
        &self.eval_tuples
    }

    fn dirty_index(&self) -> &DirtyIndex {
        &self.dirty_index
    }

    fn measure(&self) -> Option<f64> {
        self.measure
    }

    fn concat(&self) -> Concat {
        self.concat
    }
}

/// The call into a spanning-column function evaluated once per row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanningEvaluable {
    /// Registered function name, e.g. `dateInterval`
    pub function: String,
    /// String parameters passed after the column arguments
    pub params: Vec<String>,
    /// The compiled invocation
    #[serde(rename = "evaluable")]
    pub expression: Expression,
}

/// A data-quality rule whose context spans several columns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanningMetric {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    spanning_columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spanning_evaluable: Option<SpanningEvaluable>,
    eval_tuples: Vec<EvalTuple>,
    concat: Concat,
    dirty_index: DirtyIndex,
    measure: Option<f64>,
}

impl SpanningMetric {
    /// Creates a spanning metric over `columns`.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: None,
            spanning_columns: columns.into_iter().map(Into::into).collect(),
            spanning_evaluable: None,
            eval_tuples: Vec::new(),
            concat: Concat::default(),
            dirty_index: DirtyIndex::new(),
            measure: None,
        }
    }

    /// Sets the spanning evaluable.
    pub fn with_spanning_evaluable(mut self, evaluable: SpanningEvaluable) -> Self {
        self.spanning_evaluable = Some(evaluable);
        self
    }

    /// Appends a check.
    pub fn with_tuple(mut self, tuple: EvalTuple) -> Self {
        self.eval_tuples.push(tuple);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets how check results combine.
    pub fn with_concat(mut self, concat: Concat) -> Self {
        self.concat = concat;
        self
    }

    /// The spanned columns in order.
    pub fn spanning_columns(&self) -> &[String] {
        &self.spanning_columns
    }

    /// The column rows are bound to: the first spanned column.
    pub fn context_column(&self) -> Option<&str> {
        self.spanning_columns.first().map(String::as_str)
    }

    /// The spanning evaluable, if any.
    pub fn spanning_evaluable(&self) -> Option<&SpanningEvaluable> {
        self.spanning_evaluable.as_ref()
    }

    /// The description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Mutable access to the checks, e.g. to toggle them.
    pub fn eval_tuples_mut(&mut self) -> &mut [EvalTuple] {
        &mut self.eval_tuples
    }

    pub(crate) fn publish(&mut self, dirty_index: DirtyIndex, measure: f64) {
        self.dirty_index = dirty_index;
        self.measure = Some(measure);
    }
}

impl QualityRule for SpanningMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn eval_tuples(&self) -> &[EvalTuple] {
        &self.eval_tuples
    }

    fn dirty_index(&self) -> &DirtyIndex {
        &self.dirty_index
    }

    fn measure(&self) -> Option<f64> {
        self.measure
    }

    fn concat(&self) -> Concat {
        self.concat
    }
}
