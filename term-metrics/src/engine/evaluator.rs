//! Drives one metric through a pass over a project's rows.

use super::quality::PassStats;
use super::rows::{RowVisitor, VisitControl};
use crate::config::EvaluationConfig;
use crate::core::{
    BindingBuilder, Bindings, DirtyIndex, Expression, MetricTarget, Project, Row, Value,
};
use crate::error::{Result, TermError};
use crate::logging::truncate_field;
use crate::{log_pass, log_row, log_skipped};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, instrument};

/// State that exists only between `start` and `end`.
#[derive(Debug)]
struct Pass {
    bindings: Bindings,
    context_column: String,
    context_index: Option<usize>,
    pending: DirtyIndex,
    stats: PassStats,
}

/// Row visitor that evaluates the checks of one metric.
///
/// Results are staged while rows are visited and published to the metric only
/// when the pass ends; an evaluator dropped before `end` leaves the metric as it
/// was.
///
/// # Examples
///
/// ```rust
/// use term_metrics::config::EvaluationConfig;
/// use term_metrics::core::{
///     ColumnModel, DefaultBindingBuilder, EvalTuple, Expression, Metric, Project,
///     QualityRule, Row, Value,
/// };
/// use term_metrics::engine::{FilteredRows, MetricEvaluator};
///
/// let project = Project::new("people", ColumnModel::new(["age"]))
///     .with_rows(vec![Row::new(vec![Value::Int(30)]), Row::new(vec![Value::Int(-1)])]);
/// let mut metric = Metric::new("non_negative", "age").with_tuple(EvalTuple::new(
///     Expression::from_fn("value >= 0", |b| {
///         b.value().as_i64().map_or(Value::error("not a number"), |v| Value::Bool(v >= 0))
///     }),
/// ));
///
/// let mut evaluator =
///     MetricEvaluator::new(&mut metric, &DefaultBindingBuilder, EvaluationConfig::default());
/// FilteredRows::new().accept(&project, &mut evaluator).unwrap();
///
/// assert_eq!(metric.measure(), Some(0.5));
/// assert_eq!(metric.dirty_index().get(&1), Some(&vec![false]));
/// ```
#[derive(Debug)]
pub struct MetricEvaluator<'a> {
    target: MetricTarget<'a>,
    builder: &'a dyn BindingBuilder,
    config: EvaluationConfig,
    pass: Option<Pass>,
    last_stats: Option<PassStats>,
}

impl<'a> MetricEvaluator<'a> {
    /// Creates an evaluator for the given metric.
    pub fn new(
        target: impl Into<MetricTarget<'a>>,
        builder: &'a dyn BindingBuilder,
        config: EvaluationConfig,
    ) -> Self {
        Self {
            target: target.into(),
            builder,
            config,
            pass: None,
            last_stats: None,
        }
    }

    /// Counters of the most recently completed pass.
    pub fn stats(&self) -> Option<PassStats> {
        self.last_stats
    }

    fn context_column(&self) -> String {
        match &self.target {
            MetricTarget::Column(metric) => metric.column_name().unwrap_or_default().to_string(),
            MetricTarget::Spanning(metric) => metric.context_column().unwrap_or_default().to_string(),
        }
    }

    fn evaluate(&self, expression: &Expression, bindings: &Bindings) -> Value {
        if !self.config.catch_panics {
            return expression.evaluate(bindings);
        }
        panic::catch_unwind(AssertUnwindSafe(|| expression.evaluate(bindings))).unwrap_or_else(
            |payload| {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "evaluation panicked".to_string());
                Value::error(message)
            },
        )
    }
}

/// Appends a boolean result; anything else counts as an excluded error.
fn record(results: &mut Vec<bool>, stats: &mut PassStats, value: Value) -> Option<Value> {
    match value {
        Value::Bool(b) => {
            results.push(b);
            None
        }
        other => {
            stats.tuple_errors += 1;
            Some(other)
        }
    }
}

impl RowVisitor for MetricEvaluator<'_> {
    #[instrument(skip(self, project), fields(project = %project.name(), metric = %self.target.rule().name()))]
    fn start(&mut self, project: &Project) -> Result<()> {
        let context_column = self.context_column();
        let context_index = project.columns().cell_index(&context_column);
        if context_index.is_none() && !context_column.is_empty() {
            log_skipped!(
                self.config.log,
                column = %context_column,
                "Bound column is not part of the project; rows are bound without a cell"
            );
        }

        log_pass!(
            self.config.log,
            rows = project.row_count(),
            checks = self.target.rule().enabled_tuples(),
            "Starting evaluation pass"
        );

        self.pass = Some(Pass {
            bindings: self.builder.create_bindings(project),
            context_column,
            context_index,
            pending: DirtyIndex::new(),
            stats: PassStats::default(),
        });
        Ok(())
    }

    fn visit(&mut self, project: &Project, row_index: usize, row: &Row) -> VisitControl {
        let Some(mut pass) = self.pass.take() else {
            debug!(row_index, "Row visited outside of a pass");
            return VisitControl::Stop;
        };
        pass.stats.visited += 1;

        let cell = pass.context_index.and_then(|index| row.cell(index));
        if let Err(err) =
            self.builder
                .bind(&mut pass.bindings, row, row_index, &pass.context_column, cell)
        {
            log_skipped!(self.config.log, row_index, error = %err, "Failed to bind row, skipping");
            pass.stats.skipped_rows += 1;
            self.pass = Some(pass);
            return VisitControl::Continue;
        }
        pass.stats.evaluated += 1;

        let mut results = Vec::new();
        if let MetricTarget::Spanning(metric) = &self.target {
            if let Some(spanning) = metric.spanning_evaluable() {
                let value = self.evaluate(&spanning.expression, &pass.bindings);
                if let Some(excluded) = record(&mut results, &mut pass.stats, value) {
                    log_row!(
                        self.config.log,
                        row_index,
                        function = %spanning.function,
                        result = %truncate_field(&excluded.to_string(), self.config.log.max_field_length),
                        "Spanning check excluded"
                    );
                }
            }
        }

        for tuple in self.target.rule().eval_tuples() {
            if tuple.is_disabled() {
                continue;
            }
            let column = tuple.resolve_column(&pass.context_column);
            let cell = project
                .columns()
                .cell_index(column)
                .and_then(|index| row.cell(index));
            self.builder.rebind_column(&mut pass.bindings, column, cell);

            let value = self.evaluate(tuple.expression(), &pass.bindings);
            if let Some(excluded) = record(&mut results, &mut pass.stats, value) {
                log_row!(
                    self.config.log,
                    row_index,
                    check = %tuple.expression().source(),
                    result = %truncate_field(&excluded.to_string(), self.config.log.max_field_length),
                    "Check excluded"
                );
            }
        }

        let dirty = self.target.rule().concat().is_dirty(&results);
        log_row!(self.config.log, row_index, dirty, results = ?results, "Evaluated row");
        if dirty {
            pass.stats.dirty_rows += 1;
            pass.pending.insert(row_index, results);
        }

        self.pass = Some(pass);
        VisitControl::Continue
    }

    #[instrument(skip(self, project), fields(project = %project.name(), metric = %self.target.rule().name()))]
    fn end(&mut self, project: &Project) -> Result<()> {
        let pass = self
            .pass
            .take()
            .ok_or_else(|| TermError::Internal("Evaluation pass was not started".to_string()))?;
        let measure = pass.stats.measure();

        log_pass!(
            self.config.log,
            evaluated = pass.stats.evaluated,
            skipped = pass.stats.skipped_rows,
            dirty = pass.stats.dirty_rows,
            excluded_checks = pass.stats.tuple_errors,
            measure,
            "Evaluation pass finished"
        );

        match &mut self.target {
            MetricTarget::Column(metric) => metric.publish(pass.pending, measure),
            MetricTarget::Spanning(metric) => metric.publish(pass.pending, measure),
        }
        self.last_stats = Some(pass.stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Cell, ColumnModel, Concat, DefaultBindingBuilder, EvalTuple, Metric, QualityRule,
        SpanningMetric,
    };
    use crate::engine::FilteredRows;
    use crate::functions::{DateInterval, FunctionCallCompiler, SpanningColumnFunction};
    use chrono::{TimeZone, Utc};

    fn constant(result: bool) -> Expression {
        Expression::from_fn(result.to_string(), move |_| Value::Bool(result))
    }

    fn non_negative() -> Expression {
        Expression::from_fn("value >= 0", |b| match b.value() {
            Value::Int(v) => Value::Bool(v >= 0),
            other => Value::error(format!("not a number: {other}")),
        })
    }

    fn ages(values: Vec<Value>) -> Project {
        Project::new("people", ColumnModel::new(["age", "name"]))
            .with_rows(values.into_iter().map(|v| Row::new(vec![v, Value::from("x")])))
    }

    fn run<'a>(target: impl Into<MetricTarget<'a>>, project: &Project) -> PassStats {
        let mut evaluator =
            MetricEvaluator::new(target, &DefaultBindingBuilder, EvaluationConfig::default());
        FilteredRows::new().accept(project, &mut evaluator).unwrap();
        evaluator.stats().unwrap()
    }

    #[test]
    fn test_all_pass() {
        let project = ages(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]);
        let mut metric = Metric::new("m", "age").with_tuple(EvalTuple::new(non_negative()));
        run(&mut metric, &project);
        assert!(metric.dirty_index().is_empty());
        assert_eq!(metric.measure(), Some(1.0));
    }

    #[test]
    fn test_partial_failure() {
        let project = ages(vec![Value::Int(1), Value::Int(-2), Value::Int(3), Value::Int(4)]);
        let mut metric = Metric::new("m", "age").with_tuple(EvalTuple::new(non_negative()));
        run(&mut metric, &project);
        assert_eq!(metric.dirty_index().len(), 1);
        assert_eq!(metric.dirty_index().get(&1), Some(&vec![false]));
        assert_eq!(metric.measure(), Some(0.75));
    }

    #[test]
    fn test_errors_are_excluded() {
        let project = ages(vec![Value::Int(1), Value::from("oops"), Value::Int(3)]);
        let mut metric = Metric::new("m", "age").with_tuple(EvalTuple::new(non_negative()));
        let stats = run(&mut metric, &project);
        assert!(metric.dirty_index().is_empty());
        assert_eq!(metric.measure(), Some(1.0));
        assert_eq!(stats.tuple_errors, 1);
        assert_eq!(stats.evaluated, 3);
    }

    #[test]
    fn test_non_boolean_results_are_excluded() {
        let project = ages(vec![Value::Int(1)]);
        let mut metric = Metric::new("m", "age")
            .with_tuple(EvalTuple::new(Expression::from_fn("1", |_| Value::Int(1))))
            .with_tuple(EvalTuple::new(constant(false)));
        run(&mut metric, &project);
        assert_eq!(metric.dirty_index().get(&0), Some(&vec![false]));
    }

    #[test]
    fn test_disabled_tuple_is_skipped() {
        let project = ages(vec![Value::Int(1), Value::Int(2)]);
        let mut metric = Metric::new("m", "age")
            .with_tuple(EvalTuple::new(constant(false)).with_disabled(true))
            .with_tuple(EvalTuple::new(constant(true)));
        run(&mut metric, &project);
        assert!(metric.dirty_index().is_empty());
        assert_eq!(metric.measure(), Some(1.0));
    }

    #[test]
    fn test_results_keep_tuple_order() {
        let project = ages(vec![Value::Int(1)]);
        let mut metric = Metric::new("m", "age")
            .with_tuple(EvalTuple::new(constant(true)))
            .with_tuple(EvalTuple::new(constant(false)));
        run(&mut metric, &project);
        assert_eq!(metric.dirty_index().get(&0), Some(&vec![true, false]));
        assert_eq!(metric.measure(), Some(0.0));
    }

    #[test]
    fn test_tuple_target_column_rebinds_cell() {
        let project = Project::new("p", ColumnModel::new(["age", "name"])).with_rows(vec![
            Row::new(vec![Value::Int(1), Value::from("ann")]),
            Row::new(vec![Value::Int(2), Value::Null]),
        ]);
        let has_name = Expression::from_fn("isNonBlank(value)", |b| {
            Value::Bool(b.column_name() == "name" && b.value().is_non_blank_data())
        });
        let mut metric = Metric::new("m", "age")
            .with_tuple(EvalTuple::new(non_negative()))
            .with_tuple(EvalTuple::new(has_name).with_column("name"));
        run(&mut metric, &project);
        assert_eq!(metric.dirty_index().len(), 1);
        assert_eq!(metric.dirty_index().get(&1), Some(&vec![true, false]));

        // the untargeted tuple resolved to the metric's column
        assert_eq!(metric.eval_tuples()[0].resolve_column("other"), "age");
    }

    #[test]
    fn test_empty_project() {
        let project = ages(Vec::new());
        let mut metric = Metric::new("m", "age").with_tuple(EvalTuple::new(constant(false)));
        let stats = run(&mut metric, &project);
        assert_eq!(stats.evaluated, 0);
        assert_eq!(metric.measure(), Some(1.0));
    }

    #[test]
    fn test_concat_or() {
        let project = ages(vec![Value::Int(-1)]);
        let mut metric = Metric::new("m", "age")
            .with_concat(Concat::Or)
            .with_tuple(EvalTuple::new(non_negative()))
            .with_tuple(EvalTuple::new(constant(true)));
        run(&mut metric, &project);
        assert!(metric.dirty_index().is_empty());
    }

    #[test]
    fn test_abandoned_pass_leaves_metric_unchanged() {
        let project = ages(vec![Value::Int(-1), Value::Int(-2)]);
        let mut metric = Metric::new("m", "age").with_tuple(EvalTuple::new(non_negative()));
        {
            let mut evaluator =
                MetricEvaluator::new(&mut metric, &DefaultBindingBuilder, EvaluationConfig::default());
            evaluator.start(&project).unwrap();
            evaluator.visit(&project, 0, &project.rows()[0]);
        }
        assert!(metric.dirty_index().is_empty());
        assert_eq!(metric.measure(), None);
    }

    #[test]
    fn test_end_without_start_fails() {
        let project = ages(Vec::new());
        let mut metric = Metric::new("m", "age");
        let mut evaluator =
            MetricEvaluator::new(&mut metric, &DefaultBindingBuilder, EvaluationConfig::default());
        assert_eq!(
            evaluator.visit(&project, 0, &Row::new(Vec::<Value>::new())),
            VisitControl::Stop
        );
        assert!(matches!(evaluator.end(&project), Err(TermError::Internal(_))));
    }

    #[derive(Debug)]
    struct RejectNegative;

    impl BindingBuilder for RejectNegative {
        fn bind(
            &self,
            bindings: &mut Bindings,
            row: &Row,
            row_index: usize,
            column_name: &str,
            cell: Option<&Cell>,
        ) -> Result<()> {
            if cell.and_then(|c| c.value.as_i64()).is_some_and(|v| v < 0) {
                return Err(TermError::Internal("negative".to_string()));
            }
            DefaultBindingBuilder.bind(bindings, row, row_index, column_name, cell)
        }
    }

    #[test]
    fn test_binding_failure_skips_row() {
        let project = ages(vec![Value::Int(-1), Value::Int(2)]);
        let mut metric = Metric::new("m", "age").with_tuple(EvalTuple::new(constant(false)));
        let mut evaluator =
            MetricEvaluator::new(&mut metric, &RejectNegative, EvaluationConfig::default());
        FilteredRows::new().accept(&project, &mut evaluator).unwrap();
        let stats = evaluator.stats().unwrap();
        assert_eq!(stats.skipped_rows, 1);
        assert_eq!(stats.evaluated, 1);
        assert_eq!(metric.dirty_index().keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(metric.measure(), Some(0.0));
    }

    #[test]
    fn test_panicking_check_becomes_error() {
        let project = ages(vec![Value::Int(1)]);
        let mut metric = Metric::new("m", "age")
            .with_tuple(EvalTuple::new(Expression::from_fn("boom", |_| panic!("boom"))))
            .with_tuple(EvalTuple::new(constant(true)));
        let stats = run(&mut metric, &project);
        assert_eq!(stats.tuple_errors, 1);
        assert_eq!(metric.measure(), Some(1.0));
    }

    #[test]
    fn test_spanning_metric_with_date_interval() {
        let day = |d| Value::from(Utc.with_ymd_and_hms(2020, 1, d, 0, 0, 0).unwrap());
        let project = Project::new("p", ColumnModel::new(["start", "end"])).with_rows(vec![
            Row::new(vec![day(1), day(3)]),
            Row::new(vec![day(3), day(1)]),
            Row::new(vec![Value::Null, day(1)]),
        ]);
        let columns = vec!["start".to_string(), "end".to_string()];
        let params = vec!["gteq".to_string(), "1".to_string(), "days".to_string()];
        let evaluable = DateInterval
            .evaluable(&columns, Some(params.as_slice()), &FunctionCallCompiler::new())
            .unwrap();
        let mut metric = SpanningMetric::new("interval", columns)
            .with_spanning_evaluable(evaluable)
            .with_tuple(EvalTuple::new(constant(true)));

        run(&mut metric, &project);
        assert_eq!(metric.dirty_index().len(), 2);
        assert_eq!(metric.dirty_index().get(&1), Some(&vec![false, true]));
        assert_eq!(metric.dirty_index().get(&2), Some(&vec![false, true]));
        assert!((metric.measure().unwrap() - 1.0 / 3.0).abs() < 1e-9);

        // untargeted checks bind the first spanning column
        assert_eq!(metric.eval_tuples()[0].resolve_column("x"), "start");
    }

    #[test]
    fn test_misconfigured_date_interval_is_excluded() {
        let day = |d| Value::from(Utc.with_ymd_and_hms(2020, 1, d, 0, 0, 0).unwrap());
        let project = Project::new("p", ColumnModel::new(["start", "end"]))
            .with_rows(vec![Row::new(vec![day(1), day(3)])]);
        let columns = vec!["start".to_string(), "end".to_string()];

        for params in [["between", "1", "days"], ["gteq", "1", "fortnights"]] {
            let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
            let evaluable = DateInterval
                .evaluable(&columns, Some(params.as_slice()), &FunctionCallCompiler::new())
                .unwrap();
            let mut metric = SpanningMetric::new("interval", columns.clone())
                .with_spanning_evaluable(evaluable)
                .with_tuple(EvalTuple::new(constant(true)));

            let stats = run(&mut metric, &project);
            assert!(metric.dirty_index().is_empty(), "{params:?}");
            assert_eq!(metric.measure(), Some(1.0), "{params:?}");
            assert_eq!(stats.tuple_errors, 1, "{params:?}");
            assert_eq!(stats.evaluated, 1, "{params:?}");
        }
    }

    #[test]
    fn test_rerun_replaces_previous_results() {
        let mut metric = Metric::new("m", "age").with_tuple(EvalTuple::new(non_negative()));
        run(&mut metric, &ages(vec![Value::Int(-1)]));
        assert_eq!(metric.measure(), Some(0.0));
        run(&mut metric, &ages(vec![Value::Int(1)]));
        assert!(metric.dirty_index().is_empty());
        assert_eq!(metric.measure(), Some(1.0));
    }
}
