//! End-to-end evaluation: rule definitions, overlay model, passes and reports.

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use term_metrics::config::{EvaluationConfig, RulesConfig};
use term_metrics::core::{
    Bindings, ColumnModel, DefaultBindingBuilder, Evaluable, Expression, ExpressionCompiler,
    Project, QualityRule, Row, Value, UNIQUENESS_METRIC,
};
use term_metrics::engine::{evaluate_in_model, evaluate_metric, FilteredRows};
use term_metrics::error::{Result, TermError};
use term_metrics::filters::MetricsRowFilter;
use term_metrics::formatters::{JsonFormatter, MetricReport, ReportFormatter};
use term_metrics::functions::{FunctionCallCompiler, FunctionRegistry, SpanningColumnFunction};

/// A tiny check language: `nonBlank`, `positive`, or any spanning-function call.
#[derive(Debug)]
struct TestCompiler;

#[derive(Debug)]
enum Check {
    NonBlank,
    Positive,
}

impl Evaluable for Check {
    fn evaluate(&self, bindings: &Bindings) -> Value {
        let value = bindings.value();
        match self {
            Check::NonBlank => Value::Bool(value.is_non_blank_data()),
            Check::Positive => match value.as_f64() {
                Some(v) => Value::Bool(v > 0.0),
                None => Value::error(format!("{} is not a number", value.type_name())),
            },
        }
    }
}

impl ExpressionCompiler for TestCompiler {
    fn compile(&self, expression: &str) -> Result<Arc<dyn Evaluable>> {
        match expression {
            "nonBlank" => Ok(Arc::new(Check::NonBlank)),
            "positive" => Ok(Arc::new(Check::Positive)),
            other => FunctionCallCompiler::new().compile(other),
        }
    }
}

fn day(d: u32) -> Value {
    Value::from(Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap())
}

fn orders() -> Project {
    Project::new(
        "orders",
        ColumnModel::new(["id", "amount", "ordered_at", "shipped_at"]),
    )
    .with_rows(vec![
        Row::new(vec![Value::Int(1), Value::Float(10.0), day(1), day(2)]),
        Row::new(vec![Value::Int(2), Value::Float(-3.0), day(2), day(1)]),
        Row::new(vec![Value::Int(3), Value::Null, day(3), day(3)]),
        Row::new(vec![Value::Int(4), Value::from("n/a"), day(4), Value::Null]),
    ])
}

const RULES: &str = r#"{
    "metrics": [
        {
            "name": "validity",
            "column": "amount",
            "evalTuples": [
                { "expression": "nonBlank", "comment": "amount is required" },
                { "expression": "positive" }
            ]
        }
    ],
    "spanningMetrics": [
        {
            "name": "shipping_order",
            "columns": ["ordered_at", "shipped_at"],
            "function": { "name": "dateInterval", "params": ["gteq", "0", "days"] }
        }
    ]
}"#;

#[test]
fn test_rules_to_measures() {
    let project = orders();
    let mut model = RulesConfig::from_json(RULES)
        .unwrap()
        .to_overlay_model(&TestCompiler)
        .unwrap();
    let config = EvaluationConfig::default();

    // amount: row 1 fails `positive`, row 2 fails `nonBlank` (error on positive is
    // excluded), row 3 is a string: nonBlank passes and positive errors.
    let stats = evaluate_in_model(
        &mut model,
        &project,
        Some("amount"),
        "validity",
        &DefaultBindingBuilder,
        &config,
    )
    .unwrap();
    assert_eq!(stats.evaluated, 4);
    assert_eq!(stats.tuple_errors, 2);

    let validity = &model.metrics_column("amount").unwrap()["validity"];
    assert_eq!(validity.dirty_index().get(&1), Some(&vec![true, false]));
    assert_eq!(validity.dirty_index().get(&2), Some(&vec![false]));
    assert!(!validity.dirty_index().contains_key(&3));
    assert_eq!(validity.measure(), Some(0.5));

    // shipping: row 1 shipped before ordering, row 3 has no ship date.
    evaluate_in_model(
        &mut model,
        &project,
        None,
        "shipping_order",
        &DefaultBindingBuilder,
        &config,
    )
    .unwrap();
    let shipping = &model.span_metrics()[0];
    let dirty: Vec<_> = shipping.dirty_index().keys().copied().collect();
    assert_eq!(dirty, vec![1, 3]);
    assert_eq!(shipping.measure(), Some(0.5));

    let reports = MetricReport::for_model(&model);
    let json = JsonFormatter::new().format(&reports).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed[0]["name"], "validity");
    assert_eq!(parsed[0]["checks"][0]["comment"], "amount is required");
    assert_eq!(parsed[2]["function"], "dateInterval");
}

#[test]
fn test_addressing_rules() {
    let mut model = RulesConfig::from_json(RULES)
        .unwrap()
        .to_overlay_model(&TestCompiler)
        .unwrap();
    let project = orders();
    let config = EvaluationConfig::default();

    // uniqueness is addressed by name whatever column comes with it
    let stats = evaluate_in_model(
        &mut model,
        &project,
        Some("amount"),
        UNIQUENESS_METRIC,
        &DefaultBindingBuilder,
        &config,
    )
    .unwrap();
    assert_eq!(stats.evaluated, 4);
    assert_eq!(model.uniqueness().measure(), Some(1.0));

    for (column, name) in [(None, "validity"), (Some("amount"), "shipping_order")] {
        let err = evaluate_in_model(
            &mut model,
            &project,
            column,
            name,
            &DefaultBindingBuilder,
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, TermError::MetricNotFound { .. }));
    }
}

#[test]
fn test_unknown_interval_comparison_marks_no_rows() {
    let rules = r#"{
        "spanningMetrics": [
            {
                "name": "shipping_window",
                "columns": ["ordered_at", "shipped_at"],
                "function": { "name": "dateInterval", "params": ["between", "1", "days"] },
                "evalTuples": [{ "expression": "nonBlank" }]
            }
        ]
    }"#;
    let mut model = RulesConfig::from_json(rules)
        .unwrap()
        .to_overlay_model(&TestCompiler)
        .unwrap();
    let project = orders();

    let stats = evaluate_in_model(
        &mut model,
        &project,
        None,
        "shipping_window",
        &DefaultBindingBuilder,
        &EvaluationConfig::default(),
    )
    .unwrap();

    // row 3 has no ship date, so the interval is false before the comparison
    // is looked at; every other row reports the unknown comparison.
    assert_eq!(stats.evaluated, 4);
    assert_eq!(stats.tuple_errors, 3);
    let window = &model.span_metrics()[0];
    assert_eq!(window.dirty_index().keys().copied().collect::<Vec<_>>(), vec![3]);
    assert_eq!(window.dirty_index().get(&3), Some(&vec![false, true]));
    assert_eq!(window.measure(), Some(0.75));
}

#[test]
fn test_pass_over_filtered_rows() {
    let project = orders();
    let mut model = RulesConfig::from_json(RULES)
        .unwrap()
        .to_overlay_model(&TestCompiler)
        .unwrap();

    // only rows whose amount is blank
    let filter = MetricsRowFilter::new(Expression::from_fn("value", |b| b.value()))
        .with_column("amount", Some(1))
        .with_select_blank(true);
    let rows = FilteredRows::new().with_filter(Arc::new(filter));

    let target = model.target_mut(Some("amount"), "validity").unwrap();
    let stats = evaluate_metric(
        &project,
        &rows,
        target,
        &DefaultBindingBuilder,
        &EvaluationConfig::verbose(),
    )
    .unwrap();
    assert_eq!(stats.visited, 1);

    let validity = &model.metrics_column("amount").unwrap()["validity"];
    assert_eq!(validity.measure(), Some(0.0));
    assert_eq!(validity.dirty_index().keys().copied().collect::<Vec<_>>(), vec![2]);
}

#[derive(Debug)]
struct AllEqual;

impl SpanningColumnFunction for AllEqual {
    fn name(&self) -> &str {
        "allEqualIntegration"
    }

    fn description(&self) -> &str {
        "Determine if all columns hold the same value"
    }

    fn params(&self) -> &str {
        "columns..."
    }

    fn default_params(&self) -> Vec<String> {
        Vec::new()
    }

    fn call(&self, bindings: &Bindings, args: &[Value]) -> Value {
        let values: Vec<_> = args
            .iter()
            .filter_map(|arg| arg.as_str().and_then(|c| bindings.cell_value(c)))
            .collect();
        Value::Bool(values.windows(2).all(|w| w[0] == w[1]))
    }
}

#[test]
fn test_registered_function_needs_no_engine_change() {
    FunctionRegistry::global().register(Arc::new(AllEqual)).unwrap();

    let rules = r#"{"spanningMetrics": [{
        "name": "same_day",
        "columns": ["ordered_at", "shipped_at"],
        "function": { "name": "allEqualIntegration" }
    }]}"#;
    let mut model = RulesConfig::from_json(rules)
        .unwrap()
        .to_overlay_model(&TestCompiler)
        .unwrap();
    let project = orders();

    let target = model.target_mut(None, "same_day").unwrap();
    evaluate_metric(
        &project,
        &FilteredRows::new(),
        target,
        &DefaultBindingBuilder,
        &EvaluationConfig::production(),
    )
    .unwrap();

    let metric = &model.span_metrics()[0];
    assert_eq!(metric.dirty_index().keys().copied().collect::<Vec<_>>(), vec![0, 1, 3]);
    assert_eq!(metric.measure(), Some(0.25));
}
