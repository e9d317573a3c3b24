//! Property-based tests for evaluation passes and row filters.
//!
//! - the measure is always within [0, 1] and equals 1 - dirty/evaluated
//! - the dirty index holds exactly the rows whose combined verdict fails
//! - an inverted row filter never accepts a row
//! - numeric match literals compare by value regardless of integer or float

use proptest::prelude::*;
use term_metrics::config::EvaluationConfig;
use term_metrics::core::{
    ColumnModel, Concat, DefaultBindingBuilder, EvalTuple, Expression, Metric, Project,
    QualityRule, Row, Value,
};
use term_metrics::engine::{evaluate_metric, FilteredRows};
use term_metrics::filters::{MetricsRowFilter, RowFilter};

/// Cell values a check can see: a number, a blank or a non-numeric string.
fn cell_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-100i64..100).prop_map(Value::Int),
        Just(Value::Null),
        "[a-z]{1,5}".prop_map(Value::String),
    ]
}

fn concat_strategy() -> impl Strategy<Value = Concat> {
    prop_oneof![Just(Concat::And), Just(Concat::Or), Just(Concat::Xor)]
}

/// `value >= threshold`, erroring on anything that is not a number.
fn at_least(threshold: i64) -> Expression {
    Expression::from_fn(format!("value >= {threshold}"), move |b| match b.value() {
        Value::Int(v) => Value::Bool(v >= threshold),
        other => Value::error(format!("{} is not a number", other.type_name())),
    })
}

fn expected_results(value: &Value, thresholds: &[i64]) -> Vec<bool> {
    match value {
        Value::Int(v) => thresholds.iter().map(|t| v >= t).collect(),
        _ => Vec::new(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_measure_matches_dirty_fraction(
        cells in prop::collection::vec(cell_strategy(), 0..40),
        thresholds in prop::collection::vec(-50i64..50, 1..4),
        concat in concat_strategy(),
    ) {
        let project = Project::new("p", ColumnModel::new(["n"]))
            .with_rows(cells.iter().cloned().map(|v| Row::new(vec![v])));
        let mut metric = Metric::new("m", "n").with_concat(concat);
        for t in &thresholds {
            metric.push_tuple(EvalTuple::new(at_least(*t)));
        }

        let stats = evaluate_metric(
            &project,
            &FilteredRows::new(),
            &mut metric,
            &DefaultBindingBuilder,
            &EvaluationConfig::production(),
        )
        .unwrap();

        let measure = metric.measure().unwrap();
        prop_assert!((0.0..=1.0).contains(&measure));
        prop_assert_eq!(stats.evaluated, cells.len());
        let expected = if cells.is_empty() {
            1.0
        } else {
            1.0 - metric.dirty_index().len() as f64 / cells.len() as f64
        };
        prop_assert!((measure - expected).abs() < 1e-12);

        for (row_index, value) in cells.iter().enumerate() {
            let results = expected_results(value, &thresholds);
            let dirty = concat.is_dirty(&results);
            prop_assert_eq!(metric.dirty_index().get(&row_index), dirty.then_some(&results));
        }
    }

    #[test]
    fn test_inverted_filter_rejects_everything(
        value in cell_strategy(),
        matches in prop::collection::vec(cell_strategy(), 0..4),
        select_blank in any::<bool>(),
        select_error in any::<bool>(),
    ) {
        let project = Project::new("p", ColumnModel::new(["n"]));
        let filter = MetricsRowFilter::new(Expression::from_fn("value", |b| b.value()))
            .with_column("n", Some(0))
            .with_matches(matches)
            .with_select_blank(select_blank)
            .with_select_error(select_error)
            .with_invert(true);
        prop_assert!(!filter.filter_row(&project, 0, &Row::new(vec![value])));
    }

    #[test]
    fn test_numeric_matches_by_value(n in -1_000_000i64..1_000_000) {
        let project = Project::new("p", ColumnModel::new(["n"]));
        let filter = MetricsRowFilter::new(Expression::from_fn("value", |b| b.value()))
            .with_column("n", Some(0))
            .with_matches(vec![Value::Float(n as f64)]);
        prop_assert!(filter.filter_row(&project, 0, &Row::new(vec![Value::Int(n)])));
        prop_assert!(!filter.filter_row(&project, 0, &Row::new(vec![Value::Int(n + 1)])));
    }
}
