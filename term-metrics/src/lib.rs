//! # term-metrics - Data Quality Metrics for Rust
//!
//! term-metrics evaluates declarative data-quality rules ("metrics") against the
//! rows of a tabular dataset. For every rule it reports which rows violate it
//! (the *dirty index*) and an aggregate quality measure between 0 and 1.
//!
//! ## Overview
//!
//! A metric is a set of boolean checks. Checks are compiled expressions that
//! run against a per-row binding context; a row is dirty when its check
//! results combine to a failing verdict. Metrics either bind to one column or
//! span several columns, in which case a registered spanning-column function
//! such as `dateInterval` contributes the first check of every row.
//!
//! ## Quick Start
//!
//! ```rust
//! use term_metrics::prelude::*;
//! use term_metrics::core::{
//!     ColumnModel, DefaultBindingBuilder, EvalTuple, Expression, Metric, Project, Row, Value,
//! };
//! use term_metrics::engine::{evaluate_metric, FilteredRows};
//! use term_metrics::formatters::{HumanFormatter, MetricReport};
//!
//! # fn example() -> Result<()> {
//! let project = Project::new("people", ColumnModel::new(["name", "email"])).with_rows(vec![
//!     Row::new(vec![Value::from("ann"), Value::from("ann@example.com")]),
//!     Row::new(vec![Value::from("bob"), Value::Null]),
//! ]);
//!
//! let mut metric = Metric::new("completeness", "email").with_tuple(EvalTuple::new(
//!     Expression::from_fn("isNonBlank(value)", |b| Value::Bool(b.value().is_non_blank_data())),
//! ));
//!
//! evaluate_metric(
//!     &project,
//!     &FilteredRows::new(),
//!     &mut metric,
//!     &DefaultBindingBuilder,
//!     &EvaluationConfig::default(),
//! )?;
//!
//! assert_eq!(metric.measure(), Some(0.5));
//! println!("{}", HumanFormatter::new().format(&[MetricReport::from_metric(&metric)])?);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Spanning metrics
//!
//! ```rust
//! use term_metrics::core::SpanningMetric;
//! use term_metrics::functions::{FunctionCallCompiler, FunctionRegistry, DATE_INTERVAL};
//!
//! let columns = vec!["ordered_at".to_string(), "shipped_at".to_string()];
//! let params = vec!["gteq".to_string(), "0".to_string(), "days".to_string()];
//! let evaluable = FunctionRegistry::global()
//!     .require(DATE_INTERVAL)
//!     .unwrap()
//!     .evaluable(&columns, Some(params.as_slice()), &FunctionCallCompiler::new())
//!     .unwrap();
//!
//! let metric = SpanningMetric::new("shipping_order", columns).with_spanning_evaluable(evaluable);
//! assert_eq!(metric.context_column(), Some("ordered_at"));
//! ```
//!
//! ## Architecture
//!
//! - **`core`**: values, projects, bindings, metrics and the overlay model
//! - **`functions`**: spanning-column functions and their registry
//! - **`engine`**: the evaluation pass and filtered row iteration
//! - **`filters`**: row filters matching expression results
//! - **`config`**: evaluation settings and JSON rule definitions
//! - **`sources`**: loading projects from DataFusion
//! - **`formatters`**: metric reports as JSON or text
//! - **`logging`**: `tracing` configuration

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod filters;
pub mod formatters;
pub mod functions;
pub mod logging;
pub mod prelude;
pub mod sources;
