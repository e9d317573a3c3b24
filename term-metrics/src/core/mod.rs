//! Core types of the metrics library.
//!
//! This module holds the data model every other module works with:
//!
//! - **[`Value`]**: cell values and expression results, including error values
//! - **[`Project`]**: the dataset, a [`ColumnModel`] plus ordered [`Row`]s
//! - **[`Bindings`]**: the per-row context expressions are evaluated against
//! - **[`Evaluable`]** / **[`ExpressionCompiler`]**: the expression service
//! - **[`Metric`]** / **[`SpanningMetric`]**: rules made of [`EvalTuple`] checks
//! - **[`MetricsOverlayModel`]**: all rules of a project and their addressing
//!
//! ## Architecture
//!
//! ```text
//! MetricsOverlayModel
//!     ├── column "age"
//!     │   └── Metric "validity"
//!     │       ├── EvalTuple (value >= 0)
//!     │       └── EvalTuple (value < 150, disabled)
//!     ├── SpanningMetric "uniqueness"
//!     └── SpanningMetric "interval" [start, end]
//!         ├── spanning evaluable: dateInterval("start", "end", ...)
//!         └── EvalTuple ...
//! ```
//!
//! ## Example
//!
//! ```rust
//! use term_metrics::core::{EvalTuple, Expression, Metric, QualityRule, Value};
//!
//! let metric = Metric::new("non_negative", "age").with_tuple(EvalTuple::new(
//!     Expression::from_fn("value >= 0", |b| {
//!         b.value().as_f64().map_or(Value::error("not a number"), |v| Value::Bool(v >= 0.0))
//!     }),
//! ));
//! assert_eq!(metric.enabled_tuples(), 1);
//! ```

mod bindings;
mod evaluable;
mod metric;
mod overlay;
mod project;
mod value;

pub use bindings::{BindingBuilder, Bindings, DefaultBindingBuilder};
pub use evaluable::{Evaluable, Expression, ExpressionCompiler, FnEvaluable};
pub use metric::{
    Concat, DirtyIndex, EvalTuple, Metric, QualityRule, SpanningEvaluable, SpanningMetric,
};
pub use overlay::{MetricTarget, MetricsOverlayModel, UNIQUENESS_METRIC};
pub use project::{Cell, ColumnModel, Project, Row};
pub use value::{EvalError, Value};
