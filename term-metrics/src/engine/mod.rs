//! Metrics evaluation engine.
//!
//! An evaluation pass visits every accepted row of a project once with a
//! [`MetricEvaluator`]. For each row the evaluator binds the row and the
//! metric's column, evaluates the spanning check (for spanning metrics) and
//! every enabled [`EvalTuple`](crate::core::EvalTuple), and stages the row's
//! results if the row is dirty. When the pass ends the dirty index and the
//! quality measure are published to the metric together.
//!
//! ```text
//! FilteredRows::accept
//!     start ─► visit(row 0) ─► visit(row 1) ─► ... ─► end
//!                 │                                    │
//!                 └─ bind, evaluate checks, stage      └─ publish dirty index + measure
//! ```

mod evaluator;
mod quality;
mod rows;

pub use evaluator::MetricEvaluator;
pub use quality::{determine_quality, PassStats};
pub use rows::{FilteredRows, RowVisitor, VisitControl};

use crate::config::EvaluationConfig;
use crate::core::{BindingBuilder, MetricTarget, MetricsOverlayModel, Project};
use crate::error::Result;
use tracing::instrument;

/// Runs one pass of `target` over the rows of `project` accepted by `rows`.
pub fn evaluate_metric<'a>(
    project: &Project,
    rows: &FilteredRows,
    target: impl Into<MetricTarget<'a>>,
    builder: &'a dyn BindingBuilder,
    config: &EvaluationConfig,
) -> Result<PassStats> {
    let mut evaluator = MetricEvaluator::new(target, builder, config.clone());
    rows.accept(project, &mut evaluator)?;
    Ok(evaluator.stats().unwrap_or_default())
}

/// Resolves a metric of `model` the way evaluation requests address it and
/// runs one pass of it over every row of `project`.
///
/// See [`MetricsOverlayModel::target_mut`] for the addressing rules.
#[instrument(skip(model, project, builder, config), fields(project = %project.name()))]
pub fn evaluate_in_model(
    model: &mut MetricsOverlayModel,
    project: &Project,
    column: Option<&str>,
    metric_name: &str,
    builder: &dyn BindingBuilder,
    config: &EvaluationConfig,
) -> Result<PassStats> {
    let target = model.target_mut(column, metric_name)?;
    evaluate_metric(project, &FilteredRows::new(), target, builder, config)
}
