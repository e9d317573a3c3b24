//! Per-project collection of metrics and how an evaluation request addresses one.

use super::{Metric, QualityRule, SpanningMetric};
use crate::error::{Result, TermError};
use serde::Serialize;
use std::collections::BTreeMap;

/// Name under which the distinguished uniqueness metric is addressed.
pub const UNIQUENESS_METRIC: &str = "uniqueness";

/// All metrics configured for a project.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsOverlayModel {
    metrics_columns: BTreeMap<String, BTreeMap<String, Metric>>,
    uniqueness: SpanningMetric,
    span_metrics: Vec<SpanningMetric>,
}

impl Default for MetricsOverlayModel {
    fn default() -> Self {
        Self::new(SpanningMetric::new(UNIQUENESS_METRIC, Vec::<String>::new()))
    }
}

impl MetricsOverlayModel {
    /// Creates an empty model with the given uniqueness metric.
    pub fn new(uniqueness: SpanningMetric) -> Self {
        Self {
            metrics_columns: BTreeMap::new(),
            uniqueness,
            span_metrics: Vec::new(),
        }
    }

    /// Adds a column metric, replacing any metric of the same name on that column.
    ///
    /// Row-level metrics are stored under the empty column name.
    pub fn add_metric(&mut self, metric: Metric) {
        let column = metric.column_name().unwrap_or_default().to_string();
        self.metrics_columns
            .entry(column)
            .or_default()
            .insert(metric.name().to_string(), metric);
    }

    /// Adds a spanning metric.
    pub fn add_spanning_metric(&mut self, metric: SpanningMetric) {
        self.span_metrics.push(metric);
    }

    /// Replaces the uniqueness metric.
    pub fn set_uniqueness(&mut self, metric: SpanningMetric) {
        self.uniqueness = metric;
    }

    /// Metrics of one column, keyed by name.
    pub fn metrics_column(&self, column: &str) -> Option<&BTreeMap<String, Metric>> {
        self.metrics_columns.get(column)
    }

    /// Names of columns that carry at least one metric.
    pub fn metric_columns(&self) -> impl Iterator<Item = &str> {
        self.metrics_columns.keys().map(String::as_str)
    }

    /// The uniqueness metric.
    pub fn uniqueness(&self) -> &SpanningMetric {
        &self.uniqueness
    }

    /// All spanning metrics.
    pub fn span_metrics(&self) -> &[SpanningMetric] {
        &self.span_metrics
    }

    /// Resolves an evaluation request to the metric it targets.
    ///
    /// The name `uniqueness` always selects the uniqueness metric; without a
    /// column the name selects a spanning metric; otherwise the metric is
    /// looked up under the column.
    pub fn target_mut(&mut self, column: Option<&str>, metric_name: &str) -> Result<MetricTarget<'_>> {
        if metric_name == UNIQUENESS_METRIC {
            return Ok(MetricTarget::Spanning(&mut self.uniqueness));
        }

        match column {
            None => self
                .span_metrics
                .iter_mut()
                .find(|m| m.name() == metric_name)
                .map(MetricTarget::Spanning)
                .ok_or_else(|| TermError::metric_not_found(metric_name, None)),
            Some(column) => self
                .metrics_columns
                .get_mut(column)
                .and_then(|metrics| metrics.get_mut(metric_name))
                .map(MetricTarget::Column)
                .ok_or_else(|| TermError::metric_not_found(metric_name, Some(column))),
        }
    }
}

/// Exclusive handle on the metric one evaluation pass updates.
#[derive(Debug)]
pub enum MetricTarget<'a> {
    /// A metric bound to one column.
    Column(&'a mut Metric),
    /// A metric spanning several columns.
    Spanning(&'a mut SpanningMetric),
}

impl MetricTarget<'_> {
    /// Shared read access regardless of kind.
    pub fn rule(&self) -> &dyn QualityRule {
        match self {
            MetricTarget::Column(metric) => &**metric,
            MetricTarget::Spanning(metric) => &**metric,
        }
    }
}

impl<'a> From<&'a mut Metric> for MetricTarget<'a> {
    fn from(metric: &'a mut Metric) -> Self {
        MetricTarget::Column(metric)
    }
}

impl<'a> From<&'a mut SpanningMetric> for MetricTarget<'a> {
    fn from(metric: &'a mut SpanningMetric) -> Self {
        MetricTarget::Spanning(metric)
    }
}
