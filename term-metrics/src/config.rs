//! Evaluation settings and declarative rule definitions.
//!
//! [`RulesConfig`] is the serialized form of a project's metrics. It is read
//! from JSON and compiled into a [`MetricsOverlayModel`] with an
//! [`ExpressionCompiler`] for the checks and the function registry for
//! spanning functions:
//!
//! ```json
//! {
//!   "metrics": [
//!     {
//!       "name": "completeness",
//!       "column": "email",
//!       "evalTuples": [{ "expression": "isNonBlank(value)" }]
//!     }
//!   ],
//!   "spanningMetrics": [
//!     {
//!       "name": "interval",
//!       "columns": ["start", "end"],
//!       "function": { "name": "dateInterval", "params": ["gteq", "1", "days"] }
//!     }
//!   ]
//! }
//! ```

use crate::core::{
    Concat, EvalTuple, Expression, ExpressionCompiler, Metric, MetricsOverlayModel, Project,
    SpanningMetric, Value, UNIQUENESS_METRIC,
};
use crate::error::{ErrorContext, Result, TermError};
use crate::filters::MetricsRowFilter;
use crate::functions::FunctionCallCompiler;
use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Settings of an evaluation pass.
#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    /// Logging behavior of the pass
    pub log: LogConfig,
    /// Turn panics raised by checks into error results instead of unwinding
    pub catch_panics: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            catch_panics: true,
        }
    }
}

impl EvaluationConfig {
    /// Logs every row's results.
    pub fn verbose() -> Self {
        Self {
            log: LogConfig::verbose(),
            ..Self::default()
        }
    }

    /// Minimal logging.
    pub fn production() -> Self {
        Self {
            log: LogConfig::production(),
            ..Self::default()
        }
    }

    /// Sets the logging behavior.
    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Sets whether panicking checks are caught.
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }
}

/// One check of a metric definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalTupleDefinition {
    /// Expression source handed to the compiler
    pub expression: String,
    /// Column the check evaluates against; defaults to the metric's column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl EvalTupleDefinition {
    fn compile(&self, compiler: &dyn ExpressionCompiler) -> Result<EvalTuple> {
        let mut tuple = EvalTuple::new(Expression::compile(&self.expression, compiler)?)
            .with_disabled(self.disabled);
        if let Some(column) = &self.column {
            tuple = tuple.with_column(column);
        }
        if let Some(comment) = &self.comment {
            tuple = tuple.with_comment(comment);
        }
        Ok(tuple)
    }
}

/// A metric bound to one column, or to no column when `column` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub concat: Concat,
    #[serde(default)]
    pub eval_tuples: Vec<EvalTupleDefinition>,
}

impl MetricDefinition {
    fn compile(&self, compiler: &dyn ExpressionCompiler) -> Result<Metric> {
        let mut metric = match &self.column {
            Some(column) => Metric::new(&self.name, column),
            None => Metric::row_level(&self.name),
        }
        .with_concat(self.concat);
        if let Some(description) = &self.description {
            metric = metric.with_description(description);
        }
        for tuple in &self.eval_tuples {
            let tuple = tuple
                .compile(compiler)
                .with_context(|| format!("compiling check of metric '{}'", self.name))?;
            metric.push_tuple(tuple);
        }
        Ok(metric)
    }
}

/// A registered function applied to the spanning columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Registered function name
    pub name: String,
    /// Parameters after the column names; the function's defaults when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
}

/// A metric over several columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanningMetricDefinition {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionDefinition>,
    #[serde(default)]
    pub concat: Concat,
    #[serde(default)]
    pub eval_tuples: Vec<EvalTupleDefinition>,
}

impl SpanningMetricDefinition {
    fn compile(
        &self,
        compiler: &dyn ExpressionCompiler,
        functions: &FunctionCallCompiler,
    ) -> Result<SpanningMetric> {
        let mut metric = SpanningMetric::new(&self.name, self.columns.clone()).with_concat(self.concat);
        if let Some(description) = &self.description {
            metric = metric.with_description(description);
        }
        if let Some(definition) = &self.function {
            let function = functions.function(&definition.name)?;
            let evaluable = function
                .evaluable(&self.columns, definition.params.as_deref(), functions)
                .with_context(|| format!("compiling function of metric '{}'", self.name))?;
            metric = metric.with_spanning_evaluable(evaluable);
        }
        for tuple in &self.eval_tuples {
            let tuple = tuple
                .compile(compiler)
                .with_context(|| format!("compiling check of metric '{}'", self.name))?;
            metric = metric.with_tuple(tuple);
        }
        Ok(metric)
    }
}

/// Serialized metrics of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesConfig {
    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniqueness: Option<SpanningMetricDefinition>,
    #[serde(default)]
    pub spanning_metrics: Vec<SpanningMetricDefinition>,
}

impl RulesConfig {
    /// Parses a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config =
            Self::from_json(&json).with_context(|| format!("loading rules from {}", path.display()))?;
        info!(
            path = %path.display(),
            metrics = config.metrics.len(),
            spanning_metrics = config.spanning_metrics.len(),
            "Loaded rules"
        );
        Ok(config)
    }

    /// Checks names before anything is compiled.
    pub fn validate(&self) -> Result<()> {
        let all_names = self
            .metrics
            .iter()
            .map(|m| &m.name)
            .chain(self.spanning_metrics.iter().map(|m| &m.name));
        for name in all_names {
            if name.trim().is_empty() {
                return Err(TermError::Configuration("Metric name cannot be empty".to_string()));
            }
        }

        for (i, metric) in self.metrics.iter().enumerate() {
            if self.metrics[..i]
                .iter()
                .any(|m| m.name == metric.name && m.column == metric.column)
            {
                return Err(TermError::Configuration(format!(
                    "Duplicate metric '{}' on column '{}'",
                    metric.name,
                    metric.column.as_deref().unwrap_or_default()
                )));
            }
        }

        for (i, metric) in self.spanning_metrics.iter().enumerate() {
            if metric.name == UNIQUENESS_METRIC {
                return Err(TermError::Configuration(format!(
                    "'{UNIQUENESS_METRIC}' is reserved; configure it under \"uniqueness\""
                )));
            }
            if self.spanning_metrics[..i].iter().any(|m| m.name == metric.name) {
                return Err(TermError::Configuration(format!(
                    "Duplicate spanning metric '{}'",
                    metric.name
                )));
            }
            if metric.columns.is_empty() {
                return Err(TermError::Configuration(format!(
                    "Spanning metric '{}' needs at least one column",
                    metric.name
                )));
            }
        }
        Ok(())
    }

    /// Compiles the definitions, resolving spanning functions through the
    /// process-wide registry.
    pub fn to_overlay_model(&self, compiler: &dyn ExpressionCompiler) -> Result<MetricsOverlayModel> {
        self.compile(compiler, &FunctionCallCompiler::new())
    }

    /// Compiles the definitions with an explicit function compiler.
    pub fn compile(
        &self,
        compiler: &dyn ExpressionCompiler,
        functions: &FunctionCallCompiler,
    ) -> Result<MetricsOverlayModel> {
        self.validate()?;

        let mut model = match &self.uniqueness {
            Some(definition) => {
                let mut definition = definition.clone();
                definition.name = UNIQUENESS_METRIC.to_string();
                MetricsOverlayModel::new(definition.compile(compiler, functions)?)
            }
            None => MetricsOverlayModel::default(),
        };
        for metric in &self.metrics {
            model.add_metric(metric.compile(compiler)?);
        }
        for metric in &self.spanning_metrics {
            model.add_spanning_metric(metric.compile(compiler, functions)?);
        }

        debug!(
            metrics = self.metrics.len(),
            spanning_metrics = self.spanning_metrics.len(),
            "Compiled overlay model"
        );
        Ok(model)
    }
}

/// Serialized form of a [`MetricsRowFilter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFilterDefinition {
    pub expression: String,
    /// Column the expression is based on; none for row-level expressions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default)]
    pub matches: Vec<Value>,
    #[serde(default)]
    pub select_blank: bool,
    #[serde(default)]
    pub select_error: bool,
    #[serde(default)]
    pub invert: bool,
}

impl RowFilterDefinition {
    /// Compiles the filter for a project, resolving the column's cell index.
    pub fn build(&self, project: &Project, compiler: &dyn ExpressionCompiler) -> Result<MetricsRowFilter> {
        let expression = Expression::compile(&self.expression, compiler)?;
        let mut filter = MetricsRowFilter::new(expression)
            .with_matches(self.matches.clone())
            .with_select_blank(self.select_blank)
            .with_select_error(self.select_error)
            .with_invert(self.invert);
        if let Some(column) = &self.column {
            filter = filter.with_column(column, Some(project.require_cell_index(column)?));
        }
        Ok(filter)
    }
}
