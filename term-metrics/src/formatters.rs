//! Reports of evaluated metrics and their output formats.
//!
//! A [`MetricReport`] is a snapshot of one metric after a pass: its quality
//! measure, the dirty rows and the checks that produced them. Formatters turn
//! a list of reports into JSON for tools or into text for a console.
//!
//! # Examples
//!
//! ```rust
//! use term_metrics::core::Metric;
//! use term_metrics::formatters::{HumanFormatter, MetricReport, ReportFormatter};
//!
//! let report = MetricReport::from_metric(&Metric::new("completeness", "email"));
//! let output = HumanFormatter::new().format(&[report]).unwrap();
//! assert!(output.contains("completeness"));
//! ```

use crate::core::{Metric, MetricTarget, MetricsOverlayModel, QualityRule, SpanningMetric};
use crate::engine::PassStats;
use crate::error::{Result, TermError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

/// Kind of metric a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Column,
    Spanning,
}

/// One check as shown in a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Snapshot of one metric after evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReport {
    pub name: String,
    pub kind: MetricKind,
    /// The bound column, or the spanning columns
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// `None` until the metric has been evaluated
    pub measure: Option<f64>,
    pub dirty_row_count: usize,
    /// Dirty row indices in increasing order
    pub dirty_rows: Vec<usize>,
    pub checks: Vec<CheckReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<PassStats>,
    pub timestamp: DateTime<Utc>,
}

impl MetricReport {
    fn from_rule(rule: &dyn QualityRule, kind: MetricKind, columns: Vec<String>) -> Self {
        Self {
            name: rule.name().to_string(),
            kind,
            columns,
            description: None,
            function: None,
            measure: rule.measure(),
            dirty_row_count: rule.dirty_index().len(),
            dirty_rows: rule.dirty_index().keys().copied().collect(),
            checks: rule
                .eval_tuples()
                .iter()
                .map(|tuple| CheckReport {
                    expression: tuple.expression().source().to_string(),
                    column: tuple.target_column().map(str::to_string),
                    disabled: tuple.is_disabled(),
                    comment: tuple.comment().map(str::to_string),
                })
                .collect(),
            stats: None,
            timestamp: Utc::now(),
        }
    }

    /// Reports a column metric.
    pub fn from_metric(metric: &Metric) -> Self {
        let columns = metric.column_name().map(str::to_string).into_iter().collect();
        let mut report = Self::from_rule(metric, MetricKind::Column, columns);
        report.description = metric.description().map(str::to_string);
        report
    }

    /// Reports a spanning metric.
    pub fn from_spanning(metric: &SpanningMetric) -> Self {
        let mut report =
            Self::from_rule(metric, MetricKind::Spanning, metric.spanning_columns().to_vec());
        report.description = metric.description().map(str::to_string);
        report.function = metric.spanning_evaluable().map(|s| s.function.clone());
        report
    }

    /// Reports whichever metric `target` refers to.
    pub fn from_target(target: &MetricTarget<'_>) -> Self {
        match target {
            MetricTarget::Column(metric) => Self::from_metric(metric),
            MetricTarget::Spanning(metric) => Self::from_spanning(metric),
        }
    }

    /// Reports every metric of a model: column metrics by column, then the
    /// uniqueness metric, then the spanning metrics.
    pub fn for_model(model: &MetricsOverlayModel) -> Vec<Self> {
        let mut reports: Vec<Self> = model
            .metric_columns()
            .filter_map(|column| model.metrics_column(column))
            .flat_map(|metrics| metrics.values().map(Self::from_metric))
            .collect();
        reports.push(Self::from_spanning(model.uniqueness()));
        reports.extend(model.span_metrics().iter().map(Self::from_spanning));
        reports
    }

    /// Attaches the counters of the pass that produced the report.
    pub fn with_stats(mut self, stats: PassStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Returns true if the metric was evaluated and no row is dirty.
    pub fn is_clean(&self) -> bool {
        self.measure.is_some() && self.dirty_row_count == 0
    }
}

/// Configuration options for formatting reports.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the checks of each metric
    pub include_checks: bool,
    /// Include dirty row indices
    pub include_dirty_rows: bool,
    /// Maximum number of dirty rows listed per metric (`None` for all)
    pub max_dirty_rows: Option<usize>,
    /// Whether to use colorized output (for the human formatter)
    pub use_colors: bool,
    /// Whether to include timestamps (for the human formatter)
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_checks: true,
            include_dirty_rows: true,
            max_dirty_rows: None,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Only names and measures.
    pub fn minimal() -> Self {
        Self {
            include_checks: false,
            include_dirty_rows: false,
            max_dirty_rows: Some(0),
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Suitable for CI logs.
    pub fn ci() -> Self {
        Self {
            include_checks: true,
            include_dirty_rows: true,
            max_dirty_rows: Some(50),
            use_colors: false,
            include_timestamps: true,
        }
    }

    /// Sets whether checks are included.
    pub fn with_checks(mut self, include: bool) -> Self {
        self.include_checks = include;
        self
    }

    /// Sets the maximum number of dirty rows listed per metric.
    pub fn with_max_dirty_rows(mut self, max: usize) -> Self {
        self.max_dirty_rows = Some(max);
        self
    }

    /// Sets whether to use colorized output.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn limit_dirty_rows(&self, rows: &[usize]) -> Vec<usize> {
        if !self.include_dirty_rows {
            return Vec::new();
        }
        match self.max_dirty_rows {
            Some(max) => rows.iter().copied().take(max).collect(),
            None => rows.to_vec(),
        }
    }
}

/// Turns metric reports into text.
pub trait ReportFormatter {
    /// Formats reports with the formatter's own configuration.
    fn format(&self, reports: &[MetricReport]) -> Result<String>;

    /// Formats reports with a custom configuration.
    fn format_with_config(&self, reports: &[MetricReport], _config: &FormatterConfig) -> Result<String> {
        self.format(reports)
    }
}

/// Formats reports as JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a pretty-printing JSON formatter.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    /// Creates a JSON formatter with the given configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to pretty-print.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, reports: &[MetricReport]) -> Result<String> {
        self.format_with_config(reports, &self.config)
    }

    fn format_with_config(&self, reports: &[MetricReport], config: &FormatterConfig) -> Result<String> {
        let filtered: Vec<MetricReport> = reports
            .iter()
            .map(|report| {
                let mut report = report.clone();
                report.dirty_rows = config.limit_dirty_rows(&report.dirty_rows);
                if !config.include_checks {
                    report.checks.clear();
                }
                report
            })
            .collect();

        let output = if self.pretty {
            serde_json::to_string_pretty(&filtered)
        } else {
            serde_json::to_string(&filtered)
        };
        output.map_err(|e| TermError::Internal(format!("Failed to serialize reports to JSON: {e}")))
    }
}

/// Formats reports for a console.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    /// Creates a human formatter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    /// Creates a human formatter with the given configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn paint(text: &str, color: &str, config: &FormatterConfig) -> String {
    if config.use_colors {
        format!("\x1b[{color}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, reports: &[MetricReport]) -> Result<String> {
        self.format_with_config(reports, &self.config)
    }

    fn format_with_config(&self, reports: &[MetricReport], config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let evaluated = reports.iter().filter(|r| r.measure.is_some()).count();
        let clean = reports.iter().filter(|r| r.is_clean()).count();

        writeln!(output, "📊 Metrics: {} ({evaluated} evaluated, {clean} clean)", reports.len())?;

        for report in reports {
            writeln!(output)?;
            let target = if report.columns.is_empty() {
                "row".to_string()
            } else {
                report.columns.join(", ")
            };
            writeln!(output, "{} [{target}]", report.name)?;
            if let Some(description) = &report.description {
                writeln!(output, "   {description}")?;
            }
            if let Some(function) = &report.function {
                writeln!(output, "   Function: {function}")?;
            }

            match report.measure {
                Some(measure) if report.dirty_row_count == 0 => {
                    let line = format!("✅ Quality: {:.2}%", measure * 100.0);
                    writeln!(output, "   {}", paint(&line, "32", config))?;
                }
                Some(measure) => {
                    let line = format!(
                        "❌ Quality: {:.2}% ({} dirty rows)",
                        measure * 100.0,
                        report.dirty_row_count
                    );
                    writeln!(output, "   {}", paint(&line, "31", config))?;
                }
                None => writeln!(output, "   {}", paint("⏭️  Not evaluated", "33", config))?,
            }

            let rows = config.limit_dirty_rows(&report.dirty_rows);
            if !rows.is_empty() {
                let listed = rows.iter().map(usize::to_string).collect::<Vec<_>>().join(", ");
                let more = report.dirty_rows.len() - rows.len();
                if more > 0 {
                    writeln!(output, "   Dirty rows: {listed} ... and {more} more")?;
                } else {
                    writeln!(output, "   Dirty rows: {listed}")?;
                }
            }

            if config.include_checks {
                for check in &report.checks {
                    let state = if check.disabled { " (disabled)" } else { "" };
                    match &check.column {
                        Some(column) => writeln!(output, "   • {} on {column}{state}", check.expression)?,
                        None => writeln!(output, "   • {}{state}", check.expression)?,
                    }
                    if let Some(comment) = &check.comment {
                        writeln!(output, "     {comment}")?;
                    }
                }
            }

            if config.include_timestamps {
                writeln!(output, "   Timestamp: {}", report.timestamp.to_rfc3339())?;
            }
        }

        Ok(output)
    }
}
