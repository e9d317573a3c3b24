//! Error types for the term-metrics library.
//!
//! Crate-level failures (bad configuration, unknown functions, missing metrics,
//! data loading problems) are represented by [`TermError`]. Failures that happen
//! while evaluating an expression against a single row are *not* errors at this
//! level: they are carried as [`Value::Error`](crate::core::Value::Error) so a
//! pass over the dataset is never aborted by one bad row.

use thiserror::Error;

/// The main error type for the term-metrics library.
#[derive(Error, Debug)]
pub enum TermError {
    /// A rule or function configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An expression could not be compiled.
    #[error("Failed to parse expression '{expression}': {message}")]
    Parse {
        /// The expression text that failed to compile
        expression: String,
        /// Detailed error message
        message: String,
    },

    /// No spanning-column function is registered under the given name.
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    /// The addressed metric does not exist in the overlay model.
    #[error("Metric '{metric}' not found{}", .column.as_ref().map(|c| format!(" for column '{c}'")).unwrap_or_default())]
    MetricNotFound {
        /// Name of the metric that was requested
        metric: String,
        /// Column the metric was looked up under, if any
        column: Option<String>,
    },

    /// A required column is not part of the project's column model.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Error from data source operations.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "DataFusion")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, TermError>`.
pub type Result<T> = std::result::Result<T, TermError>;

impl TermError {
    /// Creates a new expression parse error.
    pub fn parse(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Creates a new metric-not-found error.
    pub fn metric_not_found(metric: impl Into<String>, column: Option<&str>) -> Self {
        Self::MetricNotFound {
            metric: metric.into(),
            column: column.map(str::to_string),
        }
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }
}

impl From<serde_json::Error> for TermError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::fmt::Error> for TermError {
    fn from(err: std::fmt::Error) -> Self {
        Self::Internal(format!("Failed to write formatted output: {err}"))
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<TermError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            TermError::Internal(inner) => TermError::Internal(format!("{msg}: {inner}")),
            other => TermError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                TermError::Internal(inner) => TermError::Internal(format!("{msg}: {inner}")),
                other => TermError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
