//! Prelude for commonly used types and traits in term-metrics.

pub use crate::config::{EvaluationConfig, RulesConfig};
pub use crate::core::{QualityRule, UNIQUENESS_METRIC};
pub use crate::engine::{RowVisitor, VisitControl};
pub use crate::error::{ErrorContext, Result, TermError};
pub use crate::filters::RowFilter;
pub use crate::formatters::{FormatterConfig, ReportFormatter};
pub use crate::functions::SpanningColumnFunction;
pub use crate::logging::LogConfig;
pub use crate::sources::ProjectSource;
