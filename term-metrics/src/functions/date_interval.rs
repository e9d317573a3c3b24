//! The `dateInterval` spanning-column function.
//!
//! `dateInterval(start, end, [comparison, threshold, unit])` compares the time
//! between two date-time columns of the same row against a threshold.
//!
//! - Both cells must hold date-times; otherwise the result is `false`.
//! - Without a comparison the interval must not be positive (`end <= start`).
//! - With a comparison only, the interval in seconds is compared against `0`.
//! - With a threshold and unit, the interval is converted to that unit by
//!   truncating division (minutes, hours, days, then weeks/months/years as
//!   7/30/365 days) before comparing.
//!
//! Comparison and unit are validated per call; unknown values produce an
//! error value rather than a failure.

use super::SpanningColumnFunction;
use crate::core::{Bindings, EvalError, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registered name of [`DateInterval`].
pub const DATE_INTERVAL: &str = "dateInterval";

const DEFAULT_PARAMS: [&str; 3] = ["lteq", "0", "seconds"];

/// Comparison between an interval and a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// interval >= threshold
    Gteq,
    /// interval <= threshold
    Lteq,
    /// interval > threshold
    Gt,
    /// interval < threshold
    Lt,
    /// interval == threshold
    Eq,
}

impl Comparison {
    /// Parses a comparison keyword.
    pub fn parse(keyword: &str) -> Result<Self, EvalError> {
        match keyword {
            "gteq" => Ok(Self::Gteq),
            "lteq" => Ok(Self::Lteq),
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "eq" => Ok(Self::Eq),
            other => Err(EvalError::new(format!("Unknown comparison {other}"))),
        }
    }

    /// Applies the comparison.
    pub fn holds(self, delta: i64, threshold: i64) -> bool {
        match self {
            Self::Gteq => delta >= threshold,
            Self::Lteq => delta <= threshold,
            Self::Gt => delta > threshold,
            Self::Lt => delta < threshold,
            Self::Eq => delta == threshold,
        }
    }
}

/// Unit an interval is expressed in before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    /// Parses a unit keyword.
    pub fn parse(keyword: &str) -> Result<Self, EvalError> {
        match keyword {
            "seconds" => Ok(Self::Seconds),
            "minutes" => Ok(Self::Minutes),
            "hours" => Ok(Self::Hours),
            "days" => Ok(Self::Days),
            "weeks" => Ok(Self::Weeks),
            "months" => Ok(Self::Months),
            "years" => Ok(Self::Years),
            other => Err(EvalError::new(format!("Unknown time unit {other}"))),
        }
    }

    /// Converts a number of seconds into this unit.
    pub fn convert(self, seconds: i64) -> i64 {
        let minutes = seconds / 60;
        let hours = minutes / 60;
        let days = hours / 24;
        match self {
            Self::Seconds => seconds,
            Self::Minutes => minutes,
            Self::Hours => hours,
            Self::Days => days,
            Self::Weeks => days / 7,
            Self::Months => days / 30,
            Self::Years => days / 365,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
            Self::Years => "years",
        };
        f.write_str(keyword)
    }
}

/// Compares the interval between two date-time columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateInterval;

impl DateInterval {
    fn date_time(bindings: &Bindings, column: &Value) -> Option<DateTime<Utc>> {
        let value = bindings.cell_value(column.as_str()?)?;
        if !value.is_non_blank_data() {
            return None;
        }
        value.as_date_time().copied()
    }

    fn threshold(arg: &Value) -> Result<i64, EvalError> {
        arg.as_i64()
            .or_else(|| arg.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| EvalError::new(format!("Invalid threshold {arg}")))
    }

    fn keyword<'a>(arg: &'a Value, kind: &str) -> Result<&'a str, EvalError> {
        arg.as_str()
            .ok_or_else(|| EvalError::new(format!("Unknown {kind} {arg}")))
    }

    fn compare(args: &[Value], delta: i64) -> Result<bool, EvalError> {
        let Some(comparison) = args.get(2) else {
            return Ok(delta <= 0);
        };
        let comparison = Comparison::parse(Self::keyword(comparison, "comparison")?)?;

        let Some(threshold) = args.get(3) else {
            return Ok(comparison.holds(delta, 0));
        };
        let threshold = Self::threshold(threshold)?;
        let unit = match args.get(4) {
            Some(unit) => TimeUnit::parse(Self::keyword(unit, "time unit")?)?,
            None => TimeUnit::Seconds,
        };

        Ok(comparison.holds(unit.convert(delta), threshold))
    }
}

impl SpanningColumnFunction for DateInterval {
    fn name(&self) -> &str {
        DATE_INTERVAL
    }

    fn description(&self) -> &str {
        "Determine if an interval is negative"
    }

    fn params(&self) -> &str {
        "start column, end column, [gteq (greater than or equal) | eq (equal) | lteq (less than or equal) | gt (greater than) | lt (lesser than)] (optional), number value (optional), string timeunit (optional)"
    }

    fn default_params(&self) -> Vec<String> {
        DEFAULT_PARAMS.iter().map(|p| (*p).to_string()).collect()
    }

    fn call(&self, bindings: &Bindings, args: &[Value]) -> Value {
        if args.len() < 2 {
            return Value::Bool(false);
        }
        let (Some(start), Some(end)) = (
            Self::date_time(bindings, &args[0]),
            Self::date_time(bindings, &args[1]),
        ) else {
            return Value::Bool(false);
        };

        let delta = (end - start).num_seconds();
        match Self::compare(args, delta) {
            Ok(result) => Value::Bool(result),
            Err(err) => Value::Error(err),
        }
    }
}
