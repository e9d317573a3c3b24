//! Loading projects from DataFusion.
//!
//! Metrics evaluate against an in-memory [`Project`]. A [`ProjectSource`]
//! produces one; [`DataFusionSource`] runs a table scan or SQL query on a
//! [`SessionContext`] and converts the resulting Arrow record batches into rows.
//!
//! Arrow types map to cell values as follows:
//!
//! | Arrow | Value |
//! |-------|-------|
//! | null entry | missing cell |
//! | Boolean | `Bool` |
//! | Int8 … Int64, UInt8 … UInt32 | `Int` |
//! | UInt64 | `Int`, or `Float` above `i64::MAX` |
//! | Float32, Float64 | `Float` |
//! | Utf8, LargeUtf8, Utf8View | `String` |
//! | Timestamp (any unit), Date32, Date64 | `DateTime` (UTC) |
//! | anything else | `String` via Arrow's display formatting |

use crate::core::{ColumnModel, Project, Row, Value};
use crate::error::{Result, TermError};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use datafusion::prelude::SessionContext;
use std::fmt::Debug;
use tracing::{debug, info};

/// Something a [`Project`] can be loaded from.
///
/// # Examples
///
/// ```rust,no_run
/// use datafusion::prelude::*;
/// use term_metrics::sources::{DataFusionSource, ProjectSource};
///
/// # async fn example() -> term_metrics::error::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("orders", "data/orders.csv", CsvReadOptions::new()).await?;
///
/// let project = DataFusionSource::table("orders").load(&ctx).await?;
/// println!("{} rows", project.row_count());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ProjectSource: Debug + Send + Sync {
    /// Loads the project from the given session context.
    async fn load(&self, ctx: &SessionContext) -> Result<Project>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Query {
    Table(String),
    Sql(String),
}

/// Loads a registered table or the result of a SQL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFusionSource {
    project_name: String,
    query: Query,
}

impl DataFusionSource {
    /// Loads a registered table; the project is named after the table.
    pub fn table(table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        Self {
            project_name: table_name.clone(),
            query: Query::Table(table_name),
        }
    }

    /// Loads the result of a SQL query.
    pub fn sql(project_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            query: Query::Sql(query.into()),
        }
    }

    /// Renames the loaded project.
    pub fn with_project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = project_name.into();
        self
    }
}

#[async_trait]
impl ProjectSource for DataFusionSource {
    async fn load(&self, ctx: &SessionContext) -> Result<Project> {
        debug!(source = %self.description(), "Loading project");

        let df = match &self.query {
            Query::Table(table) => ctx.table(table.as_str()).await.map_err(|e| {
                TermError::data_source_with_source(
                    "DataFusion",
                    format!("Failed to open table '{table}'"),
                    Box::new(e),
                )
            })?,
            Query::Sql(sql) => ctx.sql(sql).await.map_err(|e| {
                TermError::data_source_with_source(
                    "DataFusion",
                    "Failed to plan query",
                    Box::new(e),
                )
            })?,
        };

        let columns = ColumnModel::new(df.schema().fields().iter().map(|f| f.name().clone()));
        let batches = df.collect().await?;
        let project = project_from_batches(&self.project_name, columns, &batches)?;

        info!(
            project = %project.name(),
            rows = project.row_count(),
            columns = project.columns().len(),
            "Loaded project"
        );
        Ok(project)
    }

    fn description(&self) -> String {
        match &self.query {
            Query::Table(table) => format!("DataFusion table '{table}'"),
            Query::Sql(sql) => format!("DataFusion query '{sql}'"),
        }
    }
}

/// Builds a project from record batches whose columns follow `columns`.
pub fn project_from_batches(
    name: &str,
    columns: ColumnModel,
    batches: &[RecordBatch],
) -> Result<Project> {
    let mut project = Project::new(name, columns);
    for batch in batches {
        if batch.num_columns() != project.columns().len() {
            return Err(TermError::data_source(
                "DataFusion",
                format!(
                    "Batch has {} columns, expected {}",
                    batch.num_columns(),
                    project.columns().len()
                ),
            ));
        }
        for row in 0..batch.num_rows() {
            let values = batch
                .columns()
                .iter()
                .map(|array| cell_value(array, row))
                .collect::<Result<Vec<_>>>()?;
            project.push_row(Row::new(values));
        }
    }
    Ok(project)
}

fn date_time(value: Option<DateTime<Utc>>, raw: i64) -> Result<Value> {
    value
        .map(Value::DateTime)
        .ok_or_else(|| TermError::data_source("DataFusion", format!("Timestamp {raw} is out of range")))
}

/// Converts one entry of an Arrow array into a cell value.
pub fn cell_value(array: &ArrayRef, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
        DataType::Int8 => Value::Int(array.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => Value::Int(array.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => Value::Int(array.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => Value::Int(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::Int(array.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => Value::Int(array.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => Value::Int(array.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => {
            let v = array.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v).map_or(Value::Float(v as f64), Value::Int)
        }
        DataType::Float32 => Value::Float(array.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => Value::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),
        DataType::Utf8View => Value::String(array.as_string_view().value(row).to_string()),
        DataType::Timestamp(TimeUnit::Second, _) => {
            let v = array.as_primitive::<TimestampSecondType>().value(row);
            return date_time(DateTime::from_timestamp(v, 0), v);
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            let v = array.as_primitive::<TimestampMillisecondType>().value(row);
            return date_time(DateTime::from_timestamp_millis(v), v);
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            let v = array.as_primitive::<TimestampMicrosecondType>().value(row);
            return date_time(DateTime::from_timestamp_micros(v), v);
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            let v = array.as_primitive::<TimestampNanosecondType>().value(row);
            Value::DateTime(DateTime::from_timestamp_nanos(v))
        }
        DataType::Date32 => {
            let days = i64::from(array.as_primitive::<Date32Type>().value(row));
            return date_time(DateTime::from_timestamp(days * 86_400, 0), days);
        }
        DataType::Date64 => {
            let v = array.as_primitive::<Date64Type>().value(row);
            return date_time(DateTime::from_timestamp_millis(v), v);
        }
        _ => Value::String(array_value_to_string(array.as_ref(), row)?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{
        BooleanArray, Date32Array, Float64Array, Int32Array, StringArray, TimestampSecondArray,
        UInt64Array,
    };
    use arrow::datatypes::{Field, Schema};
    use chrono::TimeZone;
    use std::sync::Arc;

    #[test]
    fn test_cell_values() {
        let ints: ArrayRef = Arc::new(Int32Array::from(vec![Some(7), None]));
        assert_eq!(cell_value(&ints, 0).unwrap(), Value::Int(7));
        assert_eq!(cell_value(&ints, 1).unwrap(), Value::Null);

        let big: ArrayRef = Arc::new(UInt64Array::from(vec![u64::MAX, 1]));
        assert!(matches!(cell_value(&big, 0).unwrap(), Value::Float(_)));
        assert_eq!(cell_value(&big, 1).unwrap(), Value::Int(1));

        let floats: ArrayRef = Arc::new(Float64Array::from(vec![1.5]));
        assert_eq!(cell_value(&floats, 0).unwrap(), Value::Float(1.5));

        let bools: ArrayRef = Arc::new(BooleanArray::from(vec![true]));
        assert_eq!(cell_value(&bools, 0).unwrap(), Value::Bool(true));

        let strings: ArrayRef = Arc::new(StringArray::from(vec!["a"]));
        assert_eq!(cell_value(&strings, 0).unwrap(), Value::from("a"));
    }

    #[test]
    fn test_temporal_values() {
        let ts: ArrayRef = Arc::new(TimestampSecondArray::from(vec![86_400]));
        assert_eq!(
            cell_value(&ts, 0).unwrap(),
            Value::DateTime(Utc.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap())
        );

        let dates: ArrayRef = Arc::new(Date32Array::from(vec![18_262]));
        assert_eq!(
            cell_value(&dates, 0).unwrap(),
            Value::DateTime(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_project_from_batches() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![1, 2])),
                Arc::new(StringArray::from(vec![Some("ann"), None])),
            ],
        )
        .unwrap();

        let project =
            project_from_batches("people", ColumnModel::new(["id", "name"]), &[batch.clone()]).unwrap();
        assert_eq!(project.row_count(), 2);
        assert_eq!(project.rows()[0].cell_value(1), Value::from("ann"));
        assert!(project.rows()[1].cell(1).is_none());

        let err = project_from_batches("people", ColumnModel::new(["id"]), &[batch]).unwrap_err();
        assert!(matches!(err, TermError::DataSource { .. }));
    }
}
