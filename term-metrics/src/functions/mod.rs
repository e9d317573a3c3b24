//! Pluggable spanning-column functions.
//!
//! A spanning-column function is a named, boolean-valued function whose
//! arguments are column names of the current row followed by free-form string
//! parameters. Functions describe themselves (description, parameter help,
//! default parameters) so rule editors can offer them, and know how to build the
//! invocation expression that a [`SpanningMetric`](crate::core::SpanningMetric)
//! evaluates once per row.
//!
//! Functions live in a process-wide [`FunctionRegistry`]. The built-in
//! [`DateInterval`] is registered on first access; new functions are added with
//! [`FunctionRegistry::register`] and need no change to the engine.
//!
//! # Examples
//!
//! ```rust
//! use term_metrics::functions::{FunctionRegistry, DATE_INTERVAL};
//!
//! let function = FunctionRegistry::global().require(DATE_INTERVAL).unwrap();
//! assert_eq!(
//!     function.expression(&["start".to_string(), "end".to_string()], None),
//!     r#"dateInterval("start", "end", "lteq", "0", "seconds")"#
//! );
//! ```

mod compiler;
mod date_interval;

pub use compiler::{FunctionCall, FunctionCallCompiler};
pub use date_interval::{Comparison, DateInterval, TimeUnit, DATE_INTERVAL};

use crate::core::{Bindings, Expression, ExpressionCompiler, SpanningEvaluable, Value};
use crate::error::{Result, TermError};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Self-description of a function, as shown to rule authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescriptor {
    /// What the function checks
    pub description: String,
    /// Human-readable parameter help
    pub params: String,
    /// Result type
    pub returns: String,
    /// Parameters used when none are configured
    pub default_params: Vec<String>,
}

/// A boolean-valued function over several columns of a row.
pub trait SpanningColumnFunction: Debug + Send + Sync {
    /// Name the function is registered and invoked under.
    fn name(&self) -> &str;

    /// What the function checks.
    fn description(&self) -> &str;

    /// Human-readable parameter help.
    fn params(&self) -> &str;

    /// Result type name.
    fn returns(&self) -> &str {
        "boolean"
    }

    /// Parameters used when a rule configures none.
    fn default_params(&self) -> Vec<String>;

    /// Evaluates the function. `args` are the column names followed by the
    /// parameters. Invalid parameters yield [`Value::Error`].
    fn call(&self, bindings: &Bindings, args: &[Value]) -> Value;

    /// Builds the invocation text for the given columns and parameters,
    /// quoting every argument.
    fn expression(&self, columns: &[String], params: Option<&[String]>) -> String {
        let defaults;
        let params = match params {
            Some(params) => params,
            None => {
                defaults = self.default_params();
                defaults.as_slice()
            }
        };
        let args = columns
            .iter()
            .chain(params)
            .map(|arg| quote(arg))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({args})", self.name())
    }

    /// Compiles the invocation for the given columns and parameters.
    fn evaluable(
        &self,
        columns: &[String],
        params: Option<&[String]>,
        compiler: &dyn ExpressionCompiler,
    ) -> Result<SpanningEvaluable> {
        let params = params.map_or_else(|| self.default_params(), <[String]>::to_vec);
        let source = self.expression(columns, Some(params.as_slice()));
        debug!(function = self.name(), expression = %source, "Compiling spanning evaluable");
        Ok(SpanningEvaluable {
            function: self.name().to_string(),
            params,
            expression: Expression::compile(source, compiler)?,
        })
    }

    /// The function's self-description.
    fn descriptor(&self) -> FunctionDescriptor {
        FunctionDescriptor {
            description: self.description().to_string(),
            params: self.params().to_string(),
            returns: self.returns().to_string(),
            default_params: self.default_params(),
        }
    }
}

fn quote(arg: &str) -> String {
    format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
}

static GLOBAL_REGISTRY: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::with_builtins);

/// Name → function mapping.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: RwLock<BTreeMap<String, Arc<dyn SpanningColumnFunction>>>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in functions.
    pub fn with_builtins() -> Self {
        let mut functions: BTreeMap<String, Arc<dyn SpanningColumnFunction>> = BTreeMap::new();
        functions.insert(DATE_INTERVAL.to_string(), Arc::new(DateInterval));
        Self {
            functions: RwLock::new(functions),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static FunctionRegistry {
        &GLOBAL_REGISTRY
    }

    /// Registers a function under its name. Names can be registered once.
    pub fn register(&self, function: Arc<dyn SpanningColumnFunction>) -> Result<()> {
        let mut functions = self.functions.write().map_err(|_| {
            TermError::Internal("Failed to acquire write lock on function registry".to_string())
        })?;

        let name = function.name().to_string();
        if functions.contains_key(&name) {
            return Err(TermError::Configuration(format!(
                "Function '{name}' is already registered"
            )));
        }
        debug!(function = %name, "Registering spanning-column function");
        functions.insert(name, function);
        Ok(())
    }

    /// Looks up a function by name.
    pub fn get(&self, name: &str) -> Result<Option<Arc<dyn SpanningColumnFunction>>> {
        let functions = self.functions.read().map_err(|_| {
            TermError::Internal("Failed to acquire read lock on function registry".to_string())
        })?;
        Ok(functions.get(name).cloned())
    }

    /// Looks up a function by name, failing if it is not registered.
    pub fn require(&self, name: &str) -> Result<Arc<dyn SpanningColumnFunction>> {
        self.get(name)?
            .ok_or_else(|| TermError::UnknownFunction(name.to_string()))
    }

    /// Self-descriptions of all registered functions, keyed by name.
    pub fn descriptors(&self) -> Result<BTreeMap<String, FunctionDescriptor>> {
        let functions = self.functions.read().map_err(|_| {
            TermError::Internal("Failed to acquire read lock on function registry".to_string())
        })?;
        Ok(functions
            .iter()
            .map(|(name, function)| (name.clone(), function.descriptor()))
            .collect())
    }
}
