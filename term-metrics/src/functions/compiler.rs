//! Compiles function invocations such as `dateInterval("start", "end", "gt")`.
//!
//! This is not a general expression language: it accepts exactly one call of a
//! registered function whose arguments are string or integer literals, which is
//! the form [`SpanningColumnFunction::expression`] produces.

use super::{FunctionRegistry, SpanningColumnFunction};
use crate::core::{Bindings, Evaluable, ExpressionCompiler, Value};
use crate::error::{Result, TermError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

static INVOCATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    // This regex is compile-time constant and known to be valid
    #[allow(clippy::expect_used)]
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*\((.*)\)\s*$")
        .expect("Hard-coded regex pattern should be valid")
});

/// A compiled call of a spanning-column function.
pub struct FunctionCall {
    function: Arc<dyn SpanningColumnFunction>,
    args: Vec<Value>,
}

impl FunctionCall {
    /// Creates a call with already decoded arguments.
    pub fn new(function: Arc<dyn SpanningColumnFunction>, args: Vec<Value>) -> Self {
        Self { function, args }
    }

    /// The call's arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

impl fmt::Debug for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCall")
            .field("function", &self.function.name())
            .field("args", &self.args)
            .finish()
    }
}

impl Evaluable for FunctionCall {
    fn evaluate(&self, bindings: &Bindings) -> Value {
        self.function.call(bindings, &self.args)
    }
}

/// [`ExpressionCompiler`] for single function invocations.
#[derive(Debug, Clone, Default)]
pub struct FunctionCallCompiler {
    registry: Option<Arc<FunctionRegistry>>,
}

impl FunctionCallCompiler {
    /// Resolves functions through the process-wide registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves functions through the given registry.
    pub fn with_registry(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    fn registry(&self) -> &FunctionRegistry {
        self.registry
            .as_deref()
            .unwrap_or_else(|| FunctionRegistry::global())
    }

    /// Looks up a function in the registry this compiler resolves through.
    pub fn function(&self, name: &str) -> Result<Arc<dyn SpanningColumnFunction>> {
        self.registry().require(name)
    }
}

impl ExpressionCompiler for FunctionCallCompiler {
    fn compile(&self, expression: &str) -> Result<Arc<dyn Evaluable>> {
        let captures = INVOCATION_REGEX
            .captures(expression)
            .ok_or_else(|| TermError::parse(expression, "expected a single function call"))?;
        let name = &captures[1];
        let function = self.registry().require(name)?;
        let args = parse_args(&captures[2]).map_err(|message| TermError::parse(expression, message))?;

        Ok(Arc::new(FunctionCall::new(function, args)))
    }
}

fn parse_args(input: &str) -> std::result::Result<Vec<Value>, String> {
    let mut args = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.peek() {
            None if args.is_empty() => return Ok(args),
            None => return Err("missing argument after ','".to_string()),
            Some('"') => {
                chars.next();
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => literal.push(escaped),
                            None => return Err("unterminated escape".to_string()),
                        },
                        Some('"') => break,
                        Some(c) => literal.push(c),
                        None => return Err("unterminated string literal".to_string()),
                    }
                }
                args.push(Value::String(literal));
            }
            Some(_) => {
                let mut token = String::new();
                while let Some(c) = chars.next_if(|c| *c != ',' && !c.is_whitespace()) {
                    token.push(c);
                }
                let number = token
                    .parse::<i64>()
                    .map_err(|_| format!("unexpected token '{token}'"))?;
                args.push(Value::Int(number));
            }
        }

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => return Ok(args),
            Some(',') => {}
            Some(c) => return Err(format!("unexpected character '{c}'")),
        }
    }
}
