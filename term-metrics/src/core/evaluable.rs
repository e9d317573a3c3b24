//! Compiled expressions and the compilation service they come from.
//!
//! The expression language itself is not part of this crate. Anything that can
//! turn source text into an [`Evaluable`] can be plugged in through
//! [`ExpressionCompiler`]; closures can be used directly via [`FnEvaluable`].

use super::{Bindings, Value};
use crate::error::Result;
use serde::{Serialize, Serializer};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// A compiled expression.
///
/// Evaluation never fails at the Rust level: failures are reported as
/// [`Value::Error`] so callers can decide whether an error counts.
pub trait Evaluable: Debug + Send + Sync {
    /// Evaluates the expression against the given bindings.
    fn evaluate(&self, bindings: &Bindings) -> Value;
}

/// Turns expression text into an [`Evaluable`].
pub trait ExpressionCompiler: Debug + Send + Sync {
    /// Compiles `expression`.
    fn compile(&self, expression: &str) -> Result<Arc<dyn Evaluable>>;
}

/// An [`Evaluable`] backed by a closure.
pub struct FnEvaluable<F> {
    f: F,
}

impl<F> FnEvaluable<F>
where
    F: Fn(&Bindings) -> Value + Send + Sync,
{
    /// Wraps a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Debug for FnEvaluable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnEvaluable")
    }
}

impl<F> Evaluable for FnEvaluable<F>
where
    F: Fn(&Bindings) -> Value + Send + Sync,
{
    fn evaluate(&self, bindings: &Bindings) -> Value {
        (self.f)(bindings)
    }
}

/// A compiled expression together with the text it was compiled from.
///
/// Serializes as its source text.
#[derive(Clone)]
pub struct Expression {
    source: String,
    evaluable: Arc<dyn Evaluable>,
}

impl Expression {
    /// Pairs an already compiled evaluable with its source text.
    pub fn new(source: impl Into<String>, evaluable: Arc<dyn Evaluable>) -> Self {
        Self {
            source: source.into(),
            evaluable,
        }
    }

    /// Compiles `source` with the given compiler.
    pub fn compile(source: impl Into<String>, compiler: &dyn ExpressionCompiler) -> Result<Self> {
        let source = source.into();
        let evaluable = compiler.compile(&source)?;
        Ok(Self { source, evaluable })
    }

    /// Builds an expression from a closure. `source` is only used for reporting.
    pub fn from_fn<F>(source: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Bindings) -> Value + Send + Sync + 'static,
    {
        Self::new(source, Arc::new(FnEvaluable::new(f)))
    }

    /// The source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the compiled expression.
    pub fn evaluate(&self, bindings: &Bindings) -> Value {
        self.evaluable.evaluate(bindings)
    }
}

impl Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}
