//! Runtime values for the Jet engine.

use std::fmt;
use std::sync::Arc;

use crate::error::RunError;
use crate::eval::{Evaluator, Frame};
use crate::lazy_range::LazyRange;
use crate::node::Expression;

/// An element of a sequence. Elements are computed on demand and computing
/// one can fail, for example when a mapped lambda hits a type mismatch.
pub type Element = Result<Value, RunError>;

/// The sequence type of the language: a lazily mapped integer range.
pub type Sequence = LazyRange<Element>;

/// A runtime value in the Jet language.
#[derive(Debug, Clone)]
pub enum Value {
    /// A numeric value (always f64).
    Number(f64),
    /// A lazy sequence of values.
    Sequence(Sequence),
    /// A lambda closed over its run, ready to be applied.
    Lambda(Lambda),
}

impl Value {
    /// Name of the variant, as used in type mismatch messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Sequence(_) => "sequence",
            Value::Lambda(_) => "lambda",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The sequence for `[start, end]` whose elements are the integers as numbers.
    pub fn range(start: i64, end: i64) -> Value {
        Value::Sequence(LazyRange::of(start, end).map(|i| Ok(Value::Number(i as f64))))
    }

    /// Text form of the value. Sequence elements are computed while rendering,
    /// so a faulty element surfaces here.
    pub fn render(&self) -> Result<String, RunError> {
        match self {
            // Integral values print without a decimal point.
            Value::Number(n) => Ok(n.to_string()),
            Value::Sequence(seq) => seq.try_render(|out, element| {
                out.push_str(&element?.render()?);
                Ok(())
            }),
            Value::Lambda(lambda) => Ok(format!("<lambda/{}>", lambda.arity())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(text) => f.write_str(&text),
            Err(e) => write!(f, "<error: {}>", e),
        }
    }
}

/// A lambda value. Its body sees only its own arguments.
#[derive(Clone)]
pub struct Lambda {
    arity: usize,
    body: Arc<Expression>,
    evaluator: Evaluator,
}

impl Lambda {
    pub(crate) fn new(arity: usize, body: Arc<Expression>, evaluator: Evaluator) -> Self {
        Self {
            arity,
            body,
            evaluator,
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Evaluates the body with `args` as its whole frame.
    ///
    /// The binder guarantees the argument count at every call site.
    pub fn call(&self, args: Vec<Value>) -> Result<Value, RunError> {
        debug_assert_eq!(args.len(), self.arity);
        let frame: Frame = args.into_iter().map(Some).collect();
        self.evaluator.eval(&self.body, &frame)
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lambda")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}
