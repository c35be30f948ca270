//! Tree-walking evaluation of statements and expressions.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use jet_parser::Position;
use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::error::{RunError, RuntimeError};
use crate::node::{Expression, ExpressionKind, Statement, StatementKind};
use crate::runtime::{Output, Runtime};
use crate::stack::ensure_sufficient_stack;
use crate::value::{Lambda, Sequence, Value};

/// Variable storage of one run, or the arguments of one lambda call.
/// `None` marks a slot whose declaration has not executed yet.
pub(crate) type Frame = Vec<Option<Value>>;

/// Everything evaluation needs besides the frame: where output goes, which
/// reducer to use, and the token that can stop a `reduce`.
#[derive(Clone)]
pub(crate) struct Evaluator {
    runtime: Arc<dyn Runtime>,
    cancel: CancelToken,
}

impl Evaluator {
    pub(crate) fn new(runtime: Arc<dyn Runtime>, cancel: CancelToken) -> Self {
        Self { runtime, cancel }
    }

    pub(crate) fn execute(&self, statement: &Statement, frame: &mut [Option<Value>]) -> Result<(), RunError> {
        trace!(line = statement.position.line, "executing statement");
        guarded(statement.position, || match &statement.kind {
            StatementKind::VariableDeclaration { address, init } => {
                let value = self.eval(init, frame)?;
                frame[*address] = Some(value);
                Ok(())
            }
            StatementKind::Out(expr) => {
                let value = self.eval(expr, frame)?;
                self.runtime.out(Output::Value(value));
                Ok(())
            }
            StatementKind::Print(text) => {
                self.runtime.out(Output::Text(text.clone()));
                Ok(())
            }
        })
    }

    pub(crate) fn eval(&self, expr: &Expression, frame: &[Option<Value>]) -> Result<Value, RunError> {
        ensure_sufficient_stack(|| guarded(expr.position, || self.eval_node(expr, frame)))
    }

    fn eval_node(&self, expr: &Expression, frame: &[Option<Value>]) -> Result<Value, RunError> {
        match &expr.kind {
            ExpressionKind::Constant(value) => Ok(value.clone()),
            ExpressionKind::VarRef(address) => frame
                .get(*address)
                .cloned()
                .flatten()
                .ok_or_else(|| {
                    RuntimeError::new(
                        expr.position,
                        format!("Run-time exception: slot {} read before assignment", address),
                    )
                    .into()
                }),
            ExpressionKind::Add(l, r) => self.arithmetic(l, r, frame, |a, b| a + b),
            ExpressionKind::Sub(l, r) => self.arithmetic(l, r, frame, |a, b| a - b),
            ExpressionKind::Mul(l, r) => self.arithmetic(l, r, frame, |a, b| a * b),
            ExpressionKind::Div(l, r) => self.arithmetic(l, r, frame, |a, b| a / b),
            ExpressionKind::Pow(l, r) => self.arithmetic(l, r, frame, f64::powf),
            ExpressionKind::RangeCtor(start, end) => {
                // `as` truncates toward zero and saturates at the i64 bounds.
                let start = self.eval_number(start, frame)? as i64;
                let end = self.eval_number(end, frame)? as i64;
                Ok(Value::range(start, end))
            }
            ExpressionKind::Map { sequence, lambda } => {
                let sequence = self.eval_sequence(sequence, frame)?;
                let lambda = self.eval_lambda(lambda, frame)?;
                Ok(Value::Sequence(sequence.map(move |element| {
                    element.and_then(|x| lambda.call(vec![x]))
                })))
            }
            ExpressionKind::Reduce {
                sequence,
                identity,
                lambda,
            } => {
                let sequence = self.eval_sequence(sequence, frame)?;
                let identity = self.eval(identity, frame)?;
                let lambda = self.eval_lambda(lambda, frame)?;
                self.reduce(&sequence, identity, &lambda)
            }
            ExpressionKind::LambdaLiteral { arity, body } => {
                Ok(Value::Lambda(Lambda::new(*arity, Arc::clone(body), self.clone())))
            }
        }
    }

    fn reduce(&self, sequence: &Sequence, identity: Value, lambda: &Lambda) -> Result<Value, RunError> {
        let cancel = &self.cancel;
        // The one place long-running work looks at the cancellation token.
        let accumulate = |acc: Value, x: Value| {
            cancel
                .check()
                .inspect_err(|_| debug!("reduce observed cancellation"))?;
            lambda.call(vec![acc, x])
        };
        self.runtime.reducer().reduce(sequence, identity, &accumulate)
    }

    fn arithmetic(
        &self,
        left: &Expression,
        right: &Expression,
        frame: &[Option<Value>],
        op: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, RunError> {
        let left = self.eval_number(left, frame)?;
        let right = self.eval_number(right, frame)?;
        Ok(Value::Number(op(left, right)))
    }

    fn eval_number(&self, expr: &Expression, frame: &[Option<Value>]) -> Result<f64, RunError> {
        match self.eval(expr, frame)? {
            Value::Number(n) => Ok(n),
            other => Err(RuntimeError::type_mismatch(expr.position, "number", other.type_name()).into()),
        }
    }

    fn eval_sequence(&self, expr: &Expression, frame: &[Option<Value>]) -> Result<Sequence, RunError> {
        match self.eval(expr, frame)? {
            Value::Sequence(seq) => Ok(seq),
            other => Err(RuntimeError::type_mismatch(expr.position, "sequence", other.type_name()).into()),
        }
    }

    fn eval_lambda(&self, expr: &Expression, frame: &[Option<Value>]) -> Result<Lambda, RunError> {
        match self.eval(expr, frame)? {
            Value::Lambda(lambda) => Ok(lambda),
            other => Err(RuntimeError::type_mismatch(expr.position, "lambda", other.type_name()).into()),
        }
    }
}

/// Runs `f`, turning a panic into a run-time fault at `position`. Faults that
/// already carry a position pass through untouched, so the innermost node
/// that failed is the one reported.
fn guarded<T>(position: Position, f: impl FnOnce() -> Result<T, RunError>) -> Result<T, RunError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(RuntimeError::new(position, format!("Run-time exception {}", panic_message(&*payload))).into())
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "of unknown kind"
    }
}
