//! The boundary between the engine and whoever embeds it.
//!
//! A [`Runtime`] receives program output and chooses the reduction strategy.
//! An [`Executor`] decides where a run executes.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::error::RunError;
use crate::reducer::{Reducer, SequentialReducer};
use crate::value::Value;

/// Something a program emitted, in program order.
#[derive(Debug, Clone)]
pub enum Output {
    /// Result of an `out` statement.
    Value(Value),
    /// Text of a `print` statement.
    Text(String),
}

impl Output {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Output::Value(value) => Some(value),
            Output::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Output::Value(_) => None,
            Output::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Value(value) => write!(f, "{}", value),
            Output::Text(text) => f.write_str(text),
        }
    }
}

/// Run-time environment supplied by the embedder.
///
/// `out` may be called from a thread other than the one that started the run.
pub trait Runtime: Send + Sync {
    /// Receives every `out` and `print` result.
    fn out(&self, output: Output);

    /// The strategy used for every `reduce` of a run.
    fn reducer(&self) -> &dyn Reducer<Value, RunError>;
}

/// A runtime that records every output in memory.
pub struct Collector {
    outputs: Mutex<Vec<Output>>,
    reducer: Box<dyn Reducer<Value, RunError>>,
}

impl Collector {
    /// Reduces sequentially.
    pub fn new() -> Self {
        Self::with_reducer(SequentialReducer)
    }

    pub fn with_reducer(reducer: impl Reducer<Value, RunError> + 'static) -> Self {
        Self {
            outputs: Mutex::new(Vec::new()),
            reducer: Box::new(reducer),
        }
    }

    /// Everything emitted so far.
    pub fn outputs(&self) -> Vec<Output> {
        self.outputs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn take(&self) -> Vec<Output> {
        std::mem::take(&mut *self.outputs.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for Collector {
    fn out(&self, output: Output) {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(output);
    }

    fn reducer(&self) -> &dyn Reducer<Value, RunError> {
        self.reducer.as_ref()
    }
}

/// A unit of work handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Decides where a run executes. Dropping a job without running it is
/// reported to the caller as [`RunError::Abandoned`].
pub trait Executor {
    fn execute(&self, job: Job);
}

impl<F> Executor for F
where
    F: Fn(Job),
{
    fn execute(&self, job: Job) {
        self(job)
    }
}

/// Runs the job on the calling thread before `execute` returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job()
    }
}

/// Runs every job on a fresh OS thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) {
        if let Err(e) = std::thread::Builder::new()
            .name("jet-run".to_string())
            .spawn(job)
        {
            tracing::warn!(error = %e, "could not spawn a thread for the run");
        }
    }
}

/// Runs jobs on the blocking pool of a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running on.
    ///
    /// Panics outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        // Evaluation is CPU bound and blocking, keep it off the async workers.
        drop(self.handle.spawn_blocking(job));
    }
}
