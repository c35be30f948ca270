//! The Jet expression engine.
//!
//! Source text goes through [`jet_parser::parse`] and [`bind`] to become a
//! [`Program`]. A program runs against a [`Runtime`], which receives its
//! output and picks the [`Reducer`] used by `reduce`. Runs are cancellable
//! through their [`RunHandle`].

pub mod binder;
mod cancel;
mod error;
mod eval;
mod interpreter;
pub mod lazy_range;
pub mod node;
pub mod reducer;
mod runtime;
mod stack;
mod value;

use std::sync::Arc;

pub use binder::bind;
pub use cancel::CancelToken;
pub use error::{BindError, Error, RunError, RuntimeError, SyntaxException};
pub use interpreter::{Outcome, Program, RunHandle};
pub use lazy_range::LazyRange;
pub use reducer::{ParallelReducer, Reducer, SequentialReducer};
pub use runtime::{Collector, Executor, InlineExecutor, Job, Output, Runtime, ThreadExecutor, TokioExecutor};
pub use value::{Element, Lambda, Sequence, Value};

pub use jet_parser::{Position, SyntaxError};

/// Result type for the source-to-output pipeline.
pub type Result<T> = std::result::Result<T, Error>;

/// Parses and binds `source`.
pub fn compile(source: &str) -> std::result::Result<Program, SyntaxException> {
    let tree = jet_parser::parse(source)?;
    bind(&tree)
}

/// Compiles `source` and runs it on the calling thread.
pub fn execute(source: &str, runtime: Arc<dyn Runtime>) -> Result<()> {
    let program = compile(source)?;
    program.run_and_wait(runtime)?;
    Ok(())
}
