//! The `jet` command line.
//!
//! `jet run` executes a program with its output going to stdout, `jet check`
//! only reports what keeps a program from binding. Diagnostics are printed
//! as `line:column message`.

use std::future::Future;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use jet_eval::{
    Output, ParallelReducer, Reducer, RunError, Runtime, SequentialReducer, SyntaxException, TokioExecutor,
    Value,
};
use tracing::{debug, warn};

#[derive(Parser, Debug)]
#[command(name = "jet")]
#[command(about = "Jet expression language - runs and checks Jet programs")]
#[command(version)]
pub struct Args {
    /// Log engine events to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a program and write its output to stdout
    Run {
        /// Program source file, `-` for stdin
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// How `reduce` folds a sequence
        #[arg(long, value_enum, default_value_t = ReducerKind::Parallel)]
        reducer: ReducerKind,

        /// Cancel the run after this many milliseconds
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },
    /// Parse and bind a program without running it
    Check {
        /// Program source file, `-` for stdin
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReducerKind {
    /// Split across all cores; the lambda must be associative
    Parallel,
    /// Left fold in order on one thread
    Sequential,
}

impl ReducerKind {
    fn reducer(self) -> Box<dyn Reducer<Value, RunError>> {
        match self {
            ReducerKind::Parallel => Box::new(ParallelReducer),
            ReducerKind::Sequential => Box::new(SequentialReducer),
        }
    }
}

/// How a command ended, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failed,
    Cancelled,
}

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Status::Success => 0,
            Status::Failed => 1,
            // Conventional status of a process stopped by SIGINT
            Status::Cancelled => 130,
        }
    }
}

/// A runtime that writes each output on its own line.
pub struct Console<W> {
    out: Mutex<W>,
    reducer: Box<dyn Reducer<Value, RunError>>,
}

impl<W: Write + Send> Console<W> {
    pub fn new(out: W, reducer: ReducerKind) -> Self {
        Self {
            out: Mutex::new(out),
            reducer: reducer.reducer(),
        }
    }
}

impl<W: Write + Send> Runtime for Console<W> {
    fn out(&self, output: Output) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{}", output) {
            warn!(error = %e, "could not write program output");
            return;
        }
        // Output stays visible while a long run continues
        if let Err(e) = out.flush() {
            warn!(error = %e, "could not flush program output");
        }
    }

    fn reducer(&self) -> &dyn Reducer<Value, RunError> {
        self.reducer.as_ref()
    }
}

/// Reads a program from `input`, or from stdin when `input` is `-`.
pub fn read_source(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read program from stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

/// Binds `source` and reports every error found.
pub fn check(source: &str, diagnostics: &mut impl Write) -> Result<Status> {
    match jet_eval::compile(source) {
        Ok(program) => {
            debug!(slots = program.slot_count(), "program is well formed");
            Ok(Status::Success)
        }
        Err(e) => {
            report(&e, diagnostics)?;
            Ok(Status::Failed)
        }
    }
}

/// Compiles and runs `source` on the tokio blocking pool.
///
/// The run is cancelled when `timeout` elapses or `interrupt` completes,
/// whichever comes first.
pub async fn run(
    source: &str,
    runtime: Arc<dyn Runtime>,
    timeout: Option<Duration>,
    interrupt: impl Future<Output = ()>,
    diagnostics: &mut impl Write,
) -> Result<Status> {
    let program = match jet_eval::compile(source) {
        Ok(program) => program,
        Err(e) => {
            report(&e, diagnostics)?;
            return Ok(Status::Failed);
        }
    };

    let handle = program.run(runtime, &TokioExecutor::current());
    let cancel = handle.cancel_token();
    let deadline = async move {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };

    let finished = handle.finished();
    tokio::pin!(finished);
    let outcome = tokio::select! {
        outcome = &mut finished => outcome,
        _ = deadline => {
            debug!("timeout elapsed, cancelling run");
            cancel.cancel();
            finished.await
        }
        _ = interrupt => {
            debug!("interrupted, cancelling run");
            cancel.cancel();
            finished.await
        }
    };

    match outcome {
        Ok(()) => Ok(Status::Success),
        Err(RunError::Cancelled) => {
            writeln!(diagnostics, "{}", RunError::Cancelled)?;
            Ok(Status::Cancelled)
        }
        Err(e) => {
            writeln!(diagnostics, "{}", e)?;
            Ok(Status::Failed)
        }
    }
}

fn report(error: &SyntaxException, diagnostics: &mut impl Write) -> io::Result<()> {
    for error in &error.errors {
        writeln!(diagnostics, "{}", error)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_args() {
        let args = Args::try_parse_from(["jet", "run", "prog.jet", "--reducer", "sequential", "--timeout-ms", "250"])
            .unwrap();
        match args.command {
            Command::Run {
                input,
                reducer,
                timeout_ms,
            } => {
                assert_eq!(input, PathBuf::from("prog.jet"));
                assert_eq!(reducer, ReducerKind::Sequential);
                assert_eq!(timeout_ms, Some(250));
            }
            other => panic!("Expected run, got {:?}", other),
        }
        assert!(!args.verbose);
    }

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["jet", "-v", "run", "-"]).unwrap();
        assert!(args.verbose);
        match args.command {
            Command::Run { reducer, timeout_ms, .. } => {
                assert_eq!(reducer, ReducerKind::Parallel);
                assert_eq!(timeout_ms, None);
            }
            other => panic!("Expected run, got {:?}", other),
        }

        assert!(Args::try_parse_from(["jet", "run", "x", "--reducer", "random"]).is_err());
        assert!(Args::try_parse_from(["jet", "check"]).is_err());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Success.code(), 0);
        assert_eq!(Status::Failed.code(), 1);
        assert_eq!(Status::Cancelled.code(), 130);
    }

    #[test]
    fn test_console_writes_lines() {
        let console = Console::new(Vec::new(), ReducerKind::Sequential);
        console.out(Output::Text("hello".to_string()));
        console.out(Output::Value(Value::range(1, 3)));
        let written = console.out.into_inner().unwrap();
        assert_eq!(String::from_utf8(written).unwrap(), "hello\n[1, 2, 3]\n");
    }

    #[test]
    fn test_check_reports_every_error() {
        let mut diagnostics = Vec::new();
        let status = check("out a\nout b", &mut diagnostics).unwrap();
        assert_eq!(status, Status::Failed);
        assert_eq!(
            String::from_utf8(diagnostics).unwrap(),
            "1:5 Undefined variable: a\n2:5 Undefined variable: b\n"
        );

        let mut diagnostics = Vec::new();
        assert_eq!(check("out 1", &mut diagnostics).unwrap(), Status::Success);
        assert!(diagnostics.is_empty());
    }
}
