//! Running bound programs.
//!
//! A run is one unit of work handed to an [`Executor`]. The caller gets a
//! [`RunHandle`] back immediately and can cancel the run, block on it or
//! await it. Each run allocates its own frame, so one [`Program`] can run any
//! number of times, also concurrently.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::RunError;
use crate::eval::{Evaluator, Frame};
use crate::node::Statement;
use crate::runtime::{Executor, InlineExecutor, Runtime};

/// Result of a run. Programs produce output, not values.
pub type Outcome = Result<(), RunError>;

/// A bound program. Cheap to clone; clones share the statement list.
#[derive(Clone)]
pub struct Program {
    statements: Arc<[Statement]>,
    slot_count: usize,
}

impl Program {
    pub(crate) fn new(statements: Vec<Statement>, slot_count: usize) -> Self {
        Self {
            statements: statements.into(),
            slot_count,
        }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Number of variable slots a run allocates.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Starts the program on `executor`. `reduce` may additionally fan out
    /// to other threads, depending on the runtime's reducer.
    pub fn run(&self, runtime: Arc<dyn Runtime>, executor: &dyn Executor) -> RunHandle {
        self.run_observed(runtime, executor, |_| {})
    }

    /// Like [`run`](Self::run), calling `observer` on the worker with the
    /// outcome just before the handle sees it.
    pub fn run_observed(
        &self,
        runtime: Arc<dyn Runtime>,
        executor: &dyn Executor,
        observer: impl FnOnce(&Outcome) + Send + 'static,
    ) -> RunHandle {
        let cancel = CancelToken::new();
        let finished = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = oneshot::channel();

        let program = self.clone();
        let evaluator = Evaluator::new(runtime, cancel.clone());
        let token = cancel.clone();
        let done = Arc::clone(&finished);

        debug!(statements = self.statements.len(), "dispatching run");
        executor.execute(Box::new(move || {
            let outcome = if token.is_cancelled() {
                Err(RunError::Cancelled)
            } else {
                let result = program.execute(&evaluator);
                // A cancelled run stays cancelled even if it got to the end.
                if token.is_cancelled() {
                    Err(RunError::Cancelled)
                } else {
                    result
                }
            };
            debug!(outcome = ?outcome, "run finished");
            observer(&outcome);
            done.store(true, Ordering::Release);
            // The handle may have been dropped; nobody is waiting then.
            let _ = sender.send(outcome);
        }));

        RunHandle {
            cancel,
            finished,
            receiver,
        }
    }

    /// Runs on the calling thread and returns when the program is done.
    /// `reduce` may still use other threads.
    pub fn run_and_wait(&self, runtime: Arc<dyn Runtime>) -> Outcome {
        self.run(runtime, &InlineExecutor).wait()
    }

    fn execute(&self, evaluator: &Evaluator) -> Outcome {
        let mut frame: Frame = vec![None; self.slot_count];
        for statement in self.statements.iter() {
            evaluator.execute(statement, &mut frame)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("statements", &self.statements.len())
            .field("slot_count", &self.slot_count)
            .finish()
    }
}

/// Control over a dispatched run.
#[derive(Debug)]
pub struct RunHandle {
    cancel: CancelToken,
    finished: Arc<AtomicBool>,
    receiver: oneshot::Receiver<Outcome>,
}

impl RunHandle {
    /// Asks the run to stop. It notices at its next `reduce` step; the
    /// outcome of a cancelled run is always [`RunError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// A token that cancels this run, for handing to other threads.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Blocks the calling thread until the run is over.
    ///
    /// Must not be called from async code unless the run has already
    /// finished; use [`finished`](Self::finished) there.
    pub fn wait(mut self) -> Outcome {
        match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Closed) => Err(RunError::Abandoned),
            Err(TryRecvError::Empty) => self.receiver.blocking_recv().unwrap_or(Err(RunError::Abandoned)),
        }
    }

    /// Waits for the run without blocking a thread.
    pub async fn finished(self) -> Outcome {
        self.receiver.await.unwrap_or(Err(RunError::Abandoned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Collector, Job, Output};
    use std::sync::Mutex;

    fn program(source: &str) -> Program {
        crate::compile(source).expect("source should compile")
    }

    fn texts(collector: &Collector) -> Vec<String> {
        collector.outputs().iter().map(Output::to_string).collect()
    }

    #[test]
    fn test_run_and_wait_emits_in_order() {
        let collector = Arc::new(Collector::new());
        let outcome = program("print \"a\" out 1 print \"b\" out {1, 3}").run_and_wait(collector.clone());
        assert_eq!(outcome, Ok(()));
        assert_eq!(texts(&collector), vec!["a", "1", "b", "[1, 2, 3]"]);
    }

    #[test]
    fn test_fault_stops_the_run() {
        let collector = Arc::new(Collector::new());
        let outcome = program("out 1 out {1, 2} + 1 out 3").run_and_wait(collector.clone());
        match outcome {
            Err(RunError::Execution(e)) => assert_eq!(e.to_string(), "1:11 Expected a number, got a sequence."),
            other => panic!("Expected a fault, got {:?}", other),
        }
        assert_eq!(texts(&collector), vec!["1"]);
    }

    #[test]
    fn test_dropped_job_is_abandoned() {
        let collector = Arc::new(Collector::new());
        let handle = program("out 1").run(collector.clone(), &|job: Job| drop(job));
        assert!(!handle.is_finished());
        assert_eq!(handle.wait(), Err(RunError::Abandoned));
        assert!(collector.outputs().is_empty());
    }

    #[test]
    fn test_cancel_before_start() {
        let deferred: Arc<Mutex<Option<Job>>> = Arc::default();
        let slot = Arc::clone(&deferred);
        let executor = move |job: Job| *slot.lock().unwrap() = Some(job);

        let collector = Arc::new(Collector::new());
        let handle = program("out 1").run(collector.clone(), &executor);
        handle.cancel();
        assert!(handle.is_cancelled());

        let job = deferred.lock().unwrap().take().unwrap();
        job();
        assert!(handle.is_finished());
        assert_eq!(handle.wait(), Err(RunError::Cancelled));
        assert!(collector.outputs().is_empty());
    }

    #[test]
    fn test_observer_sees_outcome() {
        let seen: Arc<Mutex<Option<Outcome>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let handle = program("out 1 / 0").run_observed(Arc::new(Collector::new()), &InlineExecutor, move |outcome| {
            *sink.lock().unwrap() = Some(outcome.clone());
        });
        assert_eq!(handle.wait(), Ok(()));
        assert_eq!(*seen.lock().unwrap(), Some(Ok(())));
    }

    #[test]
    fn test_runs_do_not_share_frames() {
        let program = program("var a = 2 out a * 3");
        for _ in 0..3 {
            let collector = Arc::new(Collector::new());
            assert_eq!(program.run_and_wait(collector.clone()), Ok(()));
            assert_eq!(texts(&collector), vec!["6"]);
        }
    }
}
