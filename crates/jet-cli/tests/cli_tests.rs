//! Integration tests for the `jet` commands

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jet_cli::{Console, ReducerKind, Status};

/// A writer whose contents stay readable after the console is handed off.
#[derive(Clone, Default)]
struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct RunResult {
    status: Status,
    stdout: String,
    stderr: String,
}

async fn run_source(source: &str, reducer: ReducerKind, timeout: Option<Duration>) -> RunResult {
    let stdout = Buffer::default();
    let mut stderr = Vec::new();
    let console = Arc::new(Console::new(stdout.clone(), reducer));
    let status = jet_cli::run(source, console, timeout, std::future::pending(), &mut stderr)
        .await
        .expect("run should not fail to report");
    RunResult {
        status,
        stdout: stdout.contents(),
        stderr: String::from_utf8(stderr).unwrap(),
    }
}

const ENDLESS: &str = "out reduce(map({1, 1E18}, x -> 1), 0, acc x -> acc + x)";

#[tokio::test(flavor = "multi_thread")]
async fn test_run_program_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "var n = 100").unwrap();
    writeln!(file, "print \"sum:\"").unwrap();
    writeln!(file, "out reduce({{1, n}}, 0, acc x -> acc + x)").unwrap();

    let source = jet_cli::read_source(file.path()).unwrap();
    let result = run_source(&source, ReducerKind::Parallel, None).await;
    assert_eq!(result.status, Status::Success);
    assert_eq!(result.stdout, "sum:\n5050\n");
    assert!(result.stderr.is_empty());
}

#[test]
fn test_read_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let error = jet_cli::read_source(&dir.path().join("missing.jet")).unwrap_err();
    assert!(error.to_string().contains("missing.jet"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reducers_agree() {
    let source = "out reduce(map({1, 10000}, x -> x * x), 0, acc x -> acc + x)";
    let parallel = run_source(source, ReducerKind::Parallel, None).await;
    let sequential = run_source(source, ReducerKind::Sequential, None).await;
    assert_eq!(parallel.stdout, "333383335000\n");
    assert_eq!(parallel.stdout, sequential.stdout);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_syntax_errors_are_reported() {
    let result = run_source("out 1 +\nout x", ReducerKind::Sequential, None).await;
    assert_eq!(result.status, Status::Failed);
    assert!(result.stdout.is_empty());
    assert!(result.stderr.starts_with("2:1 "), "unexpected diagnostics: {}", result.stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_runtime_fault_is_reported() {
    let result = run_source("print \"before\"\nout 2 + {3, 4}", ReducerKind::Sequential, None).await;
    assert_eq!(result.status, Status::Failed);
    assert_eq!(result.stdout, "before\n");
    assert_eq!(result.stderr, "2:9 Expected a number, got a sequence.\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timeout_cancels_run() {
    for reducer in [ReducerKind::Sequential, ReducerKind::Parallel] {
        let result = run_source(ENDLESS, reducer, Some(Duration::from_millis(50))).await;
        assert_eq!(result.status, Status::Cancelled);
        assert!(result.stdout.is_empty());
        assert_eq!(result.stderr, "Execution cancelled\n");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_interrupt_cancels_run() {
    let stdout = Buffer::default();
    let mut stderr = Vec::new();
    let console = Arc::new(Console::new(stdout.clone(), ReducerKind::Sequential));
    let interrupt = tokio::time::sleep(Duration::from_millis(20));
    let status = jet_cli::run(ENDLESS, console, None, interrupt, &mut stderr).await.unwrap();
    assert_eq!(status, Status::Cancelled);
    assert!(stdout.contents().is_empty());
}
