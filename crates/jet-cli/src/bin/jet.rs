//! Jet command line runner

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use jet_cli::{Args, Command, Console};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let status = match args.command {
        Command::Run {
            input,
            reducer,
            timeout_ms,
        } => {
            let source = jet_cli::read_source(&input)?;
            let console = Arc::new(Console::new(io::stdout(), reducer));
            jet_cli::run(
                &source,
                console,
                timeout_ms.map(Duration::from_millis),
                ctrl_c(),
                &mut io::stderr(),
            )
            .await?
        }
        Command::Check { input } => {
            let source = jet_cli::read_source(&input)?;
            jet_cli::check(&source, &mut io::stderr())?
        }
    };

    Ok(ExitCode::from(status.code()))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Completes on Ctrl-C. Never completes if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
