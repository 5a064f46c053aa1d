//! Run one OpsGenie notification cycle for a batch of health-check messages.
//!
//! Messages are read as a JSON array (Consul field names) from a file or
//! stdin. Configuration comes from `--config` or the `OPSGENIE_*`
//! environment variables.

use std::process::ExitCode;

use clap::Parser;

use notify::cli::{run, Args};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let args = Args::parse();
    let outcome = run(&args, std::io::stdin()).await;

    ExitCode::from(outcome.exit_code())
}
