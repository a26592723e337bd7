//! Executor entry point: parses CLI flags, starts the scheduler process and
//! its worker fleet, and runs the ingress boundary forever.
//!
//! ```text
//! executor <n-tasks> [--port <port>] [--arena-size <bytes>]
//!          [--queue-depth <n>] [--stack-depth <n>] [--shm-name <name>]
//! ```

use clap::Parser;
use rosexec::config::ExecConfig;
use rosexec::kernel::Executor;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ExecConfig::parse();

    match Executor::start(config) {
        Ok(executor) => executor.run(),
        Err(e) => {
            tracing::error!(error = %e, "executor failed to start");
            std::process::exit(1);
        }
    }
}
