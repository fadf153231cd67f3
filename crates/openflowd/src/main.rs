//! openflowd daemon entry point.
//!
//! Initializes logging, builds the worker for the configured controller,
//! and serves tasks until interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use openflow_common::{MemStore, MemoryOfcDriver};
use openflowd::{OfcWorker, Task, WorkerConfig};

/// Initialize tracing/logging.
fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    info!("--- Starting openflowd ---");

    let config = WorkerConfig::from_env();
    info!(
        "serving openflow controller '{}' (same-vlan policy: {}, test mode: {})",
        config.ofc_uuid, config.nets_with_same_vlan, config.test_mode
    );

    // Production wiring plugs a SQL store and the controller's HTTP driver
    // in here; the in-memory pair keeps the daemon runnable stand-alone.
    let store = Arc::new(MemStore::new());
    let driver = Arc::new(MemoryOfcDriver::new());

    let (handle, worker) = OfcWorker::spawn(store, driver, config);

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("cannot wait for shutdown signal: {}", e);
    }
    info!("shutting down");

    if let Err(e) = handle.insert_task(Task::Exit).await {
        error!("cannot stop worker: {}", e);
        return ExitCode::FAILURE;
    }
    match worker.await {
        Ok(()) => {
            info!("openflowd exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("worker task failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
