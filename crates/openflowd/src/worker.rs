//! Single-consumer task loop serving one openflow controller.
//!
//! Producers enqueue [`Task`]s through a cloneable [`WorkerHandle`]; the
//! worker drains them in order on its own tokio task. Reconciliation
//! failures are recorded as controller status and never stop the loop; only
//! an explicit [`Task::Exit`] (or every handle going away) ends it.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use openflow_common::{elide_error_text, OfcDriver, OfcStatus, Store, ELIDE_DB_MAX};

use crate::config::{WorkerConfig, DEFAULT_OFC_UUID};
use crate::reconciler::Reconciler;

/// One unit of work for the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Reconcile the binding group around the given network uuid.
    UpdateNet(String),
    /// Purge every flow from the controller and the store.
    ClearAll,
    /// Write INACTIVE status and stop the worker.
    Exit,
}

impl Task {
    /// Task kind as external producers spell it.
    pub fn kind(&self) -> &'static str {
        match self {
            Task::UpdateNet(_) => "update-net",
            Task::ClearAll => "clear-all",
            Task::Exit => "exit",
        }
    }

    /// Parses the external `(kind, args...)` task shape.
    pub fn from_parts(kind: &str, args: &[&str]) -> Result<Task, TaskParseError> {
        match kind {
            "update-net" => match args {
                [net_id] => Ok(Task::UpdateNet(net_id.to_string())),
                _ => Err(TaskParseError::BadArity {
                    kind: "update-net",
                    expected: 1,
                    got: args.len(),
                }),
            },
            "clear-all" => match args {
                [] => Ok(Task::ClearAll),
                _ => Err(TaskParseError::BadArity {
                    kind: "clear-all",
                    expected: 0,
                    got: args.len(),
                }),
            },
            "exit" => match args {
                [] => Ok(Task::Exit),
                _ => Err(TaskParseError::BadArity {
                    kind: "exit",
                    expected: 0,
                    got: args.len(),
                }),
            },
            other => Err(TaskParseError::UnknownTask(other.to_string())),
        }
    }
}

/// Malformed external task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskParseError {
    #[error("unknown task '{0}'")]
    UnknownTask(String),
    #[error("task '{kind}' expects {expected} argument(s), got {got}")]
    BadArity {
        kind: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Failure to hand a task to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnqueueError {
    #[error("timeout inserting a task for openflow controller '{0}'")]
    QueueFull(String),
    #[error("openflow worker for controller '{0}' is not running")]
    WorkerGone(String),
}

/// Cloneable producer side of a worker's task queue.
#[derive(Clone)]
pub struct WorkerHandle {
    ofc_uuid: String,
    enqueue_timeout: std::time::Duration,
    tx: mpsc::Sender<Task>,
}

impl WorkerHandle {
    /// Enqueues a task, blocking up to the configured timeout when the
    /// queue is full.
    pub async fn insert_task(&self, task: Task) -> Result<(), EnqueueError> {
        match self.tx.send_timeout(task, self.enqueue_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                Err(EnqueueError::QueueFull(self.ofc_uuid.clone()))
            }
            Err(SendTimeoutError::Closed(_)) => {
                Err(EnqueueError::WorkerGone(self.ofc_uuid.clone()))
            }
        }
    }
}

/// The per-controller serving loop.
pub struct OfcWorker {
    config: WorkerConfig,
    store: Arc<dyn Store>,
    reconciler: Reconciler,
    rx: mpsc::Receiver<Task>,
}

impl OfcWorker {
    /// Builds a worker and the handle feeding it.
    pub fn new(
        store: Arc<dyn Store>,
        driver: Arc<dyn OfcDriver>,
        config: WorkerConfig,
    ) -> (Self, WorkerHandle) {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        let handle = WorkerHandle {
            ofc_uuid: config.ofc_uuid.clone(),
            enqueue_timeout: config.enqueue_timeout,
            tx,
        };
        let reconciler = Reconciler::new(store.clone(), driver, config.clone());
        let worker = Self {
            config,
            store,
            reconciler,
            rx,
        };
        (worker, handle)
    }

    /// Spawns the worker on the current runtime.
    pub fn spawn(
        store: Arc<dyn Store>,
        driver: Arc<dyn OfcDriver>,
        config: WorkerConfig,
    ) -> (WorkerHandle, JoinHandle<()>) {
        let (worker, handle) = Self::new(store, driver, config);
        (handle, tokio::spawn(worker.run()))
    }

    /// Serves tasks until [`Task::Exit`] or queue teardown.
    pub async fn run(mut self) {
        debug!("starting openflow worker for controller '{}'", self.config.ofc_uuid);
        self.set_ofc_status(OfcStatus::Active, None).await;

        loop {
            let task = match self.rx.try_recv() {
                Ok(task) => task,
                Err(TryRecvError::Empty) => {
                    tokio::time::sleep(self.config.idle_poll).await;
                    continue;
                }
                Err(TryRecvError::Disconnected) => {
                    info!("task queue for controller '{}' closed", self.config.ofc_uuid);
                    self.set_ofc_status(OfcStatus::Inactive, Some("task queue closed"))
                        .await;
                    return;
                }
            };

            match task {
                Task::UpdateNet(net_id) => match self.reconciler.update_net(&net_id).await {
                    Ok(()) => {
                        debug!("processing task 'update-net' {}: ok", net_id);
                        self.write_net_status(&net_id, OfcStatus::Active, None).await;
                        self.set_ofc_status(OfcStatus::Active, None).await;
                    }
                    Err(e) => {
                        error!("processing task 'update-net' {}: {}", net_id, e);
                        let text = e.to_string();
                        self.write_net_status(&net_id, OfcStatus::Error, Some(&text))
                            .await;
                        self.set_ofc_status(
                            OfcStatus::Error,
                            Some(&format!("error updating net {net_id}")),
                        )
                        .await;
                    }
                },
                Task::ClearAll => match self.reconciler.clear_all().await {
                    Ok(()) => {
                        debug!("processing task 'clear-all': ok");
                        self.set_ofc_status(OfcStatus::Active, None).await;
                    }
                    Err(e) => {
                        error!("processing task 'clear-all': {}", e);
                        self.set_ofc_status(OfcStatus::Error, Some("error deleting all flows"))
                            .await;
                    }
                },
                Task::Exit => {
                    debug!("exit from openflow worker '{}'", self.config.ofc_uuid);
                    self.set_ofc_status(OfcStatus::Inactive, Some("openflow worker stopped"))
                        .await;
                    return;
                }
            }
        }
    }

    /// Records the outcome of an update-net task on the network row. Store
    /// failures here are logged, never fatal.
    async fn write_net_status(&self, net_id: &str, status: OfcStatus, last_error: Option<&str>) {
        let elided = last_error.map(|text| elide_error_text(text, ELIDE_DB_MAX));
        if let Err(e) = self
            .store
            .update_net_status(net_id, status, elided.as_deref())
            .await
        {
            error!("cannot record status for net '{}': {}", net_id, e);
        }
    }

    /// Publishes controller health. The reserved default uuid has no `ofcs`
    /// row and is skipped.
    async fn set_ofc_status(&self, status: OfcStatus, last_error: Option<&str>) {
        if self.config.ofc_uuid == DEFAULT_OFC_UUID {
            return;
        }
        let elided = last_error.map(|text| elide_error_text(text, ELIDE_DB_MAX));
        if let Err(e) = self
            .store
            .update_ofc_status(&self.config.ofc_uuid, status, elided.as_deref())
            .await
        {
            error!(
                "cannot record status for controller '{}': {}",
                self.config.ofc_uuid, e
            );
        }
    }
}
