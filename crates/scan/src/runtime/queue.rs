use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::types::{BoxName, SettleReason, TaskOutcome};

/// Sequence numbers drift and fetches interleave when two boxes are scanned
/// over one connection at the same time, so scans never overlap.
pub const CONCURRENCY_LIMIT: usize = 1;

pub struct QueuedTask {
    pub box_name: BoxName,
    pub run: BoxFuture<'static, TaskOutcome>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub settled: usize,
    /// Settled tasks whose scanner reported an error.
    pub errored: usize,
    pub faulted: usize,
}

type DrainResult = Result<DrainReport, ScanError>;

/// FIFO queue that runs at most [`CONCURRENCY_LIMIT`] tasks at a time.
pub struct WorkQueue {
    intake_tx: mpsc::UnboundedSender<QueuedTask>,
    drain_rx: oneshot::Receiver<DrainResult>,
}

impl WorkQueue {
    /// Starts the worker loop on the current tokio runtime.
    pub fn start() -> Self {
        let (intake_tx, intake_rx) = mpsc::unbounded_channel();
        let (drain_tx, drain_rx) = oneshot::channel();
        let permits = Arc::new(Semaphore::new(CONCURRENCY_LIMIT));

        tokio::spawn(async move {
            let result = run_worker(intake_rx, permits).await;
            let _ = drain_tx.send(result);
        });

        Self {
            intake_tx,
            drain_rx,
        }
    }

    pub fn enqueue(&self, task: QueuedTask) -> Result<(), ScanError> {
        self.intake_tx
            .send(task)
            .map_err(|_| ScanError::QueueClosed("work queue intake closed".to_string()))
    }

    /// Closes the intake and returns a signal that fires once every enqueued
    /// task has settled.
    pub fn on_drain(self) -> DrainSignal {
        let Self { intake_tx, drain_rx } = self;
        drop(intake_tx);
        DrainSignal { rx: drain_rx }
    }
}

pub struct DrainSignal {
    rx: oneshot::Receiver<DrainResult>,
}

impl DrainSignal {
    pub async fn wait(self) -> DrainResult {
        self.rx.await.map_err(|_| ScanError::DrainDropped)?
    }
}

type TaskResult = Result<TaskOutcome, String>;

async fn run_worker(
    mut intake_rx: mpsc::UnboundedReceiver<QueuedTask>,
    permits: Arc<Semaphore>,
) -> DrainResult {
    let mut running: Vec<(BoxName, JoinHandle<TaskResult>)> = Vec::new();

    while let Some(task) = intake_rx.recv().await {
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScanError::QueueClosed("concurrency limiter closed".to_string()))?;
        let box_name = task.box_name.clone();
        running.push((box_name, tokio::spawn(run_task(task, permit))));
    }

    let mut report = DrainReport::default();
    let mut fault = None;
    for (box_name, handle) in running {
        match handle.await {
            Ok(Ok(TaskOutcome::Settled(reason))) => {
                report.settled += 1;
                if reason == SettleReason::Errored {
                    report.errored += 1;
                }
            }
            Ok(Ok(TaskOutcome::Faulted(err))) => {
                warn!(box_name = %box_name, "scan task faulted: {err}");
                report.faulted += 1;
            }
            Ok(Err(message)) => {
                warn!(box_name = %box_name, "scan task panicked: {message}");
                fault.get_or_insert(ScanError::TaskPanicked { box_name, message });
            }
            Err(e) => {
                warn!(box_name = %box_name, "scan task join failure: {e}");
                fault.get_or_insert(ScanError::QueueClosed(format!(
                    "task join failure for {box_name}: {e}"
                )));
            }
        }
    }

    debug!(
        settled = report.settled,
        errored = report.errored,
        faulted = report.faulted,
        "work queue drained"
    );
    match fault {
        Some(err) => Err(err),
        None => Ok(report),
    }
}

async fn run_task(task: QueuedTask, _permit: OwnedSemaphorePermit) -> TaskResult {
    AssertUnwindSafe(task.run)
        .catch_unwind()
        .await
        .map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
