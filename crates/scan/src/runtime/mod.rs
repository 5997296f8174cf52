use std::sync::Arc;

use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{info, warn};

use crate::error::ScanError;
use crate::hub::EventHub;
use crate::traits::BoxScanner;
use crate::types::{
    BoxName, ErrorCause, ErrorEvent, QUEUE_DRAIN_ACTION, START_ACTION, ScanRequest,
};

pub mod invoker;
pub mod queue;

pub use invoker::{HubFor, ScanInvoker};
pub use queue::{CONCURRENCY_LIMIT, DrainReport, DrainSignal, QueuedTask, WorkQueue};

/// Scans every requested box, one after another, and returns the hub their
/// events are published on.
///
/// The hub comes back before any work starts. On a `current_thread` runtime
/// scanning begins on the next scheduler turn, so handlers registered right
/// after this call see every event. On any other runtime flavor the scan is
/// held until [`EventHub::start`] is called; register handlers first, then
/// start. [`scan_boxes_with`] does both in one call.
///
/// `end` is always emitted exactly once, whatever happens to the individual
/// boxes. Called outside a Tokio runtime, the returned hub has already
/// emitted a `scan.start` error and `end`, and no box is scanned.
pub fn scan_boxes<B: BoxScanner>(
    scanner: Arc<B>,
    request: ScanRequest<B::Connection>,
) -> Arc<HubFor<B>> {
    launch(scanner, request, |hub, flavor| {
        if flavor == Some(RuntimeFlavor::CurrentThread) {
            hub.start();
        }
    })
}

/// Like [`scan_boxes`], but runs `setup` on the hub before the scan is
/// spawned, so handlers it registers see every event on any runtime flavor.
pub fn scan_boxes_with<B: BoxScanner>(
    scanner: Arc<B>,
    request: ScanRequest<B::Connection>,
    setup: impl FnOnce(&HubFor<B>),
) -> Arc<HubFor<B>> {
    launch(scanner, request, |hub, _| {
        setup(hub);
        hub.start();
    })
}

fn launch<B: BoxScanner>(
    scanner: Arc<B>,
    request: ScanRequest<B::Connection>,
    setup: impl FnOnce(&HubFor<B>, Option<RuntimeFlavor>),
) -> Arc<HubFor<B>> {
    let ScanRequest {
        connection,
        boxes,
        options,
    } = request;

    let hub = Arc::new(EventHub::new(&boxes));
    let runtime = Handle::try_current();
    setup(&hub, runtime.as_ref().ok().map(Handle::runtime_flavor));

    match runtime {
        Ok(handle) => {
            let invoker = ScanInvoker::new(scanner, connection, options, Arc::clone(&hub));
            handle.spawn(drive(invoker, boxes, Arc::clone(&hub)));
        }
        Err(e) => {
            warn!(boxes = boxes.len(), "scan requested outside a tokio runtime: {e}");
            hub.emit_error(ErrorEvent {
                action: START_ACTION.to_string(),
                error: ErrorCause::Internal(ScanError::NoRuntime(e.to_string())),
                box_name: None,
            });
            hub.emit_end();
        }
    }
    hub
}

async fn drive<B: BoxScanner>(invoker: ScanInvoker<B>, boxes: Vec<BoxName>, hub: Arc<HubFor<B>>) {
    // Give the caller one turn to attach handlers, then wait for the release.
    tokio::task::yield_now().await;
    hub.started().await;

    let total = boxes.len();
    let queue = WorkQueue::start();
    for (index, box_name) in boxes.into_iter().enumerate() {
        if let Err(e) = queue.enqueue(invoker.task(index, box_name)) {
            warn!("failed to enqueue box scan: {e}");
            break;
        }
    }

    match queue.on_drain().wait().await {
        Ok(report) => info!(
            boxes = total,
            errored = report.errored,
            faulted = report.faulted,
            "all box scans settled"
        ),
        Err(e) => {
            warn!("work queue failed to drain cleanly: {e}");
            hub.emit_error(ErrorEvent {
                action: QUEUE_DRAIN_ACTION.to_string(),
                error: ErrorCause::Internal(e),
                box_name: None,
            });
        }
    }
    hub.emit_end();
}
