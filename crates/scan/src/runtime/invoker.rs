use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ScanError;
use crate::hub::EventHub;
use crate::runtime::queue::QueuedTask;
use crate::traits::BoxScanner;
use crate::types::{
    BoxEvent, BoxName, ErrorCause, ErrorEvent, MessageEvent, SOURCE_CLOSED_ACTION, ScanOptions,
    ScannerEvent, SettleReason, TaskOutcome, TaskStatus,
};

pub type HubFor<B> =
    EventHub<<B as BoxScanner>::Mailbox, <B as BoxScanner>::Stream, <B as BoxScanner>::Error>;

/// Runs single-box scans and republishes their events on the hub.
pub struct ScanInvoker<B: BoxScanner> {
    scanner: Arc<B>,
    connection: Arc<B::Connection>,
    options: Arc<ScanOptions>,
    hub: Arc<HubFor<B>>,
}

impl<B: BoxScanner> Clone for ScanInvoker<B> {
    fn clone(&self) -> Self {
        Self {
            scanner: Arc::clone(&self.scanner),
            connection: Arc::clone(&self.connection),
            options: Arc::clone(&self.options),
            hub: Arc::clone(&self.hub),
        }
    }
}

impl<B: BoxScanner> ScanInvoker<B> {
    pub fn new(
        scanner: Arc<B>,
        connection: Arc<B::Connection>,
        options: ScanOptions,
        hub: Arc<HubFor<B>>,
    ) -> Self {
        Self {
            scanner,
            connection,
            options: Arc::new(options),
            hub,
        }
    }

    /// Wraps the scan of the box at `index` in the request as a queue task.
    pub fn task(&self, index: usize, box_name: BoxName) -> QueuedTask {
        let invoker = self.clone();
        QueuedTask {
            box_name: box_name.clone(),
            run: Box::pin(async move { invoker.run(index, box_name).await }),
        }
    }

    /// A scanner error settles the task; it never counts as a queue failure.
    pub async fn run(&self, index: usize, box_name: BoxName) -> TaskOutcome {
        self.hub.set_status(index, TaskStatus::Running);
        debug!(box_name = %box_name, range = %self.options.range, "starting box scan");

        let mut events = self.scanner.scan(
            Arc::clone(&self.connection),
            &box_name,
            &self.options.range,
            &self.options.fetch,
        );

        let outcome = loop {
            let Some(event) = events.recv().await else {
                warn!(box_name = %box_name, "scanner dropped its event source without end or error");
                let fault = ScanError::SourceClosed {
                    box_name: box_name.clone(),
                };
                self.hub.emit_error(ErrorEvent {
                    action: SOURCE_CLOSED_ACTION.to_string(),
                    error: ErrorCause::Internal(fault.clone()),
                    box_name: Some(box_name.clone()),
                });
                break TaskOutcome::Faulted(fault);
            };

            match event {
                ScannerEvent::Opened(mailbox) => self.hub.emit_opened(BoxEvent {
                    box_name: box_name.clone(),
                    mailbox,
                }),
                ScannerEvent::Closed(mailbox) => self.hub.emit_closed(BoxEvent {
                    box_name: box_name.clone(),
                    mailbox,
                }),
                ScannerEvent::Message {
                    sequence_number,
                    stream,
                } => self.hub.emit_message(MessageEvent {
                    sequence_number,
                    box_name: box_name.clone(),
                    stream,
                }),
                ScannerEvent::Error { action, error } => {
                    debug!(box_name = %box_name, action = %action, "box scan reported an error");
                    self.hub.emit_error(ErrorEvent {
                        action,
                        error: ErrorCause::Scan(error),
                        box_name: Some(box_name.clone()),
                    });
                    break TaskOutcome::Settled(SettleReason::Errored);
                }
                ScannerEvent::End => break TaskOutcome::Settled(SettleReason::Ended),
            }
        };

        // Dropping the receiver here discards anything sent after settlement.
        drop(events);
        self.hub.set_status(index, TaskStatus::Settled);
        debug!(box_name = %box_name, "box scan settled");
        outcome
    }
}
