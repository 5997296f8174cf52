use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

pub type BoxName = String;

/// Every message in natural order.
pub const DEFAULT_RANGE: &str = "1:*";
pub const DEFAULT_BODIES: &str = "HEADER.FIELDS (FROM TO SUBJECT DATE)";

/// Action reported when the work queue fails to drain cleanly.
pub const QUEUE_DRAIN_ACTION: &str = "queue.onEmpty";
/// Action reported when a scanner drops its event source without a terminal event.
pub const SOURCE_CLOSED_ACTION: &str = "scan.disconnected";
/// Action reported when a scan could not be started at all.
pub const START_ACTION: &str = "scan.start";

/// What to fetch for each message. The default is a header-only projection
/// with the body structure included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSpec {
    pub bodies: String,
    #[serde(rename = "struct")]
    pub structure: bool,
}

impl Default for FetchSpec {
    fn default() -> Self {
        Self {
            bodies: DEFAULT_BODIES.to_string(),
            structure: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub range: String,
    pub fetch: FetchSpec,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            range: DEFAULT_RANGE.to_string(),
            fetch: FetchSpec::default(),
        }
    }
}

/// Input to [`crate::scan_boxes`]. The connection is handed to the scanner
/// as-is for every box; this crate never touches it.
#[derive(Debug)]
pub struct ScanRequest<C> {
    pub connection: Arc<C>,
    pub boxes: Vec<BoxName>,
    pub options: ScanOptions,
}

impl<C> ScanRequest<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            connection,
            boxes: Vec::new(),
            options: ScanOptions::default(),
        }
    }

    pub fn boxes<I, T>(mut self, boxes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<BoxName>,
    {
        self.boxes = boxes.into_iter().map(Into::into).collect();
        self
    }

    pub fn range(mut self, range: impl Into<String>) -> Self {
        self.options.range = range.into();
        self
    }

    pub fn fetch(mut self, fetch: FetchSpec) -> Self {
        self.options.fetch = fetch;
        self
    }

    pub fn options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }
}

/// Events a scanner emits while scanning a single box.
#[derive(Debug, Clone)]
pub enum ScannerEvent<M, S, E> {
    Opened(M),
    Closed(M),
    Message { sequence_number: u32, stream: S },
    Error { action: String, error: E },
    End,
}

#[derive(Debug, Clone)]
pub struct BoxEvent<M> {
    pub box_name: BoxName,
    pub mailbox: M,
}

#[derive(Debug, Clone)]
pub struct MessageEvent<S> {
    pub sequence_number: u32,
    pub box_name: BoxName,
    pub stream: S,
}

#[derive(Debug, Clone)]
pub enum ErrorCause<E> {
    /// The scanner's own error value, unmodified.
    Scan(E),
    Internal(ScanError),
}

#[derive(Debug, Clone)]
pub struct ErrorEvent<E> {
    pub action: String,
    pub error: ErrorCause<E>,
    /// `None` for queue-level faults that belong to no single box.
    pub box_name: Option<BoxName>,
}

#[derive(Debug, Clone)]
pub enum UnifiedEvent<M, S, E> {
    Opened(BoxEvent<M>),
    Closed(BoxEvent<M>),
    Message(MessageEvent<S>),
    Error(ErrorEvent<E>),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxStatus {
    pub box_name: BoxName,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleReason {
    Ended,
    /// The scanner reported an error; it was republished and the queue moves on.
    Errored,
}

/// How a single scan task finished, as seen by the work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Settled(SettleReason),
    Faulted(ScanError),
}
