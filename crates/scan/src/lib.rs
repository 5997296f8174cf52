pub mod error;
pub mod hub;
pub mod logging;
pub mod runtime;
pub mod source;
pub mod traits;
pub mod types;

pub use error::ScanError;
pub use hub::EventHub;
pub use logging::{LogConfig, init_logging};
pub use runtime::{
    CONCURRENCY_LIMIT, DrainReport, DrainSignal, HubFor, QueuedTask, ScanInvoker, WorkQueue,
    scan_boxes, scan_boxes_with,
};
pub use source::{ScanEvents, ScannerSender, scanner_channel};
pub use traits::BoxScanner;
pub use types::{
    BoxEvent, BoxName, BoxStatus, DEFAULT_BODIES, DEFAULT_RANGE, ErrorCause, ErrorEvent,
    FetchSpec, MessageEvent, QUEUE_DRAIN_ACTION, SOURCE_CLOSED_ACTION, START_ACTION, ScanOptions, ScanRequest,
    ScannerEvent, SettleReason, TaskOutcome, TaskStatus, UnifiedEvent,
};
