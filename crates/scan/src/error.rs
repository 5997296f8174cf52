use thiserror::Error;

use crate::types::BoxName;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("scanner event source for box {box_name} closed before end or error")]
    SourceClosed { box_name: BoxName },
    #[error("scan task for box {box_name} panicked: {message}")]
    TaskPanicked { box_name: BoxName, message: String },
    #[error("work queue closed: {0}")]
    QueueClosed(String),
    #[error("drain signal dropped before the queue emptied")]
    DrainDropped,
    #[error("no tokio runtime to run the scan on: {0}")]
    NoRuntime(String),
    #[error("logging setup failed: {0}")]
    Logging(String),
}
