use std::sync::Arc;

use crate::source::ScanEvents;
use crate::types::FetchSpec;

/// Scans one box over a shared connection.
///
/// `scan` must start work right away and report through the returned
/// receiver, finishing with exactly one `End` or `Error`. Only one scan runs
/// at a time, so implementations may assume exclusive use of the connection
/// for the duration of a call.
pub trait BoxScanner: Send + Sync + 'static {
    type Connection: Send + Sync + 'static;
    type Mailbox: Send + 'static;
    type Stream: Send + 'static;
    type Error: Send + 'static;

    fn scan(
        &self,
        connection: Arc<Self::Connection>,
        box_name: &str,
        range: &str,
        fetch: &FetchSpec,
    ) -> ScanEvents<Self::Mailbox, Self::Stream, Self::Error>;
}
