//! Channel a scanner uses to report progress for one box.

use tokio::sync::mpsc;

use crate::types::ScannerEvent;

pub type ScanEvents<M, S, E> = mpsc::UnboundedReceiver<ScannerEvent<M, S, E>>;

/// Sending half handed to scanner implementations.
///
/// Sends after the receiver is gone are discarded: once a box has settled
/// nobody is listening anymore.
pub struct ScannerSender<M, S, E> {
    inner: mpsc::UnboundedSender<ScannerEvent<M, S, E>>,
}

impl<M, S, E> Clone for ScannerSender<M, S, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M, S, E> ScannerSender<M, S, E> {
    pub fn send(&self, event: ScannerEvent<M, S, E>) {
        let _ = self.inner.send(event);
    }

    pub fn opened(&self, mailbox: M) {
        self.send(ScannerEvent::Opened(mailbox));
    }

    pub fn closed(&self, mailbox: M) {
        self.send(ScannerEvent::Closed(mailbox));
    }

    pub fn message(&self, sequence_number: u32, stream: S) {
        self.send(ScannerEvent::Message {
            sequence_number,
            stream,
        });
    }

    pub fn error(&self, action: impl Into<String>, error: E) {
        self.send(ScannerEvent::Error {
            action: action.into(),
            error,
        });
    }

    pub fn end(&self) {
        self.send(ScannerEvent::End);
    }

    /// True once the receiving side has settled or been dropped.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

pub fn scanner_channel<M, S, E>() -> (ScannerSender<M, S, E>, ScanEvents<M, S, E>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ScannerSender { inner: tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_helpers_preserve_order() {
        let (tx, mut rx) = scanner_channel::<&str, &str, &str>();
        tx.opened("box");
        tx.message(7, "stream");
        tx.closed("box");
        tx.end();
        drop(tx);

        assert!(matches!(rx.recv().await, Some(ScannerEvent::Opened("box"))));
        assert!(matches!(
            rx.recv().await,
            Some(ScannerEvent::Message {
                sequence_number: 7,
                stream: "stream"
            })
        ));
        assert!(matches!(rx.recv().await, Some(ScannerEvent::Closed("box"))));
        assert!(matches!(rx.recv().await, Some(ScannerEvent::End)));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn sending_after_receiver_dropped_is_ignored() {
        let (tx, rx) = scanner_channel::<(), (), &str>();
        drop(rx);
        assert!(tx.is_closed());
        tx.error("fetch", "late");
    }
}
