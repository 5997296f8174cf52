//! Unified event surface returned to callers of [`crate::scan_boxes`].
//!
//! Each event kind has its own handler list. Handlers run synchronously, in
//! registration order, on whichever task publishes the event. A handler may
//! register further handlers (or call `subscribe`); those see the next event
//! of their kind, not the one being delivered.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{trace, warn};

use crate::types::{
    BoxEvent, BoxName, BoxStatus, ErrorEvent, MessageEvent, TaskStatus, UnifiedEvent,
};

type Handler<T> = Box<dyn FnMut(&T) + Send>;

struct Channel<T> {
    handlers: Mutex<Vec<Handler<T>>>,
}

impl<T> Channel<T> {
    fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    // Handlers are caller code; a panic in one must not wedge the hub.
    fn lock(&self) -> MutexGuard<'_, Vec<Handler<T>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self, handler: Handler<T>) {
        self.lock().push(handler);
    }

    /// The list is taken out of the lock while handlers run, so a handler can
    /// register on the same channel without deadlocking.
    fn publish(&self, event: &T) {
        let mut running = Running {
            channel: self,
            handlers: std::mem::take(&mut *self.lock()),
        };
        for handler in running.handlers.iter_mut() {
            handler(event);
        }
    }

    /// Takes the handlers out for good, leaving the channel empty.
    fn drain(&self) -> Vec<Handler<T>> {
        std::mem::take(&mut *self.lock())
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

/// Puts the taken handlers back in front of any registered meanwhile, also
/// when a handler unwinds.
struct Running<'a, T> {
    channel: &'a Channel<T>,
    handlers: Vec<Handler<T>>,
}

impl<T> Drop for Running<'_, T> {
    fn drop(&mut self) {
        let mut guard = self.channel.lock();
        let added = std::mem::take(&mut *guard);
        *guard = std::mem::take(&mut self.handlers);
        guard.extend(added);
    }
}

pub struct EventHub<M, S, E> {
    opened: Channel<BoxEvent<M>>,
    closed: Channel<BoxEvent<M>>,
    message: Channel<MessageEvent<S>>,
    error: Channel<ErrorEvent<E>>,
    end: Channel<()>,
    statuses: Mutex<Vec<BoxStatus>>,
    ended: AtomicBool,
    end_tx: watch::Sender<bool>,
    start_tx: watch::Sender<bool>,
}

impl<M, S, E> EventHub<M, S, E> {
    pub fn new(boxes: &[BoxName]) -> Self {
        let statuses = boxes
            .iter()
            .map(|box_name| BoxStatus {
                box_name: box_name.clone(),
                status: TaskStatus::Pending,
            })
            .collect();
        let (end_tx, _) = watch::channel(false);
        let (start_tx, _) = watch::channel(false);

        Self {
            opened: Channel::new(),
            closed: Channel::new(),
            message: Channel::new(),
            error: Channel::new(),
            end: Channel::new(),
            statuses: Mutex::new(statuses),
            ended: AtomicBool::new(false),
            end_tx,
            start_tx,
        }
    }

    /// Releases a scan that is held until its handlers are registered.
    /// Calling it more than once, or on a scan that already runs, is harmless.
    pub fn start(&self) {
        self.start_tx.send_replace(true);
    }

    pub(crate) async fn started(&self) {
        let mut rx = self.start_tx.subscribe();
        let _ = rx.wait_for(|started| *started).await;
    }

    pub fn on_opened(&self, handler: impl FnMut(&BoxEvent<M>) + Send + 'static) -> &Self {
        if !self.is_ended() {
            self.opened.add(Box::new(handler));
        }
        self
    }

    pub fn on_closed(&self, handler: impl FnMut(&BoxEvent<M>) + Send + 'static) -> &Self {
        if !self.is_ended() {
            self.closed.add(Box::new(handler));
        }
        self
    }

    pub fn on_message(&self, handler: impl FnMut(&MessageEvent<S>) + Send + 'static) -> &Self {
        if !self.is_ended() {
            self.message.add(Box::new(handler));
        }
        self
    }

    pub fn on_error(&self, handler: impl FnMut(&ErrorEvent<E>) + Send + 'static) -> &Self {
        if !self.is_ended() {
            self.error.add(Box::new(handler));
        }
        self
    }

    pub fn on_end(&self, mut handler: impl FnMut() + Send + 'static) -> &Self {
        if !self.is_ended() {
            self.end.add(Box::new(move |_: &()| handler()));
        }
        self
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Resolves once `end` has been emitted.
    pub async fn finished(&self) {
        let mut rx = self.end_tx.subscribe();
        let _ = rx.wait_for(|ended| *ended).await;
    }

    /// Status of every requested box, in request order.
    pub fn statuses(&self) -> Vec<BoxStatus> {
        self.lock_statuses().clone()
    }

    pub(crate) fn set_status(&self, index: usize, status: TaskStatus) {
        if let Some(entry) = self.lock_statuses().get_mut(index) {
            entry.status = status;
        }
    }

    pub(crate) fn emit_opened(&self, event: BoxEvent<M>) {
        if self.accepting("opened") {
            self.opened.publish(&event);
        }
    }

    pub(crate) fn emit_closed(&self, event: BoxEvent<M>) {
        if self.accepting("closed") {
            self.closed.publish(&event);
        }
    }

    pub(crate) fn emit_message(&self, event: MessageEvent<S>) {
        if self.accepting("message") {
            self.message.publish(&event);
        }
    }

    pub(crate) fn emit_error(&self, event: ErrorEvent<E>) {
        if self.accepting("error") {
            self.error.publish(&event);
        }
    }

    /// Emits `end` the first time it is called; later calls do nothing.
    /// Every handler is dropped afterwards. A panicking `end` handler does not
    /// keep the others from running or `finished` from resolving.
    pub(crate) fn emit_end(&self) {
        if self.ended.swap(true, Ordering::SeqCst) {
            trace!("end already emitted");
            return;
        }
        self.opened.clear();
        self.closed.clear();
        self.message.clear();
        self.error.clear();

        for mut handler in self.end.drain() {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(&()))).is_err() {
                warn!("end handler panicked");
            }
        }
        self.end_tx.send_replace(true);
    }

    fn accepting(&self, kind: &'static str) -> bool {
        let ended = self.is_ended();
        if ended {
            trace!(kind, "dropping event published after end");
        }
        !ended
    }

    fn lock_statuses(&self) -> MutexGuard<'_, Vec<BoxStatus>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M, S, E> EventHub<M, S, E>
where
    M: Clone + Send + 'static,
    S: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Every event, in publish order, as a channel. The channel closes right
    /// after `End` is delivered.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UnifiedEvent<M, S, E>> {
        let (tx, rx) = mpsc::unbounded_channel();

        let sender = tx.clone();
        self.on_opened(move |event| {
            let _ = sender.send(UnifiedEvent::Opened(event.clone()));
        });
        let sender = tx.clone();
        self.on_closed(move |event| {
            let _ = sender.send(UnifiedEvent::Closed(event.clone()));
        });
        let sender = tx.clone();
        self.on_message(move |event| {
            let _ = sender.send(UnifiedEvent::Message(event.clone()));
        });
        let sender = tx.clone();
        self.on_error(move |event| {
            let _ = sender.send(UnifiedEvent::Error(event.clone()));
        });
        self.on_end(move || {
            let _ = tx.send(UnifiedEvent::End);
        });

        rx
    }
}
