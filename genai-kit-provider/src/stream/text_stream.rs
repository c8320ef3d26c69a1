use super::event::Event;
use futures::Stream;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// Default capacity of the in-memory event queue.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// The producer half of a [`TextStream`].
///
/// Sends never block the decoder: when the queue is full, non-terminal
/// events are dropped silently (the delta stream is advisory), while
/// `Finish`/`Error` events fall back to a reserved terminal slot so the
/// consumer always observes termination.
pub struct EventSender {
    sender: mpsc::Sender<Event>,
    terminal: Arc<Mutex<Option<Event>>>,
    dropped: u64,
}

impl EventSender {
    /// Enqueues an event without blocking.
    pub fn send(&mut self, event: Event) {
        if event.is_terminal() {
            if let Err(TrySendError::Full(event)) = self.sender.try_send(event) {
                if let Ok(mut slot) = self.terminal.lock() {
                    *slot = Some(event);
                }
            }
        } else if let Err(TrySendError::Full(_)) = self.sender.try_send(event) {
            self.dropped = self.dropped.saturating_add(1);
        }
    }

    /// Number of non-terminal events dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// A backpressured stream of normalized [`Event`]s.
///
/// Backed by a bounded in-memory queue with a single producer (the adapter's
/// decoder task) and a single nominal consumer. Events are delivered in the
/// exact order the producer emitted them. Dropping or closing the stream
/// cancels the underlying work and releases the connection.
pub struct TextStream {
    receiver: mpsc::Receiver<Event>,
    terminal: Arc<Mutex<Option<Event>>>,
    cancel: CancellationToken,
    closed: bool,
}

impl TextStream {
    /// Creates a bounded stream and its producer half.
    ///
    /// `cancel` is cancelled when the stream is closed or dropped, which the
    /// producer task uses to abort the underlying connection.
    pub fn channel(capacity: usize, cancel: CancellationToken) -> (EventSender, TextStream) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let terminal = Arc::new(Mutex::new(None));
        (
            EventSender {
                sender,
                terminal: Arc::clone(&terminal),
                dropped: 0,
            },
            TextStream {
                receiver,
                terminal,
                cancel,
                closed: false,
            },
        )
    }

    /// Receives the next event, or `None` once the stream is exhausted.
    pub async fn next(&mut self) -> Option<Event> {
        match self.receiver.recv().await {
            Some(event) => Some(event),
            None => self.take_terminal(),
        }
    }

    /// Closes the stream, cancelling the underlying connection.
    ///
    /// Idempotent. Buffered events remain readable; the producer is
    /// unblocked and the channel closes within a bounded time.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.cancel.cancel();
            self.receiver.close();
        }
    }

    /// The token cancelled when this stream closes.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn take_terminal(&mut self) -> Option<Event> {
        match self.terminal.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        }
    }
}

impl Stream for TextStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(event)),
            Poll::Ready(None) => Poll::Ready(self.take_terminal()),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for TextStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
