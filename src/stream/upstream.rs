//! Upstream half of a thread boundary.
//!
//! The upstream publisher is subscribed on a dedicated named thread and its
//! signals are pushed into a bounded `tokio::sync::mpsc` channel. A full
//! channel blocks the producing thread, which is the only backpressure the
//! engine applies. Dropping the [`Upstream`] cancels the token and closes the
//! channel, so a producer blocked on a full queue wakes up and stops.

use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Flow, Publisher, Subscriber};
use crate::{Result, StreamError};

/// Signal crossing the boundary
pub(crate) enum Signal<T> {
    Next(T),
    Complete,
    Error(StreamError),
}

/// Consuming end of a thread boundary
pub(crate) struct Upstream<T> {
    name: String,
    rx: mpsc::Receiver<Signal<T>>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Upstream<T> {
    /// Subscribe `source` on a new thread named `name`
    pub(crate) fn spawn(name: &str, capacity: usize, source: Publisher<T>) -> Result<Self> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut feeder = ChannelFeeder { tx, cancel: token };
                source.subscribe(&mut feeder);
            })
            .map_err(|e| StreamError::worker_failed(name, "failed to spawn thread", Some(e)))?;

        debug!(worker = name, capacity, "Upstream thread started");
        Ok(Self { name: name.to_string(), rx, cancel, handle: Some(handle) })
    }
}

impl<T> Upstream<T> {
    /// Block until the next signal. `None` means the producer thread died.
    pub(crate) fn recv(&mut self) -> Option<Signal<T>> {
        self.rx.blocking_recv()
    }

    /// Next already-queued signal, if any
    pub(crate) fn try_recv(&mut self) -> Option<Signal<T>> {
        self.rx.try_recv().ok()
    }

    /// Async variant of [`Upstream::recv`]
    pub(crate) async fn recv_async(&mut self) -> Option<Signal<T>> {
        self.rx.recv().await
    }

    /// Error reported when the producer thread vanished without a terminal signal
    pub(crate) fn lost(&self) -> StreamError {
        StreamError::worker_failed(&self.name, "upstream thread terminated unexpectedly", None)
    }

    /// Join the producer thread after its terminal signal was received
    pub(crate) fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(worker = %self.name, "Upstream thread panicked after terminal signal");
            }
        }
    }
}

impl<T> Drop for Upstream<T> {
    fn drop(&mut self) {
        if self.handle.is_some() {
            debug!(worker = %self.name, "Cancelling upstream thread");
        }
        self.cancel.cancel();
        self.rx.close();
    }
}

/// Subscriber living on the producer thread
struct ChannelFeeder<T> {
    tx: mpsc::Sender<Signal<T>>,
    cancel: CancellationToken,
}

impl<T> Subscriber<T> for ChannelFeeder<T> {
    fn on_next(&mut self, item: T) -> Flow {
        if self.cancel.is_cancelled() {
            return Flow::Cancel;
        }
        match self.tx.blocking_send(Signal::Next(item)) {
            Ok(()) => Flow::Continue,
            Err(_) => Flow::Cancel,
        }
    }

    fn on_complete(&mut self) {
        let _ = self.tx.blocking_send(Signal::Complete);
    }

    fn on_error(&mut self, error: StreamError) {
        let _ = self.tx.blocking_send(Signal::Error(error));
    }
}
