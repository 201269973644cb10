//! Conversions between publishers and `futures` streams

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use super::{Flow, Publisher, Subscriber};
use crate::{Result, StreamError};

/// Publisher driving a `futures` stream to completion on the subscribing thread.
///
/// The stream is polled with a local executor, so it must not rely on a tokio
/// reactor; channel-backed streams such as `ReceiverStream` are fine.
pub fn from_stream<S>(stream: S) -> Publisher<S::Item>
where
    S: Stream + Send + Unpin + 'static,
    S::Item: 'static,
{
    Publisher::new(move |subscriber| {
        for item in futures::executor::block_on_stream(stream) {
            if subscriber.on_next(item).is_cancel() {
                return;
            }
        }
        subscriber.on_complete();
    })
}

impl<T: Send + 'static> Publisher<T> {
    /// Subscribe on a background thread and expose the items as an async stream.
    ///
    /// The stream yields `Ok` items followed by at most one `Err`. Dropping it
    /// cancels the subscription.
    pub fn into_stream(self, capacity: usize) -> Result<ReceiverStream<Result<T>>> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        std::thread::Builder::new()
            .name("stream_bridge".to_string())
            .spawn(move || {
                let mut forwarder = Forwarder { tx };
                self.subscribe(&mut forwarder);
                debug!("Bridged publisher finished");
            })
            .map_err(|e| {
                StreamError::worker_failed("stream_bridge", "failed to spawn thread", Some(e))
            })?;
        Ok(ReceiverStream::new(rx))
    }
}

struct Forwarder<T> {
    tx: mpsc::Sender<Result<T>>,
}

impl<T> Subscriber<T> for Forwarder<T> {
    fn on_next(&mut self, item: T) -> Flow {
        match self.tx.blocking_send(Ok(item)) {
            Ok(()) => Flow::Continue,
            Err(_) => Flow::Cancel,
        }
    }

    fn on_complete(&mut self) {}

    fn on_error(&mut self, error: StreamError) {
        let _ = self.tx.blocking_send(Err(error));
    }
}
