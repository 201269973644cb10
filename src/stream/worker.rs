//! Worker-thread boundary with a bounded queue

use tracing::{debug, trace};

use super::upstream::{Signal, Upstream};
use super::{Op, Publisher, Subscriber, publishers};

/// Decouple upstream production from downstream consumption.
///
/// Upstream is subscribed on a dedicated thread called `name` and pushes into
/// a FIFO queue holding at most `capacity` items; when the queue is full the
/// producing thread blocks until the consumer drains it. The subscribing
/// thread drains up to `capacity` queued items and emits them as one batch
/// publisher, so the stage is normally followed by [`flatten`](super::flatten):
///
/// ```rust
/// use framewire::stream::{flatten, publishers, threaded_worker};
///
/// let items = publishers::from_iter(0..1000u32)
///     .pipe(threaded_worker("example", 16))
///     .pipe(flatten())
///     .collect()
///     .unwrap();
/// assert_eq!(items, (0..1000).collect::<Vec<_>>());
/// ```
///
/// Cancelling downstream closes the queue; a producer blocked on it is woken
/// and stops at once, one blocked inside its own source stops at its next item.
pub fn threaded_worker<T>(name: impl Into<String>, capacity: usize) -> Op<T, Publisher<T>>
where
    T: Send + 'static,
{
    let name = name.into();
    let capacity = capacity.max(1);
    Op::new(move |source: Publisher<T>| {
        Publisher::new(move |downstream: &mut dyn Subscriber<Publisher<T>>| {
            let mut upstream = match Upstream::spawn(&name, capacity, source) {
                Ok(upstream) => upstream,
                Err(e) => return downstream.on_error(e),
            };

            loop {
                let mut batch = Vec::with_capacity(capacity);
                let mut terminal = match upstream.recv() {
                    Some(Signal::Next(item)) => {
                        batch.push(item);
                        None
                    }
                    Some(signal) => Some(signal),
                    None => return downstream.on_error(upstream.lost()),
                };

                while terminal.is_none() && batch.len() < capacity {
                    match upstream.try_recv() {
                        Some(Signal::Next(item)) => batch.push(item),
                        Some(signal) => terminal = Some(signal),
                        None => break,
                    }
                }

                if !batch.is_empty() {
                    trace!(worker = %name, items = batch.len(), "Draining batch");
                    if downstream.on_next(publishers::of(batch)).is_cancel() {
                        debug!(worker = %name, "Downstream cancelled worker");
                        return;
                    }
                }

                match terminal {
                    None | Some(Signal::Next(_)) => continue,
                    Some(Signal::Complete) => {
                        debug!(worker = %name, "Upstream completed");
                        upstream.finish();
                        return downstream.on_complete();
                    }
                    Some(Signal::Error(e)) => {
                        debug!(worker = %name, error = %e, "Upstream failed");
                        upstream.finish();
                        return downstream.on_error(e);
                    }
                }
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StreamError;
    use crate::stream::{flatten, map, take};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn preserves_order_across_thousands_of_items() {
        let items = publishers::from_iter(0..20_000u32)
            .pipe(threaded_worker("order", 8))
            .pipe(flatten())
            .collect()
            .unwrap();

        assert_eq!(items, (0..20_000).collect::<Vec<_>>());
    }

    #[test]
    fn preserves_order_with_slow_consumer() {
        let items = publishers::from_iter(0..500u32)
            .pipe(threaded_worker("slow", 4))
            .pipe(flatten())
            .pipe(map(|x: u32| {
                if x % 50 == 0 {
                    std::thread::sleep(Duration::from_millis(1));
                }
                x
            }))
            .collect()
            .unwrap();

        assert_eq!(items, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn producer_runs_on_named_thread() {
        let names = publishers::generate({
            let mut sent = false;
            move || {
                let name = std::thread::current().name().map(str::to_string);
                Ok((!std::mem::replace(&mut sent, true)).then_some(name))
            }
        })
        .pipe(threaded_worker("decoder_worker", 4))
        .pipe(flatten())
        .collect()
        .unwrap();

        assert_eq!(names, vec![Some("decoder_worker".to_string())]);
    }

    #[test]
    fn full_queue_blocks_producer() {
        let produced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&produced);
        let source = publishers::from_iter((0..1000u32).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let mut observed_backlog = 0;
        let mut first = true;
        let outcome = source
            .pipe(threaded_worker("bounded", 4))
            .pipe(flatten())
            .for_each(|_| {
                if first {
                    first = false;
                    std::thread::sleep(Duration::from_millis(50));
                    observed_backlog = produced.load(Ordering::SeqCst);
                }
            });

        assert!(outcome.is_ok());
        // queue (4) + one batch in hand + one item blocked in send
        assert!(observed_backlog <= 4 + 4 + 2, "producer ran ahead: {observed_backlog}");
    }

    #[test]
    fn batches_never_exceed_capacity() {
        let sizes = publishers::from_iter(0u64..)
            .pipe(threaded_worker("batches", 4))
            .pipe(map(|batch: Publisher<u64>| batch.collect().map(|items| items.len())))
            .pipe(take(5_000))
            .collect()
            .unwrap();

        assert_eq!(sizes.len(), 5_000);
        for size in sizes {
            let size = size.unwrap();
            assert!((1..=4).contains(&size), "batch of {size} items");
        }
    }

    #[test]
    fn cancellation_stops_producer() {
        let produced = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&produced);
        let source = publishers::from_iter((0u64..).inspect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let items = source
            .pipe(threaded_worker("cancel", 16))
            .pipe(flatten())
            .pipe(take(10))
            .collect()
            .unwrap();
        assert_eq!(items, (0..10).collect::<Vec<_>>());

        std::thread::sleep(Duration::from_millis(50));
        let after_cancel = produced.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(produced.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn upstream_error_crosses_boundary() {
        let source = publishers::of(vec![1u8, 2])
            .pipe(crate::stream::flat_map(|x: u8| {
                if x == 2 {
                    publishers::error(StreamError::channel_failed("gone"))
                } else {
                    publishers::of(vec![x])
                }
            }));

        let mut seen = Vec::new();
        let result = source
            .pipe(threaded_worker("errors", 4))
            .pipe(flatten())
            .for_each(|x| seen.push(x));

        assert!(matches!(result, Err(StreamError::Channel { .. })));
        assert_eq!(seen, vec![1]);
    }

    #[test]
    fn producer_panic_surfaces_as_worker_error() {
        let source = Publisher::new(|subscriber: &mut dyn Subscriber<u8>| {
            let _ = subscriber.on_next(1);
            panic!("source exploded");
        });

        let result = source.pipe(threaded_worker("panicky", 4)).pipe(flatten()).collect();
        assert!(matches!(result, Err(StreamError::Worker { .. })));
    }
}
