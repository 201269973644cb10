//! Stock synchronous operators

use super::{Flow, Op, Publisher, Subscriber};
use crate::{Result, StreamError};

/// Apply `f` to every item, 1:1, preserving order
pub fn map<A, B, F>(mut f: F) -> Op<A, B>
where
    A: 'static,
    B: 'static,
    F: FnMut(A) -> B + Send + 'static,
{
    try_map(move |item| Ok(f(item)))
}

/// Apply a fallible `f` to every item.
///
/// The first error terminates the stream downstream and cancels upstream.
pub fn try_map<A, B, F>(f: F) -> Op<A, B>
where
    A: 'static,
    B: 'static,
    F: FnMut(A) -> Result<B> + Send + 'static,
{
    Op::new(move |source: Publisher<A>| {
        Publisher::new(move |downstream| {
            source.subscribe(&mut MapSubscriber { downstream, f, done: false })
        })
    })
}

struct MapSubscriber<'a, B, F> {
    downstream: &'a mut dyn Subscriber<B>,
    f: F,
    done: bool,
}

impl<A, B, F> Subscriber<A> for MapSubscriber<'_, B, F>
where
    F: FnMut(A) -> Result<B>,
{
    fn on_next(&mut self, item: A) -> Flow {
        if self.done {
            return Flow::Cancel;
        }
        match (self.f)(item) {
            Ok(mapped) => self.downstream.on_next(mapped),
            Err(e) => {
                self.done = true;
                self.downstream.on_error(e);
                Flow::Cancel
            }
        }
    }

    fn on_complete(&mut self) {
        if !std::mem::replace(&mut self.done, true) {
            self.downstream.on_complete();
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if !std::mem::replace(&mut self.done, true) {
            self.downstream.on_error(error);
        }
    }
}

/// Transform each item into a nested publisher that is drained in order.
///
/// `f` lives for the whole subscription, so it may carry state between items.
pub fn flat_map<A, B, F>(f: F) -> Op<A, B>
where
    A: 'static,
    B: 'static,
    F: FnMut(A) -> Publisher<B> + Send + 'static,
{
    Op::new(move |source: Publisher<A>| {
        Publisher::new(move |downstream| {
            source.subscribe(&mut FlatMapSubscriber { downstream, f, done: false })
        })
    })
}

/// Concatenate a publisher of publishers in arrival order
pub fn flatten<T: 'static>() -> Op<Publisher<T>, T> {
    flat_map(|inner| inner)
}

struct FlatMapSubscriber<'a, B, F> {
    downstream: &'a mut dyn Subscriber<B>,
    f: F,
    done: bool,
}

impl<A, B: 'static, F> Subscriber<A> for FlatMapSubscriber<'_, B, F>
where
    F: FnMut(A) -> Publisher<B>,
{
    fn on_next(&mut self, item: A) -> Flow {
        if self.done {
            return Flow::Cancel;
        }

        let inner = (self.f)(item);
        let mut relay =
            InnerRelay { downstream: &mut *self.downstream, state: InnerState::Running };
        inner.subscribe(&mut relay);

        match relay.state {
            InnerState::Running | InnerState::Completed => Flow::Continue,
            InnerState::Cancelled | InnerState::Failed => {
                self.done = true;
                Flow::Cancel
            }
        }
    }

    fn on_complete(&mut self) {
        if !std::mem::replace(&mut self.done, true) {
            self.downstream.on_complete();
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if !std::mem::replace(&mut self.done, true) {
            self.downstream.on_error(error);
        }
    }
}

enum InnerState {
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Forwards a nested publisher's items; its completion is not forwarded
struct InnerRelay<'a, B> {
    downstream: &'a mut dyn Subscriber<B>,
    state: InnerState,
}

impl<B> Subscriber<B> for InnerRelay<'_, B> {
    fn on_next(&mut self, item: B) -> Flow {
        let flow = self.downstream.on_next(item);
        if flow.is_cancel() {
            self.state = InnerState::Cancelled;
        }
        flow
    }

    fn on_complete(&mut self) {
        self.state = InnerState::Completed;
    }

    fn on_error(&mut self, error: StreamError) {
        self.state = InnerState::Failed;
        self.downstream.on_error(error);
    }
}

/// Pass through the first `n` items, then complete and cancel upstream
pub fn take<T: 'static>(n: u64) -> Op<T, T> {
    Op::new(move |source: Publisher<T>| {
        Publisher::new(move |downstream| {
            if n == 0 {
                return downstream.on_complete();
            }
            source.subscribe(&mut TakeSubscriber { downstream, remaining: n, done: false })
        })
    })
}

struct TakeSubscriber<'a, T> {
    downstream: &'a mut dyn Subscriber<T>,
    remaining: u64,
    done: bool,
}

impl<T> Subscriber<T> for TakeSubscriber<'_, T> {
    fn on_next(&mut self, item: T) -> Flow {
        if self.done {
            return Flow::Cancel;
        }

        self.remaining -= 1;
        let flow = self.downstream.on_next(item);
        if self.remaining > 0 {
            return flow;
        }

        self.done = true;
        if flow == Flow::Continue {
            self.downstream.on_complete();
        }
        Flow::Cancel
    }

    fn on_complete(&mut self) {
        if !std::mem::replace(&mut self.done, true) {
            self.downstream.on_complete();
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if !std::mem::replace(&mut self.done, true) {
            self.downstream.on_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::publishers;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that counts how many items it actually produced
    fn counting_source(limit: usize, produced: Arc<AtomicUsize>) -> Publisher<usize> {
        Publisher::new(move |subscriber| {
            for i in 0..limit {
                produced.fetch_add(1, Ordering::SeqCst);
                if subscriber.on_next(i).is_cancel() {
                    return;
                }
            }
            subscriber.on_complete();
        })
    }

    #[test]
    fn map_preserves_order() {
        let items = publishers::of(vec![3, 1, 2]).pipe(map(|x: i32| -x)).collect().unwrap();
        assert_eq!(items, vec![-3, -1, -2]);
    }

    #[test]
    fn try_map_error_cancels_upstream() {
        let produced = Arc::new(AtomicUsize::new(0));
        let result = counting_source(100, Arc::clone(&produced))
            .pipe(try_map(|x: usize| {
                if x == 4 {
                    Err(StreamError::transform("decode", anyhow::anyhow!("bad frame")))
                } else {
                    Ok(x)
                }
            }))
            .collect();

        assert!(matches!(result, Err(StreamError::Transform { .. })));
        assert_eq!(produced.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn flat_map_keeps_state_between_items() {
        let mut total = 0;
        let items = publishers::of(vec![1, 2, 3])
            .pipe(flat_map(move |x: u32| {
                total += x;
                publishers::of(vec![total; x as usize])
            }))
            .collect()
            .unwrap();

        assert_eq!(items, vec![1, 3, 3, 6, 6, 6]);
    }

    #[test]
    fn flat_map_inner_error_is_terminal() {
        let produced = Arc::new(AtomicUsize::new(0));
        let result = counting_source(10, Arc::clone(&produced))
            .pipe(flat_map(|x: usize| {
                if x == 2 {
                    publishers::error(StreamError::channel_failed("inner"))
                } else {
                    publishers::of(vec![x])
                }
            }))
            .collect();

        assert!(result.is_err());
        assert_eq!(produced.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn flatten_concatenates_in_arrival_order() {
        let nested = publishers::of(vec![
            publishers::of(vec![1, 2]),
            publishers::empty(),
            publishers::of(vec![3]),
        ]);
        assert_eq!(nested.pipe(flatten()).collect().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn take_cancels_infinite_upstream() {
        let items = publishers::from_iter(0u64..).pipe(take(5)).collect().unwrap();
        assert_eq!(items, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn take_stops_production_at_source() {
        let produced = Arc::new(AtomicUsize::new(0));
        let items = counting_source(1000, Arc::clone(&produced)).pipe(take(3)).collect().unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(produced.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn take_zero_never_subscribes_upstream() {
        let produced = Arc::new(AtomicUsize::new(0));
        let items = counting_source(10, Arc::clone(&produced)).pipe(take(0)).collect().unwrap();

        assert!(items.is_empty());
        assert_eq!(produced.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn take_inside_flat_map_cancels_outer() {
        let items = publishers::from_iter(0u32..)
            .pipe(flat_map(|x: u32| publishers::of(vec![x, x])))
            .pipe(take(3))
            .collect()
            .unwrap();
        assert_eq!(items, vec![0, 0, 1]);
    }

    proptest! {
        #[test]
        fn prop_take_emits_at_most_n_and_completes(
            len in 0usize..200,
            n in 0u64..250
        ) {
            let items = publishers::from_iter(0..len).pipe(take(n)).collect();
            prop_assert!(items.is_ok());
            let items = items.unwrap();
            prop_assert_eq!(items.len() as u64, (len as u64).min(n));
            prop_assert!(items.iter().enumerate().all(|(i, &x)| i == x));
        }
    }
}
