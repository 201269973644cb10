//! Periodic re-emission of sticky items

use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};

use super::timer::timer_runtime;
use super::upstream::{Signal, Upstream};
use super::{Op, Publisher, Subscriber};

const REPEAT_IF: &str = "repeat_if";

/// Re-emit the latest item matching `predicate` every `interval`.
///
/// Every upstream item passes through. Once an item matches it is cached, and
/// whenever `interval` passes without it going out again the cached copy is
/// emitted, whether upstream is busy or idle. Late consumers (a decoder
/// joining a live channel) thereby receive infrequent state such as codec
/// metadata without the producer re-sending it.
///
/// Upstream runs on a dedicated thread (`repeat_if`) so the timer can fire
/// while it is silent. A zero `interval` re-emits the cached item before every
/// non-matching item instead of spinning.
pub fn repeat_if<T, P>(interval: Duration, mut predicate: P) -> Op<T, T>
where
    T: Clone + Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
{
    Op::new(move |source: Publisher<T>| {
        Publisher::new(move |downstream: &mut dyn Subscriber<T>| {
            let runtime = match timer_runtime(REPEAT_IF) {
                Ok(runtime) => runtime,
                Err(e) => return downstream.on_error(e),
            };
            let mut upstream = match Upstream::spawn(REPEAT_IF, 1, source) {
                Ok(upstream) => upstream,
                Err(e) => return downstream.on_error(e),
            };
            let mut cached: Option<(T, Instant)> = None;

            loop {
                let deadline = cached.as_ref().map(|(_, last)| *last + interval);
                let received = match deadline {
                    Some(deadline) if !interval.is_zero() => {
                        runtime.block_on(async { timeout_at(deadline, upstream.recv_async()).await })
                    }
                    _ => Ok(runtime.block_on(upstream.recv_async())),
                };

                match received {
                    Err(_elapsed) => {
                        if let Some((item, last)) = &mut cached {
                            trace!("Upstream idle, re-emitting cached item");
                            *last = Instant::now();
                            if downstream.on_next(item.clone()).is_cancel() {
                                debug!("Downstream cancelled repeat_if");
                                return;
                            }
                        }
                    }
                    Ok(Some(Signal::Next(item))) => {
                        if predicate(&item) {
                            cached = Some((item.clone(), Instant::now()));
                        } else if let Some((cached_item, last)) = &mut cached {
                            if last.elapsed() >= interval {
                                *last = Instant::now();
                                if downstream.on_next(cached_item.clone()).is_cancel() {
                                    debug!("Downstream cancelled repeat_if");
                                    return;
                                }
                            }
                        }
                        if downstream.on_next(item).is_cancel() {
                            debug!("Downstream cancelled repeat_if");
                            return;
                        }
                    }
                    Ok(Some(Signal::Complete)) => {
                        upstream.finish();
                        return downstream.on_complete();
                    }
                    Ok(Some(Signal::Error(e))) => {
                        upstream.finish();
                        return downstream.on_error(e);
                    }
                    Ok(None) => return downstream.on_error(upstream.lost()),
                }
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StreamError;
    use crate::stream::{publishers, take};

    /// Emits `1`, stays silent for `gap`, then emits `2` and completes
    fn quiet_after_first(gap: Duration) -> Publisher<u32> {
        Publisher::new(move |subscriber: &mut dyn Subscriber<u32>| {
            if subscriber.on_next(1).is_cancel() {
                return;
            }
            std::thread::sleep(gap);
            if subscriber.on_next(2).is_cancel() {
                return;
            }
            subscriber.on_complete();
        })
    }

    #[test]
    fn zero_interval_repeats_before_every_item() {
        let items = publishers::of(vec!["meta", "f1", "f2"])
            .pipe(repeat_if(Duration::ZERO, |s: &&str| s.starts_with('m')))
            .collect()
            .unwrap();

        assert_eq!(items, vec!["meta", "meta", "f1", "meta", "f2"]);
    }

    #[test]
    fn long_interval_passes_items_through() {
        let items = publishers::of(vec!["meta", "f1", "f2"])
            .pipe(repeat_if(Duration::from_secs(3600), |s: &&str| s.starts_with('m')))
            .collect()
            .unwrap();

        assert_eq!(items, vec!["meta", "f1", "f2"]);
    }

    #[test]
    fn without_match_is_transparent() {
        let items = publishers::of(vec![1, 2, 3])
            .pipe(repeat_if(Duration::ZERO, |x: &i32| *x > 10))
            .collect()
            .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn idle_upstream_still_gets_repeats() {
        let items = quiet_after_first(Duration::from_millis(200))
            .pipe(repeat_if(Duration::from_millis(20), |x: &u32| *x == 1))
            .collect()
            .unwrap();

        assert_eq!(items.first(), Some(&1));
        assert_eq!(items.last(), Some(&2));
        let repeats = items.iter().filter(|&&x| x == 1).count() - 1;
        assert!((5..=10).contains(&repeats), "{repeats} repeats in {items:?}");
    }

    #[test]
    fn nothing_repeats_before_first_match() {
        let items = quiet_after_first(Duration::from_millis(60))
            .pipe(repeat_if(Duration::from_millis(10), |x: &u32| *x == 2))
            .collect()
            .unwrap();
        assert_eq!(items, vec![1, 2]);
    }

    #[test]
    fn downstream_cancel_stops_repeats() {
        let items = quiet_after_first(Duration::from_secs(5))
            .pipe(repeat_if(Duration::from_millis(5), |x: &u32| *x == 1))
            .pipe(take(4))
            .collect()
            .unwrap();
        assert_eq!(items, vec![1, 1, 1, 1]);
    }

    #[test]
    fn upstream_error_propagates() {
        let result = publishers::error::<u32>(StreamError::channel_failed("closed"))
            .pipe(repeat_if(Duration::from_millis(5), |_: &u32| true))
            .collect();
        assert!(matches!(result, Err(StreamError::Channel { .. })));
    }
}
