//! Wall-clock bound on a stream

use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info};

use super::upstream::{Signal, Upstream};
use super::{Op, Publisher, Subscriber};
use crate::{Result, StreamError};

const TIMER_BREAKER: &str = "timer_breaker";

/// Current-thread runtime with only the time driver enabled
pub(super) fn timer_runtime(stage: &str) -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| StreamError::worker_failed(stage, "failed to build timer runtime", Some(e)))
}

/// Complete the stream once `duration` has elapsed since subscription.
///
/// Items arriving before the deadline pass through unchanged. When the
/// deadline fires the downstream is completed and upstream is cancelled,
/// even if upstream is blocked waiting for its own source. Upstream runs on
/// a dedicated thread (`timer_breaker`) for that reason.
pub fn timer_breaker<T>(duration: Duration) -> Op<T, T>
where
    T: Send + 'static,
{
    Op::new(move |source: Publisher<T>| {
        Publisher::new(move |downstream: &mut dyn Subscriber<T>| {
            let runtime = match timer_runtime(TIMER_BREAKER) {
                Ok(runtime) => runtime,
                Err(e) => return downstream.on_error(e),
            };
            let deadline = runtime.block_on(async { Instant::now() + duration });

            let mut upstream = match Upstream::spawn(TIMER_BREAKER, 1, source) {
                Ok(upstream) => upstream,
                Err(e) => return downstream.on_error(e),
            };

            loop {
                let signal = runtime.block_on(async { timeout_at(deadline, upstream.recv_async()).await });
                match signal {
                    Err(_elapsed) => {
                        info!(
                            limit_ms = duration.as_millis() as u64,
                            "Time limit reached, completing stream"
                        );
                        drop(upstream);
                        return downstream.on_complete();
                    }
                    Ok(Some(Signal::Next(item))) => {
                        if downstream.on_next(item).is_cancel() {
                            debug!("Downstream cancelled timer breaker");
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
