//! Push-based stream composition engine.
//!
//! A [`Publisher`] is a cold, single-subscription producer: building one does
//! no work, and everything happens inside [`Publisher::subscribe`], on the
//! caller's thread, unless a [`threaded_worker`], [`timer_breaker`] or
//! [`repeat_if`] stage sits in the chain. A [`Subscriber`] receives items and exactly one
//! terminal signal; returning [`Flow::Cancel`] from `on_next` asks the
//! producer to stop and send nothing further.
//!
//! Operators ([`Op`]) turn one publisher into another and compose
//! left-to-right:
//!
//! ```rust
//! use framewire::stream::{map, publishers, take};
//!
//! let items = publishers::from_iter(1..)
//!     .pipe(map(|x: u32| x * 10))
//!     .pipe(take(3))
//!     .collect()
//!     .unwrap();
//! assert_eq!(items, vec![10, 20, 30]);
//! ```
//!
//! Subscribing must not happen from inside an async runtime: worker stages
//! block the calling thread. Use [`Publisher::into_stream`] to consume a
//! pipeline from async code.

mod bridge;
mod ops;
pub mod publishers;
mod repeat;
mod timer;
mod upstream;
mod worker;

pub use ops::{flat_map, flatten, map, take, try_map};
pub use repeat::repeat_if;
pub use timer::timer_breaker;
pub use worker::threaded_worker;

use crate::{Result, StreamError};

/// Demand signal returned by [`Subscriber::on_next`]
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep producing
    Continue,
    /// Stop producing and release resources; no terminal signal follows
    Cancel,
}

impl Flow {
    pub fn is_cancel(self) -> bool {
        self == Flow::Cancel
    }
}

/// Consumption half of the stream contract.
///
/// A publisher calls `on_next` zero or more times and then exactly one of
/// `on_complete` / `on_error`, unless the subscriber cancelled.
pub trait Subscriber<T> {
    fn on_next(&mut self, item: T) -> Flow;

    fn on_complete(&mut self);

    fn on_error(&mut self, error: StreamError);
}

type Produce<T> = Box<dyn FnOnce(&mut dyn Subscriber<T>) + Send>;

/// Production half of the stream contract. Single use and move-only.
pub struct Publisher<T> {
    produce: Produce<T>,
}

impl<T: 'static> Publisher<T> {
    /// Create a publisher from its production logic.
    ///
    /// `produce` runs once, when the publisher is subscribed.
    pub fn new<F>(produce: F) -> Self
    where
        F: FnOnce(&mut dyn Subscriber<T>) + Send + 'static,
    {
        Self { produce: Box::new(produce) }
    }

    /// Run the production logic against `subscriber`.
    ///
    /// Returns once the stream terminated or the subscriber cancelled.
    pub fn subscribe(self, subscriber: &mut dyn Subscriber<T>) {
        (self.produce)(subscriber)
    }

    /// Apply an operator
    pub fn pipe<U: 'static>(self, op: Op<T, U>) -> Publisher<U> {
        op.apply(self)
    }

    /// Drain the stream, calling `f` for every item
    pub fn for_each<F>(self, mut f: F) -> Result<()>
    where
        F: FnMut(T),
    {
        self.try_for_each(|item| {
            f(item);
            Ok(())
        })
    }

    /// Drain the stream with a fallible consumer.
    ///
    /// The first error returned by `f` cancels the stream and is returned.
    pub fn try_for_each<F>(self, f: F) -> Result<()>
    where
        F: FnMut(T) -> Result<()>,
    {
        let mut sink = ForEach { f, outcome: None };
        self.subscribe(&mut sink);
        sink.outcome.unwrap_or(Ok(()))
    }

    /// Drain the stream into a vector
    pub fn collect(self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        self.for_each(|item| items.push(item))?;
        Ok(items)
    }
}

impl<T> std::fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").finish_non_exhaustive()
    }
}

struct ForEach<F> {
    f: F,
    outcome: Option<Result<()>>,
}

impl<T, F> Subscriber<T> for ForEach<F>
where
    F: FnMut(T) -> Result<()>,
{
    fn on_next(&mut self, item: T) -> Flow {
        match (self.f)(item) {
            Ok(()) => Flow::Continue,
            Err(e) => {
                self.outcome = Some(Err(e));
                Flow::Cancel
            }
        }
    }

    fn on_complete(&mut self) {
        self.outcome.get_or_insert(Ok(()));
    }

    fn on_error(&mut self, error: StreamError) {
        self.outcome.get_or_insert(Err(error));
    }
}

/// A composable transform from `Publisher<A>` to `Publisher<B>`
pub struct Op<A, B> {
    apply: Box<dyn FnOnce(Publisher<A>) -> Publisher<B> + Send>,
}

impl<A: 'static, B: 'static> Op<A, B> {
    pub fn new<F>(apply: F) -> Self
    where
        F: FnOnce(Publisher<A>) -> Publisher<B> + Send + 'static,
    {
        Self { apply: Box::new(apply) }
    }

    pub fn apply(self, source: Publisher<A>) -> Publisher<B> {
        (self.apply)(source)
    }

    /// Compose with a following operator
    pub fn then<C: 'static>(self, next: Op<B, C>) -> Op<A, C> {
        Op::new(move |source| next.apply(self.apply(source)))
    }
}

impl<T: 'static> Op<T, T> {
    /// Operator that passes the publisher through untouched
    pub fn identity() -> Self {
        Op::new(|source| source)
    }
}
