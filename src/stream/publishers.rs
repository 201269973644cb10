//! Primitive publisher constructors

use super::{Flow, Publisher, Subscriber};
use crate::{Result, StreamError};

pub use super::bridge::from_stream;

/// Publisher that completes immediately
pub fn empty<T: 'static>() -> Publisher<T> {
    Publisher::new(|subscriber| subscriber.on_complete())
}

/// Publisher of a literal sequence
pub fn of<T: Send + 'static>(items: Vec<T>) -> Publisher<T> {
    from_iter(items)
}

/// Publisher that fails immediately with `error`
pub fn error<T: 'static>(error: StreamError) -> Publisher<T> {
    Publisher::new(move |subscriber| subscriber.on_error(error))
}

/// Publisher draining an iterator, which may be infinite
pub fn from_iter<I>(items: I) -> Publisher<I::Item>
where
    I: IntoIterator + Send + 'static,
    I::Item: 'static,
{
    Publisher::new(move |subscriber| {
        for item in items {
            if subscriber.on_next(item).is_cancel() {
                return;
            }
        }
        subscriber.on_complete();
    })
}

/// Publisher pulling items from `next` until it returns `Ok(None)` or an error.
///
/// The closure runs on whichever thread drives the subscription, so it may
/// block on I/O.
pub fn generate<T, F>(mut next: F) -> Publisher<T>
where
    T: 'static,
    F: FnMut() -> Result<Option<T>> + Send + 'static,
{
    Publisher::new(move |subscriber| {
        loop {
            match next() {
                Ok(Some(item)) => {
                    if subscriber.on_next(item) == Flow::Cancel {
                        return;
                    }
                }
                Ok(None) => return subscriber.on_complete(),
                Err(e) => return subscriber.on_error(e),
            }
        }
    })
}

/// Publisher that defers construction of the real publisher until subscription
pub fn defer<T, F>(make: F) -> Publisher<T>
where
    T: 'static,
    F: FnOnce() -> Result<Publisher<T>> + Send + 'static,
{
    Publisher::new(move |subscriber: &mut dyn Subscriber<T>| match make() {
        Ok(publisher) => publisher.subscribe(subscriber),
        Err(e) => subscriber.on_error(e),
    })
}
