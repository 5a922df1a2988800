//! Subscriber handlers.

use std::fmt;
use std::sync::Arc;

/// A subscriber callback for payloads of type `T`.
///
/// Cloning shares the underlying closure; two handlers are equal when they
/// share it. Keep a clone around to unsubscribe later.
pub struct Handler<T> {
    inner: Arc<dyn Fn(&T) + Send + Sync>,
}

impl<T> Handler<T> {
    /// Wraps a closure.
    pub fn new(f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    /// Invokes the handler.
    pub fn call(&self, payload: &T) {
        (self.inner)(payload);
    }

    /// Identity of the shared closure.
    #[must_use]
    pub fn id(&self) -> HandlerId {
        HandlerId(Arc::as_ptr(&self.inner).cast::<()>() as usize)
    }
}

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Handler<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<T> Eq for Handler<T> {}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.id()).finish()
    }
}

/// Type-erased handler identity, used to unsubscribe across streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);
