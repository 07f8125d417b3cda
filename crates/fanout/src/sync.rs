#![forbid(unsafe_code)]

//! Thread-safe dispatch.
//!
//! Mirrors [`Emitter`](crate::Emitter) and
//! [`Dispatcher`](crate::Dispatcher) behind `Arc<Mutex<..>>` for hosts
//! with more than one thread of control. All registry mutation and
//! snapshotting is serialized through one mutex per dispatcher; the
//! mutex is never held while a handler runs, so handlers may re-enter
//! the dispatcher without deadlocking and the snapshot rule matches the
//! single-threaded variants exactly.
//!
//! Handlers must be `Send + Sync + 'static`. Delivery is still fully
//! synchronous on the dispatching thread; nothing is queued or
//! rescheduled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{AggregateError, HandlerError, HandlerFailure};
use crate::subscription::{Subscription, SubscriptionId};

type Callback<P> = Arc<dyn Fn(&P) -> Result<(), HandlerError> + Send + Sync>;

struct Entry<P> {
    id: SubscriptionId,
    callback: Callback<P>,
}

// Manual Clone: shares the callback Arc without requiring P: Clone.
impl<P> Clone for Entry<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

struct EmitterInner<P> {
    channels: HashMap<String, Vec<Entry<P>>>,
    next_id: u64,
}

struct DispatcherInner<A> {
    handlers: Vec<Entry<A>>,
    next_id: u64,
}

/// Thread-safe keyed emitter. See [`crate::Emitter`] for semantics.
pub struct Emitter<P> {
    inner: Arc<Mutex<EmitterInner<P>>>,
}

// Manual Clone: shares the same Arc.
impl<P> Clone for Emitter<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> Default for Emitter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for Emitter<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Emitter")
            .field("events", &inner.channels.len())
            .field(
                "handlers",
                &inner.channels.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

impl<P> Emitter<P> {
    /// Create an emitter with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EmitterInner {
                channels: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EmitterInner<P>> {
        self.inner.lock().expect("emitter registry mutex poisoned")
    }

    /// Register an infallible handler for `event`.
    pub fn register<F>(&self, event: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.register_fallible(event, move |payload| {
            handler(payload);
            Ok(())
        })
    }

    /// Register a fallible handler for `event`. No deduplication:
    /// registering the same closure twice yields two deliveries.
    pub fn register_fallible<F>(&self, event: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&P) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let event = event.into();
        let id = {
            let mut inner = self.lock();
            let id = SubscriptionId(inner.next_id);
            inner.next_id += 1;
            inner.channels.entry(event.clone()).or_default().push(Entry {
                id,
                callback: Arc::new(handler),
            });
            id
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(event = %event, id = id.value(), "handler registered");
        Subscription::keyed(event, id)
    }

    /// Remove a registration; no-op if already removed. Removal during
    /// a dispatch takes effect for subsequent calls only.
    pub fn unregister(&self, subscription: &Subscription) {
        let Some(event) = subscription.event() else {
            return;
        };
        let mut inner = self.lock();
        let Some(entries) = inner.channels.get_mut(event) else {
            return;
        };
        entries.retain(|entry| entry.id != subscription.id());
        if entries.is_empty() {
            inner.channels.remove(event);
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(event = %event, id = subscription.id().value(), "handler unregistered");
    }

    /// Synchronously deliver `payload` to every handler registered for
    /// `event`, in registration order, against a snapshot taken under
    /// the lock. The lock is released before any handler runs.
    ///
    /// # Errors
    ///
    /// Returns an [`AggregateError`] wrapping every handler error from
    /// this call, in delivery order, after all handlers have run.
    pub fn dispatch(&self, event: &str, payload: &P) -> Result<(), AggregateError> {
        let snapshot: Vec<Entry<P>> = {
            let inner = self.lock();
            match inner.channels.get(event) {
                Some(entries) => entries.clone(),
                None => return Ok(()),
            }
        };
        #[cfg(feature = "tracing")]
        let _span =
            tracing::trace_span!("dispatch", event = %event, handlers = snapshot.len()).entered();
        deliver(&snapshot, payload, Some(event))
    }

    /// Number of handlers currently registered for `event`.
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.lock().channels.get(event).map_or(0, Vec::len)
    }

    /// True if no handlers are registered for any event.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().channels.is_empty()
    }
}

/// Thread-safe unfiltered dispatcher. See [`crate::Dispatcher`] for
/// semantics.
pub struct Dispatcher<A> {
    inner: Arc<Mutex<DispatcherInner<A>>>,
}

// Manual Clone: shares the same Arc.
impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> Default for Dispatcher<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.lock().handlers.len())
            .finish()
    }
}

impl<A> Dispatcher<A> {
    /// Create a dispatcher with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(DispatcherInner {
                handlers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DispatcherInner<A>> {
        self.inner
            .lock()
            .expect("dispatcher registry mutex poisoned")
    }

    /// Register an infallible handler.
    pub fn register<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.register_fallible(move |action| {
            handler(action);
            Ok(())
        })
    }

    /// Register a fallible handler.
    pub fn register_fallible<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&A) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.handlers.push(Entry {
            id,
            callback: Arc::new(handler),
        });
        #[cfg(feature = "tracing")]
        tracing::trace!(id = id.value(), "handler registered");
        Subscription::unkeyed(id)
    }

    /// Remove a registration; no-op if already removed.
    pub fn unregister(&self, subscription: &Subscription) {
        if subscription.event().is_some() {
            return;
        }
        self.lock()
            .handlers
            .retain(|entry| entry.id != subscription.id());
        #[cfg(feature = "tracing")]
        tracing::trace!(id = subscription.id().value(), "handler unregistered");
    }

    /// Synchronously deliver `action` to every registered handler, in
    /// registration order, against a snapshot taken under the lock.
    ///
    /// # Errors
    ///
    /// Returns an [`AggregateError`] wrapping every handler error from
    /// this call, in delivery order, after all handlers have run.
    pub fn dispatch(&self, action: &A) -> Result<(), AggregateError> {
        let snapshot: Vec<Entry<A>> = self.lock().handlers.clone();
        if snapshot.is_empty() {
            return Ok(());
        }
        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("dispatch", handlers = snapshot.len()).entered();
        deliver(&snapshot, action, None)
    }

    /// Number of currently registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.lock().handlers.len()
    }

    /// True if no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().handlers.is_empty()
    }
}

/// Invoke a snapshot in order, collecting failures after the full
/// fan-out. Runs with no lock held.
fn deliver<P>(
    snapshot: &[Entry<P>],
    payload: &P,
    event: Option<&str>,
) -> Result<(), AggregateError> {
    let mut failures = Vec::new();
    for entry in snapshot {
        if let Err(error) = (entry.callback)(payload) {
            #[cfg(feature = "tracing")]
            tracing::warn!(id = entry.id.value(), %error, "handler failed");
            failures.push(HandlerFailure::new(entry.id, error));
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(AggregateError::new(
            event.map(str::to_string),
            snapshot.len(),
            failures,
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
