#![forbid(unsafe_code)]

//! Keyed synchronous publish/subscribe.
//!
//! # Design
//!
//! [`Emitter<P>`] maps string event keys to ordered subscriber lists in
//! shared, reference-counted storage (`Rc<RefCell<..>>`). Dispatching
//! an event snapshots the key's subscriber list, then invokes each
//! handler outside the borrow, so handlers may freely register,
//! unregister, and dispatch (including on the same emitter) while a
//! fan-out is in flight.
//!
//! # Invariants
//!
//! 1. Handlers for a key are invoked in registration order.
//! 2. The subscriber set for one dispatch call is fixed when the call
//!    begins; registry mutations during the fan-out affect later calls
//!    only.
//! 3. Registering the same closure twice yields two independent
//!    deliveries with distinct ids.
//! 4. A failing handler never prevents delivery to handlers registered
//!    after it; failures surface as one [`AggregateError`] after the
//!    full fan-out.
//! 5. Dispatching a key with no subscribers is a no-op, not an error.
//!
//! # Failure Modes
//!
//! - **Handler errors**: collected per handler and returned as an
//!   [`AggregateError`]; delivery to the rest of the snapshot is
//!   unaffected.
//! - **Reference cycles**: a handler that captures a clone of its own
//!   emitter keeps the registry alive until it is unregistered. Drop
//!   the subscription (via [`Emitter::unregister`]) to break the cycle.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{AggregateError, HandlerError, HandlerFailure};
use crate::subscription::{Subscription, SubscriptionId};

pub(crate) type Callback<P> = Rc<dyn Fn(&P) -> Result<(), HandlerError>>;

/// One registered handler: id plus shared callback.
pub(crate) struct Entry<P> {
    pub(crate) id: SubscriptionId,
    pub(crate) callback: Callback<P>,
}

// Manual Clone: shares the callback Rc without requiring P: Clone.
impl<P> Clone for Entry<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Rc::clone(&self.callback),
        }
    }
}

struct EmitterInner<P> {
    channels: HashMap<String, Vec<Entry<P>>>,
    next_id: u64,
}

impl<P> EmitterInner<P> {
    fn allocate_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// A keyed, synchronous event emitter.
///
/// Cloning an `Emitter` creates a new handle to the **same** registry —
/// both handles see the same subscribers. Construct one instance in
/// application setup code and hand clones to producers and consumers;
/// there is no ambient global emitter.
pub struct Emitter<P> {
    inner: Rc<RefCell<EmitterInner<P>>>,
}

// Manual Clone: shares the same Rc.
impl<P> Clone for Emitter<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
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
        let inner = self.inner.borrow();
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
            inner: Rc::new(RefCell::new(EmitterInner {
                channels: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Register an infallible handler for `event`.
    ///
    /// The handler is appended to the key's subscriber list; no
    /// deduplication is performed, so registering the same closure
    /// twice yields two independent deliveries.
    pub fn register<F>(&self, event: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&P) + 'static,
    {
        self.register_fallible(event, move |payload| {
            handler(payload);
            Ok(())
        })
    }

    /// Register a fallible handler for `event`.
    ///
    /// An `Err` return is collected during dispatch and reported in the
    /// call's [`AggregateError`]; it does not stop the fan-out.
    pub fn register_fallible<F>(&self, event: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&P) -> Result<(), HandlerError> + 'static,
    {
        let event = event.into();
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.allocate_id();
            inner.channels.entry(event.clone()).or_default().push(Entry {
                id,
                callback: Rc::new(handler),
            });
            id
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(event = %event, id = id.value(), "handler registered");
        Subscription::keyed(event, id)
    }

    /// Remove a registration.
    ///
    /// No-op if the handle was already unregistered, or if it was
    /// minted by an unfiltered dispatcher. Safe to call from within a
    /// handler while a dispatch is in flight: the removal takes effect
    /// for subsequent dispatch calls, not the one in progress.
    pub fn unregister(&self, subscription: &Subscription) {
        let Some(event) = subscription.event() else {
            // Handle from an unfiltered dispatcher; nothing to match.
            return;
        };
        let mut inner = self.inner.borrow_mut();
        let Some(entries) = inner.channels.get_mut(event) else {
            return;
        };
        #[cfg(feature = "tracing")]
        let before = entries.len();
        entries.retain(|entry| entry.id != subscription.id());
        #[cfg(feature = "tracing")]
        tracing::trace!(
            event = %event,
            id = subscription.id().value(),
            removed = entries.len() < before,
            "handler unregistered"
        );
        if entries.is_empty() {
            inner.channels.remove(event);
        }
    }

    /// Synchronously deliver `payload` to every handler registered for
    /// `event`, in registration order.
    ///
    /// The subscriber list is snapshotted before the first handler runs,
    /// so handlers may mutate the registry (or dispatch again) without
    /// affecting this call's delivery. Completes before returning; a key
    /// with zero subscribers returns `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns an [`AggregateError`] wrapping every handler error from
    /// this call, in delivery order, after all handlers have run.
    pub fn dispatch(&self, event: &str, payload: &P) -> Result<(), AggregateError> {
        let snapshot: Vec<Entry<P>> = {
            let inner = self.inner.borrow();
            match inner.channels.get(event) {
                Some(entries) => entries.clone(),
                None => return Ok(()),
            }
        };
        #[cfg(feature = "tracing")]
        let _span =
            tracing::trace_span!("dispatch", event = %event, handlers = snapshot.len()).entered();
        let mut failures = Vec::new();
        for entry in &snapshot {
            if let Err(error) = (entry.callback)(payload) {
                #[cfg(feature = "tracing")]
                tracing::warn!(event = %event, id = entry.id.value(), %error, "handler failed");
                failures.push(HandlerFailure::new(entry.id, error));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateError::new(
                Some(event.to_string()),
                snapshot.len(),
                failures,
            ))
        }
    }

    /// Number of handlers currently registered for `event`.
    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.inner.borrow().channels.get(event).map_or(0, Vec::len)
    }

    /// True if no handlers are registered for any event.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().channels.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
