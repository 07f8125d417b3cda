#![forbid(unsafe_code)]

//! Unfiltered single-list dispatch.
//!
//! [`Dispatcher<A>`] keeps one ordered subscriber list with no event
//! keys: every dispatched action is delivered to every registered
//! handler, in registration order, and each handler decides for itself
//! which actions it cares about. `A` is therefore normally a tagged
//! enum so consumers pattern-match on the action kind instead of
//! comparing runtime strings.
//!
//! Snapshot, ordering, and error-isolation rules are identical to
//! [`Emitter`](crate::Emitter); see that module for the full invariant
//! list.

use std::cell::RefCell;
use std::rc::Rc;

use crate::emitter::Entry;
use crate::error::{AggregateError, HandlerError, HandlerFailure};
use crate::subscription::{Subscription, SubscriptionId};

struct DispatcherInner<A> {
    handlers: Vec<Entry<A>>,
    next_id: u64,
}

impl<A> DispatcherInner<A> {
    fn allocate_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// A synchronous single-list dispatcher.
///
/// Cloning a `Dispatcher` creates a new handle to the **same**
/// subscriber list.
pub struct Dispatcher<A> {
    inner: Rc<RefCell<DispatcherInner<A>>>,
}

// Manual Clone: shares the same Rc.
impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
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
            .field("handlers", &self.inner.borrow().handlers.len())
            .finish()
    }
}

impl<A> Dispatcher<A> {
    /// Create a dispatcher with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(DispatcherInner {
                handlers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register an infallible handler. Every dispatched action is
    /// delivered to it; no deduplication is performed.
    pub fn register<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&A) + 'static,
    {
        self.register_fallible(move |action| {
            handler(action);
            Ok(())
        })
    }

    /// Register a fallible handler.
    pub fn register_fallible<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&A) -> Result<(), HandlerError> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.allocate_id();
        inner.handlers.push(Entry {
            id,
            callback: Rc::new(handler),
        });
        #[cfg(feature = "tracing")]
        tracing::trace!(id = id.value(), "handler registered");
        Subscription::unkeyed(id)
    }

    /// Remove a registration. No-op if already removed or if the handle
    /// was minted by a keyed emitter. Removal during a dispatch takes
    /// effect for subsequent calls only.
    pub fn unregister(&self, subscription: &Subscription) {
        if subscription.event().is_some() {
            // Keyed handle; nothing to match in an unfiltered list.
            return;
        }
        let mut inner = self.inner.borrow_mut();
        #[cfg(feature = "tracing")]
        let before = inner.handlers.len();
        inner.handlers.retain(|entry| entry.id != subscription.id());
        #[cfg(feature = "tracing")]
        tracing::trace!(
            id = subscription.id().value(),
            removed = inner.handlers.len() < before,
            "handler unregistered"
        );
    }

    /// Synchronously deliver `action` to every registered handler, in
    /// registration order, against a snapshot taken before the first
    /// handler runs. An empty registry returns `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns an [`AggregateError`] wrapping every handler error from
    /// this call, in delivery order, after all handlers have run.
    pub fn dispatch(&self, action: &A) -> Result<(), AggregateError> {
        let snapshot: Vec<Entry<A>> = self.inner.borrow().handlers.clone();
        if snapshot.is_empty() {
            return Ok(());
        }
        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!("dispatch", handlers = snapshot.len()).entered();
        let mut failures = Vec::new();
        for entry in &snapshot {
            if let Err(error) = (entry.callback)(action) {
                #[cfg(feature = "tracing")]
                tracing::warn!(id = entry.id.value(), %error, "handler failed");
                failures.push(HandlerFailure::new(entry.id, error));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateError::new(None, snapshot.len(), failures))
        }
    }

    /// Number of currently registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.borrow().handlers.len()
    }

    /// True if no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().handlers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, PartialEq, Eq, Clone)]
    enum CartAction {
        AddItem { product_id: u32 },
        Clear,
    }

    #[test]
    fn every_handler_sees_every_action() {
        let dispatcher = Dispatcher::new();
        let adds = Rc::new(Cell::new(0u32));
        let all = Rc::new(Cell::new(0u32));

        let adds_clone = Rc::clone(&adds);
        let _store = dispatcher.register(move |action: &CartAction| {
            if let CartAction::AddItem { .. } = action {
                adds_clone.set(adds_clone.get() + 1);
            }
        });

        let all_clone = Rc::clone(&all);
        let _audit = dispatcher.register(move |_: &CartAction| {
            all_clone.set(all_clone.get() + 1);
        });

        dispatcher
            .dispatch(&CartAction::AddItem { product_id: 7 })
            .unwrap();
        dispatcher.dispatch(&CartAction::Clear).unwrap();

        assert_eq!(adds.get(), 1);
        assert_eq!(all.get(), 2);
    }

    #[test]
    fn delivery_order_is_registration_order() {
        let dispatcher = Dispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log1 = Rc::clone(&log);
        let _s1 = dispatcher.register(move |_: &u8| log1.borrow_mut().push(1));
        let log2 = Rc::clone(&log);
        let _s2 = dispatcher.register(move |_: &u8| log2.borrow_mut().push(2));

        dispatcher.dispatch(&0).unwrap();
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn empty_registry_is_noop() {
        let dispatcher: Dispatcher<u8> = Dispatcher::new();
        assert!(dispatcher.dispatch(&0).is_ok());
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn unregister_suppresses_delivery() {
        let dispatcher = Dispatcher::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        let sub = dispatcher.register(move |_: &u8| {
            count_clone.set(count_clone.get() + 1);
        });
        dispatcher.unregister(&sub);
        dispatcher.dispatch(&0).unwrap();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn keyed_handle_is_noop() {
        let emitter = crate::Emitter::new();
        let keyed = emitter.register("tick", |_: &u8| {});

        let dispatcher = Dispatcher::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);
        let _sub = dispatcher.register(move |_: &u8| {
            count_clone.set(count_clone.get() + 1);
        });

        dispatcher.unregister(&keyed);
        dispatcher.dispatch(&0).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn failures_aggregate_in_delivery_order() {
        let dispatcher = Dispatcher::new();

        let first = dispatcher.register_fallible(|_: &u8| Err("first".to_string().into()));
        let _ok = dispatcher.register(|_: &u8| {});
        let second = dispatcher.register_fallible(|_: &u8| Err("second".to_string().into()));

        let err = dispatcher.dispatch(&0).unwrap_err();
        assert_eq!(err.attempted(), 3);
        assert_eq!(err.event(), None);
        let ids: Vec<_> = err.failures().iter().map(|f| f.subscription()).collect();
        assert_eq!(ids, vec![first.id(), second.id()]);
    }

    #[test]
    fn register_during_dispatch_misses_current_snapshot() {
        let dispatcher = Dispatcher::new();
        let late_calls = Rc::new(Cell::new(0u32));

        let dsp = dispatcher.clone();
        let late = Rc::clone(&late_calls);
        let _a = dispatcher.register(move |_: &u8| {
            let late = Rc::clone(&late);
            dsp.register(move |_: &u8| late.set(late.get() + 1));
        });

        dispatcher.dispatch(&0).unwrap();
        assert_eq!(late_calls.get(), 0);

        dispatcher.dispatch(&0).unwrap();
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn clone_shares_subscribers() {
        let dispatcher = Dispatcher::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = Rc::clone(&count);

        let other = dispatcher.clone();
        let _sub = other.register(move |_: &u8| count_clone.set(count_clone.get() + 1));

        dispatcher.dispatch(&0).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(dispatcher.handler_count(), 1);
    }
}
