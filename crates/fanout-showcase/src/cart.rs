#![forbid(unsafe_code)]

//! A cart store driven by an unfiltered dispatcher.
//!
//! The store registers one handler that pattern-matches on
//! [`CartAction`] and keeps its state behind shared interior
//! mutability, so producers only ever see the dispatcher.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use fanout::{Dispatcher, Subscription};

/// Actions the cart understands. Producers dispatch these; nothing else
/// reaches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    AddItem { product_id: String },
    RemoveItem { product_id: String },
}

/// One line in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: String,
    pub quantity: u32,
}

/// Cart state fed exclusively by dispatched [`CartAction`]s.
pub struct CartStore {
    items: Rc<RefCell<BTreeMap<String, u32>>>,
    subscription: Subscription,
}

impl CartStore {
    /// Attach a new store to `dispatcher`. The returned store owns its
    /// registration; call [`CartStore::detach`] to stop receiving
    /// actions.
    pub fn attach(dispatcher: &Dispatcher<CartAction>) -> Self {
        let items: Rc<RefCell<BTreeMap<String, u32>>> = Rc::new(RefCell::new(BTreeMap::new()));

        let state = Rc::clone(&items);
        let subscription = dispatcher.register(move |action: &CartAction| match action {
            CartAction::AddItem { product_id } => {
                *state.borrow_mut().entry(product_id.clone()).or_insert(0) += 1;
                tracing::info!(product_id = %product_id, "item added to cart");
            }
            CartAction::RemoveItem { product_id } => {
                state.borrow_mut().remove(product_id);
                tracing::info!(product_id = %product_id, "item removed from cart");
            }
        });

        Self {
            items,
            subscription,
        }
    }

    /// Snapshot of the cart contents, ordered by product id.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.items
            .borrow()
            .iter()
            .map(|(product_id, quantity)| CartItem {
                product_id: product_id.clone(),
                quantity: *quantity,
            })
            .collect()
    }

    /// Unregister the store's handler; later dispatches no longer reach
    /// this store.
    pub fn detach(&self, dispatcher: &Dispatcher<CartAction>) {
        dispatcher.unregister(&self.subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_remove() {
        let dispatcher = Dispatcher::new();
        let store = CartStore::attach(&dispatcher);

        dispatcher
            .dispatch(&CartAction::AddItem {
                product_id: "shoe-42".to_string(),
            })
            .unwrap();
        dispatcher
            .dispatch(&CartAction::AddItem {
                product_id: "shoe-42".to_string(),
            })
            .unwrap();

        assert_eq!(
            store.items(),
            vec![CartItem {
                product_id: "shoe-42".to_string(),
                quantity: 2,
            }]
        );

        dispatcher
            .dispatch(&CartAction::RemoveItem {
                product_id: "shoe-42".to_string(),
            })
            .unwrap();
        assert!(store.items().is_empty());
    }

    #[test]
    fn detached_store_stops_updating() {
        let dispatcher = Dispatcher::new();
        let store = CartStore::attach(&dispatcher);
        store.detach(&dispatcher);

        dispatcher
            .dispatch(&CartAction::AddItem {
                product_id: "shoe-42".to_string(),
            })
            .unwrap();
        assert!(store.items().is_empty());
    }

    #[test]
    fn two_stores_both_observe() {
        let dispatcher = Dispatcher::new();
        let first = CartStore::attach(&dispatcher);
        let second = CartStore::attach(&dispatcher);

        dispatcher
            .dispatch(&CartAction::AddItem {
                product_id: "sock-7".to_string(),
            })
            .unwrap();

        assert_eq!(first.items(), second.items());
        assert_eq!(first.items().len(), 1);
    }
}
