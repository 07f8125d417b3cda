#![forbid(unsafe_code)]

//! Synchronous publish/subscribe event dispatch.
//!
//! Decouples event producers from consumers through a single
//! synchronous fan-out point. Two variants of the same mechanism:
//!
//! - [`Emitter<P>`]: keyed — handlers register under a string event key
//!   and receive only that key's payloads.
//! - [`Dispatcher<A>`]: unfiltered — one subscriber list, every handler
//!   sees every dispatched action and filters by matching on it, so `A`
//!   is normally a tagged enum.
//!
//! Both have thread-safe mirrors in [`sync`]. Delivery is entirely
//! synchronous: `dispatch` invokes every handler registered at the
//! moment the call begins, in registration order, and completes before
//! returning. A failing handler never blocks the handlers after it;
//! failures are reported together as an [`AggregateError`] once the
//! fan-out finishes.
//!
//! There is no ambient global instance: construct a dispatcher in
//! application setup code and pass clones (which share the registry) to
//! producers and consumers.
//!
//! # Example
//!
//! ```
//! use fanout::Emitter;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let emitter = Emitter::new();
//! let greeted = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = Rc::clone(&greeted);
//! let sub = emitter.register("login", move |name: &String| {
//!     sink.borrow_mut().push(name.clone());
//! });
//!
//! emitter.dispatch("login", &"howard".to_string())?;
//! assert_eq!(*greeted.borrow(), vec!["howard".to_string()]);
//!
//! emitter.unregister(&sub);
//! emitter.dispatch("login", &"howard".to_string())?;
//! assert_eq!(greeted.borrow().len(), 1);
//! # Ok::<(), fanout::AggregateError>(())
//! ```

pub mod dispatcher;
pub mod emitter;
pub mod error;
pub mod subscription;
pub mod sync;

pub use dispatcher::Dispatcher;
pub use emitter::Emitter;
pub use error::{AggregateError, HandlerError, HandlerFailure};
pub use subscription::{Subscription, SubscriptionId};
