#![forbid(unsafe_code)]

//! Showcase walkthrough for the fanout dispatchers.
//!
//! Two small scenes: keyed login/logout events on an [`fanout::Emitter`],
//! and a cart store fed by tagged actions through an unfiltered
//! [`fanout::Dispatcher`].

pub mod cart;
pub mod cli;
