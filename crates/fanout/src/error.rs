#![forbid(unsafe_code)]

//! Error types for dispatch fan-out.
//!
//! A failing handler never blocks delivery to the handlers registered
//! after it. Failures are collected during the fan-out and surfaced to
//! the caller of `dispatch` as one [`AggregateError`] after every
//! handler has run.

use crate::subscription::SubscriptionId;

/// Boxed error returned by a fallible handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// One failed delivery within a dispatch call.
#[derive(Debug)]
pub struct HandlerFailure {
    subscription: SubscriptionId,
    error: HandlerError,
}

impl HandlerFailure {
    pub(crate) fn new(subscription: SubscriptionId, error: HandlerError) -> Self {
        Self {
            subscription,
            error,
        }
    }

    /// Id of the registration whose handler failed.
    #[must_use]
    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// Borrow the error the handler returned.
    #[must_use]
    pub fn error(&self) -> &(dyn std::error::Error + 'static) {
        self.error.as_ref()
    }

    /// Consume the record, yielding the handler's error.
    #[must_use]
    pub fn into_error(self) -> HandlerError {
        self.error
    }
}

impl std::fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler {}: {}", self.subscription.value(), self.error)
    }
}

/// Error returned by `dispatch` when one or more handlers failed.
///
/// The fan-out always runs to completion before this error is built, so
/// the failure list covers the whole dispatch call. Failures are in
/// delivery order and the list is never empty.
#[derive(Debug)]
pub struct AggregateError {
    event: Option<String>,
    attempted: usize,
    failures: Vec<HandlerFailure>,
}

impl AggregateError {
    pub(crate) fn new(
        event: Option<String>,
        attempted: usize,
        failures: Vec<HandlerFailure>,
    ) -> Self {
        debug_assert!(!failures.is_empty());
        Self {
            event,
            attempted,
            failures,
        }
    }

    /// Event key of the failed dispatch (`None` for the unfiltered
    /// dispatcher).
    #[must_use]
    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    /// Number of handlers the dispatch invoked, failing or not.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// The collected failures, in delivery order.
    #[must_use]
    pub fn failures(&self) -> &[HandlerFailure] {
        &self.failures
    }

    /// Consume the error, yielding the failure list.
    #[must_use]
    pub fn into_failures(self) -> Vec<HandlerFailure> {
        self.failures
    }
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.event {
            Some(event) => write!(
                f,
                "{} of {} handlers failed for event '{event}'",
                self.failures.len(),
                self.attempted
            ),
            None => write!(
                f,
                "{} of {} handlers failed",
                self.failures.len(),
                self.attempted
            ),
        }
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures.first().map(HandlerFailure::error)
    }
}
