//! Explicit state for values obtained from asynchronous operations.

mod errors;
pub mod option;
mod outcome;

use std::{fmt, future::Future};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};

pub use self::errors::Errors;
pub use self::outcome::{Outcome, OutcomeExt};

/// Shareable handle to an in-flight operation.
///
/// Every clone observes the same settlement, so callers can attach
/// continuations or race it against cancellation without re-dispatching.
pub type Pending<T> = Shared<BoxFuture<'static, Outcome<T>>>;

/// Lifecycle of a value produced by an asynchronous operation.
///
/// Transitions happen at call sites by replacing the value: a fresh operation
/// always starts a new `Loading` rather than touching an existing one.
#[derive(Clone)]
pub enum AsyncRequest<T> {
    /// Nothing was dispatched yet.
    NotAsked,
    /// The operation is in flight.
    Loading(Pending<T>),
    /// The operation succeeded.
    Loaded(T),
    /// The operation failed.
    Failed(Errors),
}

/// Tag of an [`AsyncRequest`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    NotAsked,
    Loading,
    Loaded,
    Failed,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::NotAsked => "not-asked",
            RequestKind::Loading => "loading",
            RequestKind::Loaded => "loaded",
            RequestKind::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> Default for AsyncRequest<T> {
    fn default() -> Self {
        AsyncRequest::NotAsked
    }
}

impl<T> AsyncRequest<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start tracking an operation that was just dispatched.
    pub fn loading<Fut>(operation: Fut) -> Self
    where
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        AsyncRequest::Loading(operation.boxed().shared())
    }

    /// Wait for the tracked operation and return the settled request.
    ///
    /// Settled or not-asked requests are returned unchanged.
    pub async fn settle(self) -> Self {
        match self {
            AsyncRequest::Loading(pending) => pending.await.into(),
            other => other,
        }
    }
}

impl<T> AsyncRequest<T> {
    pub fn kind(&self) -> RequestKind {
        match self {
            AsyncRequest::NotAsked => RequestKind::NotAsked,
            AsyncRequest::Loading(_) => RequestKind::Loading,
            AsyncRequest::Loaded(_) => RequestKind::Loaded,
            AsyncRequest::Failed(_) => RequestKind::Failed,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, AsyncRequest::Loading(_))
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, AsyncRequest::Loaded(_))
    }

    /// Resolved value, if the operation succeeded.
    pub fn data(&self) -> Option<&T> {
        match self {
            AsyncRequest::Loaded(data) => Some(data),
            _ => None,
        }
    }

    /// Failures, if the operation failed.
    pub fn errors(&self) -> Option<&Errors> {
        match self {
            AsyncRequest::Failed(errors) => Some(errors),
            _ => None,
        }
    }

    /// Handle to the in-flight operation, if any.
    pub fn pending(&self) -> Option<&Pending<T>> {
        match self {
            AsyncRequest::Loading(pending) => Some(pending),
            _ => None,
        }
    }
}

impl<T> From<Outcome<T>> for AsyncRequest<T> {
    fn from(outcome: Outcome<T>) -> Self {
        match outcome {
            Ok(data) => AsyncRequest::Loaded(data),
            Err(errors) => AsyncRequest::Failed(errors),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AsyncRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncRequest::NotAsked => f.write_str("NotAsked"),
            AsyncRequest::Loading(_) => f.write_str("Loading(..)"),
            AsyncRequest::Loaded(data) => f.debug_tuple("Loaded").field(data).finish(),
            AsyncRequest::Failed(errors) => f.debug_tuple("Failed").field(errors).finish(),
        }
    }
}
