//! Async combinators for [`Option`].
//!
//! The synchronous part of the algebra is the standard library's own:
//! `map`, `unwrap_or`, `or` and `flatten` (fuse) already behave as required.

use std::future::Future;

/// Run `f` over the contained value, awaiting its result; absence resolves immediately.
pub async fn map_async<T, U, F, Fut>(option: Option<T>, f: F) -> Option<U>
where
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = U>,
{
    match option {
        Some(value) => Some(f(value).await),
        None => None,
    }
}

/// Fallible flavour of [`map_async`]: a failure of `f` fails the whole operation.
pub async fn try_map_async<T, U, E, F, Fut>(option: Option<T>, f: F) -> Result<Option<U>, E>
where
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<U, E>>,
{
    match option {
        Some(value) => f(value).await.map(Some),
        None => Ok(None),
    }
}
