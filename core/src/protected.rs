//! The operations a breaker or debounce cache can wrap
//!
//! Any `Fn(&C) -> Result<T, E>` is a [`ProtectedCall`] and any
//! `Fn(&C) -> impl Future<Output = Result<T, E>>` is an
//! [`AsyncProtectedCall`]. `C` is the caller's execution context (a
//! cancellation token, a request, `()`); wrappers hand it through untouched.

use std::future::Future;

/// A fallible operation taking an execution context
pub trait ProtectedCall<C: ?Sized> {
    type Output;
    type Error;

    fn invoke(&self, ctx: &C) -> Result<Self::Output, Self::Error>;
}

impl<C, F, T, E> ProtectedCall<C> for F
where
    C: ?Sized,
    F: Fn(&C) -> Result<T, E>,
{
    type Output = T;
    type Error = E;

    fn invoke(&self, ctx: &C) -> Result<T, E> {
        self(ctx)
    }
}

/// Asynchronous counterpart of [`ProtectedCall`]
///
/// The returned future may not borrow the context; clone what it needs
/// (e.g. a `CancellationToken`) before the `async move` block.
pub trait AsyncProtectedCall<C: ?Sized> {
    type Output;
    type Error;
    type Future: Future<Output = Result<Self::Output, Self::Error>>;

    fn invoke_async(&self, ctx: &C) -> Self::Future;
}

impl<C, F, Fut, T, E> AsyncProtectedCall<C> for F
where
    C: ?Sized,
    F: Fn(&C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    type Output = T;
    type Error = E;
    type Future = Fut;

    fn invoke_async(&self, ctx: &C) -> Fut {
        self(ctx)
    }
}
