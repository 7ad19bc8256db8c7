//! Event handlers.
//!
//! A handler is an async unit of work registered with a
//! [`Dispatcher`](super::dispatcher::Dispatcher). Its identity is the shared
//! `Arc` it lives in: registering the same `Arc` twice for one event fails,
//! and the same `Arc` is what you pass back to unregister.
//!
//! Closures become handlers through [`handler_fn`]:
//!
//! ```rust,ignore
//! use tern_core::{handler_fn, Outcome};
//!
//! let pong = handler_fn("pong", |(ctx, msg): MessageArgs| async move {
//!     ctx.send_cmd("PONG", msg.params.clone())?;
//!     Ok::<_, anyhow::Error>(Outcome::Continue)
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
pub use futures::future::BoxFuture;

// ============================================================================
// Outcome
// ============================================================================

/// What a handler tells the dispatcher after observing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Outcome {
    /// The event was observed; lower-priority tiers still run.
    #[default]
    Continue,
    /// The event was consumed; lower-priority tiers are skipped.
    Eat,
}

impl Outcome {
    /// Returns `true` for [`Outcome::Eat`].
    pub fn is_eaten(self) -> bool {
        matches!(self, Self::Eat)
    }
}

/// Result of running a handler. Errors are logged by the dispatcher and
/// never reach the dispatch caller.
pub type HandlerResult = anyhow::Result<Outcome>;

// ============================================================================
// IntoOutcome - Handle handler return values
// ============================================================================

/// Conversion of handler return values into a [`HandlerResult`].
pub trait IntoOutcome: Send {
    /// Converts the value.
    fn into_outcome(self) -> HandlerResult;
}

/// `()` observes without consuming.
impl IntoOutcome for () {
    fn into_outcome(self) -> HandlerResult {
        Ok(Outcome::Continue)
    }
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> HandlerResult {
        Ok(self)
    }
}

/// `Err` is reported as a handler failure.
impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<anyhow::Error> + Send,
{
    fn into_outcome(self) -> HandlerResult {
        self.map_err(Into::into).and_then(IntoOutcome::into_outcome)
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// An event handler taking arguments of type `A`.
pub trait Handler<A>: Send + Sync + 'static {
    /// Display name used in logs and registration errors.
    fn name(&self) -> &str;

    /// Runs the handler.
    fn call(&self, args: A) -> BoxFuture<'static, HandlerResult>;
}

/// Shared handler; the `Arc` is the handler's identity.
pub type BoxedHandler<A> = Arc<dyn Handler<A>>;

/// Returns the identity of a handler (its data pointer).
pub(crate) fn handler_id<A>(handler: &BoxedHandler<A>) -> *const () {
    Arc::as_ptr(handler) as *const ()
}

/// A handler backed by an async closure.
pub struct HandlerFn<F> {
    name: String,
    func: F,
}

impl<A, F, Fut, R> Handler<A> for HandlerFn<F>
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, args: A) -> BoxFuture<'static, HandlerResult> {
        (self.func)(args).map(IntoOutcome::into_outcome).boxed()
    }
}

impl<F> std::fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFn").field("name", &self.name).finish()
    }
}

/// Wraps an async closure into a shareable handler.
pub fn handler_fn<A, F, Fut, R>(name: impl Into<String>, func: F) -> BoxedHandler<A>
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + 'static,
{
    Arc::new(HandlerFn {
        name: name.into(),
        func,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_return_values_convert() {
        let unit = handler_fn("unit", |_: ()| async {});
        assert_eq!(unit.call(()).await.unwrap(), Outcome::Continue);

        let eat = handler_fn("eat", |_: ()| async { Outcome::Eat });
        assert_eq!(eat.call(()).await.unwrap(), Outcome::Eat);

        let fail = handler_fn("fail", |_: ()| async {
            Err::<(), _>(anyhow::anyhow!("boom"))
        });
        assert_eq!(fail.call(()).await.unwrap_err().to_string(), "boom");
        assert_eq!(fail.name(), "fail");
    }

    #[test]
    fn test_identity_is_the_arc() {
        let a = handler_fn("a", |_: ()| async {});
        let b = handler_fn("a", |_: ()| async {});
        assert_eq!(handler_id(&a), handler_id(&Arc::clone(&a)));
        assert_ne!(handler_id(&a), handler_id(&b));
    }
}
