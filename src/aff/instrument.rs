//! Tracing support for asynchronous effects.
//!
//! Feature-gated behind `#[cfg(feature = "tracing")]`.

use ::tracing::Instrument as _;

use crate::env::HasCancel;
use crate::thunk::eval_async;

use super::Aff;

impl<A, Env> Aff<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// Run this effect inside a tracing span.
    ///
    /// The span is entered each time the effect runs and exited when it
    /// completes, including on every re-run by a schedule.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use tracing::debug_span;
    /// use undertow::Aff;
    ///
    /// fn fetch_order(order_id: String) -> Aff<Order> {
    ///     let span_id = order_id.clone();
    ///     Aff::effect_maybe(move || load(order_id.clone()))
    ///         .instrument(debug_span!("fetch_order", order_id = %span_id))
    /// }
    /// ```
    pub fn instrument(self, span: ::tracing::Span) -> Aff<A, Env> {
        self.derive(move |func, env| {
            let span = span.clone();
            async move { eval_async(&func, env).await }.instrument(span)
        })
    }
}
