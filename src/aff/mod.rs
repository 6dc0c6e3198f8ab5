//! Asynchronous effects.
//!
//! [`Aff`] is the asynchronous counterpart of [`Eff`](crate::Eff): a deferred,
//! memoizing, re-runnable computation whose run is a `Send` future on tokio.
//! Cancellation requested through the environment pre-empts an `Aff` even
//! while it is suspended.
//!
//! # Examples
//!
//! ```
//! use undertow::{Aff, Eff};
//!
//! # tokio_test::block_on(async {
//! let fetch = Aff::<u32>::effect(|| async { 20 });
//! let total = fetch
//!     .bind(|n| Aff::success(n + 1))
//!     .bind(|n| Eff::success(n * 2).to_aff());
//!
//! assert_eq!(total.run_standalone().await, Ok(42));
//! # });
//! ```

mod catch;
mod combinators;
pub mod iterate;
mod runtime;
#[cfg(feature = "tracing")]
mod instrument;


use std::fmt;
use std::future::Future;

use crate::eff::Eff;
use crate::env::{EnvIO, HasCancel};
use crate::error::{Error, Fin};
use crate::thunk::{AsyncFn, ThunkAsync};

pub use catch::AffCatch;

/// An asynchronous effect over environment `Env`.
pub struct Aff<A, Env = EnvIO> {
    pub(crate) thunk: ThunkAsync<A, Env>,
}

impl<A, Env> Aff<A, Env> {
    pub(crate) fn from_thunk(thunk: ThunkAsync<A, Env>) -> Self {
        Aff { thunk }
    }

    /// Build a derived effect from this one's template.
    pub(crate) fn derive<B, F, Fut>(&self, f: F) -> Aff<B, Env>
    where
        A: 'static,
        Env: 'static,
        F: Fn(AsyncFn<A, Env>, Env) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Fin<B>> + Send + 'static,
    {
        let func = self.thunk.func().clone();
        Aff::from_thunk(ThunkAsync::new(move |env: Env| f(func.clone(), env)))
    }

    /// Forget the memoized outcome so the next run re-evaluates.
    pub fn clear(&mut self) {
        self.thunk.clear();
    }
}

impl<A, Env> Aff<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// An effect that succeeds with `value`.
    pub fn success(value: A) -> Self {
        Aff::from_thunk(ThunkAsync::success(value))
    }

    /// An effect that fails with `error`.
    pub fn fail(error: impl Into<Error>) -> Self {
        Aff::from_thunk(ThunkAsync::fail(error.into()))
    }

    /// Wrap an infallible async side effect.
    pub fn effect<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = A> + Send + 'static,
    {
        Aff::from_thunk(ThunkAsync::new(move |_: Env| {
            let fut = f();
            async move { Ok(fut.await) }
        }))
    }

    /// Wrap an infallible async side effect that reads the environment.
    pub fn effect_env<F, Fut>(f: F) -> Self
    where
        F: Fn(Env) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = A> + Send + 'static,
    {
        Aff::from_thunk(ThunkAsync::new(move |env: Env| {
            let fut = f(env);
            async move { Ok(fut.await) }
        }))
    }

    /// Wrap an async side effect that may fail.
    pub fn effect_maybe<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Fin<A>> + Send + 'static,
    {
        Aff::from_thunk(ThunkAsync::new(move |_: Env| f()))
    }

    /// Wrap an async side effect that reads the environment and may fail.
    pub fn effect_maybe_env<F, Fut>(f: F) -> Self
    where
        F: Fn(Env) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Fin<A>> + Send + 'static,
    {
        Aff::from_thunk(ThunkAsync::new(f))
    }

    /// Wrap an async closure returning a foreign error type.
    pub fn attempt<F, Fut, E>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<A, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        Aff::from_thunk(ThunkAsync::new(move |_: Env| {
            let fut = f();
            async move { fut.await.map_err(Error::from_exception) }
        }))
    }

    /// Defer construction of the effect itself until it runs.
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> Aff<A, Env> + Send + Sync + 'static,
    {
        Aff::from_thunk(ThunkAsync::new(move |env: Env| {
            let aff = f();
            async move { aff.run(&env).await }
        }))
    }

    /// Lift a synchronous effect. It runs on whichever task polls this one.
    pub fn from_eff(eff: Eff<A, Env>) -> Self {
        Aff::from_thunk(ThunkAsync::from_thunk(&eff.thunk))
    }

    /// Run the effect, memoizing the outcome.
    pub async fn run(&self, env: &Env) -> Fin<A> {
        self.thunk.value(env).await
    }

    /// Run the effect and discard its value.
    pub async fn run_unit(&self, env: &Env) -> Fin<()> {
        self.run(env).await.map(|_| ())
    }

    /// Clear, then run.
    pub async fn rerun(&mut self, env: &Env) -> Fin<A> {
        self.thunk.revalue(env).await
    }
}

impl<A> Aff<A, EnvIO>
where
    A: Clone + Send + Sync + 'static,
{
    /// Run against a fresh [`EnvIO`] capturing the current runtime.
    pub async fn run_standalone(&self) -> Fin<A> {
        self.run(&EnvIO::new()).await
    }
}

// A clone is the same computation with its own memo.
impl<A, Env> Clone for Aff<A, Env> {
    fn clone(&self) -> Self {
        Aff::from_thunk(self.thunk.clone())
    }
}

impl<A, Env> fmt::Debug for Aff<A, Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aff")
            .field("evaluated", &self.thunk.is_evaluated())
            .finish()
    }
}

impl<A, Env> From<ThunkAsync<A, Env>> for Aff<A, Env> {
    fn from(thunk: ThunkAsync<A, Env>) -> Self {
        Aff::from_thunk(thunk)
    }
}

impl<A, Env> From<Eff<A, Env>> for Aff<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    fn from(eff: Eff<A, Env>) -> Self {
        Aff::from_eff(eff)
    }
}
