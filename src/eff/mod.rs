//! Synchronous effects.
//!
//! An [`Eff`] is a deferred, re-runnable computation that produces a
//! [`Fin<A>`](crate::Fin) when run against an environment. Building and
//! composing effects never executes anything; [`Eff::run`] does, and memoizes
//! the outcome until [`Eff::clear`] is called.
//!
//! `Eff<A>` (environment [`EnvIO`]) needs nothing but cancellation. Any other
//! environment implementing [`HasCancel`] carries runtime dependencies that
//! effects can read through [`Eff::effect_env`].
//!
//! # Examples
//!
//! ```
//! use undertow::{Eff, Error};
//!
//! let parse = Eff::<i32>::effect_maybe(|| "42".parse::<i32>().map_err(|e| Error::new(e.to_string())));
//! let doubled = parse.map(|n| n * 2).filter(|n| *n > 50);
//!
//! assert_eq!(doubled.run_standalone(), Ok(84));
//! ```

mod catch;
mod combinators;
pub mod iterate;

#[cfg(test)]
mod tests;

use std::fmt;

use crate::env::{EnvIO, HasCancel};
use crate::error::{Error, Fin};
use crate::thunk::{SyncFn, Thunk};

pub use catch::EffCatch;

/// A synchronous effect over environment `Env`.
pub struct Eff<A, Env = EnvIO> {
    pub(crate) thunk: Thunk<A, Env>,
}

impl<A, Env> Eff<A, Env> {
    pub(crate) fn from_thunk(thunk: Thunk<A, Env>) -> Self {
        Eff { thunk }
    }

    /// Build a derived effect from this one's template.
    pub(crate) fn derive<B, F>(&self, f: F) -> Eff<B, Env>
    where
        A: 'static,
        Env: 'static,
        F: Fn(&SyncFn<A, Env>, &Env) -> Fin<B> + Send + Sync + 'static,
    {
        let func = self.thunk.func().clone();
        Eff::from_thunk(Thunk::new(move |env: &Env| f(&func, env)))
    }

    /// Forget the memoized outcome so the next run re-evaluates.
    pub fn clear(&mut self) {
        self.thunk.clear();
    }
}

impl<A, Env> Eff<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// An effect that succeeds with `value`.
    pub fn success(value: A) -> Self {
        Eff::from_thunk(Thunk::success(value))
    }

    /// An effect that fails with `error`.
    pub fn fail(error: impl Into<Error>) -> Self {
        Eff::from_thunk(Thunk::fail(error.into()))
    }

    /// Wrap an infallible side effect.
    pub fn effect<F>(f: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Eff::from_thunk(Thunk::new(move |_: &Env| Ok(f())))
    }

    /// Wrap an infallible side effect that reads the environment.
    pub fn effect_env<F>(f: F) -> Self
    where
        F: Fn(&Env) -> A + Send + Sync + 'static,
    {
        Eff::from_thunk(Thunk::new(move |env: &Env| Ok(f(env))))
    }

    /// Wrap a side effect that may fail.
    pub fn effect_maybe<F>(f: F) -> Self
    where
        F: Fn() -> Fin<A> + Send + Sync + 'static,
    {
        Eff::from_thunk(Thunk::new(move |_: &Env| f()))
    }

    /// Wrap a side effect that reads the environment and may fail.
    pub fn effect_maybe_env<F>(f: F) -> Self
    where
        F: Fn(&Env) -> Fin<A> + Send + Sync + 'static,
    {
        Eff::from_thunk(Thunk::new(f))
    }

    /// Wrap a closure returning a foreign error type.
    ///
    /// The error is kept as the exception of an exceptional [`Error`], so it
    /// can later be matched with [`EffCatch::exception`].
    ///
    /// ```
    /// use undertow::Eff;
    ///
    /// let read = Eff::<String>::attempt(|| std::fs::read_to_string("/definitely/not/here"));
    /// let err = read.run_standalone().unwrap_err();
    /// assert!(err.is::<std::io::Error>());
    /// ```
    pub fn attempt<F, E>(f: F) -> Self
    where
        F: Fn() -> Result<A, E> + Send + Sync + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        Eff::from_thunk(Thunk::new(move |_: &Env| f().map_err(Error::from_exception)))
    }

    /// Defer construction of the effect itself until it runs.
    pub fn lazy<F>(f: F) -> Self
    where
        F: Fn() -> Eff<A, Env> + Send + Sync + 'static,
    {
        Eff::from_thunk(Thunk::new(move |env: &Env| f().run(env)))
    }

    /// Run the effect, memoizing the outcome.
    pub fn run(&self, env: &Env) -> Fin<A> {
        self.thunk.value(env)
    }

    /// Run the effect and discard its value.
    pub fn run_unit(&self, env: &Env) -> Fin<()> {
        self.run(env).map(|_| ())
    }

    /// Clear, then run.
    pub fn rerun(&mut self, env: &Env) -> Fin<A> {
        self.thunk.revalue(env)
    }
}

impl<A> Eff<A, EnvIO>
where
    A: Clone + Send + Sync + 'static,
{
    /// Run against a fresh [`EnvIO`].
    pub fn run_standalone(&self) -> Fin<A> {
        self.run(&EnvIO::new())
    }
}

// A clone is the same computation with its own memo.
impl<A, Env> Clone for Eff<A, Env> {
    fn clone(&self) -> Self {
        Eff::from_thunk(self.thunk.clone())
    }
}

impl<A, Env> fmt::Debug for Eff<A, Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eff")
            .field("evaluated", &self.thunk.is_evaluated())
            .finish()
    }
}

impl<A, Env> From<Thunk<A, Env>> for Eff<A, Env> {
    fn from(thunk: Thunk<A, Env>) -> Self {
        Eff::from_thunk(thunk)
    }
}
