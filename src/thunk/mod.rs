//! Memoizing deferred computations.
//!
//! A thunk pairs an immutable *template* (the wrapped closure, shared behind an
//! `Arc`) with a *memo cell* owned by the thunk alone. Reading a thunk evaluates
//! the template at most once; [`Thunk::clear`] and `Clone` hand out a fresh memo
//! cell over the same template so one logical computation can be replayed from
//! scratch.
//!
//! The thunk boundary is where user code is made safe to run:
//! - a cancelled environment short-circuits to [`Error::cancelled`] without
//!   invoking the template;
//! - a panic inside the template becomes an exceptional [`Error`].
//!
//! [`Error`]: crate::Error
//! [`Error::cancelled`]: crate::Error::cancelled

mod thunk_async;
mod thunk_sync;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Fin};

pub use thunk_async::ThunkAsync;
pub use thunk_sync::Thunk;

pub(crate) use thunk_async::{eval_async, AsyncFn};
pub(crate) use thunk_sync::{eval, SyncFn};

/// A boxed future that is Send
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The contents of a thunk's memo cell.
#[derive(Debug, Clone)]
pub enum ThunkState<A> {
    /// The template has not run since creation or the last clear.
    NotEvaluated,
    /// The template ran and produced this outcome.
    Evaluated(Fin<A>),
    /// Evaluation observed a cancellation request; holds the error as first seen.
    Cancelled(Error),
}

impl<A: Clone> ThunkState<A> {
    fn memo(&self) -> Option<Fin<A>> {
        match self {
            ThunkState::NotEvaluated => None,
            ThunkState::Evaluated(result) => Some(result.clone()),
            ThunkState::Cancelled(error) => Some(Err(error.clone())),
        }
    }

    fn from_result(result: &Fin<A>) -> Self {
        match result {
            Err(e) if e.is_cancelled() => ThunkState::Cancelled(e.clone()),
            other => ThunkState::Evaluated(other.clone()),
        }
    }
}

fn lock<A>(state: &Mutex<ThunkState<A>>) -> MutexGuard<'_, ThunkState<A>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reset<A>(state: &mut Mutex<ThunkState<A>>) {
    *state.get_mut().unwrap_or_else(PoisonError::into_inner) = ThunkState::NotEvaluated;
}

fn panicked(payload: Box<dyn std::any::Any + Send>) -> Error {
    let error = Error::from_panic(payload);
    crate::trace_warn!(error = %error, "effect panicked; converted to failure");
    error
}
