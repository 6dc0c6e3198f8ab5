//! Early-exit traversal of containers.
//!
//! [`Foldable`] is the only thing the iteration combinators know about a
//! collection: it turns the collection into a chain of [`Fold`] steps, each
//! carrying one element and a continuation for the rest. The consumer decides
//! after every element whether to keep going, so a failure or a predicate can
//! stop the walk without touching the remaining elements.
//!
//! # Examples
//!
//! ```
//! use undertow::fold::Foldable;
//!
//! let sum = vec![1, 2, 3, 4].fold_step(0).fold(|acc, n| acc + n);
//! assert_eq!(sum, 10);
//!
//! // Stops before the first element that fails the predicate.
//! let prefix = vec![1, 2, 30, 4].fold_step(0).fold_while(|acc, n| acc + n, |n| *n < 10);
//! assert_eq!(prefix, 3);
//! ```

use std::collections::VecDeque;
use std::fmt;

/// One step of a fold over a container.
pub enum Fold<A, S> {
    /// No elements remain.
    Done(S),
    /// An element is available.
    Loop {
        /// State threaded so far.
        state: S,
        /// The current element.
        value: A,
        /// Continue with the updated state.
        next: Box<dyn FnOnce(S) -> Fold<A, S> + Send>,
    },
}

impl<A, S> Fold<A, S> {
    /// Fold every element.
    pub fn fold<F>(self, mut f: F) -> S
    where
        F: FnMut(S, A) -> S,
    {
        let mut step = self;
        loop {
            match step {
                Fold::Done(state) => return state,
                Fold::Loop { state, value, next } => step = next(f(state, value)),
            }
        }
    }

    /// Fold while `pred` holds for the next element.
    pub fn fold_while<F, P>(self, mut f: F, mut pred: P) -> S
    where
        F: FnMut(S, A) -> S,
        P: FnMut(&A) -> bool,
    {
        let mut step = self;
        loop {
            match step {
                Fold::Done(state) => return state,
                Fold::Loop { state, value, .. } if !pred(&value) => return state,
                Fold::Loop { state, value, next } => step = next(f(state, value)),
            }
        }
    }

    /// Fold until `pred` holds for the next element.
    pub fn fold_until<F, P>(self, f: F, mut pred: P) -> S
    where
        F: FnMut(S, A) -> S,
        P: FnMut(&A) -> bool,
    {
        self.fold_while(f, move |a| !pred(a))
    }

    /// Fold with a fallible step, stopping at the first error.
    pub fn try_fold<E, F>(self, mut f: F) -> Result<S, E>
    where
        F: FnMut(S, A) -> Result<S, E>,
    {
        let mut step = self;
        loop {
            match step {
                Fold::Done(state) => return Ok(state),
                Fold::Loop { state, value, next } => step = next(f(state, value)?),
            }
        }
    }
}

impl<A: fmt::Debug, S: fmt::Debug> fmt::Debug for Fold<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fold::Done(state) => f.debug_tuple("Done").field(state).finish(),
            Fold::Loop { state, value, .. } => f
                .debug_struct("Loop")
                .field("state", state)
                .field("value", value)
                .finish_non_exhaustive(),
        }
    }
}

/// A container that can be walked one element at a time.
pub trait Foldable {
    /// Element type.
    type Item: Send + 'static;

    /// Start a fold with the given initial state.
    fn fold_step<S: 'static>(self, initial: S) -> Fold<Self::Item, S>;
}

fn step_iter<I, S>(mut iter: I, state: S) -> Fold<I::Item, S>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
    S: 'static,
{
    match iter.next() {
        None => Fold::Done(state),
        Some(value) => Fold::Loop {
            state,
            value,
            next: Box::new(move |s| step_iter(iter, s)),
        },
    }
}

impl<T: Send + 'static> Foldable for Vec<T> {
    type Item = T;

    fn fold_step<S: 'static>(self, initial: S) -> Fold<T, S> {
        step_iter(self.into_iter(), initial)
    }
}

impl<T: Send + 'static> Foldable for VecDeque<T> {
    type Item = T;

    fn fold_step<S: 'static>(self, initial: S) -> Fold<T, S> {
        step_iter(self.into_iter(), initial)
    }
}

impl<T: Send + 'static> Foldable for Option<T> {
    type Item = T;

    fn fold_step<S: 'static>(self, initial: S) -> Fold<T, S> {
        step_iter(self.into_iter(), initial)
    }
}

/// Adapter making any cloneable iterable [`Foldable`].
///
/// ```
/// use undertow::fold::{Foldable, Seq};
///
/// let evens = Seq::new((0..10).filter(|n| n % 2 == 0));
/// assert_eq!(evens.fold_step(Vec::new()).fold(|mut v, n| { v.push(n); v }), vec![0, 2, 4, 6, 8]);
/// ```
#[derive(Debug, Clone)]
pub struct Seq<I>(I);

impl<I> Seq<I> {
    /// Wrap an iterable.
    pub fn new(iterable: I) -> Self {
        Seq(iterable)
    }
}

impl<I> Foldable for Seq<I>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    fn fold_step<S: 'static>(self, initial: S) -> Fold<I::Item, S> {
        step_iter(self.0.into_iter(), initial)
    }
}
