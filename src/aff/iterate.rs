//! Iteration over collections produced by asynchronous effects.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::env::HasCancel;
use crate::fold::{Fold, Foldable};
use crate::thunk::eval_async;

use super::Aff;

/// Run `f` for every element of the collection `items` produces, one at a time.
///
/// `items` runs once. The first failing element stops the walk; later
/// elements are never visited.
pub fn iter<C, B, Env, F>(items: Aff<C, Env>, f: F) -> Aff<(), Env>
where
    C: Foldable + Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    Env: HasCancel,
    F: Fn(C::Item) -> Aff<B, Env> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    items.derive(move |func, env| {
        let f = f.clone();
        async move {
            let mut step = eval_async(&func, env.clone()).await?.fold_step(());
            loop {
                match step {
                    Fold::Done(()) => return Ok(()),
                    Fold::Loop { state, value, next } => {
                        f(value).run_unit(&env).await?;
                        step = next(state);
                    }
                }
            }
        }
    })
}

/// Run `f` for every element with up to `max_concurrency` runs in flight.
///
/// Element runs share a child cancellation scope. The first failure cancels
/// that scope: in-flight siblings stop at their next boundary and elements not
/// yet started fail without running. All dispatched work settles before the
/// first failure is returned. A `max_concurrency` of zero is treated as one.
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use undertow::aff::iterate::iter_parallel;
/// use undertow::Aff;
///
/// # tokio_test::block_on(async {
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = seen.clone();
/// let all = iter_parallel(Aff::<Vec<usize>>::success((1..=10).collect()), move |n| {
///     let counter = counter.clone();
///     Aff::<()>::effect(move || {
///         let counter = counter.clone();
///         async move { counter.fetch_add(n, Ordering::SeqCst); }
///     })
/// }, 4);
///
/// assert_eq!(all.run_standalone().await, Ok(()));
/// assert_eq!(seen.load(Ordering::SeqCst), 55);
/// # });
/// ```
pub fn iter_parallel<C, B, Env, F>(items: Aff<C, Env>, f: F, max_concurrency: usize) -> Aff<(), Env>
where
    C: Foldable + Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    Env: HasCancel,
    F: Fn(C::Item) -> Aff<B, Env> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let limit = max_concurrency.max(1);
    items.derive(move |func, env| {
        let f = f.clone();
        async move {
            let elements = eval_async(&func, env.clone())
                .await?
                .fold_step(Vec::new())
                .fold(|mut acc, item| {
                    acc.push(item);
                    acc
                });
            let scope = env.local_cancel();

            let mut runs = stream::iter(elements)
                .map(|item| {
                    let scope = scope.clone();
                    let aff = f(item);
                    async move { aff.run_unit(&scope).await }
                })
                .buffer_unordered(limit);

            let mut first_error = None;
            while let Some(result) = runs.next().await {
                if let Err(error) = result {
                    if first_error.is_none() {
                        crate::trace_debug!(error = %error, "parallel iteration failed; cancelling siblings");
                        scope.env_io().cancel();
                        first_error = Some(error);
                    }
                }
            }
            first_error.map_or(Ok(()), Err)
        }
    })
}

/// Thread `state` through repeated runs of `ma` while `pred` holds.
///
/// The asynchronous counterpart of [`eff::iterate::fold_while`](crate::eff::iterate::fold_while).
pub fn fold_while<A, S, Env, F, P>(ma: Aff<A, Env>, state: S, fold: F, pred: P) -> Aff<S, Env>
where
    A: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    Env: HasCancel,
    F: Fn(S, A) -> Aff<S, Env> + Send + Sync + 'static,
    P: Fn(&S) -> Aff<bool, Env> + Send + Sync + 'static,
{
    let fold = Arc::new(fold);
    let pred = Arc::new(pred);
    ma.derive(move |func, env| {
        let (fold, pred) = (fold.clone(), pred.clone());
        let mut state = state.clone();
        async move {
            loop {
                if !pred(&state).run(&env).await? {
                    return Ok(state);
                }
                let value = eval_async(&func, env.clone()).await?;
                state = fold(state, value).run(&env).await?;
            }
        }
    })
}
