//! Iteration over collections produced by synchronous effects.

use crate::env::HasCancel;
use crate::fold::Foldable;
use crate::thunk::eval;

use super::Eff;

/// Run `f` for every element of the collection `items` produces, in order.
///
/// `items` runs once. The first failing element stops the walk; later
/// elements are never visited.
///
/// ```
/// use undertow::eff::iterate::iter;
/// use undertow::{Eff, Error};
///
/// let checked = iter(Eff::<Vec<i32>>::success(vec![1, 2, 3]), |n| {
///     if n == 2 { Eff::<()>::fail(Error::new("two")) } else { Eff::success(()) }
/// });
/// assert_eq!(checked.run_standalone(), Err(Error::new("two")));
/// ```
pub fn iter<C, B, Env, F>(items: Eff<C, Env>, f: F) -> Eff<(), Env>
where
    C: Foldable + Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    Env: HasCancel,
    F: Fn(C::Item) -> Eff<B, Env> + Send + Sync + 'static,
{
    items.derive(move |func, env| {
        eval(func, env)?
            .fold_step(())
            .try_fold(|(), item| f(item).run_unit(env))
    })
}

/// Thread `state` through repeated runs of `ma` while `pred` holds.
///
/// Each iteration first runs `pred(&state)`; `false` ends the loop with the
/// current state. Otherwise `ma` is re-run from scratch and `fold` produces
/// the next state. Any failure ends the loop with that failure.
///
/// ```
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
/// use undertow::eff::iterate::fold_while;
/// use undertow::Eff;
///
/// let next = Arc::new(AtomicI32::new(0));
/// let counter = next.clone();
/// let tick = Eff::<i32>::effect(move || counter.fetch_add(1, Ordering::SeqCst));
///
/// let sum = fold_while(tick, 0, |s, n| Eff::success(s + n), |s| Eff::success(*s < 5));
/// assert_eq!(sum.run_standalone(), Ok(6)); // 0 + 1 + 2 + 3
/// ```
pub fn fold_while<A, S, Env, F, P>(ma: Eff<A, Env>, state: S, fold: F, pred: P) -> Eff<S, Env>
where
    A: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    Env: HasCancel,
    F: Fn(S, A) -> Eff<S, Env> + Send + Sync + 'static,
    P: Fn(&S) -> Eff<bool, Env> + Send + Sync + 'static,
{
    ma.derive(move |func, env| {
        let mut state = state.clone();
        loop {
            if !pred(&state).run(env)? {
                return Ok(state);
            }
            let value = eval(func, env)?;
            state = fold(state, value).run(env)?;
        }
    })
}
