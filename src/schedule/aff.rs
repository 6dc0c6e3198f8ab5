//! Scheduled re-runs of asynchronous effects.
//!
//! Waits are `tokio::time::sleep` raced against the environment's
//! cancellation, so a cancelled loop wakes up and stops immediately.

use std::sync::Arc;

use crate::aff::Aff;
use crate::env::HasCancel;
use crate::error::{Error, Fin};
use crate::thunk::{eval_async, AsyncFn};

use super::policy::Schedule;
use super::scheduler::Policy;

/// Run `func` under `schedule` until `policy` or the schedule says stop.
pub(crate) async fn drive<A, Env, O>(
    func: &AsyncFn<A, Env>,
    env: &Env,
    schedule: &Schedule,
    policy: &Policy<A>,
    mut observe: O,
) -> Fin<A>
where
    Env: HasCancel,
    O: FnMut(&A),
{
    let token = env.env_io().token().clone();
    let mut scheduler = schedule.start();
    loop {
        if env.is_cancelled() {
            return Err(Error::cancelled());
        }
        let result = eval_async(func, env.clone()).await;
        if let Ok(value) = &result {
            observe(value);
        }
        if !policy.should_continue(&result) {
            return result;
        }
        let Some(wait) = scheduler.next() else {
            crate::trace_debug!("schedule exhausted");
            return result;
        };
        crate::trace_debug!(
            wait_ms = wait.as_millis() as u64,
            remaining = ?scheduler.remaining(),
            "schedule continuing"
        );
        if !wait.is_zero() {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Error::cancelled()),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}

impl<A, Env> Aff<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    fn scheduled(self, schedule: Schedule, policy: Policy<A>) -> Aff<A, Env> {
        self.derive(move |func, env| {
            let (schedule, policy) = (schedule.clone(), policy.clone());
            async move { drive(&func, &env, &schedule, &policy, |_| {}).await }
        })
    }

    fn folded<S, F>(self, schedule: Schedule, policy: Policy<A>, state: S, f: F) -> Aff<S, Env>
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(S, A) -> S + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.derive(move |func, env| {
            let (schedule, policy, f) = (schedule.clone(), policy.clone(), f.clone());
            let mut acc = state.clone();
            async move {
                drive(&func, &env, &schedule, &policy, |a: &A| {
                    acc = f(acc.clone(), a.clone())
                })
                .await?;
                Ok(acc)
            }
        })
    }

    /// Re-run while it succeeds, until the schedule is exhausted.
    pub fn repeat(self, schedule: Schedule) -> Aff<A, Env> {
        self.scheduled(schedule, Policy::Repeat)
    }

    /// Re-run while it fails, until the schedule is exhausted.
    ///
    /// ```
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    /// use undertow::{Aff, Error, Schedule};
    ///
    /// # tokio_test::block_on(async {
    /// let attempts = Arc::new(AtomicU32::new(0));
    /// let counter = attempts.clone();
    /// let flaky = Aff::<&str>::effect_maybe(move || {
    ///     let n = counter.fetch_add(1, Ordering::SeqCst);
    ///     async move { if n < 2 { Err(Error::new("busy")) } else { Ok("done") } }
    /// });
    ///
    /// assert_eq!(flaky.retry(Schedule::forever()).run_standalone().await, Ok("done"));
    /// assert_eq!(attempts.load(Ordering::SeqCst), 3);
    /// # });
    /// ```
    pub fn retry(self, schedule: Schedule) -> Aff<A, Env> {
        self.scheduled(schedule, Policy::Retry)
    }

    /// Re-run while it succeeds and `pred` holds for the value.
    pub fn repeat_while<P>(self, schedule: Schedule, pred: P) -> Aff<A, Env>
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.scheduled(schedule, Policy::RepeatWhile(Arc::new(pred)))
    }

    /// Re-run while it succeeds, until `pred` holds for the value.
    pub fn repeat_until<P>(self, schedule: Schedule, pred: P) -> Aff<A, Env>
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.scheduled(schedule, Policy::RepeatUntil(Arc::new(pred)))
    }

    /// Re-run while it fails and `pred` holds for the error.
    pub fn retry_while<P>(self, schedule: Schedule, pred: P) -> Aff<A, Env>
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.scheduled(schedule, Policy::RetryWhile(Arc::new(pred)))
    }

    /// Re-run while it fails, until `pred` holds for the error.
    pub fn retry_until<P>(self, schedule: Schedule, pred: P) -> Aff<A, Env>
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.scheduled(schedule, Policy::RetryUntil(Arc::new(pred)))
    }

    /// Repeat while it succeeds, folding every value into `state`.
    pub fn fold<S, F>(self, schedule: Schedule, state: S, f: F) -> Aff<S, Env>
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(S, A) -> S + Send + Sync + 'static,
    {
        self.folded(schedule, Policy::Repeat, state, f)
    }

    /// Fold while `pred` holds for each value; the stopping value is folded.
    pub fn fold_while<S, F, P>(self, schedule: Schedule, state: S, f: F, pred: P) -> Aff<S, Env>
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(S, A) -> S + Send + Sync + 'static,
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.folded(schedule, Policy::RepeatWhile(Arc::new(pred)), state, f)
    }

    /// Fold until `pred` holds for a value; that value is folded.
    pub fn fold_until<S, F, P>(self, schedule: Schedule, state: S, f: F, pred: P) -> Aff<S, Env>
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(S, A) -> S + Send + Sync + 'static,
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.folded(schedule, Policy::RepeatUntil(Arc::new(pred)), state, f)
    }
}
