//! Scheduled re-runs of synchronous effects.
//!
//! Waits block the calling thread on the environment's token, so a
//! cancellation request ends a wait early and the loop stops before its next
//! run.

use std::sync::Arc;

use crate::eff::Eff;
use crate::env::HasCancel;
use crate::error::{Error, Fin};
use crate::thunk::{eval, SyncFn};

use super::policy::Schedule;
use super::scheduler::Policy;

/// Run `func` under `schedule` until `policy` or the schedule says stop.
///
/// Every run is a fresh evaluation. `observe` sees each successful value.
pub(crate) fn drive<A, Env, O>(
    func: &SyncFn<A, Env>,
    env: &Env,
    schedule: &Schedule,
    policy: &Policy<A>,
    mut observe: O,
) -> Fin<A>
where
    Env: HasCancel,
    O: FnMut(&A),
{
    let mut scheduler = schedule.start();
    loop {
        if env.is_cancelled() {
            return Err(Error::cancelled());
        }
        let result = eval(func, env);
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
        if !wait.is_zero() && env.env_io().token().wait_timeout(wait) {
            crate::trace_debug!("schedule cancelled while waiting");
            return Err(Error::cancelled());
        }
    }
}

impl<A, Env> Eff<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    fn scheduled(self, schedule: Schedule, policy: Policy<A>) -> Eff<A, Env> {
        self.derive(move |func, env| drive(func, env, &schedule, &policy, |_| {}))
    }

    fn folded<S, F>(self, schedule: Schedule, policy: Policy<A>, state: S, f: F) -> Eff<S, Env>
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(S, A) -> S + Send + Sync + 'static,
    {
        self.derive(move |func, env| {
            let mut acc = state.clone();
            drive(func, env, &schedule, &policy, |a| acc = f(acc.clone(), a.clone()))?;
            Ok(acc)
        })
    }

    /// Re-run while it succeeds, until the schedule is exhausted.
    ///
    /// Returns the last outcome.
    ///
    /// ```
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    /// use undertow::{Eff, Schedule};
    ///
    /// let runs = Arc::new(AtomicU32::new(0));
    /// let counter = runs.clone();
    /// let tick = Eff::<u32>::effect(move || counter.fetch_add(1, Ordering::SeqCst) + 1);
    ///
    /// assert_eq!(tick.repeat(Schedule::recurs(3)).run_standalone(), Ok(4));
    /// ```
    pub fn repeat(self, schedule: Schedule) -> Eff<A, Env> {
        self.scheduled(schedule, Policy::Repeat)
    }

    /// Re-run while it fails, until the schedule is exhausted.
    ///
    /// Returns the first success or the last failure.
    pub fn retry(self, schedule: Schedule) -> Eff<A, Env> {
        self.scheduled(schedule, Policy::Retry)
    }

    /// Re-run while it succeeds and `pred` holds for the value.
    pub fn repeat_while<P>(self, schedule: Schedule, pred: P) -> Eff<A, Env>
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.scheduled(schedule, Policy::RepeatWhile(Arc::new(pred)))
    }

    /// Re-run while it succeeds, until `pred` holds for the value.
    pub fn repeat_until<P>(self, schedule: Schedule, pred: P) -> Eff<A, Env>
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.scheduled(schedule, Policy::RepeatUntil(Arc::new(pred)))
    }

    /// Re-run while it fails and `pred` holds for the error.
    pub fn retry_while<P>(self, schedule: Schedule, pred: P) -> Eff<A, Env>
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.scheduled(schedule, Policy::RetryWhile(Arc::new(pred)))
    }

    /// Re-run while it fails, until `pred` holds for the error.
    pub fn retry_until<P>(self, schedule: Schedule, pred: P) -> Eff<A, Env>
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
    {
        self.scheduled(schedule, Policy::RetryUntil(Arc::new(pred)))
    }

    /// Repeat while it succeeds, folding every value into `state`.
    ///
    /// A failure ends the fold with that failure.
    pub fn fold<S, F>(self, schedule: Schedule, state: S, f: F) -> Eff<S, Env>
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(S, A) -> S + Send + Sync + 'static,
    {
        self.folded(schedule, Policy::Repeat, state, f)
    }

    /// Fold while `pred` holds for each value. The value that stops the loop
    /// is still folded.
    pub fn fold_while<S, F, P>(self, schedule: Schedule, state: S, f: F, pred: P) -> Eff<S, Env>
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(S, A) -> S + Send + Sync + 'static,
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.folded(schedule, Policy::RepeatWhile(Arc::new(pred)), state, f)
    }

    /// Fold until `pred` holds for a value. That value is still folded.
    pub fn fold_until<S, F, P>(self, schedule: Schedule, state: S, f: F, pred: P) -> Eff<S, Env>
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(S, A) -> S + Send + Sync + 'static,
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.folded(schedule, Policy::RepeatUntil(Arc::new(pred)), state, f)
    }
}
