//! Repeat and retry schedules.
//!
//! A [`Schedule`] is pure data describing how many times an effect may be
//! re-run and how long to wait before each re-run. Starting a schedule yields
//! a [`Scheduler`], an iterator over the waits of one invocation.
//!
//! The drivers live on [`Eff`](crate::Eff) and [`Aff`](crate::Aff):
//!
//! | method                 | continues while                          |
//! |------------------------|------------------------------------------|
//! | `repeat`               | the run succeeds                         |
//! | `retry`                | the run fails                            |
//! | `repeat_while/until`   | the run succeeds and the value predicate |
//! | `retry_while/until`    | the run fails and the error predicate    |
//! | `fold/_while/_until`   | as `repeat`, accumulating each value     |
//!
//! Every loop also stops when the schedule is exhausted or the environment is
//! cancelled. Retries never continue past a cancellation error.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use undertow::{Eff, Error, Schedule};
//!
//! let schedule = Schedule::exponential(Duration::from_millis(1)).with_repeats(2);
//! let busy = Eff::<()>::fail(Error::coded(5, "busy"));
//!
//! let err = busy.retry_while(schedule, |e| e.has_code(5)).run_standalone().unwrap_err();
//! assert_eq!(err.code(), Some(5));
//! ```

mod aff;
mod config;
mod eff;
mod policy;
mod scheduler;

#[cfg(test)]
mod tests;

pub use config::{BackoffKind, JitterKind, ScheduleConfig};
pub use policy::{Backoff, BackoffFn, Jitter, Schedule};
pub use scheduler::Scheduler;
