//! The per-invocation scheduling state machine.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Fin};

use super::policy::Schedule;

/// Iterator over the waits of one schedule invocation.
///
/// Each item is the wait before one more re-run; the iterator ends when the
/// repeats are exhausted. Created by [`Schedule::start`], never shared between
/// invocations.
#[derive(Debug, Clone)]
pub struct Scheduler {
    schedule: Schedule,
    remaining: Option<u32>,
    prev: Duration,
    current: Option<Duration>,
    last_wait: Option<Duration>,
}

impl Scheduler {
    pub(crate) fn new(schedule: Schedule) -> Self {
        Scheduler {
            remaining: schedule.repeats(),
            prev: Duration::ZERO,
            current: schedule.spacing(),
            last_wait: None,
            schedule,
        }
    }

    /// Re-runs still allowed, or `None` for an unbounded schedule.
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    fn cap(&self, wait: Duration) -> Duration {
        match self.schedule.max_delay() {
            Some(max) => wait.min(max),
            None => wait,
        }
    }
}

impl Iterator for Scheduler {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        let Some(current) = self.current else {
            return Some(Duration::ZERO);
        };
        let base = self.schedule.spacing().unwrap_or(Duration::ZERO);
        let wait = self.cap(self.schedule.jitter().apply(current, base, self.last_wait));
        let next = self.cap(self.schedule.backoff().step(base, self.prev, current));

        self.prev = current;
        self.current = Some(next);
        self.last_wait = Some(wait);
        Some(wait)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining {
            Some(n) => (n as usize, Some(n as usize)),
            None => (usize::MAX, None),
        }
    }
}

type ValuePred<A> = Arc<dyn Fn(&A) -> bool + Send + Sync>;
type ErrorPred = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Whether a loop continues after an outcome.
pub(crate) enum Policy<A> {
    /// Continue while runs succeed.
    Repeat,
    /// Continue while runs fail.
    Retry,
    RepeatWhile(ValuePred<A>),
    RepeatUntil(ValuePred<A>),
    RetryWhile(ErrorPred),
    RetryUntil(ErrorPred),
}

impl<A> Policy<A> {
    pub(crate) fn should_continue(&self, result: &Fin<A>) -> bool {
        match (self, result) {
            (Policy::Repeat, Ok(_)) => true,
            (Policy::Retry, Err(e)) => !e.is_cancelled(),
            (Policy::RepeatWhile(pred), Ok(a)) => pred(a),
            (Policy::RepeatUntil(pred), Ok(a)) => !pred(a),
            (Policy::RetryWhile(pred), Err(e)) => !e.is_cancelled() && pred(e),
            (Policy::RetryUntil(pred), Err(e)) => !e.is_cancelled() && !pred(e),
            _ => false,
        }
    }
}

impl<A> Clone for Policy<A> {
    fn clone(&self) -> Self {
        match self {
            Policy::Repeat => Policy::Repeat,
            Policy::Retry => Policy::Retry,
            Policy::RepeatWhile(p) => Policy::RepeatWhile(p.clone()),
            Policy::RepeatUntil(p) => Policy::RepeatUntil(p.clone()),
            Policy::RetryWhile(p) => Policy::RetryWhile(p.clone()),
            Policy::RetryUntil(p) => Policy::RetryUntil(p.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_no_spacing_yields_zero_waits() {
        let waits: Vec<_> = Schedule::recurs(3).start().collect();
        assert_eq!(waits, vec![Duration::ZERO; 3]);
    }

    #[test]
    fn test_never_yields_nothing() {
        assert_eq!(Schedule::never().start().next(), None);
    }

    #[test]
    fn test_forever_does_not_end() {
        let mut scheduler = Schedule::spaced(ms(5)).start();
        assert_eq!(scheduler.remaining(), None);
        assert_eq!(scheduler.nth(1000), Some(ms(5)));
    }

    #[test]
    fn test_constant_spacing() {
        let waits: Vec<_> = Schedule::spaced(ms(100)).with_repeats(3).start().collect();
        assert_eq!(waits, vec![ms(100); 3]);
    }

    #[test]
    fn test_linear_backoff() {
        let waits: Vec<_> = Schedule::linear(ms(100)).with_repeats(4).start().collect();
        assert_eq!(waits, vec![ms(100), ms(200), ms(300), ms(400)]);
    }

    #[test]
    fn test_exponential_backoff_for_retry_scenario() {
        let waits: Vec<_> = Schedule::exponential(ms(10)).with_repeats(2).start().collect();
        assert_eq!(waits, vec![ms(10), ms(20)]);
    }

    #[test]
    fn test_max_delay_caps_every_wait() {
        let waits: Vec<_> = Schedule::exponential(ms(100))
            .with_max_delay(ms(250))
            .with_repeats(4)
            .start()
            .collect();
        assert_eq!(waits, vec![ms(100), ms(200), ms(250), ms(250)]);
    }

    #[test]
    fn test_exponential_saturates() {
        let mut scheduler = Schedule::exponential(Duration::from_secs(1)).start();
        let last = scheduler.nth(200);
        assert!(last.is_some());
    }

    #[test]
    fn test_size_hint_tracks_remaining() {
        let mut scheduler = Schedule::recurs(3).start();
        scheduler.next();
        assert_eq!(scheduler.size_hint(), (2, Some(2)));
    }

    #[test]
    fn test_policy_projection() {
        let ok: Fin<i32> = Ok(1);
        let err: Fin<i32> = Err(Error::coded(5, "busy"));
        let cancelled: Fin<i32> = Err(Error::cancelled());

        assert!(Policy::Repeat.should_continue(&ok));
        assert!(!Policy::Repeat.should_continue(&err));
        assert!(Policy::<i32>::Retry.should_continue(&err));
        assert!(!Policy::<i32>::Retry.should_continue(&cancelled));

        let busy: Policy<i32> = Policy::RetryWhile(Arc::new(|e: &Error| e.has_code(5)));
        assert!(busy.should_continue(&err));
        assert!(!busy.should_continue(&ok));

        let small: Policy<i32> = Policy::RepeatUntil(Arc::new(|n: &i32| *n > 3));
        assert!(small.should_continue(&ok));
        assert!(!small.should_continue(&Ok(4)));
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_full_jitter_stays_within_wait() {
        let schedule = Schedule::spaced(ms(100)).with_full_jitter().with_repeats(50);
        assert!(schedule.start().all(|w| w <= ms(100)));
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_proportional_jitter_bounds() {
        let schedule = Schedule::spaced(ms(100)).with_jitter(0.2).with_repeats(50);
        assert!(schedule.start().all(|w| w >= ms(80) && w <= ms(120)));
    }
}
