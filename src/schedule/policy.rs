//! Schedule policy types and configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::scheduler::Scheduler;

/// A schedule describing how often, and how far apart, an effect is re-run.
///
/// Schedules are pure data. They describe repetition but don't execute it;
/// [`Schedule::start`] hands out the per-invocation state machine and the
/// `repeat`/`retry` family on [`Eff`](crate::Eff) and [`Aff`](crate::Aff) drive it.
///
/// # Repeats
///
/// `repeats` counts re-runs after the first run, so `recurs(3)` allows four
/// runs in total. [`Schedule::forever`] has no bound.
///
/// # Spacing
///
/// The spacing is the wait before the first re-run. The back-off derives each
/// later wait from the previous ones and `max_delay` caps the result. Without
/// a spacing re-runs happen back to back.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use undertow::Schedule;
///
/// let schedule = Schedule::exponential(Duration::from_millis(10)).with_repeats(3);
///
/// let waits: Vec<_> = schedule.start().collect();
/// assert_eq!(
///     waits,
///     vec![Duration::from_millis(10), Duration::from_millis(20), Duration::from_millis(40)]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schedule {
    repeats: Option<u32>,
    spacing: Option<Duration>,
    backoff: Backoff,
    max_delay: Option<Duration>,
    jitter: Jitter,
}

/// A step function producing the next wait from the previous and current ones.
pub type BackoffFn = Arc<dyn Fn(Duration, Duration) -> Duration + Send + Sync>;

/// How the wait grows between re-runs.
#[derive(Clone, Default)]
pub enum Backoff {
    /// The spacing never changes.
    #[default]
    Constant,
    /// Each wait adds the initial spacing: s, 2s, 3s, ...
    Linear,
    /// Each wait doubles: s, 2s, 4s, ...
    Exponential,
    /// Waits follow the Fibonacci sequence: s, s, 2s, 3s, 5s, ...
    Fibonacci,
    /// A custom step from `(previous, current)` to the next wait.
    Custom(BackoffFn),
}

impl Backoff {
    pub(crate) fn step(&self, base: Duration, prev: Duration, current: Duration) -> Duration {
        match self {
            Backoff::Constant => current,
            Backoff::Linear => current.saturating_add(base),
            Backoff::Exponential => current.saturating_mul(2),
            Backoff::Fibonacci => prev.saturating_add(current),
            Backoff::Custom(f) => f(prev, current),
        }
    }

    fn grows(&self) -> bool {
        !matches!(self, Backoff::Constant)
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backoff::Constant => write!(f, "Constant"),
            Backoff::Linear => write!(f, "Linear"),
            Backoff::Exponential => write!(f, "Exponential"),
            Backoff::Fibonacci => write!(f, "Fibonacci"),
            Backoff::Custom(_) => write!(f, "Custom(<function>)"),
        }
    }
}

// Custom steps compare by identity.
impl PartialEq for Backoff {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Backoff::Custom(a), Backoff::Custom(b)) => Arc::ptr_eq(a, b),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

/// Strategy for adding randomness to waits.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Jitter {
    /// No jitter applied.
    #[default]
    None,
    /// Add ±percentage randomness to the wait.
    Proportional(f64),
    /// Random wait between 0 and the computed wait.
    Full,
    /// Random wait between the spacing and 3x the previous wait.
    Decorrelated,
}

impl Jitter {
    /// Apply jitter to a computed wait.
    ///
    /// Without the `jitter` feature every strategy returns `wait` unchanged.
    pub fn apply(
        &self,
        wait: Duration,
        #[cfg_attr(not(feature = "jitter"), allow(unused_variables))] base: Duration,
        #[cfg_attr(not(feature = "jitter"), allow(unused_variables))] prev: Option<Duration>,
    ) -> Duration {
        match self {
            Jitter::None => wait,
            #[cfg(feature = "jitter")]
            Jitter::Proportional(factor) => {
                use rand::Rng;
                let millis = wait.as_millis() as f64;
                let range = millis * factor;
                let low = (millis - range).max(0.0);
                let high = millis + range;
                if high <= low {
                    wait
                } else {
                    Duration::from_millis(rand::rng().random_range(low..=high) as u64)
                }
            }
            #[cfg(feature = "jitter")]
            Jitter::Full => {
                use rand::Rng;
                let max = wait.as_millis() as u64;
                if max == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(rand::rng().random_range(0..=max))
                }
            }
            #[cfg(feature = "jitter")]
            Jitter::Decorrelated => {
                use rand::Rng;
                let low = base.as_millis() as u64;
                let high = prev.unwrap_or(wait).as_millis().saturating_mul(3) as u64;
                if high <= low {
                    wait
                } else {
                    Duration::from_millis(rand::rng().random_range(low..=high))
                }
            }
            #[cfg(not(feature = "jitter"))]
            Jitter::Proportional(_) | Jitter::Full | Jitter::Decorrelated => wait,
        }
    }
}

impl Schedule {
    /// Repeat without bound and without waiting.
    pub fn forever() -> Self {
        Self::default()
    }

    /// Never re-run: the effect runs exactly once.
    pub fn never() -> Self {
        Self::recurs(0)
    }

    /// Re-run at most once.
    pub fn once() -> Self {
        Self::recurs(1)
    }

    /// Re-run at most `n` times, back to back.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use undertow::Schedule;
    ///
    /// assert_eq!(Schedule::recurs(2).start().collect::<Vec<_>>(), vec![Duration::ZERO; 2]);
    /// ```
    pub fn recurs(n: u32) -> Self {
        Self::default().with_repeats(n)
    }

    /// Wait a fixed `spacing` between re-runs, without bound.
    pub fn spaced(spacing: Duration) -> Self {
        Self::default().with_spacing(spacing)
    }

    /// Linearly growing waits starting at `spacing`.
    pub fn linear(spacing: Duration) -> Self {
        Self::spaced(spacing).with_backoff(Backoff::Linear)
    }

    /// Doubling waits starting at `spacing`.
    pub fn exponential(spacing: Duration) -> Self {
        Self::spaced(spacing).with_backoff(Backoff::Exponential)
    }

    /// Fibonacci waits starting at `spacing`.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use undertow::Schedule;
    ///
    /// let ms = |n| Duration::from_millis(n);
    /// let waits: Vec<_> = Schedule::fibonacci(ms(100)).with_repeats(5).start().collect();
    /// assert_eq!(waits, vec![ms(100), ms(100), ms(200), ms(300), ms(500)]);
    /// ```
    pub fn fibonacci(spacing: Duration) -> Self {
        Self::spaced(spacing).with_backoff(Backoff::Fibonacci)
    }

    /// Set the maximum number of re-runs.
    pub fn with_repeats(mut self, n: u32) -> Self {
        self.repeats = Some(n);
        self
    }

    /// Set the wait before the first re-run.
    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.spacing = Some(spacing);
        self
    }

    /// Set the back-off.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Use a custom back-off step from `(previous, current)` to the next wait.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use undertow::Schedule;
    ///
    /// let schedule = Schedule::spaced(Duration::from_millis(10))
    ///     .with_backoff_fn(|_, current| current * 3)
    ///     .with_repeats(3);
    /// let waits: Vec<_> = schedule.start().map(|d| d.as_millis()).collect();
    /// assert_eq!(waits, vec![10, 30, 90]);
    /// ```
    pub fn with_backoff_fn<F>(self, f: F) -> Self
    where
        F: Fn(Duration, Duration) -> Duration + Send + Sync + 'static,
    {
        self.with_backoff(Backoff::Custom(Arc::new(f)))
    }

    /// Cap every wait at `max`.
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use undertow::Schedule;
    ///
    /// let schedule = Schedule::exponential(Duration::from_millis(100))
    ///     .with_max_delay(Duration::from_millis(300))
    ///     .with_repeats(4);
    /// let waits: Vec<_> = schedule.start().map(|d| d.as_millis()).collect();
    /// assert_eq!(waits, vec![100, 200, 300, 300]);
    /// ```
    pub fn with_max_delay(mut self, max: Duration) -> Self {
        self.max_delay = Some(max);
        self
    }

    /// Add proportional jitter; `0.25` spreads each wait by ±25%.
    ///
    /// The factor is clamped to `0.0..=1.0`; NaN means no spread.
    ///
    /// **Note**: Requires the `jitter` feature. Without it, waits are unchanged.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        let factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
        self.jitter = Jitter::Proportional(factor);
        self
    }

    /// Use full jitter: each wait is random between zero and the computed wait.
    ///
    /// **Note**: Requires the `jitter` feature. Without it, waits are unchanged.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = Jitter::Full;
        self
    }

    /// Use decorrelated jitter: random between the spacing and 3x the previous wait.
    ///
    /// **Note**: Requires the `jitter` feature. Without it, waits are unchanged.
    pub fn with_decorrelated_jitter(mut self) -> Self {
        self.jitter = Jitter::Decorrelated;
        self
    }

    /// Get the maximum number of re-runs.
    pub fn repeats(&self) -> Option<u32> {
        self.repeats
    }

    /// Get the initial spacing.
    pub fn spacing(&self) -> Option<Duration> {
        self.spacing
    }

    /// Get the back-off.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Get the wait cap.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Get the jitter strategy.
    pub fn jitter(&self) -> &Jitter {
        &self.jitter
    }

    /// True when the schedule has no repeat bound.
    pub fn is_forever(&self) -> bool {
        self.repeats.is_none()
    }

    /// Start a fresh per-invocation state machine.
    pub fn start(&self) -> Scheduler {
        Scheduler::new(self.clone())
    }

    /// Check that the policy is internally consistent.
    ///
    /// Returns an error message if the policy is invalid.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.backoff.grows() && self.spacing.is_none() {
            return Err("a growing back-off needs an initial spacing");
        }
        if let Jitter::Proportional(factor) = self.jitter {
            if !(0.0..=1.0).contains(&factor) {
                return Err("jitter factor must be within 0.0..=1.0");
            }
        }
        match (self.spacing, self.max_delay) {
            (Some(spacing), Some(max)) if max < spacing => {
                Err("max_delay must not be below the initial spacing")
            }
            _ => Ok(()),
        }
    }
}
