//! Plain-data schedule configuration.
//!
//! [`ScheduleConfig`] is what a schedule looks like in a config file: numbers
//! in milliseconds and named strategies. With the `serde` feature it
//! deserializes directly; missing fields take their defaults.
//!
//! ```rust
//! use std::time::Duration;
//! use undertow::schedule::{BackoffKind, ScheduleConfig};
//!
//! let config = ScheduleConfig {
//!     repeats: Some(2),
//!     spacing_ms: Some(10),
//!     backoff: BackoffKind::Exponential,
//!     ..ScheduleConfig::default()
//! };
//! let schedule = config.into_schedule().unwrap();
//! assert_eq!(schedule.spacing(), Some(Duration::from_millis(10)));
//! assert_eq!(schedule.repeats(), Some(2));
//! ```

use std::time::Duration;

use super::policy::{Backoff, Jitter, Schedule};

/// Serializable description of a [`Schedule`].
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScheduleConfig {
    /// Maximum re-runs; absent means unbounded.
    pub repeats: Option<u32>,
    /// Wait before the first re-run, in milliseconds.
    pub spacing_ms: Option<u64>,
    /// Back-off strategy.
    pub backoff: BackoffKind,
    /// Cap on every wait, in milliseconds.
    pub max_delay_ms: Option<u64>,
    /// Jitter strategy.
    pub jitter: JitterKind,
}

/// Named back-off strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BackoffKind {
    /// See [`Backoff::Constant`].
    #[default]
    Constant,
    /// See [`Backoff::Linear`].
    Linear,
    /// See [`Backoff::Exponential`].
    Exponential,
    /// See [`Backoff::Fibonacci`].
    Fibonacci,
}

/// Named jitter strategies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JitterKind {
    /// No jitter.
    #[default]
    None,
    /// ±factor proportional jitter.
    Proportional(f64),
    /// Full jitter.
    Full,
    /// Decorrelated jitter.
    Decorrelated,
}

impl From<BackoffKind> for Backoff {
    fn from(kind: BackoffKind) -> Self {
        match kind {
            BackoffKind::Constant => Backoff::Constant,
            BackoffKind::Linear => Backoff::Linear,
            BackoffKind::Exponential => Backoff::Exponential,
            BackoffKind::Fibonacci => Backoff::Fibonacci,
        }
    }
}

impl ScheduleConfig {
    /// Build and validate the described schedule.
    pub fn into_schedule(self) -> Result<Schedule, &'static str> {
        let mut schedule = Schedule::forever().with_backoff(self.backoff.into());
        if let Some(n) = self.repeats {
            schedule = schedule.with_repeats(n);
        }
        if let Some(ms) = self.spacing_ms {
            schedule = schedule.with_spacing(Duration::from_millis(ms));
        }
        if let Some(ms) = self.max_delay_ms {
            schedule = schedule.with_max_delay(Duration::from_millis(ms));
        }
        schedule = match self.jitter {
            JitterKind::None => schedule,
            JitterKind::Proportional(factor) if !(0.0..=1.0).contains(&factor) => {
                return Err("jitter factor must be within 0.0..=1.0");
            }
            JitterKind::Proportional(factor) => schedule.with_jitter(factor),
            JitterKind::Full => schedule.with_full_jitter(),
            JitterKind::Decorrelated => schedule.with_decorrelated_jitter(),
        };
        schedule.validate()?;
        Ok(schedule)
    }
}

impl TryFrom<ScheduleConfig> for Schedule {
    type Error = &'static str;

    fn try_from(config: ScheduleConfig) -> Result<Self, Self::Error> {
        config.into_schedule()
    }
}

impl From<&Schedule> for ScheduleConfig {
    /// Describe a schedule as data. Custom back-offs have no name and become
    /// [`BackoffKind::Constant`].
    fn from(schedule: &Schedule) -> Self {
        ScheduleConfig {
            repeats: schedule.repeats(),
            spacing_ms: schedule.spacing().map(|d| d.as_millis() as u64),
            backoff: match schedule.backoff() {
                Backoff::Linear => BackoffKind::Linear,
                Backoff::Exponential => BackoffKind::Exponential,
                Backoff::Fibonacci => BackoffKind::Fibonacci,
                Backoff::Constant | Backoff::Custom(_) => BackoffKind::Constant,
            },
            max_delay_ms: schedule.max_delay().map(|d| d.as_millis() as u64),
            jitter: match schedule.jitter() {
                Jitter::None => JitterKind::None,
                Jitter::Proportional(f) => JitterKind::Proportional(*f),
                Jitter::Full => JitterKind::Full,
                Jitter::Decorrelated => JitterKind::Decorrelated,
            },
        }
    }
}
