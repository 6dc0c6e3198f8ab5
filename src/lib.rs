//! # Undertow
//!
//! Deferred, cancellable, re-runnable effects for Rust.
//!
//! An effect describes a computation without running it. Running it against
//! an environment produces a [`Fin<A>`], a plain `Result<A, Error>`, and the
//! outcome is memoized until the effect is cleared. Effects compose with the
//! usual combinators and can be repeated or retried under a [`Schedule`].
//!
//! - [`Eff`] runs synchronously on the calling thread.
//! - [`Aff`] runs as a `Send` future on tokio and can be pre-empted by
//!   cancellation while it is suspended.
//!
//! Both carry an environment implementing [`HasCancel`]. The default,
//! [`EnvIO`], holds nothing but a cancellation token and the runtime that was
//! current when it was created.
//!
//! ## Quick Example
//!
//! ```rust
//! use std::time::Duration;
//! use undertow::{Aff, AffCatch, Error, Schedule};
//!
//! # tokio_test::block_on(async {
//! let lookup = Aff::<u32>::effect_maybe(|| async { Err(Error::coded(503, "unavailable")) });
//!
//! let resilient = lookup
//!     .retry_while(
//!         Schedule::exponential(Duration::from_millis(1)).with_repeats(3),
//!         |e| e.has_code(503),
//!     )
//!     .catch(AffCatch::code(503, |_| Aff::success(0)))
//!     .map(|n| n + 1);
//!
//! assert_eq!(resilient.run_standalone().await, Ok(1));
//! # });
//! ```
//!
//! ## Feature flags
//!
//! - `jitter`: randomized schedule waits.
//! - `tracing`: `Aff::instrument` plus debug events from the schedule and
//!   dispatch machinery.
//! - `serde`: (de)serialization of [`schedule::ScheduleConfig`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { ::tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { ::tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

pub(crate) use trace_debug;
pub(crate) use trace_warn;

pub mod aff;
pub mod eff;
pub mod env;
pub mod error;
pub mod fold;
pub mod schedule;
pub mod semigroup;
pub mod testing;
pub mod thunk;

// Re-exports
pub use aff::{Aff, AffCatch};
pub use eff::{Eff, EffCatch};
pub use env::{CancelToken, EnvIO, HasCancel};
pub use error::{codes, Error, Fin, FinExt};
pub use fold::Foldable;
pub use schedule::Schedule;
pub use semigroup::Semigroup;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aff::iterate::iter_parallel;
    pub use crate::aff::{Aff, AffCatch};
    pub use crate::eff::{Eff, EffCatch};
    pub use crate::env::{EnvIO, HasCancel};
    pub use crate::error::{Error, Fin, FinExt};
    pub use crate::fold::Foldable;
    pub use crate::schedule::Schedule;
    pub use crate::semigroup::Semigroup;
}
