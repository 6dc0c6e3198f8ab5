//! Testing utilities for effect-based code.
//!
//! [`TestEnv`] is a ready-made runtime environment carrying one payload of
//! test dependencies next to its cancellation environment. The assertion
//! macros check [`Fin`](crate::Fin) outcomes with readable panic messages.
//!
//! # Examples
//!
//! ## TestEnv
//!
//! ```rust
//! use undertow::testing::TestEnv;
//! use undertow::Eff;
//!
//! #[derive(Clone)]
//! struct Config {
//!     retries: u32,
//! }
//!
//! let read = Eff::<u32, TestEnv<Config>>::effect_env(|env| env.payload().retries);
//! let env = TestEnv::new(Config { retries: 3 });
//! assert_eq!(read.run(&env), Ok(3));
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use undertow::{assert_fail, assert_fail_code, assert_succ, Eff, Error};
//!
//! assert_succ!(Eff::<i32>::success(42).run_standalone());
//! assert_succ!(Eff::<i32>::success(42).run_standalone(), 42);
//! assert_fail!(Eff::<i32>::fail("nope").run_standalone());
//! assert_fail_code!(Eff::<i32>::fail(Error::coded(7, "busy")).run_standalone(), 7);
//! ```

use crate::env::{EnvIO, HasCancel};

/// A runtime environment for tests: an [`EnvIO`] plus a payload.
///
/// Cancellation scopes derived with [`HasCancel::local_cancel`] share the
/// payload.
#[derive(Debug, Clone)]
pub struct TestEnv<T> {
    io: EnvIO,
    payload: T,
}

impl<T> TestEnv<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap `payload` with a fresh [`EnvIO`].
    pub fn new(payload: T) -> Self {
        Self::with_io(EnvIO::new(), payload)
    }

    /// Wrap `payload` with an existing cancellation environment.
    pub fn with_io(io: EnvIO, payload: T) -> Self {
        TestEnv { io, payload }
    }

    /// The test dependencies.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// The cancellation environment.
    pub fn io(&self) -> &EnvIO {
        &self.io
    }
}

impl<T> HasCancel for TestEnv<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn env_io(&self) -> &EnvIO {
        &self.io
    }

    fn local_cancel(&self) -> Self {
        TestEnv {
            io: self.io.local(),
            payload: self.payload.clone(),
        }
    }
}

/// Assert that an outcome is a success, optionally with an expected value.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_succ, Fin};
///
/// let ok: Fin<i32> = Ok(1);
/// assert_succ!(ok, 1);
/// ```
#[macro_export]
macro_rules! assert_succ {
    ($fin:expr) => {
        match $fin {
            Ok(_) => {}
            Err(e) => {
                panic!("Expected Succ, got Fail: {:?}", e);
            }
        }
    };
    ($fin:expr, $expected:expr) => {
        match $fin {
            Ok(v) => {
                assert_eq!(v, $expected);
            }
            Err(e) => {
                panic!("Expected Succ({:?}), got Fail: {:?}", $expected, e);
            }
        }
    };
}

/// Assert that an outcome is a failure.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_fail, Error, Fin};
///
/// let failed: Fin<i32> = Err(Error::new("boom"));
/// assert_fail!(failed);
/// ```
#[macro_export]
macro_rules! assert_fail {
    ($fin:expr) => {
        match $fin {
            Err(_) => {}
            Ok(v) => {
                panic!("Expected Fail, got Succ: {:?}", v);
            }
        }
    };
}

/// Assert that an outcome is a failure carrying `code`.
///
/// The code may sit on the error itself or on any accumulated error.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_fail_code, Error, Fin, Semigroup};
///
/// let failed: Fin<i32> = Err(Error::new("first").combine(Error::coded(3, "second")));
/// assert_fail_code!(failed, 3);
/// ```
#[macro_export]
macro_rules! assert_fail_code {
    ($fin:expr, $code:expr) => {
        match $fin {
            Err(e) => {
                assert!(
                    e.has_code($code),
                    "Expected Fail with code {}, got Fail: {:?}",
                    $code,
                    e
                );
            }
            Ok(v) => {
                panic!("Expected Fail with code {}, got Succ: {:?}", $code, v);
            }
        }
    };
}
