//! Selective error recovery for [`Eff`].

use std::fmt;
use std::sync::Arc;

use crate::env::HasCancel;
use crate::error::{Error, Fin};

use super::Eff;

type Matcher = Arc<dyn Fn(&Error) -> bool + Send + Sync>;
type Fallback<A, Env> = Arc<dyn Fn(Error) -> Eff<A, Env> + Send + Sync>;

/// A predicate over errors paired with a fallback effect.
///
/// Catches are values: build them once, combine them with [`EffCatch::or`],
/// and attach them with [`Eff::catch`]. A catch whose predicate rejects the
/// error re-fails with that error unchanged.
///
/// # Example
///
/// ```
/// use undertow::{Eff, EffCatch, Error};
///
/// let flaky = Eff::<&str>::fail(Error::coded(404, "missing"));
///
/// let handled = flaky.catch(
///     EffCatch::code(500, |_| Eff::success("server"))
///         .or(EffCatch::code(404, |_| Eff::success("not found"))),
/// );
/// assert_eq!(handled.run_standalone(), Ok("not found"));
/// ```
pub struct EffCatch<A, Env> {
    matches: Matcher,
    fallback: Fallback<A, Env>,
}

impl<A, Env> EffCatch<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// Catch errors accepted by `pred`.
    pub fn when<P, F>(pred: P, fallback: F) -> Self
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
        F: Fn(Error) -> Eff<A, Env> + Send + Sync + 'static,
    {
        EffCatch {
            matches: Arc::new(pred),
            fallback: Arc::new(fallback),
        }
    }

    /// Catch errors carrying `code` anywhere in them.
    pub fn code<F>(code: i32, fallback: F) -> Self
    where
        F: Fn(Error) -> Eff<A, Env> + Send + Sync + 'static,
    {
        Self::when(move |e| e.has_code(code), fallback)
    }

    /// Catch errors equal to `error`.
    pub fn error<F>(error: Error, fallback: F) -> Self
    where
        F: Fn(Error) -> Eff<A, Env> + Send + Sync + 'static,
    {
        Self::when(move |e| *e == error, fallback)
    }

    /// Catch errors wrapping a foreign error of type `E`.
    pub fn exception<E, F>(fallback: F) -> Self
    where
        E: std::error::Error + 'static,
        F: Fn(Error) -> Eff<A, Env> + Send + Sync + 'static,
    {
        Self::when(|e| e.is::<E>(), fallback)
    }

    /// Catch cancellation.
    pub fn cancelled<F>(fallback: F) -> Self
    where
        F: Fn(Error) -> Eff<A, Env> + Send + Sync + 'static,
    {
        Self::when(Error::is_cancelled, fallback)
    }

    /// Catch every error.
    pub fn all<F>(fallback: F) -> Self
    where
        F: Fn(Error) -> Eff<A, Env> + Send + Sync + 'static,
    {
        Self::when(|_| true, fallback)
    }

    /// Try this catch first, then `other`.
    ///
    /// Both see the original error; the first whose predicate matches handles it.
    pub fn or(self, other: EffCatch<A, Env>) -> Self {
        let (first, second) = (self, other);
        let matches_first = first.matches.clone();
        let matches_second = second.matches.clone();
        EffCatch {
            matches: Arc::new(move |e: &Error| matches_first(e) || matches_second(e)),
            fallback: Arc::new(move |e: Error| {
                if (first.matches)(&e) {
                    (first.fallback)(e)
                } else {
                    (second.fallback)(e)
                }
            }),
        }
    }

    /// True when this catch handles `error`.
    pub fn matches(&self, error: &Error) -> bool {
        (self.matches)(error)
    }

    pub(crate) fn apply(&self, error: Error, env: &Env) -> Fin<A> {
        if (self.matches)(&error) {
            (self.fallback)(error).run(env)
        } else {
            Err(error)
        }
    }
}

impl<A, Env> Clone for EffCatch<A, Env> {
    fn clone(&self) -> Self {
        EffCatch {
            matches: self.matches.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

impl<A, Env> fmt::Debug for EffCatch<A, Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffCatch")
            .field("matches", &"<predicate>")
            .field("fallback", &"<handler>")
            .finish()
    }
}
