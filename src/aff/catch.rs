//! Selective error recovery for [`Aff`].

use std::fmt;
use std::sync::Arc;

use crate::env::HasCancel;
use crate::error::{Error, Fin};

use super::Aff;

type Matcher = Arc<dyn Fn(&Error) -> bool + Send + Sync>;
type Fallback<A, Env> = Arc<dyn Fn(Error) -> Aff<A, Env> + Send + Sync>;

/// A predicate over errors paired with an asynchronous fallback.
///
/// Same semantics as [`EffCatch`](crate::EffCatch): non-matching errors are
/// re-raised unchanged and [`AffCatch::or`] tries handlers in order.
///
/// ```
/// use undertow::{Aff, AffCatch, Error};
///
/// # tokio_test::block_on(async {
/// let io = Aff::<u8>::attempt(|| async {
///     Err::<u8, _>(std::io::Error::new(std::io::ErrorKind::Other, "socket closed"))
/// });
/// let handled = io.catch(AffCatch::exception::<std::io::Error, _>(|_| Aff::success(0)));
/// assert_eq!(handled.run_standalone().await, Ok(0));
/// # });
/// ```
pub struct AffCatch<A, Env> {
    matches: Matcher,
    fallback: Fallback<A, Env>,
}

impl<A, Env> AffCatch<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// Catch errors accepted by `pred`.
    pub fn when<P, F>(pred: P, fallback: F) -> Self
    where
        P: Fn(&Error) -> bool + Send + Sync + 'static,
        F: Fn(Error) -> Aff<A, Env> + Send + Sync + 'static,
    {
        AffCatch {
            matches: Arc::new(pred),
            fallback: Arc::new(fallback),
        }
    }

    /// Catch errors carrying `code` anywhere in them.
    pub fn code<F>(code: i32, fallback: F) -> Self
    where
        F: Fn(Error) -> Aff<A, Env> + Send + Sync + 'static,
    {
        Self::when(move |e| e.has_code(code), fallback)
    }

    /// Catch errors equal to `error`.
    pub fn error<F>(error: Error, fallback: F) -> Self
    where
        F: Fn(Error) -> Aff<A, Env> + Send + Sync + 'static,
    {
        Self::when(move |e| *e == error, fallback)
    }

    /// Catch errors wrapping a foreign error of type `E`.
    pub fn exception<E, F>(fallback: F) -> Self
    where
        E: std::error::Error + 'static,
        F: Fn(Error) -> Aff<A, Env> + Send + Sync + 'static,
    {
        Self::when(|e| e.is::<E>(), fallback)
    }

    /// Catch cancellation.
    pub fn cancelled<F>(fallback: F) -> Self
    where
        F: Fn(Error) -> Aff<A, Env> + Send + Sync + 'static,
    {
        Self::when(Error::is_cancelled, fallback)
    }

    /// Catch every error.
    pub fn all<F>(fallback: F) -> Self
    where
        F: Fn(Error) -> Aff<A, Env> + Send + Sync + 'static,
    {
        Self::when(|_| true, fallback)
    }

    /// Try this catch first, then `other`.
    pub fn or(self, other: AffCatch<A, Env>) -> Self {
        let (first, second) = (self, other);
        let matches_first = first.matches.clone();
        let matches_second = second.matches.clone();
        AffCatch {
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

    pub(crate) async fn apply(&self, error: Error, env: &Env) -> Fin<A> {
        if (self.matches)(&error) {
            (self.fallback)(error).run(env).await
        } else {
            Err(error)
        }
    }
}

impl<A, Env> Clone for AffCatch<A, Env> {
    fn clone(&self) -> Self {
        AffCatch {
            matches: self.matches.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

impl<A, Env> fmt::Debug for AffCatch<A, Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AffCatch")
            .field("matches", &"<predicate>")
            .field("fallback", &"<handler>")
            .finish()
    }
}
