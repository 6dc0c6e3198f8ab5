//! Synchronous thunk.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use super::{lock, panicked, reset, ThunkState};
use crate::env::HasCancel;
use crate::error::{Error, Fin};

/// Shared template of a synchronous thunk.
pub(crate) type SyncFn<A, Env> = Arc<dyn Fn(&Env) -> Fin<A> + Send + Sync>;

/// Run a template once, honouring cancellation and converting panics.
pub(crate) fn eval<A, Env: HasCancel>(func: &SyncFn<A, Env>, env: &Env) -> Fin<A> {
    if env.is_cancelled() {
        return Err(Error::cancelled());
    }
    panic::catch_unwind(AssertUnwindSafe(|| func(env))).unwrap_or_else(|p| Err(panicked(p)))
}

/// A memoizing synchronous computation over an environment.
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use undertow::env::EnvIO;
/// use undertow::thunk::Thunk;
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = calls.clone();
/// let mut thunk = Thunk::new(move |_: &EnvIO| Ok(counter.fetch_add(1, Ordering::SeqCst)));
///
/// let env = EnvIO::new();
/// assert_eq!(thunk.value(&env), Ok(0));
/// assert_eq!(thunk.value(&env), Ok(0));
/// assert_eq!(thunk.revalue(&env), Ok(1));
/// assert_eq!(calls.load(Ordering::SeqCst), 2);
/// ```
pub struct Thunk<A, Env> {
    func: SyncFn<A, Env>,
    state: Mutex<ThunkState<A>>,
}

impl<A, Env> Thunk<A, Env> {
    /// Wrap a closure. Nothing runs until the thunk is read.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Env) -> Fin<A> + Send + Sync + 'static,
    {
        Self::from_fn(Arc::new(f))
    }

    pub(crate) fn from_fn(func: SyncFn<A, Env>) -> Self {
        Thunk {
            func,
            state: Mutex::new(ThunkState::NotEvaluated),
        }
    }

    pub(crate) fn func(&self) -> &SyncFn<A, Env> {
        &self.func
    }

    /// Forget the memoized outcome so the next read re-evaluates.
    pub fn clear(&mut self) {
        reset(&mut self.state);
    }

    /// True once the memo cell holds an outcome.
    pub fn is_evaluated(&self) -> bool {
        !matches!(*lock(&self.state), ThunkState::NotEvaluated)
    }
}

impl<A, Env> Thunk<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// A thunk that always succeeds with `value`.
    pub fn success(value: A) -> Self {
        Thunk::new(move |_: &Env| Ok(value.clone()))
    }

    /// A thunk that always fails with `error`.
    pub fn fail(error: Error) -> Self {
        Thunk::new(move |_: &Env| Err(error.clone()))
    }

    /// Read the memoized outcome, evaluating the template on first read.
    pub fn value(&self, env: &Env) -> Fin<A> {
        if let Some(result) = lock(&self.state).memo() {
            return result;
        }
        let result = eval(&self.func, env);
        *lock(&self.state) = ThunkState::from_result(&result);
        result
    }

    /// Clear, then read.
    pub fn revalue(&mut self, env: &Env) -> Fin<A> {
        self.clear();
        self.value(env)
    }

    /// Compose `f` over a successful outcome without evaluating anything.
    pub fn map<B, F>(&self, f: F) -> Thunk<B, Env>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let func = self.func.clone();
        Thunk::new(move |env: &Env| eval(&func, env).map(&f))
    }

    /// Compose transformations over both outcomes without evaluating anything.
    pub fn bimap<B, S, F>(&self, succ: S, fail: F) -> Thunk<B, Env>
    where
        S: Fn(A) -> B + Send + Sync + 'static,
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        let func = self.func.clone();
        Thunk::new(move |env: &Env| match eval(&func, env) {
            Ok(a) => Ok(succ(a)),
            Err(e) => Err(fail(e)),
        })
    }
}

impl<A, Env> Thunk<Thunk<A, Env>, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// Collapse a thunk of a thunk: run the outer, then the inner it produced.
    pub fn flatten(&self) -> Thunk<A, Env> {
        let func = self.func.clone();
        Thunk::new(move |env: &Env| eval(&func, env)?.value(env))
    }
}

// Clones share the template but never the memo cell.
impl<A, Env> Clone for Thunk<A, Env> {
    fn clone(&self) -> Self {
        Thunk::from_fn(self.func.clone())
    }
}

impl<A, Env> fmt::Debug for Thunk<A, Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thunk")
            .field("func", &"<function>")
            .field("evaluated", &self.is_evaluated())
            .finish()
    }
}
