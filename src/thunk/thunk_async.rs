//! Asynchronous thunk.

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use futures::FutureExt;

use super::{lock, panicked, reset, BoxFuture, Thunk, ThunkState};
use crate::env::HasCancel;
use crate::error::{Error, Fin};

/// Shared template of an asynchronous thunk.
///
/// The environment is passed by value so the returned future is `'static`.
pub(crate) type AsyncFn<A, Env> = Arc<dyn Fn(Env) -> BoxFuture<'static, Fin<A>> + Send + Sync>;

/// Run a template once, honouring cancellation and converting panics.
///
/// Cancellation is checked before the template is invoked and raced against
/// the pending future, so a request pre-empts suspended work.
pub(crate) async fn eval_async<A, Env: HasCancel>(func: &AsyncFn<A, Env>, env: Env) -> Fin<A> {
    if env.is_cancelled() {
        return Err(Error::cancelled());
    }
    let token = env.env_io().token().clone();
    let fut = match panic::catch_unwind(AssertUnwindSafe(|| func(env))) {
        Ok(fut) => fut,
        Err(payload) => return Err(panicked(payload)),
    };
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::cancelled()),
        result = AssertUnwindSafe(fut).catch_unwind() => result.unwrap_or_else(|p| Err(panicked(p))),
    }
}

/// A memoizing asynchronous computation over an environment.
pub struct ThunkAsync<A, Env> {
    func: AsyncFn<A, Env>,
    state: Mutex<ThunkState<A>>,
}

impl<A, Env> ThunkAsync<A, Env> {
    /// Wrap an async closure. Nothing runs until the thunk is read.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Env) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Fin<A>> + Send + 'static,
    {
        let func: AsyncFn<A, Env> =
            Arc::new(move |env: Env| -> BoxFuture<'static, Fin<A>> { Box::pin(f(env)) });
        Self::from_fn(func)
    }

    pub(crate) fn from_fn(func: AsyncFn<A, Env>) -> Self {
        ThunkAsync {
            func,
            state: Mutex::new(ThunkState::NotEvaluated),
        }
    }

    pub(crate) fn func(&self) -> &AsyncFn<A, Env> {
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

impl<A, Env> ThunkAsync<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// A thunk that always succeeds with `value`.
    pub fn success(value: A) -> Self {
        ThunkAsync::new(move |_: Env| futures::future::ready(Ok(value.clone())))
    }

    /// A thunk that always fails with `error`.
    pub fn fail(error: Error) -> Self {
        ThunkAsync::new(move |_: Env| futures::future::ready(Err(error.clone())))
    }

    /// Lift a synchronous thunk's template; the memo is not carried over.
    pub fn from_thunk(thunk: &Thunk<A, Env>) -> Self {
        let func = thunk.func().clone();
        ThunkAsync::new(move |env: Env| {
            let func = func.clone();
            async move { crate::thunk::eval(&func, &env) }
        })
    }

    /// Read the memoized outcome, evaluating the template on first read.
    pub async fn value(&self, env: &Env) -> Fin<A> {
        // The memo lock is never held across an await.
        if let Some(result) = lock(&self.state).memo() {
            return result;
        }
        let result = eval_async(&self.func, env.clone()).await;
        *lock(&self.state) = ThunkState::from_result(&result);
        result
    }

    /// Clear, then read.
    pub async fn revalue(&mut self, env: &Env) -> Fin<A> {
        self.clear();
        self.value(env).await
    }

    /// Compose `f` over a successful outcome without evaluating anything.
    pub fn map<B, F>(&self, f: F) -> ThunkAsync<B, Env>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        let func = self.func.clone();
        let f = Arc::new(f);
        ThunkAsync::new(move |env: Env| {
            let func = func.clone();
            let f = f.clone();
            async move { eval_async(&func, env).await.map(|a| f(a)) }
        })
    }

    /// Compose transformations over both outcomes without evaluating anything.
    pub fn bimap<B, S, F>(&self, succ: S, fail: F) -> ThunkAsync<B, Env>
    where
        S: Fn(A) -> B + Send + Sync + 'static,
        F: Fn(Error) -> Error + Send + Sync + 'static,
        B: Send + 'static,
    {
        let func = self.func.clone();
        let succ = Arc::new(succ);
        let fail = Arc::new(fail);
        ThunkAsync::new(move |env: Env| {
            let func = func.clone();
            let succ = succ.clone();
            let fail = fail.clone();
            async move {
                match eval_async(&func, env).await {
                    Ok(a) => Ok(succ(a)),
                    Err(e) => Err(fail(e)),
                }
            }
        })
    }
}

impl<A, Env> ThunkAsync<ThunkAsync<A, Env>, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// Collapse a thunk of a thunk: run the outer, then the inner it produced.
    pub fn flatten(&self) -> ThunkAsync<A, Env> {
        let func = self.func.clone();
        ThunkAsync::new(move |env: Env| {
            let func = func.clone();
            async move {
                let inner = eval_async(&func, env.clone()).await?;
                inner.value(&env).await
            }
        })
    }
}

// Clones share the template but never the memo cell.
impl<A, Env> Clone for ThunkAsync<A, Env> {
    fn clone(&self) -> Self {
        ThunkAsync::from_fn(self.func.clone())
    }
}

impl<A, Env> fmt::Debug for ThunkAsync<A, Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThunkAsync")
            .field("func", &"<function>")
            .field("evaluated", &self.is_evaluated())
            .finish()
    }
}
