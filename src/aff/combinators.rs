//! Combinators on [`Aff`].
//!
//! These mirror the combinators on [`Eff`](crate::Eff) one for one. Each
//! returns a new effect with its own memo that re-runs its sources whenever it
//! is itself run afresh.

use std::sync::Arc;

use crate::env::{EnvIO, HasCancel};
use crate::error::Error;
use crate::thunk::{eval_async, ThunkAsync};

use super::{Aff, AffCatch};

impl<A, Env> Aff<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// Chain a dependent effect.
    ///
    /// ```
    /// use undertow::Aff;
    ///
    /// # tokio_test::block_on(async {
    /// let total = Aff::<i32>::success(2).bind(|n| Aff::success(n + 40));
    /// assert_eq!(total.run_standalone().await, Ok(42));
    /// # });
    /// ```
    #[doc(alias = "and_then")]
    pub fn bind<B, F>(self, f: F) -> Aff<B, Env>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(A) -> Aff<B, Env> + Send + Sync + 'static,
    {
        Aff::from_thunk(self.thunk.map(move |a| f(a).thunk).flatten())
    }

    /// Same as [`Aff::bind`].
    pub fn and_then<B, F>(self, f: F) -> Aff<B, Env>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(A) -> Aff<B, Env> + Send + Sync + 'static,
    {
        self.bind(f)
    }

    /// Transform the success value.
    pub fn map<B, F>(self, f: F) -> Aff<B, Env>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Aff::from_thunk(self.thunk.map(f))
    }

    /// Transform both outcomes.
    pub fn bimap<B, S, F>(self, succ: S, fail: F) -> Aff<B, Env>
    where
        B: Send + 'static,
        S: Fn(A) -> B + Send + Sync + 'static,
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        Aff::from_thunk(self.thunk.bimap(succ, fail))
    }

    /// Transform the failure without recovering from it.
    pub fn map_fail<F>(self, f: F) -> Aff<A, Env>
    where
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        self.bimap(|a| a, f)
    }

    /// Fold both outcomes into a plain value; the result always succeeds.
    pub fn match_with<B, S, F>(self, succ: S, fail: F) -> Aff<B, Env>
    where
        B: Send + 'static,
        S: Fn(A) -> B + Send + Sync + 'static,
        F: Fn(Error) -> B + Send + Sync + 'static,
    {
        let succ = Arc::new(succ);
        let fail = Arc::new(fail);
        self.derive(move |func, env| {
            let (succ, fail) = (succ.clone(), fail.clone());
            async move {
                match eval_async(&func, env).await {
                    Ok(a) => Ok(succ(a)),
                    Err(e) => Ok(fail(e)),
                }
            }
        })
    }

    /// Continue with one of two effects depending on the outcome.
    pub fn match_eff<B, S, F>(self, succ: S, fail: F) -> Aff<B, Env>
    where
        B: Clone + Send + Sync + 'static,
        S: Fn(A) -> Aff<B, Env> + Send + Sync + 'static,
        F: Fn(Error) -> Aff<B, Env> + Send + Sync + 'static,
    {
        let succ = Arc::new(succ);
        let fail = Arc::new(fail);
        self.derive(move |func, env| {
            let (succ, fail) = (succ.clone(), fail.clone());
            async move {
                let next = match eval_async(&func, env.clone()).await {
                    Ok(a) => succ(a),
                    Err(e) => fail(e),
                };
                next.run(&env).await
            }
        })
    }

    /// Recover from any failure with a value.
    pub fn if_fail<F>(self, f: F) -> Aff<A, Env>
    where
        F: Fn(Error) -> A + Send + Sync + 'static,
    {
        self.match_with(|a| a, f)
    }

    /// Recover from any failure with another effect.
    pub fn if_fail_eff<F>(self, f: F) -> Aff<A, Env>
    where
        F: Fn(Error) -> Aff<A, Env> + Send + Sync + 'static,
    {
        self.match_eff(Aff::success, f)
    }

    /// Run a continuation for its effect on success, discarding both values.
    pub fn iter<B, F>(self, f: F) -> Aff<(), Env>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(A) -> Aff<B, Env> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.derive(move |func, env| {
            let f = f.clone();
            async move {
                let a = eval_async(&func, env.clone()).await?;
                f(a).run_unit(&env).await
            }
        })
    }

    /// Run a continuation on success and keep the original value.
    pub fn tap<B, F>(self, f: F) -> Aff<A, Env>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(&A) -> Aff<B, Env> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        self.derive(move |func, env| {
            let f = f.clone();
            async move {
                let a = eval_async(&func, env.clone()).await?;
                f(&a).run_unit(&env).await?;
                Ok(a)
            }
        })
    }

    /// Fail with [`Error::filtered`] when `pred` rejects the value.
    pub fn filter<P>(self, pred: P) -> Aff<A, Env>
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let pred = Arc::new(pred);
        self.derive(move |func, env| {
            let pred = pred.clone();
            async move {
                let a = eval_async(&func, env).await?;
                if pred(&a) {
                    Ok(a)
                } else {
                    Err(Error::filtered())
                }
            }
        })
    }

    /// First success wins; if both fail, the second failure is returned.
    pub fn or_else(self, other: Aff<A, Env>) -> Aff<A, Env> {
        let other = other.thunk.func().clone();
        self.derive(move |func, env| {
            let other = other.clone();
            async move {
                match eval_async(&func, env.clone()).await {
                    Ok(a) => Ok(a),
                    Err(_) => eval_async(&other, env).await,
                }
            }
        })
    }

    /// Handle failures matched by `catch`; other failures pass through unchanged.
    pub fn catch(self, catch: AffCatch<A, Env>) -> Aff<A, Env> {
        self.derive(move |func, env| {
            let catch = catch.clone();
            async move {
                match eval_async(&func, env.clone()).await {
                    Ok(a) => Ok(a),
                    Err(e) => catch.apply(e, &env).await,
                }
            }
        })
    }

    /// Run inside a child cancellation scope.
    pub fn local_cancel(self) -> Aff<A, Env> {
        self.derive(|func, env| async move { eval_async(&func, env.local_cancel()).await })
    }
}

impl<A> Aff<A, EnvIO>
where
    A: Clone + Send + Sync + 'static,
{
    /// Widen an environment-free effect to any runtime environment.
    pub fn with_env<Env2: HasCancel>(self) -> Aff<A, Env2> {
        let func = self.thunk.func().clone();
        Aff::from_thunk(ThunkAsync::new(move |env: Env2| {
            let func = func.clone();
            let io = env.env_io().clone();
            async move { eval_async(&func, io).await }
        }))
    }
}
