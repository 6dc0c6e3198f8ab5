//! Combinators on [`Eff`].
//!
//! Every combinator composes templates and returns a new effect with its own
//! memo. Running the result re-runs its sources from scratch, so a combinator
//! never observes a stale value of the effect it was built from.

use crate::env::{EnvIO, HasCancel};
use crate::error::Error;
use crate::thunk::eval;

use super::{Eff, EffCatch};

impl<A, Env> Eff<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// Chain a dependent effect.
    ///
    /// `f` runs only when this effect succeeds; a failure short-circuits.
    ///
    /// ```
    /// use undertow::Eff;
    ///
    /// let total = Eff::<i32>::success(2).bind(|n| Eff::success(n + 40));
    /// assert_eq!(total.run_standalone(), Ok(42));
    /// ```
    #[doc(alias = "and_then")]
    pub fn bind<B, F>(self, f: F) -> Eff<B, Env>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(A) -> Eff<B, Env> + Send + Sync + 'static,
    {
        Eff::from_thunk(self.thunk.map(move |a| f(a).thunk).flatten())
    }

    /// Same as [`Eff::bind`].
    pub fn and_then<B, F>(self, f: F) -> Eff<B, Env>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(A) -> Eff<B, Env> + Send + Sync + 'static,
    {
        self.bind(f)
    }

    /// Transform the success value.
    pub fn map<B, F>(self, f: F) -> Eff<B, Env>
    where
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Eff::from_thunk(self.thunk.map(f))
    }

    /// Transform both outcomes.
    pub fn bimap<B, S, F>(self, succ: S, fail: F) -> Eff<B, Env>
    where
        S: Fn(A) -> B + Send + Sync + 'static,
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        Eff::from_thunk(self.thunk.bimap(succ, fail))
    }

    /// Transform the failure without recovering from it.
    pub fn map_fail<F>(self, f: F) -> Eff<A, Env>
    where
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        self.bimap(|a| a, f)
    }

    /// Fold both outcomes into a plain value; the result always succeeds.
    pub fn match_with<B, S, F>(self, succ: S, fail: F) -> Eff<B, Env>
    where
        S: Fn(A) -> B + Send + Sync + 'static,
        F: Fn(Error) -> B + Send + Sync + 'static,
    {
        self.derive(move |func, env| match eval(func, env) {
            Ok(a) => Ok(succ(a)),
            Err(e) => Ok(fail(e)),
        })
    }

    /// Continue with one of two effects depending on the outcome.
    pub fn match_eff<B, S, F>(self, succ: S, fail: F) -> Eff<B, Env>
    where
        B: Clone + Send + Sync + 'static,
        S: Fn(A) -> Eff<B, Env> + Send + Sync + 'static,
        F: Fn(Error) -> Eff<B, Env> + Send + Sync + 'static,
    {
        self.derive(move |func, env| match eval(func, env) {
            Ok(a) => succ(a).run(env),
            Err(e) => fail(e).run(env),
        })
    }

    /// Recover from any failure with a value.
    pub fn if_fail<F>(self, f: F) -> Eff<A, Env>
    where
        F: Fn(Error) -> A + Send + Sync + 'static,
    {
        self.match_with(|a| a, f)
    }

    /// Recover from any failure with another effect.
    pub fn if_fail_eff<F>(self, f: F) -> Eff<A, Env>
    where
        F: Fn(Error) -> Eff<A, Env> + Send + Sync + 'static,
    {
        self.derive(move |func, env| match eval(func, env) {
            Ok(a) => Ok(a),
            Err(e) => f(e).run(env),
        })
    }

    /// Run a continuation for its effect on success, discarding both values.
    pub fn iter<B, F>(self, f: F) -> Eff<(), Env>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(A) -> Eff<B, Env> + Send + Sync + 'static,
    {
        self.derive(move |func, env| {
            let a = eval(func, env)?;
            f(a).run_unit(env)
        })
    }

    /// Run a continuation on success and keep the original value.
    ///
    /// A failing continuation fails the whole effect.
    pub fn tap<B, F>(self, f: F) -> Eff<A, Env>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(&A) -> Eff<B, Env> + Send + Sync + 'static,
    {
        self.derive(move |func, env| {
            let a = eval(func, env)?;
            f(&a).run_unit(env)?;
            Ok(a)
        })
    }

    /// Fail with [`Error::filtered`] when `pred` rejects the value.
    pub fn filter<P>(self, pred: P) -> Eff<A, Env>
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.derive(move |func, env| {
            let a = eval(func, env)?;
            if pred(&a) {
                Ok(a)
            } else {
                Err(Error::filtered())
            }
        })
    }

    /// First success wins; if both fail, the second failure is returned.
    pub fn or_else(self, other: Eff<A, Env>) -> Eff<A, Env> {
        let other = other.thunk.func().clone();
        self.derive(move |func, env| eval(func, env).or_else(|_| eval(&other, env)))
    }

    /// Handle failures matched by `catch`; other failures pass through unchanged.
    pub fn catch(self, catch: EffCatch<A, Env>) -> Eff<A, Env> {
        self.derive(move |func, env| match eval(func, env) {
            Ok(a) => Ok(a),
            Err(e) => catch.apply(e, env),
        })
    }

    /// Run inside a child cancellation scope.
    ///
    /// Cancelling the scope stops this effect only; cancelling the outer
    /// environment still reaches it.
    pub fn local_cancel(self) -> Eff<A, Env> {
        self.derive(|func, env| eval(func, &env.local_cancel()))
    }

    /// Lift into an asynchronous effect.
    pub fn to_aff(self) -> crate::aff::Aff<A, Env> {
        crate::aff::Aff::from_eff(self)
    }
}

impl<A> Eff<A, EnvIO>
where
    A: Clone + Send + Sync + 'static,
{
    /// Widen an environment-free effect to any runtime environment.
    ///
    /// ```
    /// use undertow::testing::TestEnv;
    /// use undertow::Eff;
    ///
    /// let eff = Eff::<i32>::success(1).with_env::<TestEnv<&'static str>>();
    /// assert_eq!(eff.run(&TestEnv::new("payload")), Ok(1));
    /// ```
    pub fn with_env<Env2: HasCancel>(self) -> Eff<A, Env2> {
        let func = self.thunk.func().clone();
        Eff::from_thunk(crate::thunk::Thunk::new(move |env: &Env2| {
            eval(&func, env.env_io())
        }))
    }
}
