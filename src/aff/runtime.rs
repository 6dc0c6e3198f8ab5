//! Dispatch of asynchronous effects onto a tokio runtime.

use tokio::runtime::Handle;
use tokio::task::JoinError;

use crate::env::HasCancel;
use crate::error::{codes, Error};
use crate::thunk::eval_async;

use super::Aff;

fn from_join_error(error: JoinError) -> Error {
    if error.is_panic() {
        Error::from_panic(error.into_panic())
    } else if error.is_cancelled() {
        Error::cancelled()
    } else {
        Error::coded(codes::JOIN_FAILED, error.to_string())
    }
}

impl<A, Env> Aff<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: HasCancel,
{
    /// Run on the runtime captured by the environment.
    ///
    /// [`EnvIO::new`](crate::env::EnvIO::new) records the runtime current at
    /// the top of the chain. Posting hops back onto it even when the caller is
    /// being polled elsewhere. Without a captured runtime the effect runs inline.
    pub fn post(self) -> Aff<A, Env> {
        self.derive(|func, env| async move {
            let captured = env.env_io().handle().cloned();
            match captured {
                None => eval_async(&func, env).await,
                Some(handle) => {
                    crate::trace_debug!("posting effect to captured runtime");
                    let task = handle.spawn(async move { eval_async(&func, env).await });
                    task.await.unwrap_or_else(|e| Err(from_join_error(e)))
                }
            }
        })
    }

    /// Start the effect in the background and succeed immediately.
    ///
    /// The work is spawned on the captured runtime, or the current one. It
    /// still observes the environment's cancellation. Fails with
    /// [`codes::NO_RUNTIME`] when there is no runtime to spawn on.
    ///
    /// ```
    /// use std::time::Duration;
    /// use undertow::Aff;
    ///
    /// # tokio_test::block_on(async {
    /// let slow = Aff::<()>::effect(|| tokio::time::sleep(Duration::from_secs(60)));
    /// let started = tokio::time::timeout(Duration::from_secs(1), slow.fire_and_forget().run_standalone()).await;
    /// assert_eq!(started.ok(), Some(Ok(())));
    /// # });
    /// ```
    pub fn fire_and_forget(self) -> Aff<(), Env> {
        self.derive(|func, env| async move {
            let handle = env
                .env_io()
                .handle()
                .cloned()
                .or_else(|| Handle::try_current().ok())
                .ok_or_else(|| Error::coded(codes::NO_RUNTIME, "no tokio runtime to spawn on"))?;
            handle.spawn(async move {
                if let Err(_error) = eval_async(&func, env).await {
                    crate::trace_debug!(error = %_error, "background effect failed");
                }
            });
            Ok(())
        })
    }
}
