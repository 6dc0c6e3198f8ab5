//! Cancellation environment threaded through every effect run.
//!
//! An [`EnvIO`] is created once at the top of an execution chain. It carries a
//! [`CancelToken`] and the tokio runtime handle that was current when it was
//! created. Every thunk checks the token before it evaluates, and every
//! schedule loop polls it between iterations.
//!
//! Runtimes that carry their own dependencies implement [`HasCancel`] so that
//! effects can reach the cancellation environment inside them.
//!
//! # Examples
//!
//! ```
//! use undertow::env::EnvIO;
//!
//! let env = EnvIO::new();
//! let scope = env.local();
//!
//! scope.cancel();
//! assert!(scope.is_cancelled());
//! assert!(!env.is_cancelled());
//!
//! env.cancel();
//! assert!(env.local().is_cancelled());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;

/// A cooperative cancellation signal.
///
/// Clones share the same signal. Child tokens are cancelled together with
/// their parent but cancelling a child leaves the parent untouched.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
    parked: Mutex<()>,
    wake: Condvar,
    children: Mutex<Vec<Weak<TokenInner>>>,
}

impl TokenInner {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.notify.notify_waiters();
        // Taking the lock orders this wake-up after any parked flag check.
        drop(self.parked.lock().unwrap_or_else(PoisonError::into_inner));
        self.wake.notify_all();
        let children = std::mem::take(
            &mut *self
                .children
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for child in children {
            if let Some(child) = child.upgrade() {
                child.cancel();
            }
        }
    }
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Non-blocking cancellation check.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Derive a token scoped under this one.
    pub fn child(&self) -> CancelToken {
        let child = CancelToken::new();
        let mut children = self
            .inner
            .children
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_cancelled() {
            drop(children);
            child.cancel();
            return child;
        }
        children.retain(|c| c.strong_count() > 0);
        children.push(Arc::downgrade(&child.inner));
        drop(children);
        child
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        // Registered before the flag check so a concurrent cancel cannot be missed.
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Block the current thread for up to `timeout`, waking early on cancellation.
    ///
    /// Returns `true` when the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let parked = self
            .inner
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _ = self
            .inner
            .wake
            .wait_timeout_while(parked, timeout, |_| !self.is_cancelled())
            .unwrap_or_else(PoisonError::into_inner);
        self.is_cancelled()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// The minimal runtime environment: a cancellation token plus the runtime
/// handle captured when the environment was created.
#[derive(Debug, Clone)]
pub struct EnvIO {
    token: CancelToken,
    handle: Option<Handle>,
}

impl EnvIO {
    /// Create an environment, capturing the current tokio runtime if any.
    pub fn new() -> Self {
        Self::with_token(CancelToken::new())
    }

    /// Create an environment around an existing token.
    pub fn with_token(token: CancelToken) -> Self {
        EnvIO {
            token,
            handle: Handle::try_current().ok(),
        }
    }

    /// Create an environment that has not captured any runtime.
    ///
    /// Posted work runs inline in such an environment.
    pub fn detached() -> Self {
        EnvIO {
            token: CancelToken::new(),
            handle: None,
        }
    }

    /// Replace the captured runtime handle.
    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// The cancellation token.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// The runtime captured at creation.
    pub fn handle(&self) -> Option<&Handle> {
        self.handle.as_ref()
    }

    /// Request cancellation of this environment and every local scope derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Derive a child scope that shares the captured runtime.
    pub fn local(&self) -> Self {
        EnvIO {
            token: self.token.child(),
            handle: self.handle.clone(),
        }
    }
}

impl Default for EnvIO {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability of a runtime environment to expose cancellation.
///
/// # Example
///
/// ```
/// use undertow::env::{EnvIO, HasCancel};
///
/// #[derive(Clone)]
/// struct AppEnv {
///     io: EnvIO,
///     region: String,
/// }
///
/// impl HasCancel for AppEnv {
///     fn env_io(&self) -> &EnvIO {
///         &self.io
///     }
///
///     fn local_cancel(&self) -> Self {
///         AppEnv { io: self.io.local(), region: self.region.clone() }
///     }
/// }
///
/// let env = AppEnv { io: EnvIO::new(), region: "eu".into() };
/// let scope = env.local_cancel();
/// scope.env_io().cancel();
/// assert!(!env.is_cancelled());
/// ```
pub trait HasCancel: Clone + Send + Sync + 'static {
    /// The cancellation environment carried by this runtime.
    fn env_io(&self) -> &EnvIO;

    /// A copy of this runtime whose cancellation is scoped beneath this one.
    fn local_cancel(&self) -> Self;

    /// True once cancellation has been requested.
    fn is_cancelled(&self) -> bool {
        self.env_io().is_cancelled()
    }
}

impl HasCancel for EnvIO {
    fn env_io(&self) -> &EnvIO {
        self
    }

    fn local_cancel(&self) -> Self {
        self.local()
    }
}
