//! Structured errors and the `Fin` result type
//!
//! Every effect run produces a [`Fin<A>`], which is just `Result<A, Error>`.
//! [`Error`] carries a message, an optional numeric code, an optional cause
//! and, for failures raised by user code, the wrapped foreign error.
//!
//! # Examples
//!
//! ```
//! use undertow::{Error, Fin, FinExt};
//!
//! let err = Error::coded(5, "connection reset")
//!     .caused_by(Error::new("socket closed"));
//!
//! assert_eq!(err.code(), Some(5));
//! assert_eq!(err.inner().map(|e| e.message()), Some("socket closed"));
//!
//! let failed: Fin<i32> = Err(err.clone());
//! let recast: Fin<String> = failed.cast();
//! assert_eq!(recast, Err(err));
//! ```

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// The outcome of running an effect.
pub type Fin<A> = Result<A, Error>;

/// Error codes reserved by the runtime.
pub mod codes {
    /// A cancellation request was observed.
    pub const CANCELLED: i32 = -2_000_000_000;
    /// A `filter` predicate rejected the value.
    pub const FILTERED: i32 = -2_000_000_001;
    /// No async runtime was available to dispatch work onto.
    pub const NO_RUNTIME: i32 = -2_000_000_002;
    /// User code panicked while an effect was evaluated.
    pub const PANICKED: i32 = -2_000_000_003;
    /// A dispatched task could not be joined.
    pub const JOIN_FAILED: i32 = -2_000_000_004;
}

/// A structured error value.
#[derive(Debug, Clone)]
pub enum Error {
    /// An anticipated failure, produced deliberately.
    Expected {
        /// Human readable description.
        message: String,
        /// Optional numeric code.
        code: Option<i32>,
        /// The error that caused this one.
        inner: Option<Box<Error>>,
    },
    /// A failure raised by user code: a foreign error or a caught panic.
    Exceptional {
        /// Human readable description.
        message: String,
        /// Optional numeric code.
        code: Option<i32>,
        /// The foreign error.
        exception: Arc<dyn StdError + Send + Sync + 'static>,
        /// The error that caused this one.
        inner: Option<Box<Error>>,
    },
    /// Several errors accumulated with [`Semigroup::combine`](crate::Semigroup::combine).
    Many(Vec<Error>),
}

/// The foreign error recorded when user code panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panicked {
    message: String,
}

impl Panicked {
    /// The panic message, if the payload was a string.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panicked: {}", self.message)
    }
}

impl StdError for Panicked {}

impl Error {
    /// Create an expected error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Error::Expected {
            message: message.into(),
            code: None,
            inner: None,
        }
    }

    /// Create an expected error with a code and a message.
    pub fn coded(code: i32, message: impl Into<String>) -> Self {
        Error::Expected {
            message: message.into(),
            code: Some(code),
            inner: None,
        }
    }

    /// Wrap a foreign error.
    ///
    /// The message is taken from the foreign error's `Display`.
    pub fn from_exception<E>(exception: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Error::Exceptional {
            message: exception.to_string(),
            code: None,
            exception: Arc::new(exception),
            inner: None,
        }
    }

    /// Convert a panic payload into an exceptional error.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        let panicked = Panicked { message };
        Error::Exceptional {
            message: panicked.to_string(),
            code: Some(codes::PANICKED),
            exception: Arc::new(panicked),
            inner: None,
        }
    }

    /// The error produced when a cancellation request is observed.
    pub fn cancelled() -> Self {
        Error::coded(codes::CANCELLED, "cancelled")
    }

    /// The error produced when a `filter` predicate rejects a value.
    pub fn filtered() -> Self {
        Error::coded(codes::FILTERED, "value filtered out")
    }

    /// Accumulate several errors into one.
    ///
    /// A single error is returned unchanged.
    pub fn many(errors: impl IntoIterator<Item = Error>) -> Self {
        let mut errors: Vec<Error> = errors.into_iter().collect();
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            Error::Many(errors)
        }
    }

    /// Attach a cause to this error.
    ///
    /// `Many` errors cannot carry a cause and are returned unchanged.
    pub fn caused_by(self, cause: Error) -> Self {
        match self {
            Error::Expected { message, code, .. } => Error::Expected {
                message,
                code,
                inner: Some(Box::new(cause)),
            },
            Error::Exceptional {
                message,
                code,
                exception,
                ..
            } => Error::Exceptional {
                message,
                code,
                exception,
                inner: Some(Box::new(cause)),
            },
            many @ Error::Many(_) => many,
        }
    }

    /// Replace the code of this error.
    pub fn with_code(self, code: i32) -> Self {
        match self {
            Error::Expected { message, inner, .. } => Error::Expected {
                message,
                code: Some(code),
                inner,
            },
            Error::Exceptional {
                message,
                exception,
                inner,
                ..
            } => Error::Exceptional {
                message,
                code: Some(code),
                exception,
                inner,
            },
            many @ Error::Many(_) => many,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Error::Expected { message, .. } | Error::Exceptional { message, .. } => message,
            Error::Many(_) => "multiple errors",
        }
    }

    /// The error code, if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Expected { code, .. } | Error::Exceptional { code, .. } => *code,
            Error::Many(_) => None,
        }
    }

    /// The error that caused this one.
    pub fn inner(&self) -> Option<&Error> {
        match self {
            Error::Expected { inner, .. } | Error::Exceptional { inner, .. } => inner.as_deref(),
            Error::Many(_) => None,
        }
    }

    /// The wrapped foreign error, for exceptional errors.
    pub fn exception(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Error::Exceptional { exception, .. } => Some(exception.as_ref()),
            _ => None,
        }
    }

    /// True for anticipated failures.
    pub fn is_expected(&self) -> bool {
        matches!(self, Error::Expected { .. })
    }

    /// True for failures raised by user code.
    pub fn is_exceptional(&self) -> bool {
        matches!(self, Error::Exceptional { .. })
    }

    /// True when this error, or any error it accumulates, carries `code`.
    pub fn has_code(&self, code: i32) -> bool {
        match self {
            Error::Many(errors) => errors.iter().any(|e| e.has_code(code)),
            _ => self.code() == Some(code),
        }
    }

    /// True when this error records an observed cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.has_code(codes::CANCELLED)
    }

    /// True when this error was produced by a rejecting `filter`.
    pub fn is_filtered(&self) -> bool {
        self.has_code(codes::FILTERED)
    }

    /// True when a foreign error of type `E` appears anywhere in this error:
    /// in its own exception, its cause chain, or its accumulated errors.
    pub fn is<E>(&self) -> bool
    where
        E: StdError + 'static,
    {
        match self {
            Error::Many(errors) => errors.iter().any(|e| e.is::<E>()),
            Error::Exceptional {
                exception, inner, ..
            } => {
                exception.downcast_ref::<E>().is_some()
                    || inner.as_ref().is_some_and(|i| i.is::<E>())
            }
            Error::Expected { inner, .. } => inner.as_ref().is_some_and(|i| i.is::<E>()),
        }
    }

    /// Flatten accumulated errors; a single error yields itself.
    pub fn errors(&self) -> Vec<&Error> {
        match self {
            Error::Many(errors) => errors.iter().flat_map(|e| e.errors()).collect(),
            single => vec![single],
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Error::Expected {
                    message: m1,
                    code: c1,
                    inner: i1,
                },
                Error::Expected {
                    message: m2,
                    code: c2,
                    inner: i2,
                },
            ) => m1 == m2 && c1 == c2 && i1 == i2,
            (
                Error::Exceptional {
                    message: m1,
                    code: c1,
                    ..
                },
                Error::Exceptional {
                    message: m2,
                    code: c2,
                    ..
                },
            ) => m1 == m2 && c1 == c2,
            (Error::Many(a), Error::Many(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Many(errors) => {
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
            single => {
                match single.code() {
                    Some(code) => write!(f, "[{}] {}", code, single.message())?,
                    None => write!(f, "{}", single.message())?,
                }
                if let Some(inner) = single.inner() {
                    write!(f, "\n  caused by: {}", inner)?;
                }
                Ok(())
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Exceptional { exception, .. } => Some(exception.as_ref()),
            Error::Expected { inner, .. } => inner.as_deref().map(|e| e as &(dyn StdError + 'static)),
            Error::Many(_) => None,
        }
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::new(message)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::new(message)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::from_exception(e)
    }
}

/// Queries on [`Fin`] beyond those std `Result` provides.
///
/// Combining two results first-success-wins is plain [`Result::or`].
pub trait FinExt<A> {
    /// True for a success.
    fn is_succ(&self) -> bool;

    /// True for a failure.
    fn is_fail(&self) -> bool;

    /// Re-type a failure.
    ///
    /// # Panics
    ///
    /// Panics when called on a success: a successful value has no valid
    /// target type, so this is a contract violation rather than a failure.
    fn cast<B>(self) -> Fin<B>;
}

impl<A> FinExt<A> for Fin<A> {
    fn is_succ(&self) -> bool {
        self.is_ok()
    }

    fn is_fail(&self) -> bool {
        self.is_err()
    }

    #[track_caller]
    fn cast<B>(self) -> Fin<B> {
        match self {
            Err(e) => Err(e),
            Ok(_) => panic!("Fin::cast called on a success"),
        }
    }
}
