//! Semigroup trait for associative operations
//!
//! A Semigroup is a type with an associative binary operation. Here it is what
//! lets independent failures be accumulated into a single [`Error`] instead of
//! keeping only the first one.
//!
//! # Mathematical Properties
//!
//! For a type to be a valid Semigroup, the `combine` operation must be associative:
//! ```text
//! a.combine(b).combine(c) == a.combine(b.combine(c))
//! ```
//!
//! # Examples
//!
//! ```
//! use undertow::{Error, Semigroup};
//!
//! let err = Error::new("disk full").combine(Error::new("network down"));
//! assert_eq!(err.errors().len(), 2);
//! ```

use crate::error::Error;

/// A type that supports an associative binary operation
///
/// # Laws
///
/// Implementations must satisfy the associativity law:
/// ```text
/// a.combine(b).combine(c) == a.combine(b.combine(c))
/// ```
///
/// # Note on Ownership
///
/// The `combine` method takes `self` by value, not by reference. If you need to
/// preserve the original values, you must clone them before combining.
pub trait Semigroup: Sized {
    /// Combine this value with another value associatively
    fn combine(self, other: Self) -> Self;
}

// Errors accumulate into a flat `Many`, which keeps combination associative.
impl Semigroup for Error {
    fn combine(self, other: Self) -> Self {
        let mut errors = into_flat(self);
        errors.extend(into_flat(other));
        Error::Many(errors)
    }
}

fn into_flat(error: Error) -> Vec<Error> {
    match error {
        Error::Many(errors) => errors.into_iter().flat_map(into_flat).collect(),
        single => vec![single],
    }
}
