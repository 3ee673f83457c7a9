//! Internal invariant failures.
//!
//! The database never panics on a broken invariant. Checks are written with
//! [`npnr_assert!`] / [`npnr_assert_false!`], which return early with an
//! [`AssertionFailure`] carrying the failed condition and its source location.

use std::fmt;

use thiserror::Error;

/// A consistency check inside the native database failed.
///
/// The message is kept verbatim so that binding layers can re-raise it
/// without rewording.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct AssertionFailure {
    message: String,
    file: &'static str,
    line: u32,
}

impl AssertionFailure {
    pub fn new(message: impl Into<String>, file: &'static str, line: u32) -> Self {
        Self {
            message: message.into(),
            file,
            line,
        }
    }

    /// The failure text, without the source location.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> (&'static str, u32) {
        (self.file, self.line)
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.message, self.file, self.line)
    }
}

/// Return an [`AssertionFailure`] from the enclosing function unless `cond` holds.
#[macro_export]
macro_rules! npnr_assert {
    ($cond:expr) => {
        if !$cond {
            return Err($crate::AssertionFailure::new(
                concat!("Assertion failure: ", stringify!($cond)),
                file!(),
                line!(),
            )
            .into());
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::AssertionFailure::new(format!($($arg)+), file!(), line!()).into());
        }
    };
}

/// Unconditionally return an [`AssertionFailure`] from the enclosing function.
#[macro_export]
macro_rules! npnr_assert_false {
    ($($arg:tt)+) => {
        return Err($crate::AssertionFailure::new(format!($($arg)+), file!(), line!()).into())
    };
}
