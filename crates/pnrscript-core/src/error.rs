//! Error types for the binding runtime.
//!
//! [`NativeError`] is what native functions return. The exception bridge
//! turns every non-fatal variant into a [`ScriptException`]; fatal variants
//! are binding bugs and never reach a script.

use std::fmt;
use std::path::PathBuf;

use pnrscript_json::JsonError;
use pnrscript_netlist::AssertionFailure;
use thiserror::Error;

/// Errors that can occur when converting between Rust and script values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Type mismatch during conversion
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Integer overflow during conversion
    #[error("integer overflow: value {value} does not fit in {target_type}")]
    IntegerOverflow { value: i64, target_type: &'static str },

    /// Integer is not a member of the target enum
    #[error("{value} is not a valid {target_type}")]
    InvalidEnumValue { value: i64, target_type: &'static str },
}

/// Errors that can occur during native function execution.
#[derive(Debug, Error)]
pub enum NativeError {
    /// Error converting arguments or return values
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// A string names nothing in the database's interning tables
    #[error("'{value}' is not a known {kind}")]
    InvalidIdentifier { kind: &'static str, value: String },

    /// A conversion direction that is deliberately not provided
    #[error("{kind} cannot be converted {direction}")]
    UnsupportedConversion {
        kind: &'static str,
        direction: &'static str,
    },

    #[error("failed to open file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(JsonError),

    /// The native database rejected an operation
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),

    /// The wrapper's database was released or its entity removed
    #[error("{kind} no longer exists: {detail}")]
    StaleWrapper { kind: &'static str, detail: String },

    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("'{class}' object has no attribute '{name}'")]
    NoAttribute { class: String, name: String },

    #[error("attribute '{name}' of '{class}' is read-only")]
    ReadOnlyAttribute { class: String, name: String },

    #[error("{name}() takes {expected} argument(s) but {got} were given")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("'{type_name}' values are not registered with this module")]
    UnknownClass { type_name: String },

    /// Invalid `this` reference for method call
    #[error("invalid 'this' reference: {message}")]
    InvalidThis { message: String },

    /// Argument index out of bounds
    #[error("argument index {index} out of bounds (function has {count} arguments)")]
    ArgumentIndexOutOfBounds { index: usize, count: usize },

    /// A context-dependent conversion ran without a database
    #[error("conversion of {kind} requires a database")]
    MissingDatabase { kind: &'static str },
}

impl From<JsonError> for NativeError {
    /// A database assertion raised mid-import stays an assertion.
    fn from(err: JsonError) -> Self {
        match err {
            JsonError::Netlist(failure) => NativeError::Assertion(failure),
            other => NativeError::Parse(other),
        }
    }
}

impl NativeError {
    /// Create an "invalid this" error with a message.
    pub fn invalid_this(message: impl Into<String>) -> Self {
        NativeError::InvalidThis {
            message: message.into(),
        }
    }

    pub fn invalid_identifier(kind: &'static str, value: impl Into<String>) -> Self {
        NativeError::InvalidIdentifier {
            kind,
            value: value.into(),
        }
    }

    pub fn stale(kind: &'static str, detail: impl Into<String>) -> Self {
        NativeError::StaleWrapper {
            kind,
            detail: detail.into(),
        }
    }

    /// Errors that indicate a bug in the bindings rather than in the script.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NativeError::InvalidThis { .. }
                | NativeError::ArgumentIndexOutOfBounds { .. }
                | NativeError::MissingDatabase { .. }
        )
    }

    /// The script-level exception kind this error is raised as.
    ///
    /// Returns `None` for fatal errors.
    pub fn exception_kind(&self) -> Option<ExceptionKind> {
        let kind = match self {
            NativeError::Assertion(_) => ExceptionKind::AssertionError,
            NativeError::InvalidIdentifier { .. } => ExceptionKind::InvalidIdentifier,
            NativeError::UnsupportedConversion { .. } => ExceptionKind::UnsupportedConversion,
            NativeError::Io { .. } => ExceptionKind::IoError,
            NativeError::Parse(_) => ExceptionKind::ParseError,
            NativeError::Conversion(_)
            | NativeError::ArityMismatch { .. }
            | NativeError::UnknownClass { .. } => ExceptionKind::TypeError,
            NativeError::NoAttribute { .. } | NativeError::ReadOnlyAttribute { .. } => {
                ExceptionKind::AttributeError
            }
            NativeError::IndexOutOfRange { .. } => ExceptionKind::IndexError,
            NativeError::KeyNotFound { .. } => ExceptionKind::KeyError,
            NativeError::StaleWrapper { .. } => ExceptionKind::ReferenceError,
            NativeError::InvalidThis { .. }
            | NativeError::ArgumentIndexOutOfBounds { .. }
            | NativeError::MissingDatabase { .. } => return None,
        };
        Some(kind)
    }
}

/// Script-visible exception classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    AssertionError,
    InvalidIdentifier,
    UnsupportedConversion,
    IoError,
    ParseError,
    TypeError,
    AttributeError,
    IndexError,
    KeyError,
    ReferenceError,
}

impl ExceptionKind {
    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::AssertionError => "AssertionError",
            ExceptionKind::InvalidIdentifier => "InvalidIdentifier",
            ExceptionKind::UnsupportedConversion => "UnsupportedConversion",
            ExceptionKind::IoError => "IOError",
            ExceptionKind::ParseError => "ParseError",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::KeyError => "KeyError",
            ExceptionKind::ReferenceError => "ReferenceError",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An exception raised into a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ScriptException {
    pub kind: ExceptionKind,
    pub message: String,
}

impl ScriptException {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
