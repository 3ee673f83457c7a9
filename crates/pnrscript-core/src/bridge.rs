//! The exception bridge.
//!
//! The one place where a native failure becomes a script exception. Every
//! call the registry dispatches passes its result through [`bridge`].

use tracing::{debug, error};

use crate::error::{NativeError, ScriptException};

/// Translate a native result for the script side.
///
/// Assertion failures keep their message verbatim. Fatal errors are not
/// translated: they are logged and the call panics, taking the host down.
pub fn bridge<T>(result: Result<T, NativeError>) -> Result<T, ScriptException> {
    result.map_err(translate)
}

fn translate(err: NativeError) -> ScriptException {
    let Some(kind) = err.exception_kind() else {
        error!(error = %err, "fatal error in bindings");
        panic!("fatal error in bindings: {err}");
    };
    let message = match &err {
        NativeError::Assertion(failure) => failure.message().to_owned(),
        other => other.to_string(),
    };
    debug!(%kind, %message, "raising script exception");
    ScriptException::new(kind, message)
}
