//! Binding runtime between scripts and the netlist database.
//!
//! - [`runtime`]: slots, calls and the object heap
//! - [`StringConverter`] and the converter [`policy`] types
//! - [`ContextualWrapper`] and the [`handles`] it is keyed by
//! - [`bridge`]: native failures to script exceptions

mod bridge;
mod convert;
mod error;
pub mod handles;
pub mod policy;
pub mod runtime;
mod string_conv;
mod wrapper;

#[cfg(test)]
mod test_support;

pub use bridge::bridge;
pub use convert::{FromDynamic, IntoDynamic};
pub use error::{ConversionError, ExceptionKind, NativeError, ScriptException};
pub use policy::{
    ConvFromStr, ConvToStr, DerefAndWrap, FromScript, InternFromStr, ListOf, PassThrough, Scope,
    ScopeMut, ToScript, UnwrapContext,
};
pub use runtime::{CallContext, Dynamic, NativeCallable, NativeFn, NativeValue, ObjectHandle, ObjectHeap};
pub use string_conv::{Intern, StringConverter};
pub use wrapper::{ContextualWrapper, EntityHandle, ScriptClass};
