//! Binding registry.
//!
//! A [`Module`] is the namespace a host injects into its interpreter. It is
//! filled with [`ClassBuilder`] (attributes and methods of one Rust type),
//! [`EnumBuilder`] and the collection proxies in [`proxy`], and then serves
//! every script-side attribute read, write and call.
//!
//! ```ignore
//! module
//!     .register_class::<ContextualWrapper<CellHandle>>("CellInfo")
//!     .readwrite::<ConvToStr, InternFromStr, _, _, _>("name", |c| &c.name, |c, v| c.name = v)?
//!     .view("ports", |h: &CellHandle| PortMapHandle(h.0))?
//!     .method1_v::<InternFromStr, _, _>("addInput", |c, n| { c.add_input(n); Ok(()) })?
//!     .build()?;
//! ```

mod class_builder;
mod enum_builder;
mod error;
mod module;
pub mod proxy;

#[cfg(test)]
mod test_support;

pub use class_builder::ClassBuilder;
pub use enum_builder::EnumBuilder;
pub use error::RegistrationError;
pub use module::Module;
pub use proxy::{Converted, MapContainer, SetContainer, ValuePolicy, Wrapped};
