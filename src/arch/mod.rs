//! Architecture families.
//!
//! The core registration knows nothing about any device. A family supplies
//! the [`Arch`] a database is built on and, through
//! [`ArchFamily::wrap_bindings`], registers whatever it adds to the module.

pub mod generic;

use pnrscript_netlist::Arch;
use pnrscript_registry::{Module, RegistrationError};
use serde::de::DeserializeOwned;

pub use generic::{GenericArch, GenericArchArgs, GenericFamily};

pub trait ArchFamily: 'static {
    /// Module name suffix, e.g. `"generic"`.
    const NAME: &'static str;

    /// Device selection arguments passed to `load_design`.
    type Args: Clone + Default + DeserializeOwned + Send + Sync + 'static;

    fn create_arch(args: &Self::Args) -> Box<dyn Arch>;

    /// Called once, after every core binding has been registered.
    fn wrap_bindings(module: &mut Module) -> Result<(), RegistrationError>;
}
