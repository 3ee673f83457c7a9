//! Script bindings for a netlist and placement database.
//!
//! [`register_module`] builds a [`Module`] that exposes a design database
//! to scripts: cells, nets, ports, regions and the hierarchy as live
//! wrappers, their maps and vectors as mutable collections, and the
//! placement enums as integer constants. An [`ArchFamily`] chooses the
//! device and may add its own bindings; [`GenericFamily`] is a device
//! built at run time.
//!
//! ```ignore
//! let settings = Settings::load(None)?;
//! let module = register_module::<GenericFamily>(&settings)?;
//! let mut runner = ScriptRunner::new(MyInterpreter::default());
//! runner.initialize(module, &settings)?;
//! runner.run_file(Path::new("place.py"))?;
//! ```

pub mod arch;
mod bindings;
mod design;
mod host;
mod settings;

pub use arch::{ArchFamily, GenericArch, GenericArchArgs, GenericFamily};
pub use bindings::register_module;
pub use design::{load_design, parse_json_file};
pub use host::{HostError, ScriptHost, ScriptRunner, init_logging};
pub use settings::Settings;

pub use pnrscript_core::{Dynamic, ExceptionKind, ObjectHandle, ObjectHeap, ScriptException};
pub use pnrscript_registry::Module;
