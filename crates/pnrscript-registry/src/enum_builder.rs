//! Script-visible enums.

use std::marker::PhantomData;

use pnrscript_core::Dynamic;

use crate::error::RegistrationError;
use crate::module::{EnumEntry, Module};

/// Builder for an enum whose values cross the boundary as integers.
///
/// ```ignore
/// module
///     .register_enum::<PortType>("PortType")
///     .value("PORT_IN", PortType::In)?
///     .value("PORT_OUT", PortType::Out)?
///     .export_values()
///     .build()?;
/// ```
pub struct EnumBuilder<'m, E> {
    module: &'m mut Module,
    name: String,
    values: Vec<(String, i64)>,
    export: bool,
    _marker: PhantomData<E>,
}

impl<'m, E: Into<i64> + Copy> EnumBuilder<'m, E> {
    pub(crate) fn new(module: &'m mut Module, name: String) -> Self {
        Self {
            module,
            name,
            values: Vec::new(),
            export: false,
            _marker: PhantomData,
        }
    }

    pub fn value(mut self, name: &str, value: E) -> Result<Self, RegistrationError> {
        if self.values.iter().any(|(n, _)| n == name) {
            return Err(RegistrationError::DuplicateEnumValue {
                enum_name: self.name,
                value_name: name.to_owned(),
            });
        }
        self.values.push((name.to_owned(), value.into()));
        Ok(self)
    }

    /// Also make every value a module-level global.
    pub fn export_values(mut self) -> Self {
        self.export = true;
        self
    }

    pub fn build(self) -> Result<(), RegistrationError> {
        let exported = self.export.then(|| self.values.clone());
        self.module.add_enum(&self.name, EnumEntry { values: self.values })?;
        for (name, value) in exported.into_iter().flatten() {
            self.module.add_global(&name, Dynamic::Int(value))?;
        }
        Ok(())
    }
}
