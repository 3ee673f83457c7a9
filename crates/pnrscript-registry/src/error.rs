use thiserror::Error;

/// Errors raised while a module is being populated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A class, enum, function or global with this name already exists.
    #[error("duplicate registration: {name} already registered as {kind}")]
    DuplicateRegistration { name: String, kind: &'static str },

    /// The same Rust type was registered under two class names.
    #[error("type {type_name} is already registered as class '{existing}'")]
    DuplicateType {
        type_name: &'static str,
        existing: String,
    },

    #[error("duplicate member '{member}' in class '{class}'")]
    DuplicateMember { class: String, member: String },

    #[error("duplicate enum value: '{value_name}' in enum '{enum_name}'")]
    DuplicateEnumValue {
        enum_name: String,
        value_name: String,
    },

    /// A class was reopened before it was registered.
    #[error("type {type_name} is not registered as a class")]
    UnregisteredType { type_name: &'static str },
}
