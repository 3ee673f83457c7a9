//! Conversions between Rust values and [`Dynamic`] slots.
//!
//! - [`FromDynamic`]: extract a Rust value from a slot
//! - [`IntoDynamic`]: convert a Rust value into a slot
//!
//! These cover values that need no database: numbers, strings, flags and
//! the integer-backed netlist enums. Context-dependent values go through
//! [`StringConverter`](crate::StringConverter).

use pnrscript_netlist::{
    GraphicElement, GraphicElementStyle, GraphicElementType, Loc, PlaceStrength, PortType,
};

use crate::error::ConversionError;
use crate::runtime::Dynamic;

pub trait FromDynamic: Sized {
    fn from_dynamic(slot: &Dynamic) -> Result<Self, ConversionError>;
}

pub trait IntoDynamic {
    fn into_dynamic(self) -> Dynamic;
}

// ============================================================================
// Integers
// ============================================================================

macro_rules! impl_dynamic_int {
    ($($ty:ty),*) => {
        $(
            impl FromDynamic for $ty {
                fn from_dynamic(slot: &Dynamic) -> Result<Self, ConversionError> {
                    match slot {
                        Dynamic::Int(v) => <$ty>::try_from(*v).map_err(|_| {
                            ConversionError::IntegerOverflow {
                                value: *v,
                                target_type: stringify!($ty),
                            }
                        }),
                        _ => Err(ConversionError::TypeMismatch {
                            expected: "int",
                            actual: slot.type_name(),
                        }),
                    }
                }
            }

            impl IntoDynamic for $ty {
                fn into_dynamic(self) -> Dynamic {
                    Dynamic::Int(self as i64)
                }
            }
        )*
    };
}

impl_dynamic_int!(i8, i16, i32, i64, u8, u16, u32, usize);

// ============================================================================
// Floats, bool, strings, unit
// ============================================================================

impl FromDynamic for f64 {
    fn from_dynamic(slot: &Dynamic) -> Result<Self, ConversionError> {
        match slot {
            Dynamic::Float(v) => Ok(*v),
            Dynamic::Int(v) => Ok(*v as f64),
            _ => Err(ConversionError::TypeMismatch {
                expected: "float",
                actual: slot.type_name(),
            }),
        }
    }
}

impl IntoDynamic for f64 {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Float(self)
    }
}

impl FromDynamic for f32 {
    fn from_dynamic(slot: &Dynamic) -> Result<Self, ConversionError> {
        f64::from_dynamic(slot).map(|v| v as f32)
    }
}

impl IntoDynamic for f32 {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Float(self as f64)
    }
}

impl FromDynamic for bool {
    fn from_dynamic(slot: &Dynamic) -> Result<Self, ConversionError> {
        match slot {
            Dynamic::Bool(v) => Ok(*v),
            _ => Err(ConversionError::TypeMismatch {
                expected: "bool",
                actual: slot.type_name(),
            }),
        }
    }
}

impl IntoDynamic for bool {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Bool(self)
    }
}

impl FromDynamic for String {
    fn from_dynamic(slot: &Dynamic) -> Result<Self, ConversionError> {
        match slot {
            Dynamic::String(s) => Ok(s.clone()),
            _ => Err(ConversionError::TypeMismatch {
                expected: "string",
                actual: slot.type_name(),
            }),
        }
    }
}

impl IntoDynamic for String {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::String(self)
    }
}

impl IntoDynamic for &str {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::String(self.to_owned())
    }
}

impl IntoDynamic for () {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::Void
    }
}

impl FromDynamic for Dynamic {
    fn from_dynamic(slot: &Dynamic) -> Result<Self, ConversionError> {
        Ok(slot.clone())
    }
}

impl IntoDynamic for Dynamic {
    fn into_dynamic(self) -> Dynamic {
        self
    }
}

impl<T: IntoDynamic> IntoDynamic for Option<T> {
    fn into_dynamic(self) -> Dynamic {
        self.map_or(Dynamic::NullHandle, IntoDynamic::into_dynamic)
    }
}

impl<T: IntoDynamic> IntoDynamic for Vec<T> {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::List(self.into_iter().map(IntoDynamic::into_dynamic).collect())
    }
}

// ============================================================================
// Netlist enums
// ============================================================================

macro_rules! impl_dynamic_enum {
    ($($ty:ty),*) => {
        $(
            impl FromDynamic for $ty {
                fn from_dynamic(slot: &Dynamic) -> Result<Self, ConversionError> {
                    let raw = i64::from_dynamic(slot)?;
                    <$ty>::try_from(raw).map_err(|_| ConversionError::InvalidEnumValue {
                        value: raw,
                        target_type: stringify!($ty),
                    })
                }
            }

            impl IntoDynamic for $ty {
                fn into_dynamic(self) -> Dynamic {
                    Dynamic::Int(i64::from(self))
                }
            }
        )*
    };
}

impl_dynamic_enum!(PortType, PlaceStrength, GraphicElementType, GraphicElementStyle);

// ============================================================================
// Value classes
// ============================================================================

macro_rules! impl_dynamic_value {
    ($($ty:ty),*) => {
        $(
            impl FromDynamic for $ty {
                fn from_dynamic(slot: &Dynamic) -> Result<Self, ConversionError> {
                    slot.as_native()
                        .and_then(|native| native.cloned::<$ty>())
                        .ok_or(ConversionError::TypeMismatch {
                            expected: stringify!($ty),
                            actual: slot.type_name(),
                        })
                }
            }

            impl IntoDynamic for $ty {
                fn into_dynamic(self) -> Dynamic {
                    Dynamic::wrap(self)
                }
            }
        )*
    };
}

impl_dynamic_value!(Loc, GraphicElement);
