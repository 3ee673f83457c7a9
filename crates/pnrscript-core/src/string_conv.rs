//! Per-type string converters.
//!
//! Every identifier crossing the boundary is a string on the script side and
//! an opaque index on the native side; the database is needed both ways.

use pnrscript_netlist::{BelId, Context, IdString, Loc, PipId, PortRef, Property, WireId};

use crate::error::{ConversionError, NativeError};

/// Bidirectional conversion between a native value and its string form.
///
/// `from_str` never creates anything: a string the database does not know
/// is [`NativeError::InvalidIdentifier`]. Write paths that are allowed to
/// intern new names use [`Intern`] instead.
pub trait StringConverter: Sized {
    const KIND: &'static str;

    fn to_str(ctx: &Context, value: &Self) -> Result<String, NativeError>;
    fn from_str(ctx: &Context, s: &str) -> Result<Self, NativeError>;
}

/// Conversion from a string that may intern it.
pub trait Intern: Sized {
    fn intern(ctx: &mut Context, s: &str) -> Self;
}

impl StringConverter for IdString {
    const KIND: &'static str = "IdString";

    fn to_str(ctx: &Context, value: &Self) -> Result<String, NativeError> {
        ctx.ids()
            .resolve(*value)
            .map(str::to_owned)
            .ok_or_else(|| NativeError::stale(Self::KIND, format!("index {}", value.index())))
    }

    fn from_str(ctx: &Context, s: &str) -> Result<Self, NativeError> {
        ctx.lookup_id(s)
            .ok_or_else(|| NativeError::invalid_identifier(Self::KIND, s))
    }
}

impl Intern for IdString {
    fn intern(ctx: &mut Context, s: &str) -> Self {
        ctx.id(s)
    }
}

impl StringConverter for Property {
    const KIND: &'static str = "Property";

    fn to_str(_ctx: &Context, value: &Self) -> Result<String, NativeError> {
        Ok(value.to_string())
    }

    fn from_str(_ctx: &Context, s: &str) -> Result<Self, NativeError> {
        Ok(Property::from_string(s))
    }
}

impl Intern for Property {
    fn intern(_ctx: &mut Context, s: &str) -> Self {
        Property::from_string(s)
    }
}

impl StringConverter for PortRef {
    const KIND: &'static str = "PortRef";

    fn to_str(ctx: &Context, value: &Self) -> Result<String, NativeError> {
        let cell = match value.cell {
            Some(cell) => IdString::to_str(ctx, &cell)?,
            None => String::new(),
        };
        Ok(format!("{}.{}", cell, IdString::to_str(ctx, &value.port)?))
    }

    /// A cell name may itself contain `.`, so the pair cannot be recovered.
    fn from_str(_ctx: &Context, _s: &str) -> Result<Self, NativeError> {
        Err(NativeError::UnsupportedConversion {
            kind: Self::KIND,
            direction: "from a string",
        })
    }
}

macro_rules! impl_arch_converter {
    ($ty:ty, $kind:literal, $by_name:ident, $name:ident) => {
        impl StringConverter for $ty {
            const KIND: &'static str = $kind;

            fn to_str(ctx: &Context, value: &Self) -> Result<String, NativeError> {
                ctx.arch()
                    .$name(*value)
                    .map(str::to_owned)
                    .ok_or_else(|| NativeError::stale(Self::KIND, value.to_string()))
            }

            fn from_str(ctx: &Context, s: &str) -> Result<Self, NativeError> {
                ctx.arch()
                    .$by_name(s)
                    .ok_or_else(|| NativeError::invalid_identifier(Self::KIND, s))
            }
        }
    };
}

impl_arch_converter!(BelId, "BelId", bel_by_name, bel_name);
impl_arch_converter!(WireId, "WireId", wire_by_name, wire_name);
impl_arch_converter!(PipId, "PipId", pip_by_name, pip_name);

/// The empty string stands for an absent value.
impl<T: StringConverter> StringConverter for Option<T> {
    const KIND: &'static str = T::KIND;

    fn to_str(ctx: &Context, value: &Self) -> Result<String, NativeError> {
        match value {
            Some(inner) => T::to_str(ctx, inner),
            None => Ok(String::new()),
        }
    }

    fn from_str(ctx: &Context, s: &str) -> Result<Self, NativeError> {
        if s.is_empty() {
            Ok(None)
        } else {
            T::from_str(ctx, s).map(Some)
        }
    }
}

impl Intern for Option<IdString> {
    fn intern(ctx: &mut Context, s: &str) -> Self {
        (!s.is_empty()).then(|| ctx.id(s))
    }
}

/// `"x,y,z"`.
impl StringConverter for Loc {
    const KIND: &'static str = "Loc";

    fn to_str(_ctx: &Context, value: &Self) -> Result<String, NativeError> {
        Ok(format!("{},{},{}", value.x, value.y, value.z))
    }

    fn from_str(_ctx: &Context, s: &str) -> Result<Self, NativeError> {
        let mut parts = s.split(',').map(|p| p.trim().parse::<i32>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => Ok(Loc::new(x, y, z)),
            _ => Err(ConversionError::TypeMismatch {
                expected: "\"x,y,z\"",
                actual: "string",
            }
            .into()),
        }
    }
}
