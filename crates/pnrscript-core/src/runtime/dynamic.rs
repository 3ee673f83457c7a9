//! Runtime value type for call slots.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::ObjectHandle;

/// A value crossing the script boundary.
///
/// Owned script values (numbers, strings, lists) are held inline. Databases
/// are held by [`ObjectHandle`] into the heap. Everything else the bindings
/// hand out (entity wrappers, collection proxies, `Loc` and friends) is a
/// [`NativeValue`].
#[derive(Clone)]
pub enum Dynamic {
    Void,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    List(Vec<Dynamic>),
    /// Handle to a heap-allocated object
    Object(ObjectHandle),
    Native(NativeValue),
    NullHandle,
}

impl Dynamic {
    /// Store `value` as a native value.
    pub fn wrap<T: Any>(value: T) -> Self {
        Dynamic::Native(NativeValue::new(value))
    }

    /// Get a human-readable name for this slot's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Void => "void",
            Dynamic::Int(_) => "int",
            Dynamic::Float(_) => "float",
            Dynamic::Bool(_) => "bool",
            Dynamic::String(_) => "string",
            Dynamic::List(_) => "list",
            Dynamic::Object(_) => "object",
            Dynamic::Native(_) => "native",
            Dynamic::NullHandle => "null",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Dynamic::Void)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::NullHandle)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Dynamic::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Dynamic]> {
        match self {
            Dynamic::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_native(&self) -> Option<&NativeValue> {
        match self {
            Dynamic::Native(value) => Some(value),
            _ => None,
        }
    }

    /// Rust type behind a native value or heap object.
    pub fn native_type_id(&self) -> Option<TypeId> {
        match self {
            Dynamic::Native(value) => Some(value.type_id()),
            Dynamic::Object(handle) => Some(handle.type_id),
            _ => None,
        }
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Void => write!(f, "Void"),
            Dynamic::Int(v) => write!(f, "Int({})", v),
            Dynamic::Float(v) => write!(f, "Float({})", v),
            Dynamic::Bool(v) => write!(f, "Bool({})", v),
            Dynamic::String(s) => write!(f, "String({:?})", s),
            Dynamic::List(items) => f.debug_tuple("List").field(items).finish(),
            Dynamic::Object(h) => write!(f, "Object({:?})", h),
            Dynamic::Native(v) => write!(f, "Native({})", v.type_name()),
            Dynamic::NullHandle => write!(f, "NullHandle"),
        }
    }
}

impl PartialEq for Dynamic {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Dynamic::Void, Dynamic::Void) => true,
            (Dynamic::Int(a), Dynamic::Int(b)) => a == b,
            (Dynamic::Float(a), Dynamic::Float(b)) => a == b,
            (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
            (Dynamic::String(a), Dynamic::String(b)) => a == b,
            (Dynamic::List(a), Dynamic::List(b)) => a == b,
            (Dynamic::Object(a), Dynamic::Object(b)) => a == b,
            (Dynamic::NullHandle, Dynamic::NullHandle) => true,
            // Identity only; structural equality is a registered class behavior
            (Dynamic::Native(a), Dynamic::Native(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// A shared, type-erased Rust value owned by the script side.
///
/// Cloning shares the value, so an attribute write through one copy is seen
/// through every other.
#[derive(Clone)]
pub struct NativeValue {
    type_id: TypeId,
    type_name: &'static str,
    cell: Rc<RefCell<Box<dyn Any>>>,
}

impl NativeValue {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            cell: Rc::new(RefCell::new(Box::new(value))),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the stored value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// A copy of the stored value, if it is a `T`.
    pub fn cloned<T: Any + Clone>(&self) -> Option<T> {
        self.with(|value: &T| value.clone())
    }

    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.cell.try_borrow().ok()?;
        guard.downcast_ref::<T>().map(f)
    }

    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.cell.try_borrow_mut().ok()?;
        guard.downcast_mut::<T>().map(f)
    }

    pub fn ptr_eq(&self, other: &NativeValue) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Default for Dynamic {
    fn default() -> Self {
        Dynamic::Void
    }
}
