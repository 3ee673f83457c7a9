//! Context-bound wrappers.
//!
//! A [`ContextualWrapper`] is what a script holds instead of a reference into
//! the database: the database's heap handle plus an [`EntityHandle`] key path
//! to the entity. Nothing is borrowed across calls. Every access resolves the
//! path again, so a released database or a removed entity shows up as
//! [`NativeError::StaleWrapper`] instead of a dangling reference.

use std::any::{Any, TypeId};
use std::fmt;

use pnrscript_netlist::{Context, Loc, GraphicElement};

use crate::convert::IntoDynamic;
use crate::error::{ConversionError, NativeError};
use crate::handles::ContextHandle;
use crate::policy::Scope;
use crate::runtime::{Dynamic, ObjectHandle, ObjectHeap};

/// A key path from a [`Context`] to one of the things it owns.
pub trait EntityHandle: Clone + PartialEq + fmt::Debug + 'static {
    type Target: 'static;

    /// Script-facing class name.
    const KIND: &'static str;

    fn resolve<'c>(&self, ctx: &'c Context) -> Option<&'c Self::Target>;
    fn resolve_mut<'c>(&self, ctx: &'c mut Context) -> Option<&'c mut Self::Target>;

    /// Human-readable path, for error messages.
    fn describe(&self, ctx: &Context) -> String;
}

/// A non-owning, script-held view of something inside a database.
#[derive(Clone, PartialEq)]
pub struct ContextualWrapper<H> {
    pub db: ObjectHandle,
    pub handle: H,
}

impl<H: EntityHandle> ContextualWrapper<H> {
    pub fn new(db: ObjectHandle, handle: H) -> Self {
        Self { db, handle }
    }

    /// Recover a wrapper from a script value.
    ///
    /// A heap-owned [`Context`] is accepted where a context wrapper is
    /// expected, so that the handle returned by `load_design` can be used
    /// directly as a receiver.
    pub fn from_dynamic(value: &Dynamic) -> Result<Self, NativeError> {
        match value {
            Dynamic::Native(native) => native.cloned::<Self>().ok_or_else(|| {
                ConversionError::TypeMismatch {
                    expected: H::KIND,
                    actual: native.type_name(),
                }
                .into()
            }),
            Dynamic::Object(db) if db.is::<Context>() => {
                let root: &dyn Any = &ContextHandle;
                root.downcast_ref::<H>()
                    .map(|handle| Self::new(*db, handle.clone()))
                    .ok_or_else(|| {
                        ConversionError::TypeMismatch {
                            expected: H::KIND,
                            actual: "Context",
                        }
                        .into()
                    })
            }
            other => Err(ConversionError::TypeMismatch {
                expected: H::KIND,
                actual: other.type_name(),
            }
            .into()),
        }
    }

    pub fn context<'h>(&self, heap: &'h ObjectHeap) -> Result<&'h Context, NativeError> {
        heap.get::<Context>(self.db)
            .ok_or_else(|| NativeError::stale("Context", "the database has been released"))
    }

    pub fn context_mut<'h>(&self, heap: &'h mut ObjectHeap) -> Result<&'h mut Context, NativeError> {
        heap.get_mut::<Context>(self.db)
            .ok_or_else(|| NativeError::stale("Context", "the database has been released"))
    }

    pub fn get<'h>(&self, heap: &'h ObjectHeap) -> Result<&'h H::Target, NativeError> {
        let ctx = self.context(heap)?;
        self.handle
            .resolve(ctx)
            .ok_or_else(|| NativeError::stale(H::KIND, self.handle.describe(ctx)))
    }

    pub fn get_mut<'h>(&self, heap: &'h mut ObjectHeap) -> Result<&'h mut H::Target, NativeError> {
        let ctx = self.context_mut(heap)?;
        if self.handle.resolve(ctx).is_none() {
            return Err(NativeError::stale(H::KIND, self.handle.describe(ctx)));
        }
        self.handle
            .resolve_mut(ctx)
            .ok_or_else(|| NativeError::stale(H::KIND, "entity vanished"))
    }
}

impl<H: EntityHandle> IntoDynamic for ContextualWrapper<H> {
    fn into_dynamic(self) -> Dynamic {
        Dynamic::wrap(self)
    }
}

impl<H: fmt::Debug> fmt::Debug for ContextualWrapper<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextualWrapper")
            .field("db", &self.db.index)
            .field("handle", &self.handle)
            .finish()
    }
}

/// A Rust type a script class is backed by.
///
/// Accessors built by the registry reach their target through this trait,
/// whether it lives in a database (wrappers) or in the script value itself
/// (plain value classes like `Loc`).
pub trait ScriptClass: 'static {
    type Target: 'static;

    /// Script-facing class name, for error messages.
    const KIND: &'static str;

    /// The database the receiver is bound to; `None` for value classes.
    fn database(this: &Dynamic) -> Result<Option<ObjectHandle>, NativeError>;

    fn with_ref<R>(
        this: &Dynamic,
        heap: &ObjectHeap,
        f: impl FnOnce(&Scope<'_>, &Self::Target) -> Result<R, NativeError>,
    ) -> Result<R, NativeError>;

    fn with_mut<R>(
        this: &Dynamic,
        heap: &mut ObjectHeap,
        f: impl FnOnce(&mut Self::Target) -> Result<R, NativeError>,
    ) -> Result<R, NativeError>;

    /// Heap object type that also dispatches to this class.
    fn heap_type() -> Option<TypeId> {
        None
    }
}

impl<H: EntityHandle> ScriptClass for ContextualWrapper<H> {
    type Target = H::Target;
    const KIND: &'static str = H::KIND;

    fn database(this: &Dynamic) -> Result<Option<ObjectHandle>, NativeError> {
        Ok(Some(receiver::<H>(this)?.db))
    }

    fn with_ref<R>(
        this: &Dynamic,
        heap: &ObjectHeap,
        f: impl FnOnce(&Scope<'_>, &Self::Target) -> Result<R, NativeError>,
    ) -> Result<R, NativeError> {
        let wrapper = receiver::<H>(this)?;
        let ctx = wrapper.context(heap)?;
        let target = wrapper.get(heap)?;
        f(&Scope::bound(wrapper.db, ctx), target)
    }

    fn with_mut<R>(
        this: &Dynamic,
        heap: &mut ObjectHeap,
        f: impl FnOnce(&mut Self::Target) -> Result<R, NativeError>,
    ) -> Result<R, NativeError> {
        let wrapper = receiver::<H>(this)?;
        f(wrapper.get_mut(heap)?)
    }

    fn heap_type() -> Option<TypeId> {
        (TypeId::of::<H>() == TypeId::of::<ContextHandle>()).then(TypeId::of::<Context>)
    }
}

fn receiver<H: EntityHandle>(this: &Dynamic) -> Result<ContextualWrapper<H>, NativeError> {
    ContextualWrapper::<H>::from_dynamic(this).map_err(|e| NativeError::invalid_this(e.to_string()))
}

/// Implement [`ScriptClass`] for types stored by value in a script slot.
#[macro_export]
macro_rules! value_class {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::ScriptClass for $ty {
                type Target = $ty;
                const KIND: &'static str = stringify!($ty);

                fn database(
                    _this: &$crate::Dynamic,
                ) -> Result<Option<$crate::ObjectHandle>, $crate::NativeError> {
                    Ok(None)
                }

                fn with_ref<R>(
                    this: &$crate::Dynamic,
                    _heap: &$crate::ObjectHeap,
                    f: impl FnOnce(&$crate::Scope<'_>, &Self::Target) -> Result<R, $crate::NativeError>,
                ) -> Result<R, $crate::NativeError> {
                    this.as_native()
                        .and_then(|native| native.with(|value: &$ty| f(&$crate::Scope::detached(), value)))
                        .ok_or_else(|| {
                            $crate::NativeError::invalid_this(concat!("expected ", stringify!($ty)))
                        })?
                }

                fn with_mut<R>(
                    this: &$crate::Dynamic,
                    _heap: &mut $crate::ObjectHeap,
                    f: impl FnOnce(&mut Self::Target) -> Result<R, $crate::NativeError>,
                ) -> Result<R, $crate::NativeError> {
                    this.as_native()
                        .and_then(|native| native.with_mut(|value: &mut $ty| f(value)))
                        .ok_or_else(|| {
                            $crate::NativeError::invalid_this(concat!("expected ", stringify!($ty)))
                        })?
                }
            }
        )*
    };
}

value_class!(Loc, GraphicElement);
