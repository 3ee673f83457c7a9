//! Converter policies.
//!
//! An accessor is a (target, projection, policy) triple. The policy decides
//! how the projected value crosses the boundary: as a string through its
//! [`StringConverter`], as a plain script value, or as a new context-bound
//! wrapper. Policies are zero-sized; they only select trait impls.

use std::marker::PhantomData;

use pnrscript_netlist::{Context, IdString};

use crate::convert::{FromDynamic, IntoDynamic};
use crate::error::{ConversionError, NativeError};
use crate::runtime::{Dynamic, ObjectHandle, ObjectHeap};
use crate::string_conv::{Intern, StringConverter};
use crate::wrapper::{ContextualWrapper, EntityHandle};

/// Read-only conversion environment.
pub struct Scope<'a> {
    db: Option<ObjectHandle>,
    ctx: Option<&'a Context>,
}

impl<'a> Scope<'a> {
    pub fn bound(db: ObjectHandle, ctx: &'a Context) -> Self {
        Self {
            db: Some(db),
            ctx: Some(ctx),
        }
    }

    /// A scope with no database, for value classes.
    pub fn detached() -> Self {
        Self { db: None, ctx: None }
    }

    pub fn database(&self) -> Option<ObjectHandle> {
        self.db
    }

    pub fn context(&self, kind: &'static str) -> Result<&'a Context, NativeError> {
        self.ctx.ok_or(NativeError::MissingDatabase { kind })
    }

    fn bound_db(&self, kind: &'static str) -> Result<ObjectHandle, NativeError> {
        self.db.ok_or(NativeError::MissingDatabase { kind })
    }
}

/// Conversion environment for values flowing into the database.
///
/// Holds the context mutably so that write paths may intern.
pub struct ScopeMut<'a> {
    db: Option<ObjectHandle>,
    ctx: Option<&'a mut Context>,
}

impl<'a> ScopeMut<'a> {
    pub fn resolve(db: Option<ObjectHandle>, heap: &'a mut ObjectHeap) -> Result<Self, NativeError> {
        let Some(handle) = db else {
            return Ok(Self { db, ctx: None });
        };
        let ctx = heap
            .get_mut::<Context>(handle)
            .ok_or_else(|| NativeError::stale("Context", "the database has been released"))?;
        Ok(Self { db, ctx: Some(ctx) })
    }

    pub fn database(&self) -> Option<ObjectHandle> {
        self.db
    }

    pub fn context(&self, kind: &'static str) -> Result<&Context, NativeError> {
        self.ctx.as_deref().ok_or(NativeError::MissingDatabase { kind })
    }

    pub fn context_mut(&mut self, kind: &'static str) -> Result<&mut Context, NativeError> {
        self.ctx.as_deref_mut().ok_or(NativeError::MissingDatabase { kind })
    }
}

/// Native to script.
pub trait ToScript<T: ?Sized> {
    fn to_script(scope: &Scope<'_>, value: &T) -> Result<Dynamic, NativeError>;
}

/// Script to native.
pub trait FromScript<T> {
    fn from_script(scope: &mut ScopeMut<'_>, value: &Dynamic) -> Result<T, NativeError>;
}

fn expect_str(value: &Dynamic) -> Result<&str, NativeError> {
    value.as_str().ok_or_else(|| {
        ConversionError::TypeMismatch {
            expected: "string",
            actual: value.type_name(),
        }
        .into()
    })
}

/// Render through the type's [`StringConverter`].
pub struct ConvToStr;

impl<T: StringConverter> ToScript<T> for ConvToStr {
    fn to_script(scope: &Scope<'_>, value: &T) -> Result<Dynamic, NativeError> {
        let ctx = scope.context(T::KIND)?;
        T::to_str(ctx, value).map(Dynamic::String)
    }
}

/// Parse through the type's [`StringConverter`]; unknown names are errors.
pub struct ConvFromStr;

impl<T: StringConverter> FromScript<T> for ConvFromStr {
    fn from_script(scope: &mut ScopeMut<'_>, value: &Dynamic) -> Result<T, NativeError> {
        let s = expect_str(value)?;
        T::from_str(scope.context(T::KIND)?, s)
    }
}

/// Parse a string, interning it if the database has not seen it yet.
///
/// Used only where a script is naming something new.
pub struct InternFromStr;

impl<T: Intern> FromScript<T> for InternFromStr {
    fn from_script(scope: &mut ScopeMut<'_>, value: &Dynamic) -> Result<T, NativeError> {
        let s = expect_str(value)?;
        Ok(T::intern(scope.context_mut("IdString")?, s))
    }
}

/// Values that need no database.
pub struct PassThrough;

impl<T: IntoDynamic + Clone> ToScript<T> for PassThrough {
    fn to_script(_scope: &Scope<'_>, value: &T) -> Result<Dynamic, NativeError> {
        Ok(value.clone().into_dynamic())
    }
}

impl<T: FromDynamic> FromScript<T> for PassThrough {
    fn from_script(_scope: &mut ScopeMut<'_>, value: &Dynamic) -> Result<T, NativeError> {
        Ok(T::from_dynamic(value)?)
    }
}

/// Turn a name into a wrapper of the entity it names.
pub struct DerefAndWrap<H>(PhantomData<H>);

impl<H: EntityHandle + From<IdString>> ToScript<IdString> for DerefAndWrap<H> {
    fn to_script(scope: &Scope<'_>, value: &IdString) -> Result<Dynamic, NativeError> {
        let db = scope.bound_db(H::KIND)?;
        Ok(ContextualWrapper::new(db, H::from(*value)).into_dynamic())
    }
}

impl<H: EntityHandle + From<IdString>> ToScript<Option<IdString>> for DerefAndWrap<H> {
    fn to_script(scope: &Scope<'_>, value: &Option<IdString>) -> Result<Dynamic, NativeError> {
        match value {
            Some(id) => <Self as ToScript<IdString>>::to_script(scope, id),
            None => Ok(Dynamic::NullHandle),
        }
    }
}

/// Copy the value a wrapper points at out of the database.
pub struct UnwrapContext<H>(PhantomData<H>);

impl<H> FromScript<H::Target> for UnwrapContext<H>
where
    H: EntityHandle,
    H::Target: Clone,
{
    fn from_script(scope: &mut ScopeMut<'_>, value: &Dynamic) -> Result<H::Target, NativeError> {
        let wrapper = ContextualWrapper::<H>::from_dynamic(value)?;
        if Some(wrapper.db) != scope.database() {
            return Err(NativeError::stale(H::KIND, "belongs to a different database"));
        }
        let ctx = scope.context(H::KIND)?;
        wrapper
            .handle
            .resolve(ctx)
            .cloned()
            .ok_or_else(|| NativeError::stale(H::KIND, wrapper.handle.describe(ctx)))
    }
}

/// Apply `P` to every element of a returned sequence.
pub struct ListOf<P>(PhantomData<P>);

impl<T, P: ToScript<T>> ToScript<Vec<T>> for ListOf<P> {
    fn to_script(scope: &Scope<'_>, value: &Vec<T>) -> Result<Dynamic, NativeError> {
        value
            .iter()
            .map(|item| P::to_script(scope, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Dynamic::List)
    }
}

#[cfg(test)]
mod tests {
    use pnrscript_netlist::{BelId, PlaceStrength, PortRef, Property};

    use super::*;
    use crate::handles::{CellHandle, NetHandle, PortRefHandle, PortRefSlot};
    use crate::test_support::test_context;

    fn heap_with_context() -> (ObjectHeap, ObjectHandle) {
        let mut heap = ObjectHeap::new();
        let db = heap.allocate(test_context());
        (heap, db)
    }

    #[test]
    fn conv_to_str_needs_a_database() {
        let err = <ConvToStr as ToScript<IdString>>::to_script(&Scope::detached(), &IdString::EMPTY)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn conv_from_str_is_strict() {
        let (mut heap, db) = heap_with_context();
        let mut scope = ScopeMut::resolve(Some(db), &mut heap).unwrap();
        let result: Result<IdString, _> =
            ConvFromStr::from_script(&mut scope, &Dynamic::String("nope".into()));
        assert!(matches!(result, Err(NativeError::InvalidIdentifier { .. })));
    }

    #[test]
    fn intern_from_str_interns() {
        let (mut heap, db) = heap_with_context();
        let id: IdString = {
            let mut scope = ScopeMut::resolve(Some(db), &mut heap).unwrap();
            InternFromStr::from_script(&mut scope, &Dynamic::String("new_net".into())).unwrap()
        };
        let ctx = heap.get::<Context>(db).unwrap();
        assert_eq!(ctx.lookup_id("new_net"), Some(id));
    }

    #[test]
    fn wrong_script_type_is_a_type_error() {
        let (mut heap, db) = heap_with_context();
        let mut scope = ScopeMut::resolve(Some(db), &mut heap).unwrap();
        let result: Result<Property, _> = ConvFromStr::from_script(&mut scope, &Dynamic::Int(3));
        assert!(matches!(result, Err(NativeError::Conversion(_))));
    }

    #[test]
    fn pass_through_enums() {
        let v = <PassThrough as ToScript<PlaceStrength>>::to_script(
            &Scope::detached(),
            &PlaceStrength::Fixed,
        )
        .unwrap();
        assert_eq!(v, Dynamic::Int(3));
    }

    #[test]
    fn deref_and_wrap_builds_wrappers() {
        let (heap, db) = heap_with_context();
        let ctx = heap.get::<Context>(db).unwrap();
        let scope = Scope::bound(db, ctx);
        let wrapped =
            <DerefAndWrap<NetHandle> as ToScript<Option<IdString>>>::to_script(&scope, &None)
                .unwrap();
        assert!(wrapped.is_null());

        let wrapped =
            <DerefAndWrap<CellHandle> as ToScript<IdString>>::to_script(&scope, &IdString::EMPTY)
                .unwrap();
        let wrapper = ContextualWrapper::<CellHandle>::from_dynamic(&wrapped).unwrap();
        assert_eq!(wrapper.handle, CellHandle(IdString::EMPTY));
    }

    #[test]
    fn unwrap_context_copies_the_target() {
        let (mut heap, db) = heap_with_context();
        let (n, c, q) = {
            let ctx = heap.get_mut::<Context>(db).unwrap();
            let (n, c, t, q) = (ctx.id("n"), ctx.id("c"), ctx.id("T"), ctx.id("Q"));
            ctx.create_cell(c, t).unwrap().add_output(q);
            ctx.create_net(n).unwrap();
            ctx.connect_port(n, c, q).unwrap();
            (n, c, q)
        };
        let driver = ContextualWrapper::new(
            db,
            PortRefHandle {
                net: n,
                slot: PortRefSlot::Driver,
            },
        )
        .into_dynamic();

        let mut scope = ScopeMut::resolve(Some(db), &mut heap).unwrap();
        let value: PortRef =
            UnwrapContext::<PortRefHandle>::from_script(&mut scope, &driver).unwrap();
        assert_eq!(value, PortRef::new(c, q));
    }

    #[test]
    fn list_of_converts_each_element() {
        let (heap, db) = heap_with_context();
        let ctx = heap.get::<Context>(db).unwrap();
        let scope = Scope::bound(db, ctx);
        let bels = ctx.arch().bels();
        let list = <ListOf<ConvToStr> as ToScript<Vec<BelId>>>::to_script(&scope, &bels).unwrap();
        assert_eq!(list.as_list().unwrap().len(), bels.len());
        assert_eq!(list.as_list().unwrap()[0], Dynamic::String("X0Y0/LC0".into()));
    }
}
