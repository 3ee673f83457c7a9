//! Attribute and method accessor generators.
//!
//! Each builder method turns a (projection, policy) pair into a [`NativeFn`].
//! Getters read through [`ScriptClass::with_ref`] and convert with a
//! [`ToScript`] policy. Setters and method arguments are converted with a
//! [`FromScript`] policy *before* the target is resolved for writing, so
//! that write-path interning and wrapper unwrapping see the database while
//! nothing else borrows it.

use std::any::{TypeId, type_name};
use std::marker::PhantomData;

use pnrscript_core::{
    CallContext, ContextualWrapper, Dynamic, EntityHandle, FromScript, NativeError, NativeFn,
    PassThrough, Scope, ScopeMut, ScriptClass, ToScript,
};
use pnrscript_netlist::Context;
use rustc_hash::FxHashMap;

use crate::error::RegistrationError;
use crate::module::{Callable, ClassEntry, Module, PropertyEntry};

/// Builder for one script class, backed by the Rust type `C`.
///
/// Created by [`Module::register_class`]; nothing is visible to scripts
/// until [`build`](Self::build) succeeds.
pub struct ClassBuilder<'m, C: ScriptClass> {
    module: &'m mut Module,
    name: String,
    properties: FxHashMap<String, PropertyEntry>,
    methods: FxHashMap<String, Callable>,
    constructor: Option<Callable>,
    /// Index of the class being extended, if any.
    extends: Option<usize>,
    _marker: PhantomData<C>,
}

impl<'m, C: ScriptClass> ClassBuilder<'m, C> {
    pub(crate) fn new(module: &'m mut Module, name: String) -> Self {
        Self {
            module,
            name,
            properties: FxHashMap::default(),
            methods: FxHashMap::default(),
            constructor: None,
            extends: None,
            _marker: PhantomData,
        }
    }

    pub(crate) fn extending(module: &'m mut Module, name: String, index: usize) -> Self {
        Self {
            extends: Some(index),
            ..Self::new(module, name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // =========================================================================
    // Fields
    // =========================================================================

    /// A read-only attribute converted with `P`.
    pub fn readonly<P, V, F>(self, name: &str, get: F) -> Result<Self, RegistrationError>
    where
        P: ToScript<V> + 'static,
        V: ?Sized + 'static,
        F: for<'a> Fn(&'a C::Target) -> &'a V + Send + Sync + 'static,
    {
        let getter = getter::<C, P, V, F>(get);
        self.property(name, getter, None)
    }

    /// A read-write attribute: read with `R`, written with `W`.
    pub fn readwrite<R, W, V, G, S>(self, name: &str, get: G, set: S) -> Result<Self, RegistrationError>
    where
        R: ToScript<V> + 'static,
        W: FromScript<V> + 'static,
        V: 'static,
        G: for<'a> Fn(&'a C::Target) -> &'a V + Send + Sync + 'static,
        S: Fn(&mut C::Target, V) + Send + Sync + 'static,
    {
        let getter = getter::<C, R, V, G>(get);
        let setter = setter::<C, W, V, S>(set);
        self.property(name, getter, Some(setter))
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// A method with no arguments whose result is converted with `R`.
    pub fn method0<R, Ret, F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        R: ToScript<Ret> + 'static,
        Ret: 'static,
        F: Fn(&mut C::Target) -> Result<Ret, NativeError> + Send + Sync + 'static,
    {
        let native = NativeFn::new(move |call: &mut CallContext<'_>| {
            dispatch::<C, R, (), Ret>(call, 0, |_, _| Ok(()), |target, ()| f(target))
        });
        self.method(name, 0, native)
    }

    pub fn method1<R, A1, V1, Ret, F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        R: ToScript<Ret> + 'static,
        A1: FromScript<V1> + 'static,
        V1: 'static,
        Ret: 'static,
        F: Fn(&mut C::Target, V1) -> Result<Ret, NativeError> + Send + Sync + 'static,
    {
        let native = NativeFn::new(move |call: &mut CallContext<'_>| {
            dispatch::<C, R, V1, Ret>(
                call,
                1,
                |scope, raw| A1::from_script(scope, &raw[0]),
                |target, a1| f(target, a1),
            )
        });
        self.method(name, 1, native)
    }

    pub fn method2<R, A1, A2, V1, V2, Ret, F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        R: ToScript<Ret> + 'static,
        A1: FromScript<V1> + 'static,
        A2: FromScript<V2> + 'static,
        V1: 'static,
        V2: 'static,
        Ret: 'static,
        F: Fn(&mut C::Target, V1, V2) -> Result<Ret, NativeError> + Send + Sync + 'static,
    {
        let native = NativeFn::new(move |call: &mut CallContext<'_>| {
            dispatch::<C, R, (V1, V2), Ret>(
                call,
                2,
                |scope, raw| Ok((A1::from_script(scope, &raw[0])?, A2::from_script(scope, &raw[1])?)),
                |target, (a1, a2)| f(target, a1, a2),
            )
        });
        self.method(name, 2, native)
    }

    pub fn method3<R, A1, A2, A3, V1, V2, V3, Ret, F>(
        self,
        name: &str,
        f: F,
    ) -> Result<Self, RegistrationError>
    where
        R: ToScript<Ret> + 'static,
        A1: FromScript<V1> + 'static,
        A2: FromScript<V2> + 'static,
        A3: FromScript<V3> + 'static,
        V1: 'static,
        V2: 'static,
        V3: 'static,
        Ret: 'static,
        F: Fn(&mut C::Target, V1, V2, V3) -> Result<Ret, NativeError> + Send + Sync + 'static,
    {
        let native = NativeFn::new(move |call: &mut CallContext<'_>| {
            dispatch::<C, R, (V1, V2, V3), Ret>(
                call,
                3,
                |scope, raw| {
                    Ok((
                        A1::from_script(scope, &raw[0])?,
                        A2::from_script(scope, &raw[1])?,
                        A3::from_script(scope, &raw[2])?,
                    ))
                },
                |target, (a1, a2, a3)| f(target, a1, a2, a3),
            )
        });
        self.method(name, 3, native)
    }

    /// A method with no arguments and no result.
    pub fn method0_v<F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: Fn(&mut C::Target) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.method0::<PassThrough, (), F>(name, f)
    }

    pub fn method1_v<A1, V1, F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        A1: FromScript<V1> + 'static,
        V1: 'static,
        F: Fn(&mut C::Target, V1) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.method1::<PassThrough, A1, V1, (), F>(name, f)
    }

    pub fn method2_v<A1, A2, V1, V2, F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        A1: FromScript<V1> + 'static,
        A2: FromScript<V2> + 'static,
        V1: 'static,
        V2: 'static,
        F: Fn(&mut C::Target, V1, V2) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.method2::<PassThrough, A1, A2, V1, V2, (), F>(name, f)
    }

    pub fn method3_v<A1, A2, A3, V1, V2, V3, F>(
        self,
        name: &str,
        f: F,
    ) -> Result<Self, RegistrationError>
    where
        A1: FromScript<V1> + 'static,
        A2: FromScript<V2> + 'static,
        A3: FromScript<V3> + 'static,
        V1: 'static,
        V2: 'static,
        V3: 'static,
        F: Fn(&mut C::Target, V1, V2, V3) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.method3::<PassThrough, A1, A2, A3, V1, V2, V3, (), F>(name, f)
    }

    /// A method with direct access to the call; for signatures the typed
    /// generators do not cover.
    pub fn method_raw<F>(self, name: &str, arity: usize, f: F) -> Result<Self, RegistrationError>
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.method(name, arity, NativeFn::new(f))
    }

    // =========================================================================
    // Behaviours
    // =========================================================================

    /// Script-side construction of a value class.
    pub fn constructor<F>(mut self, arity: usize, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<C::Target, NativeError> + Send + Sync + 'static,
    {
        let native = NativeFn::new(move |call: &mut CallContext<'_>| {
            let value = f(call)?;
            call.set_return_slot(Dynamic::wrap(value));
            Ok(())
        });
        self.constructor = Some(Callable { arity, f: native });
        self
    }

    /// `__eq__` comparing the resolved targets.
    pub fn equality(self) -> Result<Self, RegistrationError>
    where
        C::Target: PartialEq,
    {
        let native = NativeFn::new(|call: &mut CallContext<'_>| {
            let this = call.this()?.clone();
            let other = call.arg_slot(0)?.clone();
            let same = if other.native_type_id() != this.native_type_id() {
                false
            } else {
                let heap = call.heap();
                C::with_ref(&this, heap, |_, a| C::with_ref(&other, heap, |_, b| Ok(a == b)))?
            };
            call.set_return(same);
            Ok(())
        });
        self.method("__eq__", 1, native)
    }

    /// Register the class with the module.
    pub fn build(self) -> Result<(), RegistrationError> {
        let entry = ClassEntry {
            name: self.name,
            properties: self.properties,
            methods: self.methods,
            constructor: self.constructor,
        };
        match self.extends {
            Some(index) => {
                self.module.merge_class(index, entry);
                Ok(())
            }
            None => self
                .module
                .add_class(entry, TypeId::of::<C>(), type_name::<C>(), C::heap_type()),
        }
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    pub(crate) fn property(
        mut self,
        name: &str,
        getter: NativeFn,
        setter: Option<NativeFn>,
    ) -> Result<Self, RegistrationError> {
        self.reserve(name)?;
        self.properties
            .insert(name.to_owned(), PropertyEntry { getter, setter });
        Ok(self)
    }

    pub(crate) fn method(
        mut self,
        name: &str,
        arity: usize,
        f: NativeFn,
    ) -> Result<Self, RegistrationError> {
        self.reserve(name)?;
        self.methods.insert(name.to_owned(), Callable { arity, f });
        Ok(self)
    }

    fn reserve(&self, member: &str) -> Result<(), RegistrationError> {
        let existing = self.extends.map(|index| self.module.class_entry(index));
        let taken = |properties: &FxHashMap<String, PropertyEntry>, methods: &FxHashMap<String, Callable>| {
            properties.contains_key(member) || methods.contains_key(member)
        };
        if taken(&self.properties, &self.methods)
            || existing.is_some_and(|class| taken(&class.properties, &class.methods))
        {
            return Err(RegistrationError::DuplicateMember {
                class: self.name.clone(),
                member: member.to_owned(),
            });
        }
        Ok(())
    }
}

impl<'m, H: EntityHandle> ClassBuilder<'m, ContextualWrapper<H>> {
    /// A read-only attribute that hands out a wrapper over a child entity.
    ///
    /// The parent is resolved first, so reading a view of a removed entity
    /// raises instead of producing a dangling wrapper.
    pub fn view<H2, F>(self, name: &str, child: F) -> Result<Self, RegistrationError>
    where
        H2: EntityHandle,
        F: Fn(&H) -> H2 + Send + Sync + 'static,
    {
        let getter = view_getter::<H, H2, F>(child);
        self.property(name, getter, None)
    }

    /// A view whose underlying value may be replaced, converted with `W`.
    pub fn view_rw<H2, W, V, F, S>(self, name: &str, child: F, set: S) -> Result<Self, RegistrationError>
    where
        H2: EntityHandle,
        W: FromScript<V> + 'static,
        V: 'static,
        F: Fn(&H) -> H2 + Send + Sync + 'static,
        S: Fn(&mut H::Target, V) + Send + Sync + 'static,
    {
        let getter = view_getter::<H, H2, F>(child);
        let setter = setter::<ContextualWrapper<H>, W, V, S>(set);
        self.property(name, getter, Some(setter))
    }
}

fn getter<C, P, V, F>(get: F) -> NativeFn
where
    C: ScriptClass,
    P: ToScript<V> + 'static,
    V: ?Sized + 'static,
    F: for<'a> Fn(&'a C::Target) -> &'a V + Send + Sync + 'static,
{
    NativeFn::new(move |call: &mut CallContext<'_>| {
        let this = call.this()?.clone();
        let value = C::with_ref(&this, call.heap(), |scope, target| P::to_script(scope, get(target)))?;
        call.set_return_slot(value);
        Ok(())
    })
}

fn setter<C, W, V, S>(set: S) -> NativeFn
where
    C: ScriptClass,
    W: FromScript<V> + 'static,
    V: 'static,
    S: Fn(&mut C::Target, V) + Send + Sync + 'static,
{
    NativeFn::new(move |call: &mut CallContext<'_>| {
        let this = call.this()?.clone();
        let raw = call.take_arg(0)?;
        let db = C::database(&this)?;
        let value = {
            let mut scope = ScopeMut::resolve(db, call.heap_mut())?;
            W::from_script(&mut scope, &raw)?
        };
        C::with_mut(&this, call.heap_mut(), |target| {
            set(target, value);
            Ok(())
        })
    })
}

fn view_getter<H, H2, F>(child: F) -> NativeFn
where
    H: EntityHandle,
    H2: EntityHandle,
    F: Fn(&H) -> H2 + Send + Sync + 'static,
{
    NativeFn::new(move |call: &mut CallContext<'_>| {
        let parent = ContextualWrapper::<H>::from_dynamic(call.this()?)
            .map_err(|e| NativeError::invalid_this(e.to_string()))?;
        parent.get(call.heap())?;
        call.set_return(ContextualWrapper::new(parent.db, child(&parent.handle)));
        Ok(())
    })
}

/// Convert the arguments, run the method on the resolved target, then
/// convert its result against the (possibly modified) database.
fn dispatch<C, R, Args, Ret>(
    call: &mut CallContext<'_>,
    arity: usize,
    convert: impl FnOnce(&mut ScopeMut<'_>, &[Dynamic]) -> Result<Args, NativeError>,
    run: impl FnOnce(&mut C::Target, Args) -> Result<Ret, NativeError>,
) -> Result<(), NativeError>
where
    C: ScriptClass,
    R: ToScript<Ret>,
{
    let this = call.this()?.clone();
    let raw = (0..arity)
        .map(|i| call.take_arg(i))
        .collect::<Result<Vec<_>, _>>()?;
    let db = C::database(&this)?;
    let args = {
        let mut scope = ScopeMut::resolve(db, call.heap_mut())?;
        convert(&mut scope, &raw)?
    };
    let ret = C::with_mut(&this, call.heap_mut(), |target| run(target, args))?;
    let value = match db {
        Some(db) => {
            let ctx = call
                .heap()
                .get::<Context>(db)
                .ok_or_else(|| NativeError::stale("Context", "the database has been released"))?;
            R::to_script(&Scope::bound(db, ctx), &ret)?
        }
        None => R::to_script(&Scope::detached(), &ret)?,
    };
    call.set_return_slot(value);
    Ok(())
}
