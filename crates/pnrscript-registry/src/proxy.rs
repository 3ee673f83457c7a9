//! Collection proxy generators.
//!
//! A proxy is a [`ContextualWrapper`] over a container handle, registered as
//! a class whose methods implement the collection protocol against the live
//! container. Nothing is copied out: every call resolves the container again
//! and mutations land in the database.
//!
//! - map proxies: [`ClassBuilder::map_proxy`], plus
//!   [`map_setitem`](ClassBuilder::map_setitem) and
//!   [`map_delitem`](ClassBuilder::map_delitem) where the map is writable
//! - sequence proxies: [`ClassBuilder::vec_proxy`]
//! - set proxies: [`ClassBuilder::set_proxy`], plus
//!   [`set_mutation`](ClassBuilder::set_mutation)
//!
//! Iteration is in key order, which for identifiers is interning order.

use std::hash::Hash;
use std::marker::PhantomData;

use pnrscript_core::handles::KeyedChild;
use pnrscript_core::{
    CallContext, ContextualWrapper, Dynamic, EntityHandle, FromScript, IntoDynamic, NativeError,
    ObjectHandle, Scope, ScopeMut, ToScript,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::class_builder::ClassBuilder;
use crate::error::RegistrationError;

/// Key-unique containers a map proxy can front.
pub trait MapContainer: 'static {
    type Key: Copy + Ord + 'static;
    type Value: 'static;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &Self::Key) -> Option<&Self::Value>;
    fn sorted_keys(&self) -> Vec<Self::Key>;
    fn insert(&mut self, key: Self::Key, value: Self::Value);
    fn remove(&mut self, key: &Self::Key) -> Option<Self::Value>;
}

impl<K, V> MapContainer for FxHashMap<K, V>
where
    K: Copy + Ord + Hash + 'static,
    V: 'static,
{
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        self.len()
    }

    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn sorted_keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    fn insert(&mut self, key: K, value: V) {
        self.insert(key, value);
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.remove(key)
    }
}

/// Ordered sequences a sequence proxy can front.
pub trait SeqContainer: 'static {
    type Item: 'static;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn at(&self, index: usize) -> Option<&Self::Item>;
}

impl<T: 'static> SeqContainer for Vec<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.len()
    }

    fn at(&self, index: usize) -> Option<&T> {
        self.get(index)
    }
}

pub trait SetContainer: 'static {
    type Item: Copy + Ord + 'static;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, item: &Self::Item) -> bool;
    fn sorted(&self) -> Vec<Self::Item>;
    fn insert(&mut self, item: Self::Item) -> bool;
    fn remove(&mut self, item: &Self::Item) -> bool;
}

impl<T> SetContainer for FxHashSet<T>
where
    T: Copy + Ord + Hash + 'static,
{
    type Item = T;

    fn len(&self) -> usize {
        self.len()
    }

    fn contains(&self, item: &T) -> bool {
        self.contains(item)
    }

    fn sorted(&self) -> Vec<T> {
        let mut items: Vec<T> = self.iter().copied().collect();
        items.sort_unstable();
        items
    }

    fn insert(&mut self, item: T) -> bool {
        self.insert(item)
    }

    fn remove(&mut self, item: &T) -> bool {
        self.remove(item)
    }
}

/// How a proxy hands out the value stored under `key` in `container`.
pub trait ValuePolicy<H, K, V> {
    fn value(scope: &Scope<'_>, container: &H, key: &K, value: &V) -> Result<Dynamic, NativeError>;
}

/// Plain values, converted with the policy `P`.
pub struct Converted<P>(PhantomData<P>);

impl<H, K, V, P: ToScript<V>> ValuePolicy<H, K, V> for Converted<P> {
    fn value(scope: &Scope<'_>, _container: &H, _key: &K, value: &V) -> Result<Dynamic, NativeError> {
        P::to_script(scope, value)
    }
}

/// Entities, handed out as wrappers addressed through the container.
pub struct Wrapped;

impl<H: KeyedChild<K, V>, K, V> ValuePolicy<H, K, V> for Wrapped {
    fn value(scope: &Scope<'_>, container: &H, key: &K, value: &V) -> Result<Dynamic, NativeError> {
        let db = scope
            .database()
            .ok_or(NativeError::MissingDatabase { kind: H::KIND })?;
        Ok(ContextualWrapper::new(db, container.child(key, value)).into_dynamic())
    }
}

impl<'m, H> ClassBuilder<'m, ContextualWrapper<H>>
where
    H: EntityHandle,
    H::Target: MapContainer,
{
    /// The read side of the map protocol: `__len__`, `__getitem__`,
    /// `__contains__`, `keys`, `values`, `items` and `__iter__` (keys).
    ///
    /// `KO` renders keys, `KI` parses lookup keys, `VO` renders values.
    pub fn map_proxy<KO, KI, VO>(self) -> Result<Self, RegistrationError>
    where
        KO: ToScript<<H::Target as MapContainer>::Key> + 'static,
        KI: FromScript<<H::Target as MapContainer>::Key> + 'static,
        VO: ValuePolicy<H, <H::Target as MapContainer>::Key, <H::Target as MapContainer>::Value>
            + 'static,
    {
        self.method_raw("__len__", 0, |call| {
            let proxy = open::<H>(call)?;
            let len = proxy.get(call.heap())?.len();
            call.set_return(len);
            Ok(())
        })?
        .method_raw("__getitem__", 1, |call| {
            let proxy = open::<H>(call)?;
            let raw = call.take_arg(0)?;
            let key = convert::<KI, _>(call, proxy.db, &raw)?;
            let value = read(call, &proxy, |scope, map| {
                let value = map.lookup(&key).ok_or_else(|| key_not_found(&raw))?;
                VO::value(scope, &proxy.handle, &key, value)
            })?;
            call.set_return_slot(value);
            Ok(())
        })?
        .method_raw("__contains__", 1, |call| {
            let proxy = open::<H>(call)?;
            let raw = call.take_arg(0)?;
            let found = match lookup_key::<KI, _>(call, proxy.db, &raw)? {
                Some(key) => proxy.get(call.heap())?.lookup(&key).is_some(),
                None => false,
            };
            call.set_return(found);
            Ok(())
        })?
        .method_raw("keys", 0, |call| {
            let proxy = open::<H>(call)?;
            let keys = read(call, &proxy, |scope, map| {
                map.sorted_keys().iter().map(|k| KO::to_script(scope, k)).collect()
            })?;
            call.set_return_slot(Dynamic::List(keys));
            Ok(())
        })?
        .method_raw("__iter__", 0, |call| {
            let proxy = open::<H>(call)?;
            let keys = read(call, &proxy, |scope, map| {
                map.sorted_keys().iter().map(|k| KO::to_script(scope, k)).collect()
            })?;
            call.set_return_slot(Dynamic::List(keys));
            Ok(())
        })?
        .method_raw("values", 0, |call| {
            let proxy = open::<H>(call)?;
            let values = read(call, &proxy, |scope, map| {
                map.sorted_keys()
                    .iter()
                    .filter_map(|k| map.lookup(k).map(|v| (k, v)))
                    .map(|(k, v)| VO::value(scope, &proxy.handle, k, v))
                    .collect()
            })?;
            call.set_return_slot(Dynamic::List(values));
            Ok(())
        })?
        .method_raw("items", 0, |call| {
            let proxy = open::<H>(call)?;
            let items = read(call, &proxy, |scope, map| {
                map.sorted_keys()
                    .iter()
                    .filter_map(|k| map.lookup(k).map(|v| (k, v)))
                    .map(|(k, v)| {
                        let key = KO::to_script(scope, k)?;
                        let value = VO::value(scope, &proxy.handle, k, v)?;
                        Ok(Dynamic::List(vec![key, value]))
                    })
                    .collect()
            })?;
            call.set_return_slot(Dynamic::List(items));
            Ok(())
        })
    }

    /// `__setitem__`, inserting or replacing in the live map.
    pub fn map_setitem<KW, VW>(self) -> Result<Self, RegistrationError>
    where
        KW: FromScript<<H::Target as MapContainer>::Key> + 'static,
        VW: FromScript<<H::Target as MapContainer>::Value> + 'static,
    {
        self.method_raw("__setitem__", 2, |call| {
            let proxy = open::<H>(call)?;
            let raw_key = call.take_arg(0)?;
            let raw_value = call.take_arg(1)?;
            let key = convert::<KW, _>(call, proxy.db, &raw_key)?;
            let value = convert::<VW, _>(call, proxy.db, &raw_value)?;
            proxy.get_mut(call.heap_mut())?.insert(key, value);
            Ok(())
        })
    }

    /// `__delitem__` and its alias `remove`; the key must be present.
    pub fn map_delitem<KI>(self) -> Result<Self, RegistrationError>
    where
        KI: FromScript<<H::Target as MapContainer>::Key> + 'static,
    {
        fn delete<H, KI>(call: &mut CallContext<'_>) -> Result<(), NativeError>
        where
            H: EntityHandle,
            H::Target: MapContainer,
            KI: FromScript<<H::Target as MapContainer>::Key>,
        {
            let proxy = open::<H>(call)?;
            let raw = call.take_arg(0)?;
            let key = convert::<KI, _>(call, proxy.db, &raw)?;
            proxy
                .get_mut(call.heap_mut())?
                .remove(&key)
                .map(drop)
                .ok_or_else(|| key_not_found(&raw))
        }

        self.method_raw("__delitem__", 1, delete::<H, KI>)?
            .method_raw("remove", 1, delete::<H, KI>)
    }
}

impl<'m, H> ClassBuilder<'m, ContextualWrapper<H>>
where
    H: EntityHandle,
    H::Target: SeqContainer,
{
    /// `__len__`, `__getitem__` (negative indices count from the end) and
    /// `__iter__`, with elements rendered by `VO`.
    pub fn vec_proxy<VO>(self) -> Result<Self, RegistrationError>
    where
        VO: ValuePolicy<H, usize, <H::Target as SeqContainer>::Item> + 'static,
    {
        self.method_raw("__len__", 0, |call| {
            let proxy = open::<H>(call)?;
            let len = proxy.get(call.heap())?.len();
            call.set_return(len);
            Ok(())
        })?
        .method_raw("__getitem__", 1, |call| {
            let proxy = open::<H>(call)?;
            let index: i64 = call.arg(0)?;
            let value = read(call, &proxy, |scope, seq| {
                let len = seq.len();
                let position = if index < 0 {
                    usize::try_from(index + len as i64).ok()
                } else {
                    usize::try_from(index).ok()
                };
                let (position, item) = position
                    .and_then(|p| seq.at(p).map(|item| (p, item)))
                    .ok_or(NativeError::IndexOutOfRange { index, len })?;
                VO::value(scope, &proxy.handle, &position, item)
            })?;
            call.set_return_slot(value);
            Ok(())
        })?
        .method_raw("__iter__", 0, |call| {
            let proxy = open::<H>(call)?;
            let items = read(call, &proxy, |scope, seq| {
                (0..seq.len())
                    .filter_map(|i| seq.at(i).map(|item| (i, item)))
                    .map(|(i, item)| VO::value(scope, &proxy.handle, &i, item))
                    .collect()
            })?;
            call.set_return_slot(Dynamic::List(items));
            Ok(())
        })
    }
}

impl<'m, H> ClassBuilder<'m, ContextualWrapper<H>>
where
    H: EntityHandle,
    H::Target: SetContainer,
{
    /// `__len__`, `__contains__` and `__iter__`.
    pub fn set_proxy<EO, EI>(self) -> Result<Self, RegistrationError>
    where
        EO: ToScript<<H::Target as SetContainer>::Item> + 'static,
        EI: FromScript<<H::Target as SetContainer>::Item> + 'static,
    {
        self.method_raw("__len__", 0, |call| {
            let proxy = open::<H>(call)?;
            let len = proxy.get(call.heap())?.len();
            call.set_return(len);
            Ok(())
        })?
        .method_raw("__contains__", 1, |call| {
            let proxy = open::<H>(call)?;
            let raw = call.take_arg(0)?;
            let found = match lookup_key::<EI, _>(call, proxy.db, &raw)? {
                Some(item) => proxy.get(call.heap())?.contains(&item),
                None => false,
            };
            call.set_return(found);
            Ok(())
        })?
        .method_raw("__iter__", 0, |call| {
            let proxy = open::<H>(call)?;
            let items = read(call, &proxy, |scope, set| {
                set.sorted().iter().map(|item| EO::to_script(scope, item)).collect()
            })?;
            call.set_return_slot(Dynamic::List(items));
            Ok(())
        })
    }

    /// `add` and `remove`; removing an absent element is a `KeyError`.
    pub fn set_mutation<EW>(self) -> Result<Self, RegistrationError>
    where
        EW: FromScript<<H::Target as SetContainer>::Item> + 'static,
    {
        self.method_raw("add", 1, |call| {
            let proxy = open::<H>(call)?;
            let raw = call.take_arg(0)?;
            let item = convert::<EW, _>(call, proxy.db, &raw)?;
            proxy.get_mut(call.heap_mut())?.insert(item);
            Ok(())
        })?
        .method_raw("remove", 1, |call| {
            let proxy = open::<H>(call)?;
            let raw = call.take_arg(0)?;
            let item = convert::<EW, _>(call, proxy.db, &raw)?;
            if proxy.get_mut(call.heap_mut())?.remove(&item) {
                Ok(())
            } else {
                Err(key_not_found(&raw))
            }
        })
    }
}

fn open<H: EntityHandle>(call: &CallContext<'_>) -> Result<ContextualWrapper<H>, NativeError> {
    ContextualWrapper::<H>::from_dynamic(call.this()?)
        .map_err(|e| NativeError::invalid_this(e.to_string()))
}

fn read<H, R>(
    call: &CallContext<'_>,
    proxy: &ContextualWrapper<H>,
    f: impl FnOnce(&Scope<'_>, &H::Target) -> Result<R, NativeError>,
) -> Result<R, NativeError>
where
    H: EntityHandle,
{
    let heap = call.heap();
    let ctx = proxy.context(heap)?;
    let target = proxy.get(heap)?;
    f(&Scope::bound(proxy.db, ctx), target)
}

fn convert<P: FromScript<V>, V>(
    call: &mut CallContext<'_>,
    db: ObjectHandle,
    raw: &Dynamic,
) -> Result<V, NativeError> {
    let mut scope = ScopeMut::resolve(Some(db), call.heap_mut())?;
    P::from_script(&mut scope, raw)
}

/// A membership key, or `None` when the string names nothing at all.
fn lookup_key<P: FromScript<V>, V>(
    call: &mut CallContext<'_>,
    db: ObjectHandle,
    raw: &Dynamic,
) -> Result<Option<V>, NativeError> {
    match convert::<P, V>(call, db, raw) {
        Ok(key) => Ok(Some(key)),
        Err(NativeError::InvalidIdentifier { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn key_not_found(raw: &Dynamic) -> NativeError {
    NativeError::KeyNotFound {
        key: raw.as_str().map_or_else(|| format!("{raw:?}"), str::to_owned),
    }
}

#[cfg(test)]
mod tests {
    use pnrscript_core::handles::{
        AttrMapHandle, AttrOwner, BelSetHandle, PortHandle, PortMapHandle,
        PortRefHandle, PortRefVecHandle,
    };
    use pnrscript_core::{ConvFromStr, ConvToStr, ExceptionKind, InternFromStr, ObjectHeap};
    use pnrscript_netlist::{BelId, CellInfo, Context, PortInfo, PortRef, Property};

    use super::*;
    use crate::Module;
    use crate::test_support::{database, wrap};

    fn s(text: &str) -> Dynamic {
        Dynamic::String(text.to_owned())
    }

    fn proxy_module() -> Module {
        let mut module = Module::new("test");
        module
            .register_class::<ContextualWrapper<AttrMapHandle>>("AttrMap")
            .map_proxy::<ConvToStr, ConvFromStr, Converted<ConvToStr>>()
            .unwrap()
            .map_setitem::<InternFromStr, InternFromStr>()
            .unwrap()
            .map_delitem::<ConvFromStr>()
            .unwrap()
            .build()
            .unwrap();
        module
            .register_class::<ContextualWrapper<PortMapHandle>>("PortMap")
            .map_proxy::<ConvToStr, ConvFromStr, Wrapped>()
            .unwrap()
            .build()
            .unwrap();
        module
            .register_class::<ContextualWrapper<PortHandle>>("PortInfo")
            .readonly::<ConvToStr, _, _>("name", |p: &PortInfo| &p.name)
            .unwrap()
            .build()
            .unwrap();
        module
            .register_class::<ContextualWrapper<PortRefVecHandle>>("PortRefVector")
            .vec_proxy::<Wrapped>()
            .unwrap()
            .build()
            .unwrap();
        module
            .register_class::<ContextualWrapper<PortRefHandle>>("PortRef")
            .readonly::<ConvToStr, _, _>("port", |p: &PortRef| &p.port)
            .unwrap()
            .build()
            .unwrap();
        module
            .register_class::<ContextualWrapper<BelSetHandle>>("BelSet")
            .set_proxy::<ConvToStr, ConvFromStr>()
            .unwrap()
            .set_mutation::<ConvFromStr>()
            .unwrap()
            .build()
            .unwrap();
        module
    }

    fn lut(ctx: &mut Context) -> pnrscript_netlist::IdString {
        let (c, t, a, b, f) = (ctx.id("lut"), ctx.id("LUT2"), ctx.id("A"), ctx.id("B"), ctx.id("F"));
        let cell: &mut CellInfo = ctx.create_cell(c, t).unwrap();
        cell.add_input(a);
        cell.add_input(b);
        cell.add_output(f);
        c
    }

    fn call(module: &Module, heap: &mut ObjectHeap, this: &Dynamic, name: &str, args: Vec<Dynamic>) -> Dynamic {
        module.call_method(heap, this, name, args).unwrap()
    }

    #[test]
    fn attr_map_mutations_reach_the_database() {
        let module = proxy_module();
        let (mut heap, db) = database();
        let attrs = wrap(&mut heap, db, |ctx| AttrMapHandle(AttrOwner::CellAttrs(lut(ctx))));

        call(&module, &mut heap, &attrs, "__setitem__", vec![s("keep"), s("1")]);
        call(&module, &mut heap, &attrs, "__setitem__", vec![s("src"), s("top.v:3")]);
        assert_eq!(call(&module, &mut heap, &attrs, "__len__", vec![]), Dynamic::Int(2));
        assert_eq!(call(&module, &mut heap, &attrs, "__getitem__", vec![s("keep")]), s("1"));

        let ctx = heap.get::<Context>(db).unwrap();
        let lut = ctx.lookup_id("lut").unwrap();
        let keep = ctx.lookup_id("keep").unwrap();
        assert_eq!(ctx.cells[&lut].attrs[&keep], Property::from_int(1, 1));

        call(&module, &mut heap, &attrs, "__delitem__", vec![s("keep")]);
        let fresh = wrap(&mut heap, db, |_| AttrMapHandle(AttrOwner::CellAttrs(lut)));
        let contains = call(&module, &mut heap, &fresh, "__contains__", vec![s("keep")]);
        assert_eq!(contains, Dynamic::Bool(false));
        assert_eq!(call(&module, &mut heap, &fresh, "keys", vec![]), Dynamic::List(vec![s("src")]));
    }

    #[test]
    fn lookups_are_strict() {
        let module = proxy_module();
        let (mut heap, db) = database();
        let attrs = wrap(&mut heap, db, |ctx| AttrMapHandle(AttrOwner::CellAttrs(lut(ctx))));

        let err = module
            .call_method(&mut heap, &attrs, "__getitem__", vec![s("nowhere")])
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::InvalidIdentifier);
        let contains = call(&module, &mut heap, &attrs, "__contains__", vec![s("nowhere")]);
        assert_eq!(contains, Dynamic::Bool(false));

        // Interned but absent from this map.
        let err = module
            .call_method(&mut heap, &attrs, "remove", vec![s("A")])
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::KeyError);
    }

    #[test]
    fn port_map_values_are_wrappers() {
        let module = proxy_module();
        let (mut heap, db) = database();
        let ports = wrap(&mut heap, db, |ctx| PortMapHandle(lut(ctx)));

        let keys = call(&module, &mut heap, &ports, "__iter__", vec![]);
        assert_eq!(keys, Dynamic::List(vec![s("A"), s("B"), s("F")]));

        let port = call(&module, &mut heap, &ports, "__getitem__", vec![s("F")]);
        assert_eq!(module.class_name_of(&port), Some("PortInfo"));
        assert_eq!(module.get_attr(&mut heap, &port, "name").unwrap(), s("F"));

        let items = call(&module, &mut heap, &ports, "items", vec![]);
        assert_eq!(items.as_list().map(<[Dynamic]>::len), Some(3));
    }

    #[test]
    fn port_ref_vector_supports_negative_indices() {
        let module = proxy_module();
        let (mut heap, db) = database();
        let users = wrap(&mut heap, db, |ctx| {
            let c = lut(ctx);
            let (n, a, b) = (ctx.id("n"), ctx.id("A"), ctx.id("B"));
            ctx.create_net(n).unwrap();
            ctx.connect_port(n, c, a).unwrap();
            ctx.connect_port(n, c, b).unwrap();
            PortRefVecHandle(n)
        });

        assert_eq!(call(&module, &mut heap, &users, "__len__", vec![]), Dynamic::Int(2));
        let last = call(&module, &mut heap, &users, "__getitem__", vec![Dynamic::Int(-1)]);
        assert_eq!(module.get_attr(&mut heap, &last, "port").unwrap(), s("B"));

        let err = module
            .call_method(&mut heap, &users, "__getitem__", vec![Dynamic::Int(2)])
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::IndexError);
        let err = module
            .call_method(&mut heap, &users, "__getitem__", vec![Dynamic::Int(-3)])
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::IndexError);
    }

    #[test]
    fn bel_set_add_and_remove() {
        let module = proxy_module();
        let (mut heap, db) = database();
        let bels = wrap(&mut heap, db, |ctx| {
            let r = ctx.id("left");
            ctx.create_region(r).unwrap();
            ctx.add_bel_to_region(r, BelId::new(2)).unwrap();
            BelSetHandle(r)
        });

        call(&module, &mut heap, &bels, "add", vec![s("B0")]);
        let all = call(&module, &mut heap, &bels, "__iter__", vec![]);
        assert_eq!(all, Dynamic::List(vec![s("B0"), s("B2")]));

        call(&module, &mut heap, &bels, "remove", vec![s("B2")]);
        assert_eq!(call(&module, &mut heap, &bels, "__len__", vec![]), Dynamic::Int(1));
        let contains = call(&module, &mut heap, &bels, "__contains__", vec![s("NOT_A_BEL")]);
        assert_eq!(contains, Dynamic::Bool(false));
        let err = module
            .call_method(&mut heap, &bels, "remove", vec![s("B2")])
            .unwrap_err();
        assert_eq!(err.kind, ExceptionKind::KeyError);
    }

    #[test]
    fn proxies_over_removed_owners_are_stale() {
        let module = proxy_module();
        let (mut heap, db) = database();
        let ports = wrap(&mut heap, db, |ctx| PortMapHandle(lut(ctx)));
        heap.get_mut::<Context>(db).unwrap().cells.clear();
        let err = module.call_method(&mut heap, &ports, "__len__", vec![]).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ReferenceError);
    }
}
