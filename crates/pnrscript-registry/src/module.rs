//! The script-facing namespace.

use std::any::{TypeId, type_name};

use pnrscript_core::{
    CallContext, Dynamic, NativeError, NativeFn, ObjectHeap, ScriptClass, ScriptException, bridge,
};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::class_builder::ClassBuilder;
use crate::enum_builder::EnumBuilder;
use crate::error::RegistrationError;

/// An attribute accessor pair.
pub(crate) struct PropertyEntry {
    pub getter: NativeFn,
    pub setter: Option<NativeFn>,
}

/// A callable with a fixed argument count (excluding the receiver).
#[derive(Clone)]
pub(crate) struct Callable {
    pub arity: usize,
    pub f: NativeFn,
}

pub(crate) struct ClassEntry {
    pub name: String,
    pub properties: FxHashMap<String, PropertyEntry>,
    pub methods: FxHashMap<String, Callable>,
    pub constructor: Option<Callable>,
}

pub(crate) struct EnumEntry {
    pub values: Vec<(String, i64)>,
}

/// A populated binding namespace.
///
/// Registration happens once, through the builders; afterwards the module
/// is only read. Every script-facing entry point takes the [`ObjectHeap`]
/// that owns the databases its wrappers point into, and reports failures as
/// [`ScriptException`]s.
pub struct Module {
    name: String,
    classes: Vec<ClassEntry>,
    by_type: FxHashMap<TypeId, usize>,
    by_name: FxHashMap<String, usize>,
    enums: FxHashMap<String, EnumEntry>,
    functions: FxHashMap<String, Callable>,
    globals: FxHashMap<String, Dynamic>,
    order: Vec<String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
            by_type: FxHashMap::default(),
            by_name: FxHashMap::default(),
            enums: FxHashMap::default(),
            functions: FxHashMap::default(),
            globals: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // =========================================================================
    // Registration
    // =========================================================================

    pub fn register_class<C: ScriptClass>(&mut self, name: &str) -> ClassBuilder<'_, C> {
        ClassBuilder::new(self, name.to_owned())
    }

    /// Reopen a registered class to add members to it.
    ///
    /// Members already on the class count as duplicates. Nothing changes
    /// unless [`ClassBuilder::build`] succeeds.
    pub fn extend_class<C: ScriptClass>(&mut self) -> Result<ClassBuilder<'_, C>, RegistrationError> {
        let index = *self
            .by_type
            .get(&TypeId::of::<C>())
            .ok_or(RegistrationError::UnregisteredType {
                type_name: type_name::<C>(),
            })?;
        let name = self.classes[index].name.clone();
        Ok(ClassBuilder::extending(self, name, index))
    }

    pub fn register_enum<E: Into<i64> + Copy>(&mut self, name: &str) -> EnumBuilder<'_, E> {
        EnumBuilder::new(self, name.to_owned())
    }

    /// Register a free function taking exactly `arity` arguments.
    pub fn function<F>(&mut self, name: &str, arity: usize, f: F) -> Result<(), RegistrationError>
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), NativeError> + Send + Sync + 'static,
    {
        self.claim(name, "function")?;
        self.functions.insert(
            name.to_owned(),
            Callable {
                arity,
                f: NativeFn::new(f),
            },
        );
        debug!(module = %self.name, function = name, arity, "registered function");
        Ok(())
    }

    pub fn add_global(&mut self, name: &str, value: Dynamic) -> Result<(), RegistrationError> {
        self.claim(name, "global")?;
        self.globals.insert(name.to_owned(), value);
        Ok(())
    }

    pub(crate) fn add_class(
        &mut self,
        class: ClassEntry,
        type_id: TypeId,
        type_name: &'static str,
        heap_type: Option<TypeId>,
    ) -> Result<(), RegistrationError> {
        if let Some(&existing) = self.by_type.get(&type_id) {
            return Err(RegistrationError::DuplicateType {
                type_name,
                existing: self.classes[existing].name.clone(),
            });
        }
        self.claim(&class.name, "class")?;
        let index = self.classes.len();
        self.by_type.insert(type_id, index);
        if let Some(heap_type) = heap_type {
            self.by_type.entry(heap_type).or_insert(index);
        }
        self.by_name.insert(class.name.clone(), index);
        debug!(
            module = %self.name,
            class = %class.name,
            attributes = class.properties.len(),
            methods = class.methods.len(),
            "registered class"
        );
        self.classes.push(class);
        Ok(())
    }

    pub(crate) fn class_entry(&self, index: usize) -> &ClassEntry {
        &self.classes[index]
    }

    pub(crate) fn merge_class(&mut self, index: usize, additions: ClassEntry) {
        let class = &mut self.classes[index];
        debug!(
            module = %self.name,
            class = %class.name,
            attributes = additions.properties.len(),
            methods = additions.methods.len(),
            "extended class"
        );
        class.properties.extend(additions.properties);
        class.methods.extend(additions.methods);
        if additions.constructor.is_some() {
            class.constructor = additions.constructor;
        }
    }

    pub(crate) fn add_enum(&mut self, name: &str, entry: EnumEntry) -> Result<(), RegistrationError> {
        self.claim(name, "enum")?;
        debug!(module = %self.name, enum_name = name, values = entry.values.len(), "registered enum");
        self.enums.insert(name.to_owned(), entry);
        Ok(())
    }

    /// Reserve a top-level name and record it in registration order.
    fn claim(&mut self, name: &str, kind: &'static str) -> Result<(), RegistrationError> {
        if self.order.iter().any(|n| n == name) {
            return Err(RegistrationError::DuplicateRegistration {
                name: name.to_owned(),
                kind,
            });
        }
        self.order.push(name.to_owned());
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Every top-level name, in the order it was registered.
    pub fn registration_order(&self) -> &[String] {
        &self.order
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.classes.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// The class a script value dispatches to.
    pub fn class_name_of(&self, value: &Dynamic) -> Option<&str> {
        self.class_of(value).ok().map(|c| c.name.as_str())
    }

    /// Attribute and method names of a class, sorted.
    pub fn members(&self, class: &str) -> Option<Vec<&str>> {
        let class = &self.classes[*self.by_name.get(class)?];
        let mut names: Vec<&str> = class
            .properties
            .keys()
            .chain(class.methods.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        Some(names)
    }

    pub fn global(&self, name: &str) -> Option<&Dynamic> {
        self.globals.get(name)
    }

    pub fn enum_value(&self, enum_name: &str, value: &str) -> Option<i64> {
        self.enums
            .get(enum_name)?
            .values
            .iter()
            .find(|(n, _)| n == value)
            .map(|(_, v)| *v)
    }

    // =========================================================================
    // Script-facing surface
    // =========================================================================

    pub fn get_attr(
        &self,
        heap: &mut ObjectHeap,
        this: &Dynamic,
        name: &str,
    ) -> Result<Dynamic, ScriptException> {
        bridge(self.try_get_attr(heap, this, name))
    }

    pub fn set_attr(
        &self,
        heap: &mut ObjectHeap,
        this: &Dynamic,
        name: &str,
        value: Dynamic,
    ) -> Result<(), ScriptException> {
        bridge(self.try_set_attr(heap, this, name, value))
    }

    pub fn call_method(
        &self,
        heap: &mut ObjectHeap,
        this: &Dynamic,
        name: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, ScriptException> {
        bridge(self.try_call_method(heap, this, name, args))
    }

    pub fn call_function(
        &self,
        heap: &mut ObjectHeap,
        name: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, ScriptException> {
        bridge(self.try_call_function(heap, name, args))
    }

    /// Instantiate a class that has a constructor.
    pub fn construct(
        &self,
        heap: &mut ObjectHeap,
        class: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, ScriptException> {
        bridge(self.try_construct(heap, class, args))
    }

    /// Script `==`: the class's `__eq__` when it has one, identity otherwise.
    pub fn equals(
        &self,
        heap: &mut ObjectHeap,
        a: &Dynamic,
        b: &Dynamic,
    ) -> Result<bool, ScriptException> {
        let has_eq = self
            .class_of(a)
            .is_ok_and(|class| class.methods.contains_key("__eq__"));
        if !has_eq {
            return Ok(a == b);
        }
        let result = self.call_method(heap, a, "__eq__", vec![b.clone()])?;
        Ok(result.as_bool().unwrap_or(false))
    }

    fn try_get_attr(
        &self,
        heap: &mut ObjectHeap,
        this: &Dynamic,
        name: &str,
    ) -> Result<Dynamic, NativeError> {
        let class = self.class_of(this)?;
        let property = class.properties.get(name).ok_or_else(|| NativeError::NoAttribute {
            class: class.name.clone(),
            name: name.to_owned(),
        })?;
        invoke(&property.getter, vec![this.clone()], 1, heap)
    }

    fn try_set_attr(
        &self,
        heap: &mut ObjectHeap,
        this: &Dynamic,
        name: &str,
        value: Dynamic,
    ) -> Result<(), NativeError> {
        let class = self.class_of(this)?;
        let property = class.properties.get(name).ok_or_else(|| NativeError::NoAttribute {
            class: class.name.clone(),
            name: name.to_owned(),
        })?;
        let setter = property.setter.as_ref().ok_or_else(|| NativeError::ReadOnlyAttribute {
            class: class.name.clone(),
            name: name.to_owned(),
        })?;
        invoke(setter, vec![this.clone(), value], 1, heap).map(drop)
    }

    fn try_call_method(
        &self,
        heap: &mut ObjectHeap,
        this: &Dynamic,
        name: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, NativeError> {
        let class = self.class_of(this)?;
        let method = class.methods.get(name).ok_or_else(|| NativeError::NoAttribute {
            class: class.name.clone(),
            name: name.to_owned(),
        })?;
        check_arity(name, method.arity, args.len())?;
        let mut slots = Vec::with_capacity(args.len() + 1);
        slots.push(this.clone());
        slots.extend(args);
        invoke(&method.f, slots, 1, heap)
    }

    fn try_call_function(
        &self,
        heap: &mut ObjectHeap,
        name: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, NativeError> {
        let function = self.functions.get(name).ok_or_else(|| NativeError::NoAttribute {
            class: self.name.clone(),
            name: name.to_owned(),
        })?;
        check_arity(name, function.arity, args.len())?;
        invoke(&function.f, args, 0, heap)
    }

    fn try_construct(
        &self,
        heap: &mut ObjectHeap,
        class_name: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, NativeError> {
        let class = self
            .by_name
            .get(class_name)
            .map(|&i| &self.classes[i])
            .ok_or_else(|| NativeError::UnknownClass {
                type_name: class_name.to_owned(),
            })?;
        let constructor = class.constructor.as_ref().ok_or_else(|| NativeError::NoAttribute {
            class: class.name.clone(),
            name: "__init__".to_owned(),
        })?;
        check_arity(class_name, constructor.arity, args.len())?;
        invoke(&constructor.f, args, 0, heap)
    }

    fn class_of(&self, value: &Dynamic) -> Result<&ClassEntry, NativeError> {
        let type_id = match value {
            Dynamic::Native(native) => Some(native.type_id()),
            Dynamic::Object(handle) => Some(handle.type_id),
            _ => None,
        };
        type_id
            .and_then(|id| self.by_type.get(&id))
            .map(|&i| &self.classes[i])
            .ok_or_else(|| NativeError::UnknownClass {
                type_name: value.type_name().to_owned(),
            })
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("classes", &self.classes.len())
            .field("enums", &self.enums.len())
            .field("functions", &self.functions.len())
            .finish()
    }
}

fn check_arity(name: &str, expected: usize, got: usize) -> Result<(), NativeError> {
    if expected != got {
        return Err(NativeError::ArityMismatch {
            name: name.to_owned(),
            expected,
            got,
        });
    }
    Ok(())
}

fn invoke(
    f: &NativeFn,
    mut slots: Vec<Dynamic>,
    arg_offset: usize,
    heap: &mut ObjectHeap,
) -> Result<Dynamic, NativeError> {
    let mut ret = Dynamic::Void;
    let mut call = CallContext::new(&mut slots, arg_offset, &mut ret, heap);
    f.call(&mut call)?;
    Ok(ret)
}
