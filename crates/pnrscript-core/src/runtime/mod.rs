//! Native function storage and execution context.
//!
//! ## Key Types
//!
//! - [`Dynamic`]: Runtime value type for call slots
//! - [`NativeFn`]: Type-erased callable wrapper for bound functions
//! - [`CallContext`]: Bridge between a script call and Rust
//! - [`ObjectHeap`]: Generational arena for script-owned databases

mod call_context;
mod dynamic;
mod native_fn;
mod object_heap;

pub use call_context::CallContext;
pub use dynamic::{Dynamic, NativeValue};
pub use native_fn::{NativeCallable, NativeFn};
pub use object_heap::{ObjectHandle, ObjectHeap};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NativeError;

    #[test]
    fn dynamic_type_names() {
        assert_eq!(Dynamic::Void.type_name(), "void");
        assert_eq!(Dynamic::Int(0).type_name(), "int");
        assert_eq!(Dynamic::Float(0.0).type_name(), "float");
        assert_eq!(Dynamic::Bool(false).type_name(), "bool");
        assert_eq!(Dynamic::String("".into()).type_name(), "string");
        assert_eq!(Dynamic::List(vec![]).type_name(), "list");
        assert_eq!(Dynamic::NullHandle.type_name(), "null");
    }

    #[test]
    fn native_values_share_state() {
        let a = Dynamic::wrap(7i32);
        let b = a.clone();
        a.as_native().unwrap().with_mut(|v: &mut i32| *v = 9);
        assert_eq!(b.as_native().unwrap().cloned::<i32>(), Some(9));
        assert_eq!(a, b);
        assert_ne!(a, Dynamic::wrap(9i32));
    }

    #[test]
    fn native_value_wrong_type() {
        let v = NativeValue::new(String::from("x"));
        assert!(v.cloned::<i32>().is_none());
        assert!(v.is::<String>());
    }

    #[test]
    fn object_heap_allocate_and_get() {
        let mut heap = ObjectHeap::new();
        let handle = heap.allocate(42i32);
        assert_eq!(heap.get::<i32>(handle), Some(&42));
        assert!(handle.is::<i32>());
    }

    #[test]
    fn object_heap_wrong_type() {
        let mut heap = ObjectHeap::new();
        let handle = heap.allocate(42i32);
        assert!(heap.get::<String>(handle).is_none());
    }

    #[test]
    fn object_heap_ref_counting() {
        let mut heap = ObjectHeap::new();
        let handle = heap.allocate(42i32);

        assert_eq!(heap.ref_count(handle), Some(1));
        heap.add_ref(handle);
        assert_eq!(heap.ref_count(handle), Some(2));

        assert!(!heap.release(handle));
        assert!(heap.release(handle));
        assert_eq!(heap.ref_count(handle), None);
        assert!(heap.get::<i32>(handle).is_none());
        assert!(heap.is_empty());
    }

    #[test]
    fn object_heap_generational_handles() {
        let mut heap = ObjectHeap::new();
        let handle1 = heap.allocate(42i32);
        heap.free(handle1);
        assert!(heap.get::<i32>(handle1).is_none());

        let handle2 = heap.allocate(100i32);
        assert_eq!(handle1.index, handle2.index);
        assert_eq!(heap.get::<i32>(handle2), Some(&100));
        assert!(heap.get::<i32>(handle1).is_none());
    }

    #[test]
    fn call_context_method_arg_offset() {
        let mut slots = vec![Dynamic::wrap(42i32), Dynamic::Int(42)];
        let mut ret = Dynamic::Void;
        let mut heap = ObjectHeap::new();

        let ctx = CallContext::new(&mut slots, 1, &mut ret, &mut heap);
        assert_eq!(ctx.arg_count(), 1);
        assert!(ctx.this().unwrap().as_native().unwrap().is::<i32>());
    }

    #[test]
    fn free_function_has_no_this() {
        let mut slots = vec![Dynamic::Int(1)];
        let mut ret = Dynamic::Void;
        let mut heap = ObjectHeap::new();

        let ctx = CallContext::new(&mut slots, 0, &mut ret, &mut heap);
        assert!(matches!(ctx.this(), Err(NativeError::InvalidThis { .. })));
    }

    #[test]
    fn native_fn_call() {
        let native = NativeFn::new(|ctx: &mut CallContext| {
            let a: i64 = ctx.arg(0)?;
            let b: i64 = ctx.arg(1)?;
            ctx.set_return(a + b);
            Ok(())
        });

        let mut slots = vec![Dynamic::Int(10), Dynamic::Int(20)];
        let mut ret = Dynamic::Void;
        let mut heap = ObjectHeap::new();

        let mut ctx = CallContext::new(&mut slots, 0, &mut ret, &mut heap);
        native.call(&mut ctx).unwrap();

        assert_eq!(ret, Dynamic::Int(30));
    }

    #[test]
    fn missing_argument_is_out_of_bounds() {
        let mut slots = vec![Dynamic::Int(10)];
        let mut ret = Dynamic::Void;
        let mut heap = ObjectHeap::new();

        let ctx = CallContext::new(&mut slots, 0, &mut ret, &mut heap);
        let err = ctx.arg::<i64>(3).unwrap_err();
        assert!(matches!(
            err,
            NativeError::ArgumentIndexOutOfBounds { index: 3, count: 1 }
        ));
    }
}
