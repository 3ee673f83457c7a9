//! Call context bridging scripts and native Rust functions.

use std::fmt;

use crate::convert::{FromDynamic, IntoDynamic};
use crate::error::NativeError;

use super::{Dynamic, ObjectHeap};

/// Context for native function calls.
///
/// Holds the argument slots, the return slot and the object heap. For
/// methods and attribute accessors slot 0 is `this` and the arguments start
/// at slot 1.
///
/// ```ignore
/// let name: String = ctx.arg(0)?;
/// ctx.set_return(name.len() as i64);
/// ```
pub struct CallContext<'vm> {
    slots: &'vm mut [Dynamic],
    /// Index of first argument (0 for functions, 1 for methods where 0 is `this`)
    arg_offset: usize,
    return_slot: &'vm mut Dynamic,
    heap: &'vm mut ObjectHeap,
}

impl<'vm> CallContext<'vm> {
    pub fn new(
        slots: &'vm mut [Dynamic],
        arg_offset: usize,
        return_slot: &'vm mut Dynamic,
        heap: &'vm mut ObjectHeap,
    ) -> Self {
        Self {
            slots,
            arg_offset,
            return_slot,
            heap,
        }
    }

    /// Get the number of arguments (excluding `this` for methods).
    pub fn arg_count(&self) -> usize {
        self.slots.len().saturating_sub(self.arg_offset)
    }

    pub fn arg_slot(&self, index: usize) -> Result<&Dynamic, NativeError> {
        let slot_index = self.arg_offset + index;
        self.slots
            .get(slot_index)
            .ok_or(NativeError::ArgumentIndexOutOfBounds {
                index,
                count: self.arg_count(),
            })
    }

    /// Move an argument out of its slot, leaving `Void` behind.
    pub fn take_arg(&mut self, index: usize) -> Result<Dynamic, NativeError> {
        let slot_index = self.arg_offset + index;
        let count = self.arg_count();
        self.slots
            .get_mut(slot_index)
            .map(std::mem::take)
            .ok_or(NativeError::ArgumentIndexOutOfBounds { index, count })
    }

    /// Get a typed argument value.
    pub fn arg<T: FromDynamic>(&self, index: usize) -> Result<T, NativeError> {
        let slot = self.arg_slot(index)?;
        T::from_dynamic(slot).map_err(NativeError::Conversion)
    }

    /// The receiver of a method or accessor call.
    pub fn this(&self) -> Result<&Dynamic, NativeError> {
        if self.arg_offset == 0 {
            return Err(NativeError::invalid_this("free function has no receiver"));
        }
        self.slots
            .first()
            .ok_or_else(|| NativeError::invalid_this("no slots available"))
    }

    pub fn set_return_slot(&mut self, slot: Dynamic) {
        *self.return_slot = slot;
    }

    pub fn set_return<T: IntoDynamic>(&mut self, value: T) {
        *self.return_slot = value.into_dynamic();
    }

    pub fn heap(&self) -> &ObjectHeap {
        self.heap
    }

    pub fn heap_mut(&mut self) -> &mut ObjectHeap {
        self.heap
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("arg_count", &self.arg_count())
            .field("arg_offset", &self.arg_offset)
            .finish()
    }
}
