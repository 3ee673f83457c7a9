use std::any::Any;

use pnrscript_core::{ContextualWrapper, Dynamic, EntityHandle, IntoDynamic, ObjectHandle, ObjectHeap};
use pnrscript_netlist::{Arch, BelId, Context, PipId, WireId};

/// A row of four bels (`B0`..`B3`) and two wires; no pips.
struct RowArch;

const BELS: [&str; 4] = ["B0", "B1", "B2", "B3"];
const WIRES: [&str; 2] = ["W0", "W1"];

impl Arch for RowArch {
    fn family(&self) -> &'static str {
        "row"
    }
    fn bel_by_name(&self, name: &str) -> Option<BelId> {
        BELS.iter().position(|b| *b == name).map(|i| BelId::new(i as u32))
    }
    fn bel_name(&self, bel: BelId) -> Option<&str> {
        BELS.get(bel.index() as usize).copied()
    }
    fn bels(&self) -> Vec<BelId> {
        (0..BELS.len() as u32).map(BelId::new).collect()
    }
    fn wire_by_name(&self, name: &str) -> Option<WireId> {
        WIRES.iter().position(|w| *w == name).map(|i| WireId::new(i as u32))
    }
    fn wire_name(&self, wire: WireId) -> Option<&str> {
        WIRES.get(wire.index() as usize).copied()
    }
    fn wires(&self) -> Vec<WireId> {
        (0..WIRES.len() as u32).map(WireId::new).collect()
    }
    fn pip_by_name(&self, _name: &str) -> Option<PipId> {
        None
    }
    fn pip_name(&self, _pip: PipId) -> Option<&str> {
        None
    }
    fn pips(&self) -> Vec<PipId> {
        Vec::new()
    }
    fn pip_dst_wire(&self, _pip: PipId) -> Option<WireId> {
        None
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A heap holding one empty database.
pub(crate) fn database() -> (ObjectHeap, ObjectHandle) {
    let mut heap = ObjectHeap::new();
    let db = heap.allocate(Context::new(Box::new(RowArch)));
    (heap, db)
}

/// Populate the database with `f` and wrap the handle it returns.
pub(crate) fn wrap<H: EntityHandle>(
    heap: &mut ObjectHeap,
    db: ObjectHandle,
    f: impl FnOnce(&mut Context) -> H,
) -> Dynamic {
    let ctx = heap.get_mut::<Context>(db).unwrap();
    ContextualWrapper::new(db, f(ctx)).into_dynamic()
}
